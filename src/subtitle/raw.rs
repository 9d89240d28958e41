//! Line-for-line view of a subtitle file used by the translation phase.
//!
//! The file is never re-parsed structurally: it is split into raw lines, the
//! caption text lines are picked out by [`is_translatable`], and the rewritten
//! variants are rendered back with the same line count, line endings and
//! trailing newline as the input.

use std::path::Path;

use crate::error::Result;

const BOM: char = '\u{feff}';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEnding {
    Lf,
    CrLf,
}

impl LineEnding {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::CrLf => "\r\n",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLineSet {
    /// Lines without their terminators.
    pub lines: Vec<String>,
    pub ending: LineEnding,
    pub trailing_newline: bool,
    pub bom: bool,
}

impl RawLineSet {
    pub fn parse(content: &str) -> Self {
        let (bom, content) = match content.strip_prefix(BOM) {
            Some(rest) => (true, rest),
            None => (false, content),
        };

        let ending = if content.contains("\r\n") {
            LineEnding::CrLf
        } else {
            LineEnding::Lf
        };
        let trailing_newline = content.ends_with('\n');

        let body = if trailing_newline {
            &content[..content.len() - 1]
        } else {
            content
        };

        let lines = if content.is_empty() {
            Vec::new()
        } else {
            body.split('\n')
                .map(|l| l.strip_suffix('\r').unwrap_or(l).to_string())
                .collect()
        };

        Self {
            lines,
            ending,
            trailing_newline,
            bom,
        }
    }

    pub async fn read(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        Ok(Self::parse(&content))
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Render `lines` with this file's conventions. A line may itself contain
    /// `\n` (the combined document does); those breaks are emitted with the
    /// file's line ending too.
    pub fn render(&self, lines: &[String]) -> String {
        let eol = self.ending.as_str();
        let mut out = String::new();
        if self.bom {
            out.push(BOM);
        }
        let body = lines
            .iter()
            .map(|l| {
                if self.ending == LineEnding::CrLf {
                    l.replace('\n', eol)
                } else {
                    l.clone()
                }
            })
            .collect::<Vec<_>>()
            .join(eol);
        out.push_str(&body);
        if self.trailing_newline && !lines.is_empty() {
            out.push_str(eol);
        }
        out
    }
}

/// A raw line is caption text unless it is blank or starts with a digit
/// (sequence numbers and `HH:MM:SS,mmm --> ...` timing lines).
///
/// Captions that themselves begin with a numeral are treated as structural.
pub fn is_translatable(line: &str) -> bool {
    let trimmed = line.trim_start_matches(BOM);
    match trimmed.chars().next() {
        None => false,
        Some(c) if c.is_ascii_digit() => false,
        Some(_) => !trimmed.trim().is_empty(),
    }
}

/// Translatable lines of `set` paired with their file-line index.
pub fn translatable_lines(set: &RawLineSet) -> Vec<(usize, String)> {
    set.lines
        .iter()
        .enumerate()
        .filter(|(_, line)| is_translatable(line))
        .map(|(i, line)| (i, line.clone()))
        .collect()
}
