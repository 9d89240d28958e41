pub mod convert;
pub mod merge;
pub mod raw;
pub mod srt;
pub mod text;

pub use convert::segments_to_document;
pub use merge::{merge_line, DerivedDocuments};
pub use raw::{is_translatable, translatable_lines, LineEnding, RawLineSet};

use std::time::Duration;

/// Which variant of a unit's subtitles a document holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanguageTag {
    Source,
    Transliteration,
    TranslationA,
    TranslationB,
    Combined,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaptionLine {
    /// 1-based, contiguous.
    pub index: usize,
    pub start: Duration,
    pub end: Duration,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleDocument {
    pub language: LanguageTag,
    pub lines: Vec<CaptionLine>,
}

impl SubtitleDocument {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn render(&self, formatter: &dyn SubtitleFormatter) -> String {
        formatter.format(&self.lines)
    }
}

pub trait SubtitleFormatter {
    fn format(&self, lines: &[CaptionLine]) -> String;
}
