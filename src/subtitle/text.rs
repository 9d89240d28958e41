// Plain-text sidecar: one caption per line
use super::{CaptionLine, SubtitleFormatter};

pub struct PlainTextFormatter;

impl SubtitleFormatter for PlainTextFormatter {
    fn format(&self, lines: &[CaptionLine]) -> String {
        lines
            .iter()
            .map(|line| line.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}
