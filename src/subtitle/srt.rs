//! SubRip rendering of the transcribed source document.
//!
//! Cues are separated by one blank line and the file ends with a single
//! newline, which is the layout the translation phase reads back line by line.

use std::fmt::Write;
use std::time::Duration;

use super::{CaptionLine, SubtitleFormatter};

pub struct SrtFormatter;

impl SubtitleFormatter for SrtFormatter {
    fn format(&self, lines: &[CaptionLine]) -> String {
        let mut out = String::new();
        for (i, line) in lines.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            write_cue(&mut out, line);
        }
        out
    }
}

fn write_cue(out: &mut String, line: &CaptionLine) {
    // Writing into a String cannot fail.
    let _ = writeln!(
        out,
        "{}\n{} --> {}\n{}",
        line.index,
        format_timestamp(line.start),
        format_timestamp(line.end),
        line.text
    );
}

/// `HH:MM:SS,mmm`; hours keep counting past 99.
pub fn format_timestamp(d: Duration) -> String {
    let ms = d.as_millis();
    format!(
        "{:02}:{:02}:{:02},{:03}",
        ms / 3_600_000,
        ms / 60_000 % 60,
        ms / 1000 % 60,
        ms % 1000
    )
}
