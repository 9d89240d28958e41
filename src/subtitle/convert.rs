use super::{CaptionLine, LanguageTag, SubtitleDocument};
use crate::transcribe::TranscriptSegment;

/// Convert transcript segments to a source-language document.
///
/// Segment timing is used as-is: no gap filling, no merging.
pub fn segments_to_document(segments: Vec<TranscriptSegment>) -> SubtitleDocument {
    let lines = segments
        .into_iter()
        .enumerate()
        .map(|(i, segment)| CaptionLine {
            index: i + 1,
            start: segment.start,
            end: segment.end,
            text: segment.text.trim().to_string(),
        })
        .collect();

    SubtitleDocument {
        language: LanguageTag::Source,
        lines,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn segment(start_ms: u64, end_ms: u64, text: &str) -> TranscriptSegment {
        TranscriptSegment {
            text: text.to_string(),
            start: Duration::from_millis(start_ms),
            end: Duration::from_millis(end_ms),
        }
    }

    #[test]
    fn test_sequential_indices_and_direct_timing() {
        let doc = segments_to_document(vec![
            segment(0, 1500, " 你好 "),
            segment(1000, 3000, "世界"),
            segment(5000, 5200, "再见"),
        ]);

        assert_eq!(doc.language, LanguageTag::Source);
        assert_eq!(doc.len(), 3);
        assert_eq!(
            doc.lines.iter().map(|l| l.index).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert_eq!(doc.lines[0].text, "你好");
        // Overlaps are kept as reported.
        assert_eq!(doc.lines[1].start, Duration::from_millis(1000));
        assert_eq!(doc.lines[0].end, Duration::from_millis(1500));
    }

    #[test]
    fn test_empty_segments() {
        assert!(segments_to_document(Vec::new()).is_empty());
    }
}
