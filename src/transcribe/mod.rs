pub mod scheduler;
pub mod whisper;

pub use scheduler::TranscriptionScheduler;
pub use whisper::WhisperClient;

use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptSegment {
    pub start: Duration,
    pub end: Duration,
    pub text: String,
}

/// Speech recognition engine: audio file in, timed segments out.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio: &Path) -> Result<Vec<TranscriptSegment>>;
    fn name(&self) -> &'static str;
}

/// Seconds reported by a recognition engine, clamped into a valid `Duration`.
pub(crate) fn seconds(secs: f64) -> Duration {
    if secs.is_finite() && secs > 0.0 {
        Duration::from_secs_f64(secs)
    } else {
        Duration::ZERO
    }
}
