use std::time::Instant;

use tracing::{error, info, warn};

use crate::config::Config;
use crate::discovery::OutputPaths;
use crate::error::Result;
use crate::files::{move_file, write_atomic};
use crate::media::{MediaUnit, Transcoder};
use crate::pipeline::PassOutcome;
use crate::retry::{run_with_retry, BatchOutcome, RetryPolicy};
use crate::shutdown::Sleeper;
use crate::subtitle::srt::SrtFormatter;
use crate::subtitle::text::PlainTextFormatter;
use crate::subtitle::segments_to_document;
use crate::transcribe::Transcriber;

/// Intermediate audio handed to the recognition engine.
const AUDIO_FILE: &str = "audio.mp3";

/// Turns one media unit into a source-language subtitle and archives it.
pub struct TranscriptionScheduler<'a> {
    config: &'a Config,
    transcoder: &'a dyn Transcoder,
    transcriber: &'a dyn Transcriber,
    sleeper: &'a dyn Sleeper,
}

impl<'a> TranscriptionScheduler<'a> {
    pub fn new(
        config: &'a Config,
        transcoder: &'a dyn Transcoder,
        transcriber: &'a dyn Transcriber,
        sleeper: &'a dyn Sleeper,
    ) -> Self {
        Self {
            config,
            transcoder,
            transcriber,
            sleeper,
        }
    }

    /// Fill in the media length; a failed probe only costs the throughput log.
    async fn probe(&self, unit: &MediaUnit) -> MediaUnit {
        match self.transcoder.probe_duration(&unit.path).await {
            Ok(duration) => unit.clone().with_duration(duration),
            Err(e) => {
                warn!("Could not probe {}: {}", unit.path.display(), e);
                unit.clone()
            }
        }
    }

    pub async fn process(&self, unit: &MediaUnit) -> Result<PassOutcome> {
        info!("Start processing {}...", unit.path.display());

        let unit = self.probe(unit).await;

        // The intermediate audio lives and dies with this directory.
        let work_dir = tempfile::TempDir::new()?;
        let audio = work_dir.path().join(AUDIO_FILE);
        self.transcoder.transcode(&unit.path, &audio).await?;
        info!("Audio file exported {}", audio.display());

        info!(
            "Starting transcribing {} with {}...",
            unit.base_name,
            self.transcriber.name()
        );
        let started = Instant::now();
        let policy = RetryPolicy::from(&self.config.retry);
        let label = format!("transcribe {}", unit.base_name);
        let outcome = run_with_retry(&policy, self.sleeper, &label, |_| {
            self.transcriber.transcribe(&audio)
        })
        .await;

        let segments = match outcome {
            BatchOutcome::Completed { value, .. } => value,
            BatchOutcome::Exhausted { attempts, error } => {
                error!(
                    "Giving up on {} after {} attempts: {}",
                    unit.base_name, attempts, error
                );
                return Ok(PassOutcome::Aborted {
                    unit: unit.base_name.clone(),
                    reason: error.to_string(),
                });
            }
            BatchOutcome::Cancelled { .. } => return Ok(PassOutcome::Cancelled),
        };
        work_dir.close()?;

        let elapsed = started.elapsed().as_secs_f64();
        if let Some(length) = unit.duration {
            let length = length.as_secs_f64();
            info!(
                "Time elapsed {:.2}s - media length {:.2}s - relative speed {:.1}x",
                elapsed,
                length,
                if elapsed > 0.0 { length / elapsed } else { 0.0 }
            );
        }

        let document = segments_to_document(segments);
        let paths = OutputPaths::new(&self.config.subtitle_dir, &unit.base_name, &self.config.languages);
        std::fs::create_dir_all(&self.config.subtitle_dir)?;

        let outcome = if document.is_empty() {
            info!("Subtitle empty {}", paths.source.display());
            PassOutcome::Empty {
                unit: unit.base_name.clone(),
            }
        } else {
            write_atomic(&paths.source, &document.render(&SrtFormatter))?;
            write_atomic(&paths.sidecar, &document.render(&PlainTextFormatter))?;
            info!(
                "Subtitle written {} ({} captions)",
                paths.source.display(),
                document.len()
            );
            PassOutcome::Completed {
                unit: unit.base_name.clone(),
            }
        };

        let archived = self.config.subtitle_dir.join(unit.archive_name());
        move_file(&unit.path, &archived)?;
        info!("Archived media to {}", archived.display());

        Ok(outcome)
    }
}
