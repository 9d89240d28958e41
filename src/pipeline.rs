use crate::config::Config;
use crate::discovery::{discover_media, discover_translation, Deferred};
use crate::error::Result;
use crate::media::{Downloader, Transcoder, UrlQueue};
use crate::shutdown::{Shutdown, Sleeper};
use crate::transcribe::{Transcriber, TranscriptionScheduler};
use crate::translate::{TranslationPass, Translator, Transliterator};
use std::fmt;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, error, info, warn};

/// The two alternating halves of a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Transcribing,
    Translating,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Transcribing => write!(f, "transcription"),
            Phase::Translating => write!(f, "translation"),
        }
    }
}

/// What one pass did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassOutcome {
    /// Nothing to do.
    Idle,
    Completed { unit: String },
    /// Transcription produced no segments; the media was archived anyway.
    Empty { unit: String },
    /// Retries exhausted; nothing was written and the unit stays pending.
    Aborted { unit: String, reason: String },
    /// The pass hit an error before finishing the unit.
    Failed { reason: String },
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub transcription: PassOutcome,
    pub translation: PassOutcome,
}

/// Counters kept across the lifetime of [`Pipeline::run`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub cycles: u64,
    pub transcribed: u64,
    pub empty: u64,
    pub translated: u64,
    pub aborted: u64,
    pub failed: u64,
}

impl PipelineStats {
    fn record(&mut self, phase: Phase, outcome: &PassOutcome) {
        match (phase, outcome) {
            (Phase::Transcribing, PassOutcome::Completed { .. }) => self.transcribed += 1,
            (Phase::Translating, PassOutcome::Completed { .. }) => self.translated += 1,
            (_, PassOutcome::Empty { .. }) => self.empty += 1,
            (_, PassOutcome::Aborted { .. }) => self.aborted += 1,
            (_, PassOutcome::Failed { .. }) => self.failed += 1,
            _ => {}
        }
    }
}

/// Top-level driver: one transcription pass, then one translation pass,
/// until shut down.
pub struct Pipeline {
    config: Config,
    transcoder: Box<dyn Transcoder>,
    transcriber: Box<dyn Transcriber>,
    translator: Box<dyn Translator>,
    transliterator: Box<dyn Transliterator>,
    downloader: Option<Box<dyn Downloader>>,
    deferred_media: Mutex<Deferred>,
    deferred_translation: Mutex<Deferred>,
}

fn lock(deferred: &Mutex<Deferred>) -> MutexGuard<'_, Deferred> {
    deferred.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Defer a unit that failed so the next scan passes over it; a finished unit
/// leaves the list.
fn track(deferred: &Mutex<Deferred>, key: &Path, result: &Result<PassOutcome>) {
    match result {
        Ok(PassOutcome::Aborted { .. } | PassOutcome::Failed { .. }) | Err(_) => {
            lock(deferred).defer(key)
        }
        Ok(PassOutcome::Completed { .. } | PassOutcome::Empty { .. }) => lock(deferred).forget(key),
        Ok(PassOutcome::Idle | PassOutcome::Cancelled) => {}
    }
}

impl Pipeline {
    pub fn new(
        config: Config,
        transcoder: Box<dyn Transcoder>,
        transcriber: Box<dyn Transcriber>,
        translator: Box<dyn Translator>,
        transliterator: Box<dyn Transliterator>,
    ) -> Self {
        Self {
            config,
            transcoder,
            transcriber,
            translator,
            transliterator,
            downloader: None,
            deferred_media: Mutex::default(),
            deferred_translation: Mutex::default(),
        }
    }

    /// Process `urls.txt` in the media directory at the start of every
    /// transcription pass.
    pub fn with_downloader(mut self, downloader: Box<dyn Downloader>) -> Self {
        self.downloader = Some(downloader);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn prepare_directories(&self) -> Result<()> {
        std::fs::create_dir_all(&self.config.media_dir)?;
        std::fs::create_dir_all(&self.config.subtitle_dir)?;
        Ok(())
    }

    /// Download queued URLs, then transcribe at most one media unit. A unit
    /// that fails is passed over until the other pending units had a turn.
    pub async fn transcription_pass(&self, sleeper: &dyn Sleeper) -> Result<PassOutcome> {
        if let (Some(downloader), true) = (&self.downloader, self.config.download_queue) {
            let queue = self.config.url_queue_path();
            match UrlQueue::process(&queue, downloader.as_ref(), &self.config.media_dir).await {
                Ok(0) => {}
                Ok(n) => info!("Downloaded {} file(s) from {}", n, queue.display()),
                Err(e) => warn!("Download queue {} failed: {}", queue.display(), e),
            }
        }

        let found = discover_media(&self.config, &mut lock(&self.deferred_media))?;
        let Some(unit) = found else {
            return Ok(PassOutcome::Idle);
        };

        let result = TranscriptionScheduler::new(
            &self.config,
            self.transcoder.as_ref(),
            self.transcriber.as_ref(),
            sleeper,
        )
        .process(&unit)
        .await;
        track(&self.deferred_media, &unit.path, &result);
        result
    }

    /// Translate at most one incomplete subtitle document.
    ///
    /// Documents that failed or were aborted are skipped while others are
    /// pending; see [`crate::discovery`].
    pub async fn translation_pass(&self, sleeper: &dyn Sleeper) -> Result<PassOutcome> {
        let found = discover_translation(&self.config, &mut lock(&self.deferred_translation))?;
        let Some(unit) = found else {
            return Ok(PassOutcome::Idle);
        };

        let result = TranslationPass::new(
            &self.config,
            self.translator.as_ref(),
            self.transliterator.as_ref(),
            sleeper,
        )
        .process(&unit)
        .await;
        track(&self.deferred_translation, &unit.paths.source, &result);
        result
    }

    /// Run one phase; errors are logged and never propagated, and an idle
    /// phase waits for the idle interval.
    async fn run_phase(&self, phase: Phase, sleeper: &dyn Sleeper) -> PassOutcome {
        let result = match phase {
            Phase::Transcribing => self.transcription_pass(sleeper).await,
            Phase::Translating => self.translation_pass(sleeper).await,
        };

        match result {
            Ok(PassOutcome::Idle) => {
                debug!("No {} work, waiting", phase);
                if sleeper.sleep(self.config.idle_interval()).await {
                    PassOutcome::Idle
                } else {
                    PassOutcome::Cancelled
                }
            }
            Ok(outcome) => outcome,
            Err(e) => {
                error!("{} pass failed: {}", phase, e);
                PassOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// One transcription pass followed by one translation pass.
    pub async fn run_cycle(&self, sleeper: &dyn Sleeper) -> CycleReport {
        let transcription = self.run_phase(Phase::Transcribing, sleeper).await;
        let translation = if transcription == PassOutcome::Cancelled {
            PassOutcome::Cancelled
        } else {
            self.run_phase(Phase::Translating, sleeper).await
        };
        CycleReport {
            transcription,
            translation,
        }
    }

    /// Alternate passes until `shutdown` is triggered.
    pub async fn run(&self, shutdown: &Shutdown) -> PipelineStats {
        let mut stats = PipelineStats::default();

        info!(
            "Watching {} for media and {} for subtitles",
            self.config.media_dir.display(),
            self.config.subtitle_dir.display()
        );

        while !shutdown.is_triggered() {
            let report = self.run_cycle(shutdown).await;
            stats.cycles += 1;
            stats.record(Phase::Transcribing, &report.transcription);
            stats.record(Phase::Translating, &report.translation);
        }

        info!("Shutting down after {} cycle(s)", stats.cycles);
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_display() {
        assert_eq!(Phase::Transcribing.to_string(), "transcription");
        assert_eq!(Phase::Translating.to_string(), "translation");
    }

    #[test]
    fn test_stats_record() {
        let mut stats = PipelineStats::default();
        stats.record(Phase::Transcribing, &PassOutcome::Completed { unit: "a".into() });
        stats.record(Phase::Translating, &PassOutcome::Completed { unit: "a".into() });
        stats.record(Phase::Transcribing, &PassOutcome::Empty { unit: "b".into() });
        stats.record(
            Phase::Translating,
            &PassOutcome::Aborted {
                unit: "c".into(),
                reason: "x".into(),
            },
        );
        stats.record(Phase::Translating, &PassOutcome::Idle);

        assert_eq!(stats.transcribed, 1);
        assert_eq!(stats.translated, 1);
        assert_eq!(stats.empty, 1);
        assert_eq!(stats.aborted, 1);
        assert_eq!(stats.failed, 0);
    }
}
