use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, error, info};

use super::{plan_batches, BatchExecutor, Translator, Transliterator};
use crate::config::Config;
use crate::discovery::TranslationUnit;
use crate::error::Result;
use crate::files::write_atomic;
use crate::pipeline::PassOutcome;
use crate::retry::{run_with_retry, BatchOutcome, RetryPolicy};
use crate::shutdown::Sleeper;
use crate::subtitle::{translatable_lines, DerivedDocuments, RawLineSet};

/// Produces the four derived documents of one source subtitle.
///
/// Outputs are written only after every batch has succeeded; an exhausted
/// batch aborts the unit so it is picked up again on a later pass.
pub struct TranslationPass<'a> {
    config: &'a Config,
    translator: &'a dyn Translator,
    transliterator: &'a dyn Transliterator,
    sleeper: &'a dyn Sleeper,
}

impl<'a> TranslationPass<'a> {
    pub fn new(
        config: &'a Config,
        translator: &'a dyn Translator,
        transliterator: &'a dyn Transliterator,
        sleeper: &'a dyn Sleeper,
    ) -> Self {
        Self {
            config,
            translator,
            transliterator,
            sleeper,
        }
    }

    pub async fn process(&self, unit: &TranslationUnit) -> Result<PassOutcome> {
        info!("Start translating {}...", unit.paths.source.display());

        let source = RawLineSet::read(&unit.paths.source).await?;
        let batches = plan_batches(translatable_lines(&source), self.config.batch_size);
        let total = batches.len();
        debug!(
            "{}: {} lines, {} batch(es) of up to {}",
            unit.base_name,
            source.len(),
            total,
            self.config.batch_size
        );

        let mut docs = DerivedDocuments::new(&source);
        let executor = BatchExecutor::new(
            self.translator,
            self.transliterator,
            &self.config.languages,
            self.sleeper,
        );
        let policy = RetryPolicy::from(&self.config.retry);
        let progress = self.progress_bar(total);

        for batch in &batches {
            let label = format!("{} batch {}/{}", unit.base_name, batch.number + 1, total);
            let outcome =
                run_with_retry(&policy, self.sleeper, &label, |pause| executor.execute(batch, pause))
                    .await;

            match outcome {
                BatchOutcome::Completed { value, attempts } => {
                    value.apply(batch, &mut docs);
                    debug!("{}: {} lines in {} attempt(s)", label, batch.len(), attempts);
                }
                BatchOutcome::Exhausted { attempts, error } => {
                    if let Some(pb) = &progress {
                        pb.abandon();
                    }
                    let kind = if error.is_alignment() {
                        "alignment failure"
                    } else {
                        "service failure"
                    };
                    error!(
                        "{}: {} after {} attempts, nothing written: {}",
                        label, kind, attempts, error
                    );
                    return Ok(PassOutcome::Aborted {
                        unit: unit.base_name.clone(),
                        reason: format!("{label}: {error}"),
                    });
                }
                BatchOutcome::Cancelled { .. } => {
                    if let Some(pb) = &progress {
                        pb.abandon();
                    }
                    return Ok(PassOutcome::Cancelled);
                }
            }

            if let Some(pb) = &progress {
                pb.inc(1);
            }
        }

        if let Some(pb) = progress {
            pb.finish_and_clear();
        }

        let paths = &unit.paths;
        write_atomic(&paths.translation_a, &source.render(&docs.translation_a))?;
        write_atomic(&paths.translation_b, &source.render(&docs.translation_b))?;
        write_atomic(&paths.transliteration, &source.render(&docs.transliteration))?;
        write_atomic(&paths.combined, &source.render(&docs.combined))?;
        info!("Combined file written {}", paths.combined.display());

        Ok(PassOutcome::Completed {
            unit: unit.base_name.clone(),
        })
    }

    fn progress_bar(&self, total: usize) -> Option<ProgressBar> {
        if !self.config.show_progress || total == 0 {
            return None;
        }
        let pb = ProgressBar::new(total as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} batches ({eta})")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        Some(pb)
    }
}
