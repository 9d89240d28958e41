//! Bounded retry with geometric backoff.
//!
//! Every failed attempt is followed by a pause of `inter_batch_sleep`; both
//! that pause and the `inter_call_sleep` handed to the operation then grow by
//! `backoff_factor`. The caller always gets a tagged [`BatchOutcome`]: an
//! exhausted run never carries data.

use std::future::Future;
use std::time::Duration;

use tracing::{info, warn};

use crate::config::RetryConfig;
use crate::error::SubpipeError;
use crate::shutdown::Sleeper;

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub inter_call_sleep: Duration,
    pub inter_batch_sleep: Duration,
    pub backoff_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            inter_call_sleep: Duration::from_secs_f64(config.inter_call_sleep_secs),
            inter_batch_sleep: Duration::from_secs_f64(config.inter_batch_sleep_secs),
            backoff_factor: config.backoff_factor,
        }
    }
}

/// Per-unit-of-work retry bookkeeping.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryState {
    /// Failed attempts so far.
    pub attempt: u32,
    pub inter_call_sleep: Duration,
    pub inter_batch_sleep: Duration,
}

impl RetryState {
    pub fn new(policy: &RetryPolicy) -> Self {
        Self {
            attempt: 0,
            inter_call_sleep: policy.inter_call_sleep,
            inter_batch_sleep: policy.inter_batch_sleep,
        }
    }

    /// Grow both pauses for the next attempt.
    pub fn back_off(&mut self, factor: f64) {
        self.inter_call_sleep = self.inter_call_sleep.mul_f64(factor);
        self.inter_batch_sleep = self.inter_batch_sleep.mul_f64(factor);
    }
}

#[derive(Debug)]
pub enum BatchOutcome<T> {
    Completed { value: T, attempts: u32 },
    /// Every attempt failed; `error` is the last failure.
    Exhausted { attempts: u32, error: SubpipeError },
    /// Shutdown was requested while waiting between attempts.
    Cancelled { attempts: u32 },
}

impl<T> BatchOutcome<T> {
    pub fn attempts(&self) -> u32 {
        match self {
            BatchOutcome::Completed { attempts, .. }
            | BatchOutcome::Exhausted { attempts, .. }
            | BatchOutcome::Cancelled { attempts } => *attempts,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, BatchOutcome::Completed { .. })
    }
}

/// Run `operation` until it succeeds or `policy.max_attempts` attempts have
/// failed. The operation receives the current inter-call pause.
pub async fn run_with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
    label: &str,
    mut operation: F,
) -> BatchOutcome<T>
where
    F: FnMut(Duration) -> Fut,
    Fut: Future<Output = crate::error::Result<T>>,
{
    let mut state = RetryState::new(policy);

    loop {
        match operation(state.inter_call_sleep).await {
            Ok(value) => {
                return BatchOutcome::Completed {
                    value,
                    attempts: state.attempt + 1,
                }
            }
            Err(SubpipeError::Cancelled) => {
                return BatchOutcome::Cancelled {
                    attempts: state.attempt + 1,
                }
            }
            Err(error) => {
                state.attempt += 1;
                if error.is_alignment() {
                    warn!(
                        "{}: attempt {}/{} returned misaligned output: {}",
                        label, state.attempt, policy.max_attempts, error
                    );
                } else {
                    warn!(
                        "{}: attempt {}/{} failed: {}",
                        label, state.attempt, policy.max_attempts, error
                    );
                }

                if state.attempt >= policy.max_attempts {
                    return BatchOutcome::Exhausted {
                        attempts: state.attempt,
                        error,
                    };
                }

                info!(
                    "{}: sleeping {:.1}s before retry",
                    label,
                    state.inter_batch_sleep.as_secs_f64()
                );
                if !sleeper.sleep(state.inter_batch_sleep).await {
                    return BatchOutcome::Cancelled {
                        attempts: state.attempt,
                    };
                }
                state.back_off(policy.backoff_factor);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSleeper {
        sleeps: Mutex<Vec<Duration>>,
        cancel_after: Option<usize>,
    }

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) -> bool {
            let mut sleeps = self.sleeps.lock().unwrap();
            sleeps.push(duration);
            self.cancel_after.map_or(true, |n| sleeps.len() < n)
        }
    }

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 5,
            inter_call_sleep: Duration::from_secs(1),
            inter_batch_sleep: Duration::from_secs(60),
            backoff_factor: 1.5,
        }
    }

    fn secs(durations: &[Duration]) -> Vec<f64> {
        durations.iter().map(|d| d.as_secs_f64()).collect()
    }

    #[tokio::test]
    async fn test_success_on_first_attempt() {
        let sleeper = RecordingSleeper::default();
        let outcome = run_with_retry(&policy(), &sleeper, "batch 1", |_| async { Ok(42) }).await;

        match outcome {
            BatchOutcome::Completed { value, attempts } => {
                assert_eq!(value, 42);
                assert_eq!(attempts, 1);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert!(sleeper.sleeps.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_always_failing_stops_at_max_attempts() {
        let sleeper = RecordingSleeper::default();
        let calls = AtomicU32::new(0);

        let outcome: BatchOutcome<()> = run_with_retry(&policy(), &sleeper, "batch 1", |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(SubpipeError::Api("rate limited".to_string())) }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 5);
        match outcome {
            BatchOutcome::Exhausted { attempts, error } => {
                assert_eq!(attempts, 5);
                assert!(matches!(error, SubpipeError::Api(_)));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_backoff_grows_by_factor() {
        let sleeper = RecordingSleeper::default();
        let call_pauses = Mutex::new(Vec::new());

        let _: BatchOutcome<()> = run_with_retry(&policy(), &sleeper, "batch 1", |pause| {
            call_pauses.lock().unwrap().push(pause);
            async { Err(SubpipeError::Translation("boom".to_string())) }
        })
        .await;

        // No pause after the final failure.
        assert_eq!(
            secs(&sleeper.sleeps.lock().unwrap()),
            vec![60.0, 90.0, 135.0, 202.5]
        );
        assert_eq!(
            secs(&call_pauses.lock().unwrap()),
            vec![1.0, 1.5, 2.25, 3.375, 5.0625]
        );
    }

    #[tokio::test]
    async fn test_recovers_after_failures() {
        let sleeper = RecordingSleeper::default();
        let calls = AtomicU32::new(0);

        let outcome = run_with_retry(&policy(), &sleeper, "batch 2", |_| {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(SubpipeError::Alignment {
                        language: "en".to_string(),
                        expected: 3,
                        actual: 2,
                    })
                } else {
                    Ok("done")
                }
            }
        })
        .await;

        assert!(outcome.is_completed());
        assert_eq!(outcome.attempts(), 3);
        assert_eq!(sleeper.sleeps.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_cancelled_during_backoff() {
        let sleeper = RecordingSleeper {
            cancel_after: Some(1),
            ..Default::default()
        };

        let outcome: BatchOutcome<()> = run_with_retry(&policy(), &sleeper, "batch 1", |_| async {
            Err(SubpipeError::Api("down".to_string()))
        })
        .await;

        assert!(matches!(outcome, BatchOutcome::Cancelled { attempts: 1 }));
    }

    #[tokio::test]
    async fn test_cancelled_inside_operation() {
        let sleeper = RecordingSleeper::default();
        let outcome: BatchOutcome<()> =
            run_with_retry(&policy(), &sleeper, "batch 1", |_| async {
                Err(SubpipeError::Cancelled)
            })
            .await;

        assert!(matches!(outcome, BatchOutcome::Cancelled { attempts: 1 }));
        assert!(sleeper.sleeps.lock().unwrap().is_empty());
    }

    #[test]
    fn test_policy_from_config() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.inter_call_sleep, Duration::from_secs(1));
        assert_eq!(policy.inter_batch_sleep, Duration::from_secs(60));
    }
}
