//! Cooperative cancellation.
//!
//! The pipeline only yields at sleeps, so cancellation is observed there and
//! at the top of each loop iteration. A blocked external call always runs to
//! completion.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

/// Something that can wait for a while.
#[async_trait]
pub trait Sleeper: Send + Sync {
    /// Wait for `duration`. Returns `false` if the wait was cut short by
    /// cancellation.
    async fn sleep(&self, duration: Duration) -> bool;
}

/// Cloneable cancellation handle; every clone observes the same signal.
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    triggered: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request shutdown. Safe to call from any thread, including signal handlers.
    pub fn trigger(&self) {
        self.triggered.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Sleeper for Shutdown {
    async fn sleep(&self, duration: Duration) -> bool {
        let notified = self.notify.notified();
        tokio::pin!(notified);
        // Register before checking the flag so a trigger in between is not lost.
        notified.as_mut().enable();

        if self.is_triggered() {
            return false;
        }
        if duration.is_zero() {
            return true;
        }

        tokio::select! {
            _ = tokio::time::sleep(duration) => true,
            _ = notified => false,
        }
    }
}
