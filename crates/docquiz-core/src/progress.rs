//! Progress reporting and cooperative cancellation.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;

/// Progress callback receiving a percentage in `0..=100`.
pub type ProgressCallback = Arc<dyn Fn(u8) + Send + Sync>;

/// Wraps an optional callback and keeps reported values monotonic.
pub struct ProgressReporter {
    callback: Option<ProgressCallback>,
    last: Option<u8>,
}

impl ProgressReporter {
    pub fn new(callback: Option<ProgressCallback>) -> Self {
        Self {
            callback,
            last: None,
        }
    }

    /// Report a percentage. Values are clamped to 100 and never go backwards.
    pub fn report(&mut self, percent: u8) {
        let percent = percent.min(100);
        if self.last.is_some_and(|last| percent <= last) {
            return;
        }
        self.last = Some(percent);
        if let Some(callback) = &self.callback {
            callback(percent);
        }
    }

    /// Report `done / total` of the range `start..=end`.
    pub fn report_fraction(&mut self, start: u8, end: u8, done: u32, total: u32) {
        if total == 0 {
            self.report(end);
            return;
        }
        let span = f64::from(end.saturating_sub(start));
        let offset = (span * f64::from(done) / f64::from(total)).round();
        self.report(start.saturating_add(offset as u8));
    }

    pub fn last(&self) -> Option<u8> {
        self.last
    }
}

/// Shared cancellation signal.
///
/// Cloning yields another handle to the same signal. Long-running work polls
/// [`CancellationToken::is_cancelled`] at its own boundaries; observers that
/// want a wake-up await [`CancellationToken::cancelled`].
#[derive(Clone, Default)]
pub struct CancellationToken {
    inner: Arc<CancelState>,
}

#[derive(Default)]
struct CancelState {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the signal and wake every waiter. Idempotent.
    pub fn cancel(&self) {
        if !self.inner.cancelled.swap(true, Ordering::SeqCst) {
            self.inner.notify.notify_waiters();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once [`CancellationToken::cancel`] has been called.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
