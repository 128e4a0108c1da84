use std::future::Future;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Quiet window for search input before a refresh is fired.
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

/// Cancellable one-shot timer: each `schedule` call cancels the pending
/// timer (if any) and starts a new one. Only the timer wait is cancelled;
/// a task whose window already elapsed runs to completion.
pub struct Debouncer {
    window: Duration,
    pending: Mutex<Option<CancellationToken>>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: Mutex::new(None),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn schedule<F, Fut>(&self, task: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let token = CancellationToken::new();
        if let Some(previous) = self.replace_pending(Some(token.clone())) {
            previous.cancel();
        }

        let window = self.window;
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    debug!("debounced task superseded");
                }
                _ = tokio::time::sleep(window) => {
                    task().await;
                }
            }
        });
    }

    /// Drops the pending timer without scheduling a new one.
    pub fn cancel(&self) {
        if let Some(previous) = self.replace_pending(None) {
            previous.cancel();
        }
    }

    fn replace_pending(&self, next: Option<CancellationToken>) -> Option<CancellationToken> {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *pending, next)
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(SEARCH_DEBOUNCE)
    }
}
