//! Cancellable one-shot timers.
//!
//! Controllers own their pending timers (scan timeout, gesture auto-reset)
//! so teardown can cancel them deterministically instead of letting a stray
//! callback mutate state after the owner is gone.

use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::trace;

/// A one-shot timer that runs an async action after a delay unless
/// cancelled first. Dropping the deadline cancels it.
pub struct Deadline {
    handle: JoinHandle<()>,
}

impl Deadline {
    /// Arm a timer that runs `action` once `delay` has elapsed.
    pub fn after<F, Fut>(delay: Duration, action: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send,
    {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            trace!(?delay, "Deadline elapsed");
            action().await;
        });

        Self { handle }
    }

    /// Cancel the timer. No-op if it already fired.
    pub fn cancel(&self) {
        self.handle.abort();
    }
}

impl Drop for Deadline {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
