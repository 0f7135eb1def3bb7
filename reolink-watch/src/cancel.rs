//! Cooperative cancellation for the polling loop

use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

#[derive(Debug, Default)]
struct Inner {
    cancelled: Mutex<bool>,
    signal: Condvar,
}

/// Shared flag that stops a watch between ticks
///
/// Clones share the same flag. Cancelling wakes any thread sleeping in
/// [`wait_timeout`](Self::wait_timeout), so the loop does not wait out its
/// interval before noticing.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    inner: Arc<Inner>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; idempotent
    pub fn cancel(&self) {
        let mut cancelled = self.inner.cancelled.lock();
        if !*cancelled {
            *cancelled = true;
            self.inner.signal.notify_all();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.cancelled.lock()
    }

    /// Sleep for up to `timeout`, returning early if cancelled
    ///
    /// Returns `true` if the token is cancelled when the wait ends.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let mut cancelled = self.inner.cancelled.lock();
        if !*cancelled {
            self.inner
                .signal
                .wait_while_for(&mut cancelled, |cancelled| !*cancelled, timeout);
        }
        *cancelled
    }
}
