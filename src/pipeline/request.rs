//! Coalesced redraw requests.
//!
//! Any thread may call [`RenderSignal::request`]; the render loop consumes
//! requests with `wait` or `wait_timeout`. A request is a single flag, so a
//! burst of requests between two frames produces exactly one frame.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Single-slot "frame needed" flag.
#[derive(Debug, Default)]
pub struct RenderSignal {
    pending: Mutex<bool>,
    wake: Condvar,
    requests: AtomicU64,
}

impl RenderSignal {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, bool> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Ask for a frame. Cheap and safe from any thread.
    pub fn request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        *self.lock() = true;
        self.wake.notify_one();
    }

    /// Block until a frame is requested, then consume the request.
    pub fn wait(&self) {
        let mut pending = self.lock();
        while !*pending {
            pending = self.wake.wait(pending).unwrap_or_else(PoisonError::into_inner);
        }
        *pending = false;
    }

    /// Like [`wait`](Self::wait) but gives up after `timeout`.
    /// Returns whether a request was consumed.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let pending = self.lock();
        let (mut pending, _) = self
            .wake
            .wait_timeout_while(pending, timeout, |p| !*p)
            .unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *pending, false)
    }

    /// Consume a pending request without blocking.
    pub fn take(&self) -> bool {
        std::mem::replace(&mut *self.lock(), false)
    }

    /// Whether a request is waiting.
    pub fn is_pending(&self) -> bool {
        *self.lock()
    }

    /// Total `request()` calls so far, coalesced or not.
    pub fn request_count(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    #[test]
    fn test_requests_coalesce() {
        let signal = RenderSignal::new();
        signal.request();
        signal.request();
        signal.request();

        assert_eq!(signal.request_count(), 3);
        assert!(signal.take());
        assert!(!signal.take());
    }

    #[test]
    fn test_wait_timeout_without_request() {
        let signal = RenderSignal::new();
        assert!(!signal.wait_timeout(Duration::from_millis(5)));
    }

    #[test]
    fn test_wait_wakes_on_request_from_other_thread() {
        let signal = Arc::new(RenderSignal::new());
        let remote = Arc::clone(&signal);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            remote.request();
        });

        signal.wait();
        assert!(!signal.is_pending());
        handle.join().unwrap();
    }
}
