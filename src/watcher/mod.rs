//! Lifecycle plumbing shared by the background change watchers.
//!
//! A watcher runs `Idle -> Running -> Stopping -> Terminated`. Stopping is
//! cooperative: [`WatcherShared::request_stop`] flips the state, wakes a
//! sleeping poll loop and kills an owned monitor process so a blocking
//! line-read returns. The loop itself observes the signal at its next
//! suspension point and records `Terminated` on the way out, including on
//! transport failure, so the detector knows a handle is no longer usable.

pub(crate) mod poll;
pub(crate) mod stream;

use std::process::Child;
use std::sync::{Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use log::{debug, error};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WatcherState {
    Idle,
    Running,
    Stopping,
    Terminated,
}

/// State shared between a watcher thread and the detector that owns it.
pub(crate) struct WatcherShared {
    state: Mutex<WatcherState>,
    cond: Condvar,
    /// Monitor subprocess owned by a stream watcher, if any. Held here so
    /// a stop request can kill it and unblock the reader.
    child: Mutex<Option<Child>>,
}

impl WatcherShared {
    pub(crate) fn new() -> Self {
        WatcherShared {
            state: Mutex::new(WatcherState::Idle),
            cond: Condvar::new(),
            child: Mutex::new(None),
        }
    }

    /// Marks the loop as running and reports whether it may proceed.
    /// Returns false when a stop was requested before the thread got
    /// scheduled; the loop must then exit without doing anything.
    pub(crate) fn mark_running(&self) -> bool {
        let mut state = self.state.lock().unwrap();
        if *state == WatcherState::Idle {
            *state = WatcherState::Running;
            true
        } else {
            false
        }
    }

    /// Asks the loop to stop at its next suspension point. Also kills an
    /// owned monitor process so a blocked line-read returns promptly.
    pub(crate) fn request_stop(&self) {
        {
            let mut state = self.state.lock().unwrap();
            match *state {
                WatcherState::Idle | WatcherState::Running => {
                    *state = WatcherState::Stopping;
                    self.cond.notify_all();
                }
                WatcherState::Stopping | WatcherState::Terminated => return,
            }
        }
        self.kill_child();
    }

    pub(crate) fn stop_requested(&self) -> bool {
        *self.state.lock().unwrap() == WatcherState::Stopping
    }

    pub(crate) fn terminated(&self) -> bool {
        *self.state.lock().unwrap() == WatcherState::Terminated
    }

    /// Records the loop as gone. Any still-owned monitor process is
    /// forcibly terminated so it cannot leak.
    pub(crate) fn mark_terminated(&self) {
        {
            let mut state = self.state.lock().unwrap();
            *state = WatcherState::Terminated;
            self.cond.notify_all();
        }
        self.kill_child();
        debug!("theme watcher terminated");
    }

    /// Interruptible sleep. Returns true when the wait ended because a
    /// stop was requested, false on an ordinary timeout.
    pub(crate) fn wait_for(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock().unwrap();
        loop {
            if *state != WatcherState::Running {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            state = self.cond.wait_timeout(state, deadline - now).unwrap().0;
        }
    }

    pub(crate) fn adopt_child(&self, child: Child) {
        *self.child.lock().unwrap() = Some(child);
    }

    fn kill_child(&self) {
        if let Some(mut child) = self.child.lock().unwrap().take() {
            if let Err(err) = child.kill() {
                error!("failed to kill theme monitor process: {}", err);
            }
            let _ = child.wait();
            debug!("theme monitor process has been destroyed");
        }
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> WatcherState {
        *self.state.lock().unwrap()
    }
}

/// Owner side of one background watcher. At most one live handle exists
/// per detector; dropping it signals the loop and joins the thread, so a
/// successor can never overlap with its predecessor.
pub(crate) struct WatcherHandle {
    shared: std::sync::Arc<WatcherShared>,
    thread: Option<JoinHandle<()>>,
}

impl WatcherHandle {
    pub(crate) fn new(shared: std::sync::Arc<WatcherShared>, thread: JoinHandle<()>) -> Self {
        WatcherHandle {
            shared,
            thread: Some(thread),
        }
    }

    /// True once the loop has exited, normally or through a transport
    /// failure. A terminated handle must be replaced, never reused.
    pub(crate) fn is_terminated(&self) -> bool {
        self.shared.terminated()
    }

    /// Signals the loop and waits for it to drain to `Terminated`.
    pub(crate) fn stop(self) {
        // Drop does the actual work.
    }
}

/// Spawns a named watcher thread. When the OS refuses to create the
/// thread the handle comes back already terminated, so the detector
/// treats it like any other transport failure.
pub(crate) fn spawn_loop<F>(
    name: &str,
    shared: std::sync::Arc<WatcherShared>,
    body: F,
) -> WatcherHandle
where
    F: FnOnce() + Send + 'static,
{
    match std::thread::Builder::new().name(name.to_string()).spawn(body) {
        Ok(thread) => WatcherHandle::new(shared, thread),
        Err(err) => {
            error!("failed to spawn {} thread: {}", name, err);
            shared.mark_terminated();
            WatcherHandle {
                shared,
                thread: None,
            }
        }
    }
}

impl Drop for WatcherHandle {
    fn drop(&mut self) {
        self.shared.request_stop();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("theme watcher thread panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn fresh_shared_starts_idle() {
        let shared = WatcherShared::new();
        assert_matches!(shared.state(), WatcherState::Idle);
        assert!(!shared.stop_requested());
        assert!(!shared.terminated());
    }

    #[test]
    fn running_loop_observes_stop_request() {
        let shared = WatcherShared::new();
        assert!(shared.mark_running());
        shared.request_stop();
        assert!(shared.stop_requested());
        shared.mark_terminated();
        assert_matches!(shared.state(), WatcherState::Terminated);
    }

    #[test]
    fn stop_before_start_prevents_running() {
        let shared = WatcherShared::new();
        shared.request_stop();
        assert!(!shared.mark_running());
    }

    #[test]
    fn stop_request_interrupts_the_wait() {
        use std::sync::Arc;
        use std::time::Instant;

        let shared = Arc::new(WatcherShared::new());
        assert!(shared.mark_running());

        let waiter = shared.clone();
        let thread = std::thread::spawn(move || {
            let started = Instant::now();
            let interrupted = waiter.wait_for(Duration::from_secs(30));
            (interrupted, started.elapsed())
        });

        std::thread::sleep(Duration::from_millis(50));
        shared.request_stop();

        let (interrupted, waited) = thread.join().unwrap();
        assert!(interrupted);
        assert!(waited < Duration::from_secs(5));
    }

    #[test]
    fn plain_timeout_is_not_an_interrupt() {
        let shared = WatcherShared::new();
        assert!(shared.mark_running());
        assert!(!shared.wait_for(Duration::from_millis(10)));
    }
}
