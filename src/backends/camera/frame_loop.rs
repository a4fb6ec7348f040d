// SPDX-License-Identifier: GPL-3.0-only
//! Thread lifecycle management for the scan loop
//!
//! Frame acquisition and decoding are blocking, variable-latency operations,
//! so the scan loop runs on its own worker thread with cooperative
//! cancellation. The stop flag is polled once per iteration; there is no
//! preemption mid-frame.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

/// Action returned by the loop callback to control loop behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopAction {
    /// Continue running the loop
    Continue,
    /// Stop the loop gracefully
    Stop,
}

/// Controller for a scan loop running in a separate thread
///
/// At most one loop runs per controller. Stopping blocks until the worker
/// has fully exited, so shared resources (e.g. the capture device) are safe
/// to reuse once `stop()` returns.
pub struct ScanLoopController {
    thread_handle: Option<JoinHandle<()>>,
    stop_signal: Arc<AtomicBool>,
    name: String,
}

impl ScanLoopController {
    /// Start a scan loop with one-time initialization and teardown.
    ///
    /// `init_fn` runs once on the worker thread; if it fails the thread exits
    /// without entering the loop (the closure is expected to have surfaced
    /// the failure to its consumer already). `loop_fn` is called repeatedly
    /// until it returns [`LoopAction::Stop`] or the controller's stop signal
    /// is set. `teardown_fn` runs exactly once after the loop exits, while
    /// the worker still owns the state.
    pub fn start_with_init<S, I, F, T>(name: &str, init_fn: I, mut loop_fn: F, teardown_fn: T) -> Self
    where
        S: Send + 'static,
        I: FnOnce() -> Result<S, String> + Send + 'static,
        F: FnMut(&mut S) -> LoopAction + Send + 'static,
        T: FnOnce(S) + Send + 'static,
    {
        let stop_signal = Arc::new(AtomicBool::new(false));
        let stop_signal_clone = Arc::clone(&stop_signal);
        let name_clone = name.to_string();

        info!(name = %name, "Starting scan loop");

        let thread_handle = thread::spawn(move || {
            debug!(name = %name_clone, "Scan loop thread started, initializing...");

            let mut state = match init_fn() {
                Ok(s) => s,
                Err(e) => {
                    warn!(name = %name_clone, error = %e, "Initialization failed");
                    return;
                }
            };

            loop {
                if stop_signal_clone.load(Ordering::SeqCst) {
                    debug!(name = %name_clone, "Stop signal received");
                    break;
                }

                match loop_fn(&mut state) {
                    LoopAction::Continue => {}
                    LoopAction::Stop => {
                        debug!(name = %name_clone, "Loop requested stop");
                        break;
                    }
                }
            }

            teardown_fn(state);
            info!(name = %name_clone, "Scan loop thread exiting");
        });

        Self {
            thread_handle: Some(thread_handle),
            stop_signal,
            name: name.to_string(),
        }
    }

    /// Check if the loop is still running
    pub fn is_running(&self) -> bool {
        self.thread_handle
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    /// Signal the loop to stop (non-blocking)
    pub fn request_stop(&self) {
        debug!(name = %self.name, "Requesting scan loop stop");
        self.stop_signal.store(true, Ordering::SeqCst);
    }

    /// Stop the loop and wait for the thread to finish
    ///
    /// This is the required way to stop before reopening the same capture
    /// device; the worker has fully exited when it returns.
    pub fn stop(&mut self) {
        self.request_stop();
        self.join();
    }

    /// Wait for the thread to finish without sending a stop signal
    ///
    /// Useful if the loop stops itself via `LoopAction::Stop`.
    pub fn join(&mut self) {
        if let Some(handle) = self.thread_handle.take() {
            debug!(name = %self.name, "Waiting for scan loop thread to finish");
            if let Err(e) = handle.join() {
                warn!(name = %self.name, "Scan loop thread panicked: {:?}", e);
            } else {
                debug!(name = %self.name, "Scan loop thread finished");
            }
        }
    }
}

impl Drop for ScanLoopController {
    fn drop(&mut self) {
        if self.thread_handle.is_some() {
            debug!(name = %self.name, "ScanLoopController dropped, stopping loop");
            self.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;
    use std::time::Duration;

    #[test]
    fn test_loop_self_stop() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = Arc::clone(&counter);

        let mut controller = ScanLoopController::start_with_init(
            "test-loop",
            || Ok(()),
            move |_: &mut ()| {
                let count = counter_clone.fetch_add(1, Ordering::SeqCst);
                if count >= 10 { LoopAction::Stop } else { LoopAction::Continue }
            },
            |_| {},
        );

        controller.join();
        assert_eq!(counter.load(Ordering::SeqCst), 11); // 0-10 inclusive
    }

    #[test]
    fn test_stop_signal() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = Arc::clone(&counter);

        let mut controller = ScanLoopController::start_with_init(
            "test-loop",
            || Ok(()),
            move |_: &mut ()| {
                counter_clone.fetch_add(1, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(10));
                LoopAction::Continue
            },
            |_| {},
        );

        thread::sleep(Duration::from_millis(50));

        controller.stop();
        assert!(counter.load(Ordering::SeqCst) > 0);
    }

    #[test]
    fn test_teardown_runs_after_loop() {
        let torn_down = Arc::new(AtomicBool::new(false));
        let torn_down_clone = Arc::clone(&torn_down);

        let mut controller = ScanLoopController::start_with_init(
            "test-teardown",
            || Ok(42u32),
            |_state| LoopAction::Stop,
            move |state| {
                assert_eq!(state, 42);
                torn_down_clone.store(true, Ordering::SeqCst);
            },
        );

        controller.join();
        assert!(torn_down.load(Ordering::SeqCst));
    }

    #[test]
    fn test_init_failure_skips_loop_and_teardown() {
        let ran = Arc::new(AtomicBool::new(false));
        let ran_loop = Arc::clone(&ran);
        let ran_teardown = Arc::clone(&ran);

        let mut controller = ScanLoopController::start_with_init(
            "test-fail-init",
            || Err::<(), _>("init failed".to_string()),
            move |_: &mut ()| {
                ran_loop.store(true, Ordering::SeqCst);
                LoopAction::Stop
            },
            move |_| {
                ran_teardown.store(true, Ordering::SeqCst);
            },
        );

        controller.join();
        assert!(!ran.load(Ordering::SeqCst));
    }

    #[test]
    fn test_is_running() {
        let controller = ScanLoopController::start_with_init(
            "test-running",
            || Ok(()),
            |_: &mut ()| {
                thread::sleep(Duration::from_millis(100));
                LoopAction::Continue
            },
            |_| {},
        );

        assert!(controller.is_running());

        // Drop will stop it
        drop(controller);
    }
}
