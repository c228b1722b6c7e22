//! Re-armable one-shot timer.
//!
//! A timer is a single task waiting on a deadline published through a
//! `watch` channel. Arming replaces any pending deadline, so at most one
//! expiry is outstanding and expiries never overlap: the callback always
//! runs on the timer task itself.
//!
//! ```text
//!  TimerHandle::arm_after ──watch──▶ TimerTask::run ──sleep_until──▶ on_expire()
//!  TimerHandle::cancel    ──watch──▶        │
//!  TimerHandle::stop      ──watch──▶      exits
//! ```

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerState {
    Idle,
    Armed(Instant),
    Stopped,
}

/// Control side of a one-shot timer.
///
/// Cheap to clone; every clone drives the same timer.
#[derive(Debug, Clone)]
pub struct TimerHandle {
    state: Arc<watch::Sender<TimerState>>,
}

/// Task side of a one-shot timer, see [`TimerTask::run`].
#[derive(Debug)]
pub struct TimerTask {
    state: watch::Receiver<TimerState>,
}

/// Create a disarmed timer.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::time::Duration;
/// use wiegand_hardware::timer;
///
/// #[tokio::main(flavor = "current_thread", start_paused = true)]
/// async fn main() {
///     let fired = Arc::new(AtomicUsize::new(0));
///     let (handle, task) = timer::channel();
///
///     let counter = fired.clone();
///     let join = tokio::spawn(task.run(move || {
///         counter.fetch_add(1, Ordering::SeqCst);
///     }));
///
///     handle.arm_after(Duration::from_millis(100));
///     handle.arm_after(Duration::from_millis(100));
///     tokio::time::sleep(Duration::from_millis(250)).await;
///     assert_eq!(fired.load(Ordering::SeqCst), 1);
///
///     handle.stop();
///     join.await.unwrap();
/// }
/// ```
pub fn channel() -> (TimerHandle, TimerTask) {
    let (tx, rx) = watch::channel(TimerState::Idle);
    (
        TimerHandle {
            state: Arc::new(tx),
        },
        TimerTask { state: rx },
    )
}

impl TimerHandle {
    /// Arm the timer to fire once after `delay`, replacing any pending expiry.
    pub fn arm_after(&self, delay: Duration) {
        self.arm_at(Instant::now() + delay);
    }

    /// Arm the timer to fire once at `deadline`, replacing any pending expiry.
    pub fn arm_at(&self, deadline: Instant) {
        self.state.send_if_modified(|state| {
            if *state == TimerState::Stopped {
                return false;
            }
            *state = TimerState::Armed(deadline);
            true
        });
    }

    /// Cancel a pending expiry, if any.
    pub fn cancel(&self) {
        self.state.send_if_modified(|state| {
            if *state == TimerState::Stopped {
                return false;
            }
            *state = TimerState::Idle;
            true
        });
    }

    /// Stop the timer task for good. Later arms are ignored.
    pub fn stop(&self) {
        self.state.send_replace(TimerState::Stopped);
    }

    /// Check if [`stop`](Self::stop) has been called.
    pub fn is_stopped(&self) -> bool {
        *self.state.borrow() == TimerState::Stopped
    }
}

impl TimerTask {
    /// Run the timer until it is stopped or every handle is dropped.
    ///
    /// `on_expire` runs on this task, once per expiry. It may re-arm the
    /// timer through a handle.
    pub async fn run<F>(mut self, mut on_expire: F)
    where
        F: FnMut() + Send,
    {
        loop {
            let state = *self.state.borrow_and_update();
            match state {
                TimerState::Stopped => break,
                TimerState::Idle => {
                    if self.state.changed().await.is_err() {
                        break;
                    }
                }
                TimerState::Armed(deadline) => {
                    tokio::select! {
                        () = tokio::time::sleep_until(deadline) => {
                            match self.state.has_changed() {
                                // Re-armed or cancelled while the sleep completed
                                Ok(true) => continue,
                                Ok(false) => {}
                                Err(_) => break,
                            }
                            on_expire();
                            if self.state.changed().await.is_err() {
                                break;
                            }
                        }
                        changed = self.state.changed() => {
                            if changed.is_err() {
                                break;
                            }
                        }
                    }
                }
            }
        }
    }
}
