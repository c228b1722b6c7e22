//! Reader power supervision.
//!
//! The reader is powered through an open-collector output. After asserting
//! it, the line is read back; a line that does not come up is re-asserted a
//! bounded number of times before the sequencer gives up for a cool-down
//! period. Once stable, a frame-liveness watchdog recycles power if the
//! reader stops sending frames.
//!
//! # States
//!
//! ```text
//!            open                 line ok
//!   ┌─────┐ ─────▶ ┌────────────┐ ───────▶ ┌────────┐
//!   │ Off │        │ PoweringOn │          │ Stable │
//!   └─────┘ ◀───┐  └────────────┘          └────────┘
//!      ▲        │        │ line low          ▲   │ no frame within
//!      │        │        ▼                   │   │ liveness timeout
//!      │        │  ┌────────────────┐ line ok│   ▼
//!      │        │  │ VerifyRetry(n) │────────┘  Off, then PoweringOn
//!      │        │  └────────────────┘           after the off-time
//!      │        │        │ n == retry limit
//!      │        │        ▼
//!      │        └─ ┌────────┐
//!      └────────── │ GiveUp │  cool-down
//!                  └────────┘
//! ```
//!
//! All transitions happen in the timer callback. Opening and closing a
//! session only record whether power is wanted and fire the timer at once.
//! A session reopened before its close took effect restarts verification
//! from `PoweringOn` with a fresh retry count.

use crate::{stats::ReaderStats, timer::TimerHandle, traits::GpioController};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, info, warn};
use wiegand_core::ReaderConfig;

/// Power sequencer state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PowerState {
    /// Line deasserted.
    Off,

    /// Line asserted, waiting for the first read-back.
    PoweringOn,

    /// Read-back failed `n` times; line re-asserted.
    VerifyRetry(u8),

    /// Reader powered and verified.
    Stable,

    /// Retries exhausted, cooling down.
    GiveUp,
}

impl PowerState {
    /// Check if a transition from this state to `target` is valid.
    ///
    /// # Examples
    ///
    /// ```
    /// use wiegand_hardware::power::PowerState;
    ///
    /// assert!(PowerState::Off.can_transition_to(&PowerState::PoweringOn));
    /// assert!(PowerState::VerifyRetry(1).can_transition_to(&PowerState::VerifyRetry(2)));
    /// assert!(!PowerState::Off.can_transition_to(&PowerState::Stable));
    /// ```
    pub fn can_transition_to(&self, target: &PowerState) -> bool {
        matches!(
            (self, target),
            // Power request
            (PowerState::Off, PowerState::PoweringOn)
            // Read-back
            | (PowerState::PoweringOn, PowerState::Stable | PowerState::VerifyRetry(1) | PowerState::GiveUp)
            | (PowerState::VerifyRetry(_), PowerState::Stable | PowerState::GiveUp)
            // Watchdog recycle or cool-down over
            | (PowerState::Stable | PowerState::GiveUp, PowerState::Off)
            // Power-off request
            | (PowerState::PoweringOn | PowerState::VerifyRetry(_), PowerState::Off)
            // Session reopened before the close took effect
            | (PowerState::VerifyRetry(_) | PowerState::Stable | PowerState::GiveUp, PowerState::PoweringOn)
        ) || matches!(
            (self, target),
            (PowerState::VerifyRetry(n), PowerState::VerifyRetry(m)) if *m == n.saturating_add(1)
        )
    }

    /// Check if the reader is supposed to be powered in this state.
    pub fn is_powered(&self) -> bool {
        matches!(
            self,
            PowerState::PoweringOn | PowerState::VerifyRetry(_) | PowerState::Stable
        )
    }
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PowerState::Off => write!(f, "Off"),
            PowerState::PoweringOn => write!(f, "PoweringOn"),
            PowerState::VerifyRetry(n) => write!(f, "VerifyRetry({n})"),
            PowerState::Stable => write!(f, "Stable"),
            PowerState::GiveUp => write!(f, "GiveUp"),
        }
    }
}

/// Sequencer timings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowerTiming {
    pub verify_interval: Duration,
    pub retry_limit: u8,
    pub cooldown: Duration,
    pub off_time: Duration,
    pub liveness_timeout: Duration,
}

impl From<&ReaderConfig> for PowerTiming {
    fn from(config: &ReaderConfig) -> Self {
        Self {
            verify_interval: config.power_verify_interval,
            retry_limit: config.power_retry_limit,
            cooldown: config.power_cooldown,
            off_time: config.power_off_time,
            liveness_timeout: config.liveness_timeout,
        }
    }
}

impl Default for PowerTiming {
    fn default() -> Self {
        Self::from(&ReaderConfig::default())
    }
}

/// What the timer callback observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowerInput {
    /// A session wants the reader powered.
    pub requested: bool,

    /// The power line reads back as asserted.
    pub line_active: bool,

    /// The session was closed and reopened since the last expiry.
    pub restarted: bool,
}

/// Outcome of one timer expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowerTransition {
    pub next: PowerState,

    /// Level to drive onto the power line, if it changes.
    pub drive: Option<bool>,

    /// Delay before the next expiry, if any.
    pub rearm: Option<Duration>,
}

impl PowerTransition {
    fn new(next: PowerState, drive: Option<bool>, rearm: Option<Duration>) -> Self {
        Self { next, drive, rearm }
    }
}

/// Next state for a timer expiry in `state`.
///
/// # Examples
///
/// ```
/// use wiegand_hardware::power::{PowerInput, PowerState, PowerTiming, transition};
///
/// let timing = PowerTiming::default();
/// let input = PowerInput { requested: true, line_active: false, restarted: false };
///
/// let step = transition(PowerState::Off, input, &timing);
/// assert_eq!(step.next, PowerState::PoweringOn);
/// assert_eq!(step.drive, Some(true));
/// assert_eq!(step.rearm, Some(timing.verify_interval));
/// ```
pub fn transition(state: PowerState, input: PowerInput, timing: &PowerTiming) -> PowerTransition {
    if !input.requested {
        return match state {
            PowerState::Off => PowerTransition::new(PowerState::Off, None, None),
            _ => PowerTransition::new(PowerState::Off, Some(false), None),
        };
    }

    match state {
        PowerState::Off => PowerTransition::new(
            PowerState::PoweringOn,
            Some(true),
            Some(timing.verify_interval),
        ),
        _ if input.restarted => PowerTransition::new(
            PowerState::PoweringOn,
            Some(true),
            Some(timing.verify_interval),
        ),
        PowerState::PoweringOn | PowerState::VerifyRetry(_) if input.line_active => {
            PowerTransition::new(PowerState::Stable, None, Some(timing.liveness_timeout))
        }
        PowerState::PoweringOn | PowerState::VerifyRetry(_) => {
            let attempts = match state {
                PowerState::VerifyRetry(n) => n,
                _ => 0,
            };
            if attempts < timing.retry_limit {
                PowerTransition::new(
                    PowerState::VerifyRetry(attempts + 1),
                    Some(true),
                    Some(timing.verify_interval),
                )
            } else {
                PowerTransition::new(PowerState::GiveUp, Some(false), Some(timing.cooldown))
            }
        }
        // Liveness watchdog expired
        PowerState::Stable => {
            PowerTransition::new(PowerState::Off, Some(false), Some(timing.off_time))
        }
        // Cool-down over: stay off until the next session
        PowerState::GiveUp => PowerTransition::new(PowerState::Off, Some(false), None),
    }
}

/// Drives the power line through [`transition`].
pub struct PowerSequencer<G> {
    gpio: Arc<G>,
    pin: u32,
    timing: PowerTiming,
    requested: AtomicBool,
    restarted: AtomicBool,
    state: Mutex<PowerState>,
    timer: TimerHandle,
    stats: Arc<ReaderStats>,
}

impl<G: GpioController> PowerSequencer<G> {
    /// Create a sequencer in `Off`.
    ///
    /// `timer` must be the handle of a timer whose task calls
    /// [`on_timer`](Self::on_timer).
    pub fn new(
        gpio: Arc<G>,
        pin: u32,
        timing: PowerTiming,
        timer: TimerHandle,
        stats: Arc<ReaderStats>,
    ) -> Self {
        Self {
            gpio,
            pin,
            timing,
            requested: AtomicBool::new(false),
            restarted: AtomicBool::new(false),
            state: Mutex::new(PowerState::Off),
            timer,
            stats,
        }
    }

    fn lock(&self) -> MutexGuard<'_, PowerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current state.
    pub fn state(&self) -> PowerState {
        *self.lock()
    }

    /// Whether power is currently requested.
    pub fn requested(&self) -> bool {
        self.requested.load(Ordering::Acquire)
    }

    /// Ask for the reader to be powered.
    pub fn request_on(&self) {
        let state = self.lock();
        // A pending off leaves the state untouched until the timer fires
        if !self.requested.swap(true, Ordering::AcqRel) && *state != PowerState::Off {
            self.restarted.store(true, Ordering::Release);
        }
        self.timer.arm_after(Duration::ZERO);
    }

    /// Ask for the reader to be switched off.
    pub fn request_off(&self) {
        let _state = self.lock();
        self.requested.store(false, Ordering::Release);
        self.timer.arm_after(Duration::ZERO);
    }

    /// Restart the liveness watchdog after a frame.
    pub fn frame_seen(&self) {
        let state = self.lock();
        if *state == PowerState::Stable {
            self.timer.arm_after(self.timing.liveness_timeout);
        }
    }

    /// Timer expiry: apply one transition.
    pub fn on_timer(&self) {
        let mut state = self.lock();
        let input = PowerInput {
            requested: self.requested.load(Ordering::Acquire),
            line_active: self.gpio.read_line(self.pin),
            restarted: self.restarted.swap(false, Ordering::AcqRel),
        };

        let from = *state;
        let step = transition(from, input, &self.timing);
        debug_assert!(
            from == step.next || from.can_transition_to(&step.next),
            "invalid power transition {from} -> {}",
            step.next
        );

        if let Some(level) = step.drive {
            self.gpio.set_line(self.pin, level);
        }
        if let Some(delay) = step.rearm {
            self.timer.arm_after(delay);
        }
        *state = step.next;
        drop(state);

        self.report(from, step.next, input);
    }

    /// Deassert the line and stop the timer for good.
    pub fn shutdown(&self) {
        let mut state = self.lock();
        self.requested.store(false, Ordering::Release);
        self.restarted.store(false, Ordering::Release);
        self.timer.stop();
        self.gpio.set_line(self.pin, false);
        *state = PowerState::Off;
    }

    fn report(&self, from: PowerState, to: PowerState, input: PowerInput) {
        match (from, to) {
            (from, PowerState::PoweringOn) if input.restarted && from != PowerState::Off => {
                if !from.is_powered() {
                    self.stats.record_power_cycle();
                }
                info!(pin = self.pin, state = %from, "Session reopened, restarting power verification");
            }
            (PowerState::Off, PowerState::PoweringOn) => {
                self.stats.record_power_cycle();
                info!(pin = self.pin, "Reader power on");
            }
            (_, PowerState::Stable) => {
                info!(pin = self.pin, "Reader power stable");
            }
            (_, PowerState::VerifyRetry(attempt)) => {
                self.stats.record_power_retry();
                warn!(
                    pin = self.pin,
                    attempt,
                    limit = self.timing.retry_limit,
                    "Power line did not come up, re-asserting"
                );
            }
            (_, PowerState::GiveUp) => {
                self.stats.record_power_give_up();
                warn!(
                    pin = self.pin,
                    cooldown = ?self.timing.cooldown,
                    "Power line failed verification, giving up"
                );
            }
            (PowerState::Stable, PowerState::Off) if input.requested => {
                self.stats.record_watchdog_recycle();
                warn!(
                    timeout = ?self.timing.liveness_timeout,
                    "No frame from reader, recycling power"
                );
            }
            (PowerState::GiveUp, PowerState::Off) if input.requested => {
                info!("Power cool-down over, waiting for next session");
            }
            (from, PowerState::Off) if from != PowerState::Off => {
                info!(pin = self.pin, "Reader power off");
            }
            _ => debug!(state = %to, "Power timer expired"),
        }
    }
}

impl<G> fmt::Debug for PowerSequencer<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PowerSequencer")
            .field("pin", &self.pin)
            .field("timing", &self.timing)
            .field("requested", &self.requested.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}
