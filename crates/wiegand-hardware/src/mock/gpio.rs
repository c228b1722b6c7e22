//! Mock GPIO controller for testing and development.
//!
//! This module provides an in-memory GPIO bank that can be driven
//! programmatically for testing without a Raspberry Pi or a reader attached.

use crate::{
    HardwareError, Result,
    traits::{EdgeHandler, GpioController},
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Number of lines on the mock bank (BCM2837 GPIO count).
pub const MOCK_PIN_COUNT: u32 = 54;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PinMode {
    Input,
    Output,
}

#[derive(Default)]
struct Claims {
    modes: HashMap<u32, PinMode>,
    handlers: HashMap<u32, EdgeHandler>,
    released: Vec<u32>,
}

struct MockGpioState {
    /// Stored line levels, one bit per pin. Idle lines are pulled high.
    levels: AtomicU64,

    /// Pins forced low regardless of what is driven.
    stuck_low: AtomicU64,

    /// Pins whose next request fails.
    failing: AtomicU64,

    claims: Mutex<Claims>,
}

impl MockGpioState {
    fn claims(&self) -> MutexGuard<'_, Claims> {
        self.claims.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_level(&self, pin: u32, high: bool) {
        let bit = pin_bit(pin);
        if high {
            self.levels.fetch_or(bit, Ordering::AcqRel);
        } else {
            self.levels.fetch_and(!bit, Ordering::AcqRel);
        }
    }

    fn level(&self, pin: u32) -> bool {
        let bit = pin_bit(pin);
        self.levels.load(Ordering::Acquire) & bit != 0
            && self.stuck_low.load(Ordering::Acquire) & bit == 0
    }

    fn request(&self, pin: u32, mode: PinMode) -> Result<()> {
        if pin >= MOCK_PIN_COUNT {
            return Err(HardwareError::resource_unavailable(format!(
                "GPIO {pin} does not exist"
            )));
        }
        if self.failing.fetch_and(!pin_bit(pin), Ordering::AcqRel) & pin_bit(pin) != 0 {
            return Err(HardwareError::resource_unavailable(format!(
                "GPIO {pin} request failed"
            )));
        }

        let mut claims = self.claims();
        if claims.modes.contains_key(&pin) {
            return Err(HardwareError::resource_unavailable(format!(
                "GPIO {pin} already claimed"
            )));
        }
        claims.modes.insert(pin, mode);
        Ok(())
    }

    fn handler(&self, pin: u32) -> Option<EdgeHandler> {
        self.claims().handlers.get(&pin).cloned()
    }
}

fn pin_bit(pin: u32) -> u64 {
    1u64.checked_shl(pin).unwrap_or(0)
}

/// Mock GPIO bank.
///
/// Inputs idle high, as Wiegand lines do with their pull-ups. Edges are
/// produced through a [`MockGpioHandle`], which invokes the registered
/// handler synchronously, just as an interrupt would.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use wiegand_hardware::mock::MockGpio;
/// use wiegand_hardware::traits::GpioController;
///
/// let (gpio, handle) = MockGpio::new();
/// let edges = Arc::new(AtomicUsize::new(0));
///
/// gpio.request_input(4).unwrap();
/// let counter = edges.clone();
/// gpio.on_falling_edge(4, Arc::new(move || {
///     counter.fetch_add(1, Ordering::SeqCst);
/// }))
/// .unwrap();
///
/// handle.pulse(4);
/// handle.pulse(4);
/// assert_eq!(edges.load(Ordering::SeqCst), 2);
/// ```
#[derive(Clone)]
pub struct MockGpio {
    state: Arc<MockGpioState>,
}

impl MockGpio {
    /// Create a new mock bank.
    ///
    /// Returns a tuple of (MockGpio, MockGpioHandle) where the handle drives
    /// edges and injects faults.
    pub fn new() -> (Self, MockGpioHandle) {
        let state = Arc::new(MockGpioState {
            levels: AtomicU64::new(u64::MAX),
            stuck_low: AtomicU64::new(0),
            failing: AtomicU64::new(0),
            claims: Mutex::new(Claims::default()),
        });

        let gpio = Self {
            state: state.clone(),
        };
        (gpio, MockGpioHandle { state })
    }
}

impl Default for MockGpio {
    fn default() -> Self {
        Self::new().0
    }
}

impl std::fmt::Debug for MockGpio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let claims = self.state.claims();
        f.debug_struct("MockGpio")
            .field("claimed", &claims.modes.len())
            .field("handlers", &claims.handlers.len())
            .finish()
    }
}

impl GpioController for MockGpio {
    fn is_valid(&self, pin: u32) -> bool {
        pin < MOCK_PIN_COUNT
    }

    fn request_input(&self, pin: u32) -> Result<()> {
        self.state.request(pin, PinMode::Input)?;
        self.state.set_level(pin, true);
        Ok(())
    }

    fn request_output(&self, pin: u32, initial: bool) -> Result<()> {
        self.state.request(pin, PinMode::Output)?;
        self.state.set_level(pin, initial);
        Ok(())
    }

    fn release(&self, pin: u32) {
        let mut claims = self.state.claims();
        if claims.modes.remove(&pin).is_some() {
            claims.handlers.remove(&pin);
            claims.released.push(pin);
        }
    }

    fn read_line(&self, pin: u32) -> bool {
        self.state.level(pin)
    }

    fn set_line(&self, pin: u32, high: bool) {
        self.state.set_level(pin, high);
    }

    fn on_falling_edge(&self, pin: u32, handler: EdgeHandler) -> Result<()> {
        let mut claims = self.state.claims();
        match claims.modes.get(&pin) {
            Some(PinMode::Input) => {
                claims.handlers.insert(pin, handler);
                Ok(())
            }
            _ => Err(HardwareError::resource_unavailable(format!(
                "GPIO {pin} is not an input"
            ))),
        }
    }
}

/// Handle for driving a mock GPIO bank.
///
/// It can be cloned and shared across tasks.
#[derive(Clone)]
pub struct MockGpioHandle {
    state: Arc<MockGpioState>,
}

impl MockGpioHandle {
    /// Pull `pin` low, fire its falling-edge handler, release it high.
    pub fn pulse(&self, pin: u32) {
        self.state.set_level(pin, false);
        if let Some(handler) = self.state.handler(pin) {
            handler();
        }
        self.state.set_level(pin, true);
    }

    /// Pull two lines low together and fire the handler of `first`.
    ///
    /// This is what a wiring fault or crosstalk looks like to the sampler.
    pub fn pulse_both(&self, first: u32, second: u32) {
        self.state.set_level(first, false);
        self.state.set_level(second, false);
        if let Some(handler) = self.state.handler(first) {
            handler();
        }
        self.state.set_level(first, true);
        self.state.set_level(second, true);
    }

    /// Current level of `pin` as seen by a reader of the line.
    pub fn level(&self, pin: u32) -> bool {
        self.state.level(pin)
    }

    /// Level last driven onto `pin`, ignoring any stuck fault.
    pub fn driven_level(&self, pin: u32) -> bool {
        self.state.levels.load(Ordering::Acquire) & pin_bit(pin) != 0
    }

    /// Force `pin` to read low whatever is driven onto it.
    pub fn hold_low(&self, pin: u32) {
        self.state.stuck_low.fetch_or(pin_bit(pin), Ordering::AcqRel);
    }

    /// Clear a fault set with [`hold_low`](Self::hold_low).
    pub fn release_hold(&self, pin: u32) {
        self.state
            .stuck_low
            .fetch_and(!pin_bit(pin), Ordering::AcqRel);
    }

    /// Make the next request for `pin` fail.
    pub fn fail_next_request(&self, pin: u32) {
        self.state.failing.fetch_or(pin_bit(pin), Ordering::AcqRel);
    }

    /// Check if `pin` is currently claimed.
    pub fn is_claimed(&self, pin: u32) -> bool {
        self.state.claims().modes.contains_key(&pin)
    }

    /// Check if a falling-edge handler is attached to `pin`.
    pub fn has_edge_handler(&self, pin: u32) -> bool {
        self.state.claims().handlers.contains_key(&pin)
    }

    /// Pins released so far, in release order.
    pub fn released_pins(&self) -> Vec<u32> {
        self.state.claims().released.clone()
    }
}

impl std::fmt::Debug for MockGpioHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockGpioHandle").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_request_and_release() {
        let (gpio, handle) = MockGpio::new();

        gpio.request_output(18, false).unwrap();
        gpio.request_input(4).unwrap();
        assert!(handle.is_claimed(18));
        assert!(!gpio.read_line(18));
        assert!(gpio.read_line(4));

        gpio.release(4);
        gpio.release(18);
        gpio.release(18);
        assert_eq!(handle.released_pins(), vec![4, 18]);
        assert!(!handle.is_claimed(18));
    }

    #[test]
    fn test_double_claim_rejected() {
        let (gpio, _handle) = MockGpio::new();
        gpio.request_input(4).unwrap();
        let result = gpio.request_output(4, true);
        assert!(matches!(result, Err(HardwareError::ResourceUnavailable { .. })));
    }

    #[test]
    fn test_invalid_pin() {
        let (gpio, _handle) = MockGpio::new();
        assert!(!gpio.is_valid(MOCK_PIN_COUNT));
        assert!(gpio.request_input(MOCK_PIN_COUNT).is_err());
        assert!(!gpio.read_line(200));
    }

    #[test]
    fn test_fail_next_request_is_one_shot() {
        let (gpio, handle) = MockGpio::new();
        handle.fail_next_request(26);
        assert!(gpio.request_input(26).is_err());
        assert!(gpio.request_input(26).is_ok());
    }

    #[test]
    fn test_edge_handler_requires_input() {
        let (gpio, _handle) = MockGpio::new();
        gpio.request_output(18, false).unwrap();
        assert!(gpio.on_falling_edge(18, Arc::new(|| {})).is_err());
        assert!(gpio.on_falling_edge(5, Arc::new(|| {})).is_err());
    }

    #[test]
    fn test_pulse_samples_low_level() {
        let (gpio, handle) = MockGpio::new();
        let gpio = Arc::new(gpio);
        gpio.request_input(4).unwrap();
        gpio.request_input(26).unwrap();

        let lows = Arc::new(AtomicUsize::new(0));
        let (observer, counter) = (gpio.clone(), lows.clone());
        gpio.on_falling_edge(
            4,
            Arc::new(move || {
                if !observer.read_line(4) && observer.read_line(26) {
                    counter.fetch_add(1, Ordering::SeqCst);
                }
            }),
        )
        .unwrap();

        handle.pulse(4);
        handle.pulse_both(4, 26);
        assert_eq!(lows.load(Ordering::SeqCst), 1);
        assert!(gpio.read_line(4));
        assert!(gpio.read_line(26));
    }

    #[test]
    fn test_stuck_low_overrides_driven_level() {
        let (gpio, handle) = MockGpio::new();
        gpio.request_output(18, false).unwrap();

        handle.hold_low(18);
        gpio.set_line(18, true);
        assert!(!gpio.read_line(18));
        assert!(handle.driven_level(18));

        handle.release_hold(18);
        assert!(gpio.read_line(18));
    }

    #[test]
    fn test_release_detaches_handler() {
        let (gpio, handle) = MockGpio::new();
        gpio.request_input(4).unwrap();
        gpio.on_falling_edge(4, Arc::new(|| {})).unwrap();
        assert!(handle.has_edge_handler(4));

        gpio.release(4);
        assert!(!handle.has_edge_handler(4));
    }
}
