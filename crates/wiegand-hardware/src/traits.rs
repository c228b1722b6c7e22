//! GPIO controller trait.
//!
//! The reader needs three lines: one output driving the reader's power enable
//! and two inputs for DATA0 and DATA1. Edge handlers run in interrupt
//! context on real hardware, so they must be short and must never block.
//!
//! The trait is synchronous: every operation is a register access, and the
//! edge handler is invoked from the controller's own context rather than
//! awaited.

use crate::error::Result;
use std::sync::Arc;

/// Callback invoked on each falling edge of a watched line.
pub type EdgeHandler = Arc<dyn Fn() + Send + Sync>;

/// Access to a bank of GPIO lines.
///
/// # Examples
///
/// ```
/// use wiegand_hardware::mock::MockGpio;
/// use wiegand_hardware::traits::GpioController;
///
/// let (gpio, _handle) = MockGpio::new();
///
/// gpio.request_output(18, false).unwrap();
/// gpio.set_line(18, true);
/// assert!(gpio.read_line(18));
/// gpio.release(18);
/// ```
pub trait GpioController: Send + Sync {
    /// Check if `pin` exists on this controller.
    fn is_valid(&self, pin: u32) -> bool;

    /// Claim `pin` as an input.
    ///
    /// # Errors
    /// Returns `HardwareError::ResourceUnavailable` if the pin is invalid or
    /// already claimed.
    fn request_input(&self, pin: u32) -> Result<()>;

    /// Claim `pin` as an output driven to `initial`.
    ///
    /// # Errors
    /// Returns `HardwareError::ResourceUnavailable` if the pin is invalid or
    /// already claimed.
    fn request_output(&self, pin: u32, initial: bool) -> Result<()>;

    /// Release a claimed pin and any edge handler registered on it.
    fn release(&self, pin: u32);

    /// Current logic level of `pin`.
    fn read_line(&self, pin: u32) -> bool;

    /// Drive an output pin.
    fn set_line(&self, pin: u32, high: bool);

    /// Register `handler` for falling edges on an input pin.
    ///
    /// # Errors
    /// Returns `HardwareError::ResourceUnavailable` if the pin is not claimed
    /// as an input or the interrupt cannot be attached.
    fn on_falling_edge(&self, pin: u32, handler: EdgeHandler) -> Result<()>;
}
