//! Enum wrapper for GPIO controller dispatch.
//!
//! The reader is generic over [`GpioController`]; binaries that pick the
//! backend at runtime hold an [`AnyGpio`] instead, which dispatches to the
//! concrete controller without boxing.
//!
//! # Examples
//!
//! ```
//! use wiegand_hardware::devices::AnyGpio;
//! use wiegand_hardware::mock::MockGpio;
//! use wiegand_hardware::traits::GpioController;
//!
//! let (gpio, _handle) = MockGpio::new();
//! let gpio = AnyGpio::Mock(gpio);
//!
//! assert!(gpio.is_valid(18));
//! assert_eq!(gpio.backend(), "mock");
//! ```

use crate::Result;
use crate::mock::MockGpio;
use crate::traits::{EdgeHandler, GpioController};

/// Enum wrapper for GPIO controller dispatch.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyGpio {
    /// In-memory GPIO bank for development and testing.
    Mock(MockGpio),
}

impl AnyGpio {
    /// Short name of the backend, for logs.
    pub fn backend(&self) -> &'static str {
        match self {
            Self::Mock(_) => "mock",
        }
    }
}

impl GpioController for AnyGpio {
    fn is_valid(&self, pin: u32) -> bool {
        match self {
            Self::Mock(gpio) => gpio.is_valid(pin),
        }
    }

    fn request_input(&self, pin: u32) -> Result<()> {
        match self {
            Self::Mock(gpio) => gpio.request_input(pin),
        }
    }

    fn request_output(&self, pin: u32, initial: bool) -> Result<()> {
        match self {
            Self::Mock(gpio) => gpio.request_output(pin, initial),
        }
    }

    fn release(&self, pin: u32) {
        match self {
            Self::Mock(gpio) => gpio.release(pin),
        }
    }

    fn read_line(&self, pin: u32) -> bool {
        match self {
            Self::Mock(gpio) => gpio.read_line(pin),
        }
    }

    fn set_line(&self, pin: u32, high: bool) {
        match self {
            Self::Mock(gpio) => gpio.set_line(pin, high),
        }
    }

    fn on_falling_edge(&self, pin: u32, handler: EdgeHandler) -> Result<()> {
        match self {
            Self::Mock(gpio) => gpio.on_falling_edge(pin, handler),
        }
    }
}
