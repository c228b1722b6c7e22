//! Mock GPIO for testing and development.
//!
//! [`MockGpio`] stands in for the Raspberry Pi GPIO bank, and
//! [`WiegandTransmitter`] plays the part of the reader on its data lines.

pub mod gpio;
pub mod transmitter;

pub use gpio::{MOCK_PIN_COUNT, MockGpio, MockGpioHandle};
pub use transmitter::WiegandTransmitter;
