//! Simulated Wiegand reader output.
//!
//! Drives a [`MockGpioHandle`] the way an AY-Dx9M drives DATA0/DATA1: one
//! low pulse per bit, on DATA1 for a `1` and on DATA0 for a `0`, most
//! significant bit first.

use super::MockGpioHandle;
use crate::Result;
use wiegand_core::TransmissionFormat;
use wiegand_protocol::{
    CapturedFrame,
    encoder::{encode_bcd, encode_card, encode_key},
};

/// Bit-level transmitter on a pair of mock data lines.
///
/// # Examples
///
/// ```
/// use wiegand_core::TransmissionFormat;
/// use wiegand_hardware::mock::MockGpio;
///
/// let (_gpio, handle) = MockGpio::new();
/// let reader = handle.transmitter(4, 26);
///
/// reader.send_key(TransmissionFormat::Skw06Rf, '5').unwrap();
/// reader.send_card(12, 4096).unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct WiegandTransmitter {
    handle: MockGpioHandle,
    data0: u32,
    data1: u32,
}

impl MockGpioHandle {
    /// Transmitter on the given DATA0/DATA1 pins.
    pub fn transmitter(&self, data0: u32, data1: u32) -> WiegandTransmitter {
        WiegandTransmitter {
            handle: self.clone(),
            data0,
            data1,
        }
    }
}

impl WiegandTransmitter {
    /// Send one bit.
    pub fn send_bit(&self, bit: bool) {
        let line = if bit { self.data1 } else { self.data0 };
        self.handle.pulse(line);
    }

    /// Send the low `bit_count` bits of a frame, most significant first.
    pub fn send_frame(&self, frame: &CapturedFrame) {
        for position in (0..frame.bit_count).rev() {
            self.send_bit((frame.bits >> position) & 1 == 1);
        }
    }

    /// Send a frame with both lines pulled low at bit `position`.
    ///
    /// Positions count from the least significant bit, like the frame bits.
    pub fn send_frame_with_collision(&self, frame: &CapturedFrame, position: u8) {
        for current in (0..frame.bit_count).rev() {
            if current == position {
                self.handle.pulse_both(self.data0, self.data1);
            } else {
                self.send_bit((frame.bits >> current) & 1 == 1);
            }
        }
    }

    /// Send a key press in the given keypad format.
    ///
    /// # Errors
    /// Returns `HardwareError::Core` if the key cannot be encoded in the format.
    pub fn send_key(&self, format: TransmissionFormat, key: char) -> Result<()> {
        let frame = encode_key(format, key)?;
        self.send_frame(&frame);
        Ok(())
    }

    /// Send a 26-bit card read (H10301).
    ///
    /// # Errors
    /// Returns `HardwareError::Core` if the card cannot be encoded.
    pub fn send_card(&self, facility: u8, code: u16) -> Result<()> {
        let frame = encode_card(TransmissionFormat::Wiegand26, facility, code)?;
        self.send_frame(&frame);
        Ok(())
    }

    /// Send a six-digit PIN in K6W26BCD.
    ///
    /// # Errors
    /// Returns `HardwareError::Core` unless `pin` is six ASCII digits.
    pub fn send_pin(&self, pin: &str) -> Result<()> {
        let frame = encode_bcd(pin)?;
        self.send_frame(&frame);
        Ok(())
    }
}
