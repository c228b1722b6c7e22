//! Raw and captured Wiegand frames.
//!
//! A [`RawFrame`] is the capture-side view: two 32-bit accumulators filled
//! from bit 31 downward plus the bit-position mask. Once the line has gone
//! quiet it is normalized into a right-aligned [`CapturedFrame`] which can be
//! checked for line integrity and handed to the decoders.

use serde::{Deserialize, Serialize};
use std::fmt;
use wiegand_core::{
    Error, Result,
    constants::{FRAME_WINDOW_BITS, INITIAL_BIT_MASK, all_ones},
};

/// Frame accumulator state between two quiet periods.
///
/// `line0` holds the sampled DATA0 level per bit (the bit value), `line1` the
/// DATA1 level (its complement). `mask` marks the next free bit position and
/// is `0` once the 32-bit window is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawFrame {
    pub line0: u32,
    pub line1: u32,
    pub mask: u32,
}

impl Default for RawFrame {
    fn default() -> Self {
        Self::new()
    }
}

impl RawFrame {
    /// Create an empty frame with the full window available.
    pub const fn new() -> Self {
        Self {
            line0: 0,
            line1: 0,
            mask: INITIAL_BIT_MASK,
        }
    }

    /// Record one falling edge with the sampled line levels.
    ///
    /// Returns `false` and leaves the frame untouched if the window is full.
    ///
    /// # Examples
    ///
    /// ```
    /// use wiegand_protocol::RawFrame;
    ///
    /// let mut frame = RawFrame::new();
    /// frame.push(true, false);
    /// frame.push(false, true);
    /// assert_eq!(frame.bit_count(), 2);
    /// assert_eq!(frame.normalize().bits, 0b10);
    /// ```
    pub fn push(&mut self, level0: bool, level1: bool) -> bool {
        if self.mask == 0 {
            return false;
        }
        if self.mask == INITIAL_BIT_MASK {
            self.line0 = 0;
            self.line1 = 0;
        }
        if level0 {
            self.line0 |= self.mask;
        }
        if level1 {
            self.line1 |= self.mask;
        }
        self.mask >>= 1;
        true
    }

    /// Number of bits consumed, derived from how far the mask has shifted.
    #[must_use]
    pub fn bit_count(&self) -> u8 {
        if self.mask == 0 {
            FRAME_WINDOW_BITS
        } else {
            // At most 31 for a non-zero mask
            self.mask.leading_zeros() as u8
        }
    }

    /// Check if no edge has been recorded since the last reset.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mask == INITIAL_BIT_MASK
    }

    /// Check if the 32-bit window is exhausted.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.mask == 0
    }

    /// Right-align both accumulators in the low `bit_count` bits.
    #[must_use]
    pub fn normalize(&self) -> CapturedFrame {
        let bit_count = self.bit_count();
        let shift = u32::from(FRAME_WINDOW_BITS - bit_count);
        CapturedFrame {
            bits: self.line0.checked_shr(shift).unwrap_or(0),
            complement: self.line1.checked_shr(shift).unwrap_or(0),
            bit_count,
        }
    }
}

/// A completed, right-aligned frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CapturedFrame {
    /// DATA0 accumulator: the transmitted bit values.
    pub bits: u32,

    /// DATA1 accumulator: expected to be the bitwise complement of `bits`.
    pub complement: u32,

    /// Number of bits received.
    pub bit_count: u8,
}

impl CapturedFrame {
    /// Build a clean frame as a healthy reader would transmit it.
    ///
    /// # Examples
    ///
    /// ```
    /// use wiegand_protocol::CapturedFrame;
    ///
    /// let frame = CapturedFrame::from_bits(0b101010, 6);
    /// assert_eq!(frame.complement, 0b010101);
    /// assert!(frame.validate().is_ok());
    /// ```
    #[must_use]
    pub fn from_bits(bits: u32, bit_count: u8) -> Self {
        let ones = all_ones(bit_count);
        Self {
            bits: bits & ones,
            complement: !bits & ones,
            bit_count,
        }
    }

    /// Check if the frame carries no bits (a spurious timer expiry).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bit_count == 0
    }

    /// Check the complementary-line integrity of the frame.
    ///
    /// Every bit must have pulled exactly one line low, so
    /// `bits XOR complement` must be all ones over `bit_count` bits.
    ///
    /// # Errors
    /// Returns `Error::EmptyFrame` for a frame without bits and
    /// `Error::BitError` if any bit position saw both or neither line low.
    pub fn validate(&self) -> Result<()> {
        if self.is_empty() {
            return Err(Error::EmptyFrame);
        }
        let expected = all_ones(self.bit_count);
        let actual = self.bits ^ self.complement;
        if actual != expected {
            return Err(Error::BitError {
                line0: self.bits,
                line1: self.complement,
                actual,
                expected,
                bits: self.bit_count,
            });
        }
        Ok(())
    }
}

impl fmt::Display for CapturedFrame {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{:0width$b} ({} bits)",
            self.bits,
            self.bit_count,
            width = usize::from(self.bit_count)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push_bits(frame: &mut RawFrame, bits: &[u8]) {
        for &bit in bits {
            frame.push(bit == 1, bit == 0);
        }
    }

    #[test]
    fn test_new_frame_is_empty() {
        let frame = RawFrame::new();
        assert!(frame.is_empty());
        assert!(!frame.is_full());
        assert_eq!(frame.bit_count(), 0);
        assert!(frame.normalize().is_empty());
    }

    #[test]
    fn test_push_and_normalize_key_frame() {
        let mut frame = RawFrame::new();
        push_bits(&mut frame, &[1, 0, 1, 0, 1, 0]);

        assert_eq!(frame.bit_count(), 6);
        let captured = frame.normalize();
        assert_eq!(captured.bits, 0b101010);
        assert_eq!(captured.complement, 0b010101);
        assert_eq!(captured.bit_count, 6);
        assert!(captured.validate().is_ok());
    }

    #[test]
    fn test_first_bit_clears_stale_accumulators() {
        let mut frame = RawFrame {
            line0: 0xDEAD_BEEF,
            line1: 0x1234_5678,
            mask: INITIAL_BIT_MASK,
        };
        push_bits(&mut frame, &[0, 1]);
        assert_eq!(frame.normalize(), CapturedFrame::from_bits(0b01, 2));
    }

    #[test]
    fn test_window_full_drops_extra_edges() {
        let mut frame = RawFrame::new();
        for _ in 0..32 {
            assert!(frame.push(true, false));
        }
        assert!(frame.is_full());
        assert_eq!(frame.bit_count(), 32);
        assert!(!frame.push(false, true));

        let captured = frame.normalize();
        assert_eq!(captured.bits, u32::MAX);
        assert_eq!(captured.complement, 0);
        assert!(captured.validate().is_ok());
    }

    #[test]
    fn test_validate_detects_both_lines_low() {
        let mut frame = RawFrame::new();
        frame.push(true, false);
        frame.push(false, false);
        frame.push(false, true);

        let err = frame.normalize().validate().unwrap_err();
        match err {
            Error::BitError {
                actual,
                expected,
                bits,
                ..
            } => {
                assert_eq!(actual, 0b101);
                assert_eq!(expected, 0b111);
                assert_eq!(bits, 3);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_validate_empty_frame() {
        let frame = CapturedFrame::from_bits(0, 0);
        assert!(matches!(frame.validate(), Err(Error::EmptyFrame)));
    }

    #[test]
    fn test_display() {
        let frame = CapturedFrame::from_bits(0b000111, 6);
        assert_eq!(frame.to_string(), "000111 (6 bits)");
    }
}
