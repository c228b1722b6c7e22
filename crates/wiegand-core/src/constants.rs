//! Core constants for the Wiegand keypad reader.
//!
//! This module collects the wire-level, timing and wiring constants shared by
//! the protocol and hardware crates. Timing values follow the AY-Dx9M reader
//! behaviour: a Wiegand bit is a pulse of roughly 50µs repeated every 1-2ms,
//! so a 100ms silence reliably marks the end of a frame.
//!
//! # Wire Format
//!
//! ```text
//! DATA0 ‾‾‾‾‾|_|‾‾‾‾‾‾‾‾‾‾‾‾‾|_|‾‾‾‾‾‾‾‾‾‾‾‾‾    falling edge = bit 0
//! DATA1 ‾‾‾‾‾‾‾‾‾‾‾‾|_|‾‾‾‾‾‾‾‾‾‾‾‾‾‾|_|‾‾‾‾    falling edge = bit 1
//!             0      1      0       1
//! ```
//!
//! # Usage
//!
//! ```
//! use wiegand_core::constants::*;
//!
//! assert_eq!(INITIAL_BIT_MASK, 0x8000_0000);
//! assert_eq!(all_ones(WIEGAND26_LENGTH), 0x03FF_FFFF);
//! ```

// ============================================================================
// Frame Window
// ============================================================================

/// Width of the capture window in bits.
///
/// Both line accumulators are 32-bit registers, so a frame can never carry
/// more than 32 bits.
pub const FRAME_WINDOW_BITS: u8 = 32;

/// Bit-position mask at the start of every frame (the full window).
///
/// The first edge of a frame is stored at bit 31 and the mask walks toward
/// bit 0 with every further edge.
pub const INITIAL_BIT_MASK: u32 = 1 << 31;

/// Frame length of the standard 26-bit card format (H10301).
pub const WIEGAND26_LENGTH: u8 = 26;

/// Frame length of the single-key 6-bit formats.
pub const SINGLE_KEY6_LENGTH: u8 = 6;

/// Frame length of the single-key 8-bit nibble-complemented format.
pub const SINGLE_KEY8_LENGTH: u8 = 8;

/// Mask with the low `bits` bits set.
///
/// # Examples
///
/// ```
/// use wiegand_core::constants::all_ones;
///
/// assert_eq!(all_ones(0), 0);
/// assert_eq!(all_ones(6), 0x3F);
/// assert_eq!(all_ones(32), u32::MAX);
/// ```
#[must_use]
pub const fn all_ones(bits: u8) -> u32 {
    if bits >= FRAME_WINDOW_BITS {
        u32::MAX
    } else {
        (1u32 << bits) - 1
    }
}

// ============================================================================
// Event Records
// ============================================================================

/// Maximum length of a rendered event record, excluding the line terminator.
///
/// The longest record the decoders produce is a card read such as
/// `R=0, M=8, F=255, C=65535, L=26` (30 bytes).
pub const MAX_RECORD_LEN: usize = 35;

/// Line terminator appended to every record handed to a consumer.
pub const RECORD_TERMINATOR: u8 = b'\n';

// ============================================================================
// GPIO Wiring (Raspberry Pi 3 B+ with Iono Pi IO board)
// ============================================================================

/// Default power-enable output (open collector output on the Iono Pi).
pub const DEFAULT_POWER_PIN: u32 = 18;

/// Default Wiegand DATA0 input.
pub const DEFAULT_DATA0_PIN: u32 = 4;

/// Default Wiegand DATA1 input.
pub const DEFAULT_DATA1_PIN: u32 = 26;

// ============================================================================
// Timing (milliseconds unless noted)
// ============================================================================

/// Silence after the last edge that closes a frame.
pub const DEFAULT_FRAME_QUIET_TIMEOUT_MS: u64 = 100;

/// Delay between asserting the power line and verifying it.
pub const DEFAULT_POWER_VERIFY_INTERVAL_MS: u64 = 500;

/// Number of re-assert attempts before the sequencer gives up.
pub const DEFAULT_POWER_RETRY_LIMIT: u8 = 3;

/// Cool-down after giving up, in seconds.
pub const DEFAULT_POWER_COOLDOWN_SECS: u64 = 60;

/// Time the reader is held unpowered during a watchdog recycle.
pub const DEFAULT_POWER_OFF_TIME_MS: u64 = 1000;

/// Frame-liveness watchdog while the reader is powered, in seconds.
pub const DEFAULT_LIVENESS_TIMEOUT_SECS: u64 = 300;

// ============================================================================
// Environment
// ============================================================================

/// Environment variable overriding the power-enable pin.
pub const ENV_POWER_PIN: &str = "WIEGAND_POWER_PIN";

/// Environment variable overriding the DATA0 pin.
pub const ENV_DATA0_PIN: &str = "WIEGAND_D0_PIN";

/// Environment variable overriding the DATA1 pin.
pub const ENV_DATA1_PIN: &str = "WIEGAND_D1_PIN";

/// Environment variable overriding the keypad transmission format (0-7).
pub const ENV_FORMAT: &str = "WIEGAND_FORMAT";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_ones_widths() {
        assert_eq!(all_ones(1), 0x1);
        assert_eq!(all_ones(SINGLE_KEY6_LENGTH), 0x3F);
        assert_eq!(all_ones(SINGLE_KEY8_LENGTH), 0xFF);
        assert_eq!(all_ones(WIEGAND26_LENGTH), 0x3FF_FFFF);
        assert_eq!(all_ones(31), 0x7FFF_FFFF);
        assert_eq!(all_ones(40), u32::MAX);
    }

    #[test]
    fn test_default_pins_are_distinct() {
        assert_ne!(DEFAULT_POWER_PIN, DEFAULT_DATA0_PIN);
        assert_ne!(DEFAULT_POWER_PIN, DEFAULT_DATA1_PIN);
        assert_ne!(DEFAULT_DATA0_PIN, DEFAULT_DATA1_PIN);
    }
}
