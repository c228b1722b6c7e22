//! Wiegand parity windows.
//!
//! Every parity-protected Wiegand frame has the same shape: a leading
//! even-parity bit, a payload of `n - 2` bits, and a trailing odd-parity bit.
//! The leading bit covers the first half of the payload, the trailing bit the
//! second half:
//!
//! ```text
//!  bit n-1                                   bit 0
//!  ┌────┬──────────────┬──────────────┬────┐
//!  │ EP │ leading half │ trailing half│ OP │
//!  └────┴──────────────┴──────────────┴────┘
//!   even over ◄──────►  odd over ◄─────────►
//! ```
//!
//! Single-key frames use 2-bit halves, 26-bit frames use 12-bit halves.

use wiegand_core::constants::all_ones;

/// XOR-fold of all bits in `value` (1 when the set-bit count is odd).
#[must_use]
pub fn xor_fold(value: u32) -> u32 {
    value.count_ones() & 1
}

/// Bit masks of the even (leading) and odd (trailing) parity windows.
///
/// Each window includes its own parity bit. Frames shorter than 4 bits have
/// no payload to protect and yield empty windows.
///
/// # Examples
///
/// ```
/// use wiegand_protocol::parity::parity_windows;
///
/// assert_eq!(parity_windows(6), (0b111000, 0b000111));
/// assert_eq!(parity_windows(26), (0x3FFE000, 0x1FFF));
/// ```
#[must_use]
pub fn parity_windows(bit_count: u8) -> (u32, u32) {
    if bit_count < 4 {
        return (0, 0);
    }
    let half = (bit_count - 2) / 2;
    let even = all_ones(half + 1) << (bit_count - half - 1);
    let odd = all_ones(half + 1);
    (even, odd)
}

/// Check both parity windows of a right-aligned frame.
///
/// The leading window must hold an even number of set bits and the trailing
/// window an odd number.
///
/// # Examples
///
/// ```
/// use wiegand_protocol::parity::check_parity;
///
/// // Key '5' in SKW06RF: 1 0101 0
/// assert!(check_parity(0b101010, 6));
/// // Same key with the odd-parity bit flipped
/// assert!(!check_parity(0b101011, 6));
/// ```
#[must_use]
pub fn check_parity(bits: u32, bit_count: u8) -> bool {
    if bit_count < 4 {
        return false;
    }
    let (even, odd) = parity_windows(bit_count);
    xor_fold(bits & even) == 0 && xor_fold(bits & odd) == 1
}

/// Wrap a payload in leading even and trailing odd parity bits.
///
/// `payload_len` is the payload width in bits; the returned frame is
/// `payload_len + 2` bits wide.
///
/// # Examples
///
/// ```
/// use wiegand_protocol::parity::{check_parity, with_parity};
///
/// let frame = with_parity(0b1011, 4);
/// assert_eq!(frame, 0b110111);
/// assert!(check_parity(frame, 6));
/// ```
#[must_use]
pub fn with_parity(payload: u32, payload_len: u8) -> u32 {
    let payload = payload & all_ones(payload_len);
    let half = payload_len / 2;
    let leading = payload >> (payload_len - half);
    let trailing = payload & all_ones(payload_len - half);

    let even_bit = xor_fold(leading);
    let odd_bit = xor_fold(trailing) ^ 1;

    (even_bit << (payload_len + 1)) | (payload << 1) | odd_bit
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xor_fold() {
        assert_eq!(xor_fold(0), 0);
        assert_eq!(xor_fold(0b1), 1);
        assert_eq!(xor_fold(0b11), 0);
        assert_eq!(xor_fold(0b10110), 1);
        assert_eq!(xor_fold(u32::MAX), 0);
    }

    #[test]
    fn test_parity_windows_8_bits() {
        // Not used by any format but the shape still holds: 3-bit halves.
        assert_eq!(parity_windows(8), (0b1111_0000, 0b0000_1111));
    }

    #[test]
    fn test_parity_windows_too_short() {
        assert_eq!(parity_windows(0), (0, 0));
        assert_eq!(parity_windows(3), (0, 0));
        assert!(!check_parity(0b101, 3));
    }

    #[test]
    fn test_check_parity_vendor_rows() {
        // SKW06RF table rows: 0, 3, 7, *, #
        for row in [0b110100, 0b000111, 0b101111, 0b110111, 0b011100] {
            assert!(check_parity(row, 6), "row {row:06b}");
        }
    }

    #[test]
    fn test_check_parity_single_bit_flips_detected() {
        let frame = with_parity(0x0C_1000, 24);
        assert!(check_parity(frame, 26));
        for bit in 0..26 {
            assert!(!check_parity(frame ^ (1 << bit), 26), "flip at {bit}");
        }
    }

    #[test]
    fn test_with_parity_card() {
        // Facility 12, code 4096: leading 12 bits 0x0C1 have three ones,
        // trailing 12 bits are zero.
        let frame = with_parity(0x0C_1000, 24);
        assert_eq!(frame, (1 << 25) | (0x0C_1000 << 1) | 1);
    }
}
