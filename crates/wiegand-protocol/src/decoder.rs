//! Per-format decoders and frame dispatch.
//!
//! Each transmission format has a pure decoder taking the right-aligned frame
//! bits and the bit count. [`FrameDecoder`] selects the decoder for a
//! completed frame based on the configured keypad format and the number of
//! bits actually received.

use crate::{
    event::{DecodedEvent, Payload},
    frame::CapturedFrame,
    keymap,
    parity::check_parity,
};
use wiegand_core::{
    Result, ResultCode, TransmissionFormat,
    constants::{WIEGAND26_LENGTH, all_ones},
};

/// Decode a frame in the given format.
///
/// Assumes the frame already passed the complementary-line check.
///
/// # Examples
///
/// ```
/// use wiegand_core::{ResultCode, TransmissionFormat};
/// use wiegand_protocol::{Payload, decode};
///
/// let event = decode(TransmissionFormat::Skw06Rf, 0b110111, 6);
/// assert_eq!(event.result, ResultCode::Ok);
/// assert_eq!(event.payload, Payload::Key('*'));
/// ```
#[must_use]
pub fn decode(format: TransmissionFormat, bits: u32, bit_count: u8) -> DecodedEvent {
    match format {
        TransmissionFormat::Skw06Rf => decode_single_key(format, bits, bit_count, keymap::rosslare_key),
        TransmissionFormat::Skw06Np => decode_single_key(format, bits, bit_count, keymap::nibble_key),
        TransmissionFormat::Skw08Nc => decode_complemented_key(bits, bit_count),
        TransmissionFormat::K4W26Bf | TransmissionFormat::K5W26Fc | TransmissionFormat::Wiegand26 => {
            decode_card(format, bits, bit_count)
        }
        TransmissionFormat::K6W26Bcd => decode_bcd(bits, bit_count),
        TransmissionFormat::Sk3X4Mx | TransmissionFormat::K8CdBcd => {
            DecodedEvent::failed(ResultCode::UnsupportedFormat, format, bits, bit_count)
        }
    }
}

/// 6-bit single key: `EP | 4-bit key code | OP`.
fn decode_single_key(
    format: TransmissionFormat,
    bits: u32,
    bit_count: u8,
    table: fn(u32) -> Option<char>,
) -> DecodedEvent {
    if !check_parity(bits, bit_count) {
        return DecodedEvent::failed(ResultCode::ParityError, format, bits, bit_count);
    }
    match table((bits >> 1) & 0xF) {
        Some(key) => DecodedEvent::ok(format, Payload::Key(key), bit_count),
        None => DecodedEvent::failed(ResultCode::DataError, format, bits, bit_count),
    }
}

/// 8-bit single key: complemented high nibble followed by the key nibble.
fn decode_complemented_key(bits: u32, bit_count: u8) -> DecodedEvent {
    let format = TransmissionFormat::Skw08Nc;
    let low = bits & 0xF;
    let high = (bits >> 4) & 0xF;

    if low ^ high != 0xF {
        return DecodedEvent::failed(ResultCode::DataError, format, bits, bit_count);
    }
    match keymap::nibble_key(low) {
        Some(key) => DecodedEvent::ok(format, Payload::Key(key), bit_count),
        None => DecodedEvent::failed(ResultCode::DataError, format, bits, bit_count),
    }
}

/// 26-bit card layout: `EP | 8-bit facility | 16-bit code | OP`.
fn decode_card(format: TransmissionFormat, bits: u32, bit_count: u8) -> DecodedEvent {
    if !check_parity(bits, bit_count) {
        return DecodedEvent::failed(ResultCode::ParityError, format, bits, bit_count);
    }
    let facility = (bits >> 17) & 0xFF;
    let code = (bits >> 1) & 0xFFFF;
    DecodedEvent::ok(format, Payload::Card { facility, code }, bit_count)
}

/// 26-bit BCD layout: `EP | 6 BCD digits | OP`.
fn decode_bcd(bits: u32, bit_count: u8) -> DecodedEvent {
    let format = TransmissionFormat::K6W26Bcd;
    if !check_parity(bits, bit_count) {
        return DecodedEvent::failed(ResultCode::ParityError, format, bits, bit_count);
    }
    let digits = (bits >> 1) & all_ones(24);
    let valid = (0..6).all(|i| (digits >> (i * 4)) & 0xF <= 9);
    if !valid {
        return DecodedEvent::failed(ResultCode::DataError, format, bits, bit_count);
    }
    DecodedEvent::ok(format, Payload::Bcd(digits), bit_count)
}

/// Frame dispatch for a reader programmed with one keypad format.
///
/// Decoder selection, in order:
/// 1. the bit count matches the configured format: configured decoder
/// 2. a 26-bit frame: generic card decoder (the built-in proximity reader)
/// 3. the configured format has no Wiegand length: configured decoder,
///    which reports it as unsupported
/// 4. otherwise an unsupported-length record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameDecoder {
    format: TransmissionFormat,
}

impl FrameDecoder {
    pub fn new(format: TransmissionFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> TransmissionFormat {
        self.format
    }

    /// Validate line integrity, then decode.
    ///
    /// # Errors
    /// Returns `Error::EmptyFrame` or `Error::BitError` from
    /// [`CapturedFrame::validate`]; no decoder runs in that case.
    ///
    /// # Examples
    ///
    /// ```
    /// use wiegand_core::TransmissionFormat;
    /// use wiegand_protocol::{CapturedFrame, FrameDecoder};
    ///
    /// let decoder = FrameDecoder::new(TransmissionFormat::Skw08Nc);
    /// let event = decoder.process(&CapturedFrame::from_bits(0b1100_0011, 8)).unwrap();
    /// assert_eq!(event.to_string(), "R=0, M=2, K='3', L=8");
    /// ```
    pub fn process(&self, frame: &CapturedFrame) -> Result<DecodedEvent> {
        frame.validate()?;
        Ok(self.dispatch(frame.bits, frame.bit_count))
    }

    /// Select and run the decoder for a frame of `bit_count` bits.
    #[must_use]
    pub fn dispatch(&self, bits: u32, bit_count: u8) -> DecodedEvent {
        match self.format.wire_length() {
            Some(length) if length == bit_count => decode(self.format, bits, bit_count),
            _ if bit_count == WIEGAND26_LENGTH => decode(TransmissionFormat::Wiegand26, bits, bit_count),
            None => decode(self.format, bits, bit_count),
            Some(_) => DecodedEvent::failed(ResultCode::UnsupportedLength, self.format, bits, bit_count),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parity::with_parity;
    use rstest::rstest;
    use wiegand_core::Error;

    #[rstest]
    #[case::key_5(0b101010, '5')]
    #[case::key_star(0b110111, '*')]
    #[case::key_0(0b110100, '0')]
    #[case::key_hash(0b011100, '#')]
    #[case::key_1(0b000010, '1')]
    fn test_skw06rf_keys(#[case] bits: u32, #[case] key: char) {
        let event = decode(TransmissionFormat::Skw06Rf, bits, 6);
        assert_eq!(event.result, ResultCode::Ok);
        assert_eq!(event.payload, Payload::Key(key));
        assert_eq!(event.bit_count, 6);
    }

    #[rstest]
    #[case::code_0(0x0)]
    #[case::code_c(0xC)]
    #[case::code_d(0xD)]
    #[case::code_f(0xF)]
    fn test_skw06rf_unmapped_codes(#[case] code: u32) {
        let event = decode(TransmissionFormat::Skw06Rf, with_parity(code, 4), 6);
        assert_eq!(event.result, ResultCode::DataError);
        assert_eq!(event.payload, Payload::Raw(with_parity(code, 4)));
    }

    #[test]
    fn test_skw06rf_parity_error() {
        let event = decode(TransmissionFormat::Skw06Rf, 0b101011, 6);
        assert_eq!(event.result, ResultCode::ParityError);
        assert_eq!(event.to_string(), "R=1, M=0, D=0000002B, L=6");
    }

    #[rstest]
    #[case(0x0, '0')]
    #[case(0x9, '9')]
    #[case(0xA, '*')]
    #[case(0xB, '#')]
    fn test_skw06np_keys(#[case] code: u32, #[case] key: char) {
        let event = decode(TransmissionFormat::Skw06Np, with_parity(code, 4), 6);
        assert_eq!(event.result, ResultCode::Ok);
        assert_eq!(event.payload, Payload::Key(key));
    }

    #[test]
    fn test_skw06np_unmapped_code() {
        let event = decode(TransmissionFormat::Skw06Np, with_parity(0xE, 4), 6);
        assert_eq!(event.result, ResultCode::DataError);
    }

    #[rstest]
    #[case(0b1100_0011, Some('3'))]
    #[case(0b1111_0000, Some('0'))]
    #[case(0b0101_1010, Some('*'))]
    #[case(0b0100_1011, Some('#'))]
    #[case(0b0011_1100, None)]
    #[case(0b1100_0010, None)]
    #[case(0b0000_0000, None)]
    fn test_skw08nc(#[case] bits: u32, #[case] key: Option<char>) {
        let event = decode(TransmissionFormat::Skw08Nc, bits, 8);
        match key {
            Some(key) => {
                assert_eq!(event.result, ResultCode::Ok);
                assert_eq!(event.payload, Payload::Key(key));
            }
            None => assert_eq!(event.result, ResultCode::DataError),
        }
    }

    #[rstest]
    #[case(TransmissionFormat::K4W26Bf, 3)]
    #[case(TransmissionFormat::K5W26Fc, 4)]
    #[case(TransmissionFormat::Wiegand26, 8)]
    fn test_card_formats(#[case] format: TransmissionFormat, #[case] mode: u8) {
        let bits = with_parity((12 << 16) | 4096, 24);
        let event = decode(format, bits, 26);
        assert_eq!(event.result, ResultCode::Ok);
        assert_eq!(
            event.payload,
            Payload::Card {
                facility: 12,
                code: 4096
            }
        );
        assert_eq!(
            event.to_string(),
            format!("R=0, M={mode}, F=12, C=4096, L=26")
        );
    }

    #[test]
    fn test_card_parity_error() {
        let bits = with_parity((12 << 16) | 4096, 24) ^ (1 << 25);
        let event = decode(TransmissionFormat::Wiegand26, bits, 26);
        assert_eq!(event.result, ResultCode::ParityError);
    }

    #[test]
    fn test_bcd() {
        let event = decode(TransmissionFormat::K6W26Bcd, with_parity(0x123456, 24), 26);
        assert_eq!(event.to_string(), "R=0, M=5, D=123456, L=26");
    }

    #[test]
    fn test_bcd_rejects_hex_digit() {
        let event = decode(TransmissionFormat::K6W26Bcd, with_parity(0x12A456, 24), 26);
        assert_eq!(event.result, ResultCode::DataError);
    }

    #[rstest]
    #[case(TransmissionFormat::Sk3X4Mx)]
    #[case(TransmissionFormat::K8CdBcd)]
    fn test_unsupported_formats(#[case] format: TransmissionFormat) {
        let event = decode(format, 0b101010, 6);
        assert_eq!(event.result, ResultCode::UnsupportedFormat);
        assert_eq!(event.payload, Payload::Raw(0b101010));
    }

    #[test]
    fn test_dispatch_configured_length() {
        let decoder = FrameDecoder::new(TransmissionFormat::K4W26Bf);
        let event = decoder.dispatch(with_parity(0x01_0001, 24), 26);
        assert_eq!(event.format, TransmissionFormat::K4W26Bf);
        assert_eq!(event.result, ResultCode::Ok);
    }

    #[test]
    fn test_dispatch_card_on_keypad_format() {
        let decoder = FrameDecoder::new(TransmissionFormat::Skw06Rf);
        let event = decoder.dispatch(with_parity((12 << 16) | 4096, 24), 26);
        assert_eq!(event.to_string(), "R=0, M=8, F=12, C=4096, L=26");
    }

    #[test]
    fn test_dispatch_unsupported_format() {
        let decoder = FrameDecoder::new(TransmissionFormat::Sk3X4Mx);
        let event = decoder.dispatch(0b101010, 6);
        assert_eq!(event.result, ResultCode::UnsupportedFormat);
        assert_eq!(event.to_string(), "R=3, M=6, D=0000002A, L=6");

        // A card still decodes while the keypad format is unsupported
        let event = decoder.dispatch(with_parity(1 << 16, 24), 26);
        assert_eq!(event.result, ResultCode::Ok);
    }

    #[rstest]
    #[case(TransmissionFormat::Skw06Rf, 8)]
    #[case(TransmissionFormat::Skw08Nc, 6)]
    #[case(TransmissionFormat::K6W26Bcd, 32)]
    #[case(TransmissionFormat::Skw06Np, 1)]
    fn test_dispatch_unsupported_length(#[case] format: TransmissionFormat, #[case] bit_count: u8) {
        let decoder = FrameDecoder::new(format);
        let event = decoder.dispatch(0x1, bit_count);
        assert_eq!(event.result, ResultCode::UnsupportedLength);
        assert_eq!(event.format, format);
        assert_eq!(event.bit_count, bit_count);
    }

    #[test]
    fn test_process_rejects_bit_error() {
        let decoder = FrameDecoder::new(TransmissionFormat::Skw06Rf);
        let mut frame = CapturedFrame::from_bits(0b101010, 6);
        frame.complement ^= 0b000100;

        assert!(matches!(decoder.process(&frame), Err(Error::BitError { .. })));
    }
}
