//! Frame encoder.
//!
//! Builds the frame a reader transmits for a key press, a card or a BCD PIN.
//! Used to replay input through a simulated reader and to check the decoders
//! against their own vendor tables.

use crate::{frame::CapturedFrame, keymap, parity::with_parity};
use wiegand_core::{
    Error, Result, TransmissionFormat,
    constants::{SINGLE_KEY6_LENGTH, SINGLE_KEY8_LENGTH, WIEGAND26_LENGTH},
};

/// Number of digits in a K6W26BCD PIN.
pub const BCD_DIGITS: usize = 6;

/// Encode a single key press.
///
/// # Errors
/// Returns `Error::Unencodable` if the format is not a single-key format or
/// the key is not on its table.
///
/// # Examples
///
/// ```
/// use wiegand_core::TransmissionFormat;
/// use wiegand_protocol::encoder::encode_key;
///
/// let frame = encode_key(TransmissionFormat::Skw06Rf, '5').unwrap();
/// assert_eq!(frame.bits, 0b101010);
/// assert_eq!(frame.bit_count, 6);
/// ```
pub fn encode_key(format: TransmissionFormat, key: char) -> Result<CapturedFrame> {
    let unencodable = || unencodable(format, format!("key '{key}'"));

    match format {
        TransmissionFormat::Skw06Rf => {
            let code = keymap::rosslare_code(key).ok_or_else(unencodable)?;
            Ok(CapturedFrame::from_bits(with_parity(code, 4), SINGLE_KEY6_LENGTH))
        }
        TransmissionFormat::Skw06Np => {
            let code = keymap::nibble_code(key).ok_or_else(unencodable)?;
            Ok(CapturedFrame::from_bits(with_parity(code, 4), SINGLE_KEY6_LENGTH))
        }
        TransmissionFormat::Skw08Nc => {
            let code = keymap::nibble_code(key).ok_or_else(unencodable)?;
            let bits = ((!code & 0xF) << 4) | code;
            Ok(CapturedFrame::from_bits(bits, SINGLE_KEY8_LENGTH))
        }
        _ => Err(unencodable()),
    }
}

/// Encode a facility code and card number.
///
/// # Errors
/// Returns `Error::Unencodable` for formats without the card layout.
pub fn encode_card(format: TransmissionFormat, facility: u8, code: u16) -> Result<CapturedFrame> {
    match format {
        TransmissionFormat::K4W26Bf | TransmissionFormat::K5W26Fc | TransmissionFormat::Wiegand26 => {
            let payload = (u32::from(facility) << 16) | u32::from(code);
            Ok(CapturedFrame::from_bits(with_parity(payload, 24), WIEGAND26_LENGTH))
        }
        _ => Err(unencodable(format, format!("card {facility}/{code}"))),
    }
}

/// Encode a six-digit PIN in K6W26BCD.
///
/// # Errors
/// Returns `Error::Unencodable` unless `pin` is exactly six ASCII digits.
///
/// # Examples
///
/// ```
/// use wiegand_protocol::{FrameDecoder, encoder::encode_bcd};
/// use wiegand_core::TransmissionFormat;
///
/// let frame = encode_bcd("123456").unwrap();
/// let event = FrameDecoder::new(TransmissionFormat::K6W26Bcd).process(&frame).unwrap();
/// assert_eq!(event.to_string(), "R=0, M=5, D=123456, L=26");
/// ```
pub fn encode_bcd(pin: &str) -> Result<CapturedFrame> {
    let format = TransmissionFormat::K6W26Bcd;
    if pin.len() != BCD_DIGITS {
        return Err(unencodable(format, format!("PIN \"{pin}\"")));
    }

    let mut payload = 0u32;
    for c in pin.chars() {
        let digit = c
            .to_digit(10)
            .ok_or_else(|| unencodable(format, format!("PIN \"{pin}\"")))?;
        payload = (payload << 4) | digit;
    }
    Ok(CapturedFrame::from_bits(with_parity(payload, 24), WIEGAND26_LENGTH))
}

fn unencodable(format: TransmissionFormat, what: String) -> Error {
    Error::Unencodable {
        format: format.to_string(),
        what,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Payload, decoder::FrameDecoder};
    use rstest::rstest;
    use wiegand_core::ResultCode;

    #[rstest]
    #[case(TransmissionFormat::Skw06Rf)]
    #[case(TransmissionFormat::Skw06Np)]
    #[case(TransmissionFormat::Skw08Nc)]
    fn test_every_key_decodes_back(#[case] format: TransmissionFormat) {
        let decoder = FrameDecoder::new(format);
        for key in "0123456789*#".chars() {
            let frame = encode_key(format, key).unwrap();
            let event = decoder.process(&frame).unwrap();
            assert_eq!(event.result, ResultCode::Ok, "key {key}");
            assert_eq!(event.payload, Payload::Key(key));
        }
    }

    #[test]
    fn test_encode_key_known_patterns() {
        assert_eq!(encode_key(TransmissionFormat::Skw06Rf, '*').unwrap().bits, 0b110111);
        assert_eq!(encode_key(TransmissionFormat::Skw08Nc, '3').unwrap().bits, 0b1100_0011);
    }

    #[test]
    fn test_encode_key_rejects() {
        assert!(encode_key(TransmissionFormat::Skw06Rf, 'A').is_err());
        assert!(encode_key(TransmissionFormat::K4W26Bf, '1').is_err());
        assert!(encode_key(TransmissionFormat::Sk3X4Mx, '1').is_err());
    }

    #[test]
    fn test_encode_card() {
        let frame = encode_card(TransmissionFormat::Wiegand26, 12, 4096).unwrap();
        assert_eq!(frame.bit_count, 26);
        assert_eq!(frame.bits, (1 << 25) | (0x0C_1000 << 1) | 1);

        assert!(encode_card(TransmissionFormat::K6W26Bcd, 1, 1).is_err());
    }

    #[rstest]
    #[case("12345")]
    #[case("1234567")]
    #[case("12a456")]
    #[case("")]
    fn test_encode_bcd_rejects(#[case] pin: &str) {
        assert!(matches!(encode_bcd(pin), Err(Error::Unencodable { .. })));
    }
}
