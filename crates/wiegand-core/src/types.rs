use crate::{
    Result,
    constants::{SINGLE_KEY6_LENGTH, SINGLE_KEY8_LENGTH, WIEGAND26_LENGTH},
    error::Error,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Keypad transmission format.
///
/// The AY-Dx9M keypad is programmed for one of eight output formats (menu
/// option 1-8, identified here as mode 0-7). `Wiegand26` is the standard
/// H10301 card format emitted by the built-in proximity reader regardless
/// of the keypad setting; it cannot be configured as the keypad mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransmissionFormat {
    /// Single key, Wiegand 6-bit (Rosslare format). Factory setting.
    #[serde(rename = "SKW06RF")]
    Skw06Rf,

    /// Single key, Wiegand 6-bit with nibble and parity bits.
    #[serde(rename = "SKW06NP")]
    Skw06Np,

    /// Single key, Wiegand 8-bit, nibbles complemented.
    #[serde(rename = "SKW08NC")]
    Skw08Nc,

    /// 4 keys binary + facility code, Wiegand 26-bit.
    #[serde(rename = "K4W26BF")]
    K4W26Bf,

    /// 1 to 5 keys + facility code, Wiegand 26-bit.
    #[serde(rename = "K5W26FC")]
    K5W26Fc,

    /// 6 keys BCD and parity bits, Wiegand 26-bit.
    #[serde(rename = "K6W26BCD")]
    K6W26Bcd,

    /// Single key, 3x4 matrix keypad (MD-P64 interface). Not decodable.
    #[serde(rename = "SK3X4MX")]
    Sk3X4Mx,

    /// 1 to 8 keys BCD, clock & data. Not decodable.
    #[serde(rename = "K8CDBCD")]
    K8CdBcd,

    /// Wiegand 26-bit card format (H10301).
    #[serde(rename = "WIEGAND26")]
    Wiegand26,
}

impl TransmissionFormat {
    /// All keypad formats selectable through configuration, in mode order.
    pub const KEYPAD_FORMATS: [TransmissionFormat; 8] = [
        TransmissionFormat::Skw06Rf,
        TransmissionFormat::Skw06Np,
        TransmissionFormat::Skw08Nc,
        TransmissionFormat::K4W26Bf,
        TransmissionFormat::K5W26Fc,
        TransmissionFormat::K6W26Bcd,
        TransmissionFormat::Sk3X4Mx,
        TransmissionFormat::K8CdBcd,
    ];

    /// Resolve a configured keypad mode (0-7).
    ///
    /// # Errors
    /// Returns `Error::InvalidFormat` for any value above 7. Mode 8 is the
    /// card format and is deliberately not selectable here.
    ///
    /// # Examples
    ///
    /// ```
    /// use wiegand_core::TransmissionFormat;
    ///
    /// assert_eq!(TransmissionFormat::from_mode(2).unwrap(), TransmissionFormat::Skw08Nc);
    /// assert!(TransmissionFormat::from_mode(8).is_err());
    /// ```
    pub fn from_mode(mode: u8) -> Result<Self> {
        Self::KEYPAD_FORMATS
            .get(usize::from(mode))
            .copied()
            .ok_or(Error::InvalidFormat(mode))
    }

    /// Mode number as rendered in the `M=` field of event records.
    #[must_use]
    pub fn mode(&self) -> u8 {
        match self {
            TransmissionFormat::Skw06Rf => 0,
            TransmissionFormat::Skw06Np => 1,
            TransmissionFormat::Skw08Nc => 2,
            TransmissionFormat::K4W26Bf => 3,
            TransmissionFormat::K5W26Fc => 4,
            TransmissionFormat::K6W26Bcd => 5,
            TransmissionFormat::Sk3X4Mx => 6,
            TransmissionFormat::K8CdBcd => 7,
            TransmissionFormat::Wiegand26 => 8,
        }
    }

    /// Number of Wiegand bits a frame in this format carries.
    ///
    /// Returns `None` for the formats that do not travel as Wiegand frames.
    #[must_use]
    pub fn wire_length(&self) -> Option<u8> {
        match self {
            TransmissionFormat::Skw06Rf | TransmissionFormat::Skw06Np => Some(SINGLE_KEY6_LENGTH),
            TransmissionFormat::Skw08Nc => Some(SINGLE_KEY8_LENGTH),
            TransmissionFormat::K4W26Bf
            | TransmissionFormat::K5W26Fc
            | TransmissionFormat::K6W26Bcd
            | TransmissionFormat::Wiegand26 => Some(WIEGAND26_LENGTH),
            TransmissionFormat::Sk3X4Mx | TransmissionFormat::K8CdBcd => None,
        }
    }

    /// Check whether frames in this format can be decoded at all.
    #[must_use]
    pub fn is_supported(&self) -> bool {
        self.wire_length().is_some()
    }

    /// Vendor name of the format as printed in the reader manual.
    #[must_use]
    pub fn vendor_name(&self) -> &'static str {
        match self {
            TransmissionFormat::Skw06Rf => "SKW06RF",
            TransmissionFormat::Skw06Np => "SKW06NP",
            TransmissionFormat::Skw08Nc => "SKW08NC",
            TransmissionFormat::K4W26Bf => "K4W26BF",
            TransmissionFormat::K5W26Fc => "K5W26FC",
            TransmissionFormat::K6W26Bcd => "K6W26BCD",
            TransmissionFormat::Sk3X4Mx => "SK3X4MX",
            TransmissionFormat::K8CdBcd => "K8CDBCD",
            TransmissionFormat::Wiegand26 => "WIEGAND26",
        }
    }
}

impl Default for TransmissionFormat {
    fn default() -> Self {
        TransmissionFormat::Skw06Rf
    }
}

impl fmt::Display for TransmissionFormat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.vendor_name())
    }
}

impl std::str::FromStr for TransmissionFormat {
    type Err = Error;

    /// Accepts either a mode number (`"0"`-`"7"`) or a vendor name.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Ok(mode) = s.parse::<u8>() {
            return Self::from_mode(mode);
        }
        Self::KEYPAD_FORMATS
            .iter()
            .chain(std::iter::once(&TransmissionFormat::Wiegand26))
            .find(|format| format.vendor_name().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| Error::Config(format!("Unknown transmission format: {s}")))
    }
}

/// Outcome of decoding one frame, as rendered in the `R=` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultCode {
    /// Frame decoded successfully.
    Ok,

    /// Per-field parity check failed.
    ParityError,

    /// Parity correct but payload outside the vendor table.
    DataError,

    /// Configured format has no decoder.
    UnsupportedFormat,

    /// Bit count matches no known encoding.
    UnsupportedLength,
}

impl ResultCode {
    /// Numeric code as rendered in event records.
    #[must_use]
    pub fn code(&self) -> u8 {
        match self {
            ResultCode::Ok => 0,
            ResultCode::ParityError => 1,
            ResultCode::DataError => 2,
            ResultCode::UnsupportedFormat => 3,
            ResultCode::UnsupportedLength => 4,
        }
    }

    /// Check if this result is delivered to the consumer.
    ///
    /// Parity and data errors are logged and dropped; the unsupported
    /// results still reach the consumer as diagnostic records.
    #[must_use]
    pub fn is_delivered(&self) -> bool {
        matches!(
            self,
            ResultCode::Ok | ResultCode::UnsupportedFormat | ResultCode::UnsupportedLength
        )
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            ResultCode::Ok => "OK",
            ResultCode::ParityError => "PARITY_ERROR",
            ResultCode::DataError => "DATA_ERROR",
            ResultCode::UnsupportedFormat => "UNSUPPORTED_FORMAT",
            ResultCode::UnsupportedLength => "UNSUPPORTED_LENGTH",
        };
        write!(f, "{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, TransmissionFormat::Skw06Rf)]
    #[case(1, TransmissionFormat::Skw06Np)]
    #[case(2, TransmissionFormat::Skw08Nc)]
    #[case(3, TransmissionFormat::K4W26Bf)]
    #[case(4, TransmissionFormat::K5W26Fc)]
    #[case(5, TransmissionFormat::K6W26Bcd)]
    #[case(6, TransmissionFormat::Sk3X4Mx)]
    #[case(7, TransmissionFormat::K8CdBcd)]
    fn test_format_from_mode(#[case] mode: u8, #[case] expected: TransmissionFormat) {
        let format = TransmissionFormat::from_mode(mode).unwrap();
        assert_eq!(format, expected);
        assert_eq!(format.mode(), mode);
    }

    #[rstest]
    #[case(8)]
    #[case(9)]
    #[case(255)]
    fn test_format_from_mode_invalid(#[case] mode: u8) {
        assert!(matches!(
            TransmissionFormat::from_mode(mode),
            Err(Error::InvalidFormat(m)) if m == mode
        ));
    }

    #[rstest]
    #[case(TransmissionFormat::Skw06Rf, Some(6))]
    #[case(TransmissionFormat::Skw06Np, Some(6))]
    #[case(TransmissionFormat::Skw08Nc, Some(8))]
    #[case(TransmissionFormat::K4W26Bf, Some(26))]
    #[case(TransmissionFormat::K5W26Fc, Some(26))]
    #[case(TransmissionFormat::K6W26Bcd, Some(26))]
    #[case(TransmissionFormat::Sk3X4Mx, None)]
    #[case(TransmissionFormat::K8CdBcd, None)]
    #[case(TransmissionFormat::Wiegand26, Some(26))]
    fn test_format_wire_length(#[case] format: TransmissionFormat, #[case] expected: Option<u8>) {
        assert_eq!(format.wire_length(), expected);
        assert_eq!(format.is_supported(), expected.is_some());
    }

    #[rstest]
    #[case("3", TransmissionFormat::K4W26Bf)]
    #[case("SKW08NC", TransmissionFormat::Skw08Nc)]
    #[case("k6w26bcd", TransmissionFormat::K6W26Bcd)]
    #[case(" WIEGAND26 ", TransmissionFormat::Wiegand26)]
    fn test_format_from_str(#[case] input: &str, #[case] expected: TransmissionFormat) {
        let format: TransmissionFormat = input.parse().unwrap();
        assert_eq!(format, expected);
    }

    #[test]
    fn test_format_from_str_unknown() {
        assert!("SKW99".parse::<TransmissionFormat>().is_err());
        assert!("8".parse::<TransmissionFormat>().is_err());
    }

    #[test]
    fn test_format_serde_uses_vendor_names() {
        let json = serde_json::to_string(&TransmissionFormat::K5W26Fc).unwrap();
        assert_eq!(json, "\"K5W26FC\"");
        let parsed: TransmissionFormat = serde_json::from_str("\"SKW06NP\"").unwrap();
        assert_eq!(parsed, TransmissionFormat::Skw06Np);
    }

    #[test]
    fn test_result_codes() {
        assert_eq!(ResultCode::Ok.code(), 0);
        assert_eq!(ResultCode::ParityError.code(), 1);
        assert_eq!(ResultCode::DataError.code(), 2);
        assert_eq!(ResultCode::UnsupportedFormat.code(), 3);
        assert_eq!(ResultCode::UnsupportedLength.code(), 4);
    }

    #[test]
    fn test_result_delivery() {
        assert!(ResultCode::Ok.is_delivered());
        assert!(ResultCode::UnsupportedFormat.is_delivered());
        assert!(ResultCode::UnsupportedLength.is_delivered());
        assert!(!ResultCode::ParityError.is_delivered());
        assert!(!ResultCode::DataError.is_delivered());
    }
}
