//! Vendor key tables for the single-key formats.
//!
//! | code | SKW06RF | SKW06NP / SKW08NC |
//! |------|---------|-------------------|
//! | 0x0  | -       | `0`               |
//! | 0x1-0x9 | `1`-`9` | `1`-`9`        |
//! | 0xA  | `0`     | `*`               |
//! | 0xB  | `*`     | `#`               |
//! | 0xC  | -       | -                 |
//! | 0xD  | -       | -                 |
//! | 0xE  | `#`     | -                 |
//! | 0xF  | -       | -                 |

/// Rosslare 6-bit key table (SKW06RF), indexed by the 4-bit payload.
const ROSSLARE_KEYS: [Option<char>; 16] = [
    None,
    Some('1'),
    Some('2'),
    Some('3'),
    Some('4'),
    Some('5'),
    Some('6'),
    Some('7'),
    Some('8'),
    Some('9'),
    Some('0'),
    Some('*'),
    None,
    None,
    Some('#'),
    None,
];

/// Plain nibble key table (SKW06NP, SKW08NC), indexed by the 4-bit payload.
const NIBBLE_KEYS: [Option<char>; 16] = [
    Some('0'),
    Some('1'),
    Some('2'),
    Some('3'),
    Some('4'),
    Some('5'),
    Some('6'),
    Some('7'),
    Some('8'),
    Some('9'),
    Some('*'),
    Some('#'),
    None,
    None,
    None,
    None,
];

/// Key for a SKW06RF payload nibble.
///
/// # Examples
///
/// ```
/// use wiegand_protocol::keymap::rosslare_key;
///
/// assert_eq!(rosslare_key(0x5), Some('5'));
/// assert_eq!(rosslare_key(0xA), Some('0'));
/// assert_eq!(rosslare_key(0x0), None);
/// ```
#[must_use]
pub fn rosslare_key(code: u32) -> Option<char> {
    lookup(&ROSSLARE_KEYS, code)
}

/// Key for a SKW06NP/SKW08NC payload nibble.
#[must_use]
pub fn nibble_key(code: u32) -> Option<char> {
    lookup(&NIBBLE_KEYS, code)
}

/// Payload nibble a SKW06RF reader sends for `key`.
#[must_use]
pub fn rosslare_code(key: char) -> Option<u32> {
    position(&ROSSLARE_KEYS, key)
}

/// Payload nibble a SKW06NP/SKW08NC reader sends for `key`.
#[must_use]
pub fn nibble_code(key: char) -> Option<u32> {
    position(&NIBBLE_KEYS, key)
}

fn lookup(table: &[Option<char>; 16], code: u32) -> Option<char> {
    usize::try_from(code)
        .ok()
        .and_then(|index| table.get(index))
        .copied()
        .flatten()
}

fn position(table: &[Option<char>; 16], key: char) -> Option<u32> {
    table
        .iter()
        .position(|entry| *entry == Some(key))
        .and_then(|index| u32::try_from(index).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0x1, Some('1'))]
    #[case(0x9, Some('9'))]
    #[case(0xA, Some('0'))]
    #[case(0xB, Some('*'))]
    #[case(0xE, Some('#'))]
    #[case(0x0, None)]
    #[case(0xC, None)]
    #[case(0xD, None)]
    #[case(0xF, None)]
    #[case(0x10, None)]
    fn test_rosslare_key(#[case] code: u32, #[case] expected: Option<char>) {
        assert_eq!(rosslare_key(code), expected);
    }

    #[rstest]
    #[case(0x0, Some('0'))]
    #[case(0x7, Some('7'))]
    #[case(0xA, Some('*'))]
    #[case(0xB, Some('#'))]
    #[case(0xC, None)]
    #[case(0xF, None)]
    fn test_nibble_key(#[case] code: u32, #[case] expected: Option<char>) {
        assert_eq!(nibble_key(code), expected);
    }

    #[test]
    fn test_reverse_tables_are_inverse() {
        for key in "0123456789*#".chars() {
            let code = rosslare_code(key).unwrap();
            assert_eq!(rosslare_key(code), Some(key));

            let code = nibble_code(key).unwrap();
            assert_eq!(nibble_key(code), Some(key));
        }
        assert_eq!(rosslare_code('A'), None);
        assert_eq!(nibble_code('A'), None);
    }
}
