//! Decoded events and their text records.
//!
//! Every decode result is rendered exactly once into the fixed record grammar
//! consumers read:
//!
//! ```text
//! R=<result>, M=<mode>[, F=<facility>][, K='<char>'|D=<hex>|C=<int>], L=<bitcount>
//! ```

use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Write};
use wiegand_core::{
    ResultCode, TransmissionFormat,
    constants::{MAX_RECORD_LEN, RECORD_TERMINATOR},
};

/// Payload extracted from a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Payload {
    /// Single key press.
    Key(char),

    /// Facility code and card/user number.
    Card { facility: u32, code: u32 },

    /// Six BCD digits, most significant first.
    Bcd(u32),

    /// Undecoded frame bits for error and unsupported results.
    Raw(u32),
}

/// Result of decoding one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DecodedEvent {
    pub result: ResultCode,
    pub format: TransmissionFormat,
    pub payload: Payload,
    pub bit_count: u8,
}

impl DecodedEvent {
    /// Successful decode.
    pub fn ok(format: TransmissionFormat, payload: Payload, bit_count: u8) -> Self {
        Self {
            result: ResultCode::Ok,
            format,
            payload,
            bit_count,
        }
    }

    /// Failed or unsupported decode carrying the raw bits.
    pub fn failed(result: ResultCode, format: TransmissionFormat, raw: u32, bit_count: u8) -> Self {
        Self {
            result,
            format,
            payload: Payload::Raw(raw),
            bit_count,
        }
    }

    /// Check if the event is handed to the consumer.
    #[must_use]
    pub fn is_delivered(&self) -> bool {
        self.result.is_delivered()
    }

    /// Render the record into `buf`, truncating if it does not fit.
    ///
    /// Returns the number of bytes written. No line terminator is appended.
    ///
    /// # Examples
    ///
    /// ```
    /// use wiegand_core::TransmissionFormat;
    /// use wiegand_protocol::{DecodedEvent, Payload};
    ///
    /// let event = DecodedEvent::ok(TransmissionFormat::Skw06Rf, Payload::Key('5'), 6);
    ///
    /// let mut buf = [0u8; 8];
    /// let written = event.render_into(&mut buf);
    /// assert_eq!(&buf[..written], b"R=0, M=0");
    /// ```
    pub fn render_into(&self, buf: &mut [u8]) -> usize {
        let mut writer = TruncatingWriter { buf, len: 0 };
        // The writer never fails, it stops copying at capacity
        let _ = write!(writer, "{self}");
        writer.len
    }

    /// Render the consumer record, including the line terminator.
    #[must_use]
    pub fn to_record(&self) -> EventRecord {
        let mut line = [0u8; MAX_RECORD_LEN];
        let len = self.render_into(&mut line);

        let mut record = BytesMut::with_capacity(len + 1);
        record.extend_from_slice(&line[..len]);
        record.put_u8(RECORD_TERMINATOR);
        EventRecord(record.freeze())
    }
}

impl fmt::Display for DecodedEvent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "R={}, M={}", self.result.code(), self.format.mode())?;
        match self.payload {
            Payload::Key(key) => write!(f, ", K='{key}'")?,
            Payload::Card { facility, code } => write!(f, ", F={facility}, C={code}")?,
            Payload::Bcd(digits) => write!(f, ", D={digits:06X}")?,
            Payload::Raw(raw) => write!(f, ", D={raw:08X}")?,
        }
        write!(f, ", L={}", self.bit_count)
    }
}

/// Rendered, immutable record as queued for the consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord(Bytes);

impl EventRecord {
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_bytes(self) -> Bytes {
        self.0
    }
}

impl fmt::Display for EventRecord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let text = String::from_utf8_lossy(&self.0);
        write!(f, "{}", text.trim_end())
    }
}

struct TruncatingWriter<'a> {
    buf: &'a mut [u8],
    len: usize,
}

impl fmt::Write for TruncatingWriter<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let room = self.buf.len() - self.len;
        let take = s.len().min(room);
        self.buf[self.len..self.len + take].copy_from_slice(&s.as_bytes()[..take]);
        self.len += take;
        Ok(())
    }
}
