//! Wiegand frame decoding for AY-Dx9M keypad readers.
//!
//! This crate is pure: it turns completed frames into decoded events and
//! consumer records, and never touches hardware or timers.
//!
//! # Pipeline
//!
//! ```text
//! RawFrame ──normalize──▶ CapturedFrame ──validate──▶ FrameDecoder ──▶ DecodedEvent ──▶ EventRecord
//!                                           │
//!                                           └─ BitError: frame dropped
//! ```
//!
//! # Example
//!
//! ```
//! use wiegand_core::TransmissionFormat;
//! use wiegand_protocol::{FrameDecoder, RawFrame};
//!
//! // Key '5' in the factory format: 1 0101 0
//! let mut frame = RawFrame::new();
//! for bit in [1, 0, 1, 0, 1, 0] {
//!     frame.push(bit == 1, bit == 0);
//! }
//!
//! let decoder = FrameDecoder::new(TransmissionFormat::Skw06Rf);
//! let event = decoder.process(&frame.normalize()).unwrap();
//! assert_eq!(event.to_record().as_bytes(), b"R=0, M=0, K='5', L=6\n");
//! ```

pub mod decoder;
pub mod encoder;
pub mod event;
pub mod frame;
pub mod keymap;
pub mod parity;

pub use decoder::{FrameDecoder, decode};
pub use event::{DecodedEvent, EventRecord, Payload};
pub use frame::{CapturedFrame, RawFrame};
