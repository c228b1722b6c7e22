//! GPIO-level driver for AY-Dx9M Wiegand keypad readers.
//!
//! This crate turns falling edges on a reader's DATA0/DATA1 lines into event
//! records a consumer can read, and supervises the reader's power supply.
//!
//! # Design Philosophy
//!
//! - **Interrupt-safe capture**: the edge handler only touches atomics and
//!   re-arms a timer. Decoding happens on the frame timer task.
//! - **Single consumer**: one session at a time owns the event queue.
//!   Records produced while no session is open are discarded.
//! - **Supervised power**: the reader is only powered while a session is
//!   open, the power line is verified after every assertion, and a reader
//!   that stops sending frames is power-cycled.
//! - **Testable without hardware**: [`mock::MockGpio`] and
//!   [`mock::WiegandTransmitter`] stand in for the GPIO bank and the reader.
//!
//! # Usage
//!
//! ```
//! use wiegand_core::ReaderConfig;
//! use wiegand_hardware::mock::MockGpio;
//! use wiegand_hardware::{ReadMode, WiegandReader};
//!
//! #[tokio::main(flavor = "current_thread", start_paused = true)]
//! async fn main() -> wiegand_hardware::Result<()> {
//!     let config = ReaderConfig::default();
//!     let (gpio, handle) = MockGpio::new();
//!     let reader = WiegandReader::start(config.clone(), gpio)?;
//!     let session = reader.open()?;
//!
//!     // A 26-bit card read arrives regardless of the keypad format
//!     handle
//!         .transmitter(config.data0_pin, config.data1_pin)
//!         .send_card(12, 4096)?;
//!
//!     let mut buf = [0u8; 64];
//!     let n = reader.read(session, &mut buf, ReadMode::Blocking).await?;
//!     assert_eq!(&buf[..n], b"R=0, M=8, F=12, C=4096, L=26\n");
//!
//!     reader.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T>`][error::Result] with a
//! [`HardwareError`]. Frame-level problems (bit errors, parity, unsupported
//! lengths) are not errors of the API: they are logged, counted in
//! [`StatsSnapshot`] and, where the format allows, delivered as records with
//! a non-zero result code.

pub mod capture;
pub mod completion;
pub mod devices;
pub mod error;
pub mod mock;
pub mod power;
pub mod queue;
pub mod reader;
pub mod stats;
pub mod timer;
pub mod traits;

// Re-export commonly used types for convenience
pub use devices::AnyGpio;
pub use error::{HardwareError, Result};
pub use power::{PowerState, PowerTiming};
pub use queue::{ReadMode, SessionId};
pub use reader::{SessionHandle, WiegandReader};
pub use stats::{ReaderStats, StatsSnapshot};
pub use traits::{EdgeHandler, GpioController};
