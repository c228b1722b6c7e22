use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // Frame errors
    #[error(
        "Bit error: D0 {line0:08X} xor D1 {line1:08X} = {actual:08X}, expected {expected:08X} over {bits} bits"
    )]
    BitError {
        line0: u32,
        line1: u32,
        actual: u32,
        expected: u32,
        bits: u8,
    },

    #[error("Empty frame")]
    EmptyFrame,

    #[error("Cannot encode {what} in format {format}")]
    Unencodable { format: String, what: String },

    // Configuration errors
    #[error("Invalid transmission format: {0}")]
    InvalidFormat(u8),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid value for {key}: {value}")]
    InvalidConfigValue { key: String, value: String },
}

pub type Result<T> = std::result::Result<T, Error>;
