//! Error types for reader and GPIO operations.
//!
//! Frame-level failures (bit, parity and data errors) never surface here:
//! they are logged and the frame dropped. This type covers what a caller of
//! the reader can observe: session misuse, missing GPIO resources and
//! interrupted reads.

/// Result type alias for hardware operations.
pub type Result<T> = std::result::Result<T, HardwareError>;

/// Errors that can occur during reader and GPIO operations.
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    /// A consumer session is already open.
    #[error("Session busy: reader already open")]
    SessionBusy,

    /// Close with a handle that is not the open session.
    #[error("Bad close: session {session} is not open")]
    BadClose { session: u64 },

    /// Read or interrupt with a handle that is not the open session.
    #[error("Session {session} is not open")]
    SessionNotOpen { session: u64 },

    /// GPIO line missing, invalid or already claimed.
    #[error("Resource unavailable: {resource}")]
    ResourceUnavailable { resource: String },

    /// A blocking read was interrupted before a record arrived.
    #[error("Read interrupted")]
    Interrupted,

    /// A non-blocking read found the queue empty.
    #[error("Operation would block")]
    WouldBlock,

    /// Reader configuration rejected.
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Error from the shared core types.
    #[error(transparent)]
    Core(#[from] wiegand_core::Error),
}

impl HardwareError {
    /// Create a new bad close error.
    pub fn bad_close(session: u64) -> Self {
        Self::BadClose { session }
    }

    /// Create a new session not open error.
    pub fn session_not_open(session: u64) -> Self {
        Self::SessionNotOpen { session }
    }

    /// Create a new resource unavailable error.
    pub fn resource_unavailable(resource: impl Into<String>) -> Self {
        Self::ResourceUnavailable {
            resource: resource.into(),
        }
    }

    /// Create a new configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Check if the operation may succeed when retried later.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::WouldBlock | Self::Interrupted | Self::SessionBusy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_close_error() {
        let error = HardwareError::bad_close(7);
        assert!(matches!(error, HardwareError::BadClose { session: 7 }));
        assert_eq!(error.to_string(), "Bad close: session 7 is not open");
    }

    #[test]
    fn test_resource_unavailable_error() {
        let error = HardwareError::resource_unavailable("GPIO 4");
        assert_eq!(error.to_string(), "Resource unavailable: GPIO 4");
    }

    #[test]
    fn test_core_error_is_transparent() {
        let error: HardwareError = wiegand_core::Error::InvalidFormat(9).into();
        assert_eq!(error.to_string(), "Invalid transmission format: 9");
    }

    #[test]
    fn test_transient_errors() {
        assert!(HardwareError::WouldBlock.is_transient());
        assert!(HardwareError::Interrupted.is_transient());
        assert!(HardwareError::SessionBusy.is_transient());
        assert!(!HardwareError::bad_close(1).is_transient());
        assert!(!HardwareError::configuration("pins").is_transient());
    }
}
