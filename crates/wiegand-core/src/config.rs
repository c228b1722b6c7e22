//! Reader configuration.
//!
//! The configuration is read once at startup. Pin numbers and the keypad
//! transmission format default to the AY-D19M wiring on a Raspberry Pi with
//! an Iono Pi board; every value can be overridden from the environment.

use crate::{
    Result,
    constants::*,
    error::Error,
    types::TransmissionFormat,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Wiring, keypad mode and timing for one reader.
///
/// # Examples
///
/// ```
/// use wiegand_core::{ReaderConfig, TransmissionFormat};
///
/// let config = ReaderConfig::default()
///     .with_format(TransmissionFormat::Skw08Nc)
///     .with_data_pins(17, 27);
///
/// assert!(config.validate().is_ok());
/// assert_eq!(config.data0_pin, 17);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// GPIO output driving the reader's power enable.
    pub power_pin: u32,

    /// GPIO input wired to Wiegand DATA0.
    pub data0_pin: u32,

    /// GPIO input wired to Wiegand DATA1.
    pub data1_pin: u32,

    /// Keypad transmission format programmed into the reader.
    pub format: TransmissionFormat,

    /// Silence after the last edge that closes a frame.
    pub frame_quiet_timeout: Duration,

    /// Delay between asserting power and reading it back.
    pub power_verify_interval: Duration,

    /// Re-assert attempts before giving up.
    pub power_retry_limit: u8,

    /// Idle time after giving up.
    pub power_cooldown: Duration,

    /// Unpowered time during a watchdog recycle.
    pub power_off_time: Duration,

    /// Longest time a powered reader may go without a frame.
    pub liveness_timeout: Duration,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            power_pin: DEFAULT_POWER_PIN,
            data0_pin: DEFAULT_DATA0_PIN,
            data1_pin: DEFAULT_DATA1_PIN,
            format: TransmissionFormat::default(),
            frame_quiet_timeout: Duration::from_millis(DEFAULT_FRAME_QUIET_TIMEOUT_MS),
            power_verify_interval: Duration::from_millis(DEFAULT_POWER_VERIFY_INTERVAL_MS),
            power_retry_limit: DEFAULT_POWER_RETRY_LIMIT,
            power_cooldown: Duration::from_secs(DEFAULT_POWER_COOLDOWN_SECS),
            power_off_time: Duration::from_millis(DEFAULT_POWER_OFF_TIME_MS),
            liveness_timeout: Duration::from_secs(DEFAULT_LIVENESS_TIMEOUT_SECS),
        }
    }
}

impl ReaderConfig {
    /// Create a configuration with the given keypad format and default wiring.
    pub fn new(format: TransmissionFormat) -> Self {
        Self {
            format,
            ..Default::default()
        }
    }

    /// Load the configuration from the environment on top of the defaults.
    ///
    /// Reads `WIEGAND_POWER_PIN`, `WIEGAND_D0_PIN`, `WIEGAND_D1_PIN` and
    /// `WIEGAND_FORMAT`. Unset variables keep their default.
    ///
    /// # Errors
    /// Returns `Error::InvalidConfigValue` if a variable is set but cannot be
    /// parsed, or any error from [`validate`](Self::validate).
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load the configuration through an arbitrary key lookup.
    ///
    /// This is the testable core of [`from_env`](Self::from_env).
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(pin) = parse_value(&lookup, ENV_POWER_PIN)? {
            config.power_pin = pin;
        }
        if let Some(pin) = parse_value(&lookup, ENV_DATA0_PIN)? {
            config.data0_pin = pin;
        }
        if let Some(pin) = parse_value(&lookup, ENV_DATA1_PIN)? {
            config.data1_pin = pin;
        }
        if let Some(format) = lookup(ENV_FORMAT) {
            config.format = format.parse().map_err(|_| Error::InvalidConfigValue {
                key: ENV_FORMAT.to_string(),
                value: format,
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Set the power-enable pin.
    pub fn with_power_pin(mut self, pin: u32) -> Self {
        self.power_pin = pin;
        self
    }

    /// Set the DATA0 and DATA1 pins.
    pub fn with_data_pins(mut self, data0: u32, data1: u32) -> Self {
        self.data0_pin = data0;
        self.data1_pin = data1;
        self
    }

    /// Set the keypad transmission format.
    pub fn with_format(mut self, format: TransmissionFormat) -> Self {
        self.format = format;
        self
    }

    /// Set the frame quiet timeout.
    pub fn with_frame_quiet_timeout(mut self, timeout: Duration) -> Self {
        self.frame_quiet_timeout = timeout;
        self
    }

    /// Set the frame-liveness watchdog period.
    pub fn with_liveness_timeout(mut self, timeout: Duration) -> Self {
        self.liveness_timeout = timeout;
        self
    }

    /// Validate the configuration.
    ///
    /// # Errors
    /// Returns `Error::Config` if:
    /// - Two roles share the same pin
    /// - The format is the card format (not a keypad mode)
    /// - A timing value is zero
    pub fn validate(&self) -> Result<()> {
        if self.power_pin == self.data0_pin
            || self.power_pin == self.data1_pin
            || self.data0_pin == self.data1_pin
        {
            return Err(Error::Config(format!(
                "GPIO pins must be distinct (power {}, D0 {}, D1 {})",
                self.power_pin, self.data0_pin, self.data1_pin
            )));
        }

        if self.format == TransmissionFormat::Wiegand26 {
            return Err(Error::Config(
                "WIEGAND26 is a card format, not a keypad transmission mode".to_string(),
            ));
        }

        let timings = [
            ("frame_quiet_timeout", self.frame_quiet_timeout),
            ("power_verify_interval", self.power_verify_interval),
            ("power_cooldown", self.power_cooldown),
            ("power_off_time", self.power_off_time),
            ("liveness_timeout", self.liveness_timeout),
        ];
        if let Some((name, _)) = timings.iter().find(|(_, value)| value.is_zero()) {
            return Err(Error::Config(format!("{name} must be greater than zero")));
        }

        Ok(())
    }
}

fn parse_value<F, T>(lookup: &F, key: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| Error::InvalidConfigValue {
                key: key.to_string(),
                value: raw,
            }),
    }
}
