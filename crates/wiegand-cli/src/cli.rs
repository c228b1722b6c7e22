use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use std::time::Duration;
use wiegand_core::{ReaderConfig, TransmissionFormat};

#[derive(Parser, Debug)]
#[command(name = "wiegand", version, about = "AY-Dx9M Wiegand reader tool")]
pub struct Cli {
    #[arg(long, global = true, help = "Output machine-readable JSON")]
    pub json: bool,
    #[command(flatten)]
    pub reader: ReaderArgs,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the keypad transmission formats.
    Formats,
    /// Print the effective reader configuration.
    Config,
    /// Run a reader on the mock GPIO bank and replay reader traffic.
    Simulate(SimulateArgs),
}

/// Reader settings. Flags override `WIEGAND_*` environment variables.
#[derive(Args, Debug, Default)]
pub struct ReaderArgs {
    #[arg(long, global = true, help = "GPIO driving the reader power enable")]
    pub power_pin: Option<u32>,
    #[arg(long, global = true, help = "GPIO wired to DATA0")]
    pub d0_pin: Option<u32>,
    #[arg(long, global = true, help = "GPIO wired to DATA1")]
    pub d1_pin: Option<u32>,
    #[arg(long, global = true, help = "Keypad format: mode 0-7 or vendor name")]
    pub format: Option<TransmissionFormat>,
    #[arg(long, global = true, help = "Frame-liveness watchdog in seconds")]
    pub liveness_secs: Option<u64>,
}

impl ReaderArgs {
    /// Environment configuration with the command-line overrides applied.
    pub fn resolve(&self) -> anyhow::Result<ReaderConfig> {
        let config = ReaderConfig::from_env().context("Invalid WIEGAND_* environment")?;
        self.apply(config)
    }

    pub fn apply(&self, mut config: ReaderConfig) -> anyhow::Result<ReaderConfig> {
        if let Some(pin) = self.power_pin {
            config.power_pin = pin;
        }
        if let Some(pin) = self.d0_pin {
            config.data0_pin = pin;
        }
        if let Some(pin) = self.d1_pin {
            config.data1_pin = pin;
        }
        if let Some(format) = self.format {
            config.format = format;
        }
        if let Some(secs) = self.liveness_secs {
            config.liveness_timeout = Duration::from_secs(secs);
        }
        config.validate().context("Invalid reader configuration")?;
        Ok(config)
    }
}

#[derive(Args, Debug, Default)]
pub struct SimulateArgs {
    #[arg(long, help = "Keys to press, one frame each, in the configured format")]
    pub keys: Option<String>,
    #[arg(long, value_parser = parse_card, help = "Card read as FACILITY:CODE (repeatable)")]
    pub card: Vec<(u8, u16)>,
    #[arg(long, help = "Six-digit PIN sent as one K6W26BCD frame")]
    pub pin: Option<String>,
    #[arg(long, default_value_t = false, help = "Append a frame with a line collision")]
    pub collision: bool,
}

pub fn parse_card(value: &str) -> anyhow::Result<(u8, u16)> {
    let Some((facility, code)) = value.split_once(':') else {
        bail!("expected FACILITY:CODE, got \"{value}\"");
    };
    let facility = facility
        .trim()
        .parse()
        .with_context(|| format!("facility \"{facility}\" is not 0-255"))?;
    let code = code
        .trim()
        .parse()
        .with_context(|| format!("card code \"{code}\" is not 0-65535"))?;
    Ok((facility, code))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_card() {
        assert_eq!(parse_card("12:4096").unwrap(), (12, 4096));
        assert_eq!(parse_card(" 0 : 65535 ").unwrap(), (0, 65535));
        assert!(parse_card("12").is_err());
        assert!(parse_card("256:1").is_err());
        assert!(parse_card("1:65536").is_err());
    }

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::try_parse_from([
            "wiegand",
            "--format",
            "SKW08NC",
            "--d0-pin",
            "17",
            "--d1-pin",
            "27",
            "config",
        ])
        .unwrap();

        let config = cli.reader.apply(ReaderConfig::default()).unwrap();
        assert_eq!(config.format, TransmissionFormat::Skw08Nc);
        assert_eq!(config.data0_pin, 17);
        assert_eq!(config.data1_pin, 27);
        assert_eq!(config.power_pin, ReaderConfig::default().power_pin);
    }

    #[test]
    fn test_format_by_mode_number() {
        let cli = Cli::try_parse_from(["wiegand", "formats", "--format", "5"]).unwrap();
        assert_eq!(cli.reader.format, Some(TransmissionFormat::K6W26Bcd));
        assert!(Cli::try_parse_from(["wiegand", "formats", "--format", "8"]).is_err());
    }

    #[test]
    fn test_conflicting_pins_rejected() {
        let args = ReaderArgs {
            d0_pin: Some(18),
            ..Default::default()
        };
        assert!(args.apply(ReaderConfig::default()).is_err());
    }

    #[test]
    fn test_simulate_args() {
        let cli = Cli::try_parse_from([
            "wiegand",
            "--json",
            "simulate",
            "--keys",
            "12#",
            "--card",
            "12:4096",
            "--card",
            "1:2",
            "--collision",
        ])
        .unwrap();

        assert!(cli.json);
        let Commands::Simulate(args) = cli.command else {
            panic!("expected simulate");
        };
        assert_eq!(args.keys.as_deref(), Some("12#"));
        assert_eq!(args.card, vec![(12, 4096), (1, 2)]);
        assert!(args.collision);
    }
}
