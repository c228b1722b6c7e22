//! `wiegand` command-line entrypoint.
//!
//! - `wiegand formats` - list the keypad transmission formats
//! - `wiegand config` - show the configuration a reader would start with
//! - `wiegand simulate` - run a reader on the mock GPIO bank

mod cli;
mod simulate;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use serde::Serialize;
use wiegand_core::TransmissionFormat;

#[derive(Debug, Serialize)]
struct FormatInfo {
    mode: u8,
    name: &'static str,
    wire_length: Option<u8>,
    supported: bool,
}

impl From<TransmissionFormat> for FormatInfo {
    fn from(format: TransmissionFormat) -> Self {
        Self {
            mode: format.mode(),
            name: format.vendor_name(),
            wire_length: format.wire_length(),
            supported: format.is_supported(),
        }
    }
}

fn print_formats(json: bool) -> Result<()> {
    let formats: Vec<FormatInfo> = TransmissionFormat::KEYPAD_FORMATS
        .into_iter()
        .chain([TransmissionFormat::Wiegand26])
        .map(FormatInfo::from)
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&formats)?);
        return Ok(());
    }
    for info in formats {
        let length = info
            .wire_length
            .map_or_else(|| "-".to_string(), |bits| format!("{bits} bits"));
        let note = if info.supported { "" } else { "  (not decodable)" };
        println!("{}  {:<10} {:>8}{note}", info.mode, info.name, length);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout stays clean for records and JSON
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Formats => print_formats(cli.json),
        Commands::Config => {
            let config = cli.reader.resolve()?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                println!("{config:#?}");
            }
            Ok(())
        }
        Commands::Simulate(args) => {
            let config = cli.reader.resolve()?;
            simulate::run(config, args, cli.json).await
        }
    }
}
