//! `wiegand simulate`: a reader on the mock GPIO bank.
//!
//! Each stimulus is transmitted bit by bit on the mock data lines and given
//! the frame timeout to complete; the records it produced are then drained
//! from the session and printed to stdout.

use crate::cli::SimulateArgs;
use anyhow::{Context, Result};
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use tracing::info;
use wiegand_core::{ReaderConfig, TransmissionFormat};
use wiegand_hardware::mock::{MockGpio, WiegandTransmitter};
use wiegand_hardware::{AnyGpio, HardwareError, ReadMode, SessionHandle, StatsSnapshot, WiegandReader};
use wiegand_protocol::CapturedFrame;
use wiegand_protocol::encoder::{encode_card, encode_key};

/// Extra wait past the frame timeout before draining.
const SETTLE_MARGIN: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, PartialEq, Eq)]
enum Stimulus {
    Key(char),
    Card { facility: u8, code: u16 },
    Pin(String),
    Collision,
}

impl fmt::Display for Stimulus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stimulus::Key(key) => write!(f, "key '{key}'"),
            Stimulus::Card { facility, code } => write!(f, "card {facility}:{code}"),
            Stimulus::Pin(pin) => write!(f, "pin {pin}"),
            Stimulus::Collision => write!(f, "line collision"),
        }
    }
}

impl Stimulus {
    fn send(&self, config: &ReaderConfig, transmitter: &WiegandTransmitter) -> Result<()> {
        match self {
            Stimulus::Key(key) => transmitter.send_key(config.format, *key)?,
            Stimulus::Card { facility, code } => transmitter.send_card(*facility, *code)?,
            Stimulus::Pin(pin) => transmitter.send_pin(pin)?,
            Stimulus::Collision => {
                let frame = collision_frame(config)?;
                transmitter.send_frame_with_collision(&frame, frame.bit_count / 2);
            }
        }
        Ok(())
    }
}

/// A `0` key in the configured format, or a zero card when the format has
/// no single-key encoding.
fn collision_frame(config: &ReaderConfig) -> Result<CapturedFrame> {
    encode_key(config.format, '0')
        .or_else(|_| encode_card(TransmissionFormat::Wiegand26, 0, 0))
        .context("Cannot build collision frame")
}

#[derive(Debug, Serialize)]
struct RecordLine<'a> {
    stimulus: String,
    record: &'a str,
}

#[derive(Debug, Serialize)]
struct Summary<'a> {
    config: &'a ReaderConfig,
    power: String,
    stats: StatsSnapshot,
}

fn stimuli(args: &SimulateArgs) -> Vec<Stimulus> {
    let mut stimuli: Vec<Stimulus> = args
        .keys
        .iter()
        .flat_map(|keys| keys.chars())
        .filter(|key| !key.is_whitespace())
        .map(Stimulus::Key)
        .collect();
    stimuli.extend(
        args.card
            .iter()
            .map(|&(facility, code)| Stimulus::Card { facility, code }),
    );
    stimuli.extend(args.pin.clone().map(Stimulus::Pin));
    if args.collision {
        stimuli.push(Stimulus::Collision);
    }
    stimuli
}

pub async fn run(config: ReaderConfig, args: SimulateArgs, json: bool) -> Result<()> {
    let stimuli = stimuli(&args);
    if stimuli.is_empty() {
        anyhow::bail!("Nothing to simulate: pass --keys, --card, --pin or --collision");
    }

    let (gpio, handle) = MockGpio::new();
    let gpio = AnyGpio::Mock(gpio);
    info!(backend = gpio.backend(), format = %config.format, "Starting simulated reader");

    let reader = WiegandReader::start(config.clone(), gpio).context("Reader startup failed")?;
    let session = reader.open()?;
    let transmitter = handle.transmitter(config.data0_pin, config.data1_pin);
    let settle = config.frame_quiet_timeout + SETTLE_MARGIN;

    let result = replay(&reader, session, &config, &transmitter, &stimuli, settle, json).await;

    let summary = Summary {
        config: &config,
        power: reader.power_state().to_string(),
        stats: reader.stats(),
    };
    finish(&reader, session).await?;
    result?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        let stats = summary.stats;
        println!(
            "frames={} enqueued={} bit_errors={} parity_errors={} data_errors={} unsupported={} power={}",
            stats.frames,
            stats.enqueued,
            stats.bit_errors,
            stats.parity_errors,
            stats.data_errors,
            stats.unsupported,
            summary.power
        );
    }
    Ok(())
}

async fn replay(
    reader: &WiegandReader<AnyGpio>,
    session: SessionHandle,
    config: &ReaderConfig,
    transmitter: &WiegandTransmitter,
    stimuli: &[Stimulus],
    settle: Duration,
    json: bool,
) -> Result<()> {
    for stimulus in stimuli {
        stimulus
            .send(config, transmitter)
            .with_context(|| format!("Cannot send {stimulus}"))?;
        tokio::time::sleep(settle).await;

        let records = drain(reader, session).await?;
        if records.is_empty() {
            println!("{stimulus}: no record (see log)");
        }
        for record in records {
            if json {
                let line = RecordLine {
                    stimulus: stimulus.to_string(),
                    record: &record,
                };
                println!("{}", serde_json::to_string(&line)?);
            } else {
                println!("{stimulus}: {record}");
            }
        }
    }
    Ok(())
}

/// Close the session and stop the reader. The lines are released even when
/// the close fails.
async fn finish(reader: &WiegandReader<AnyGpio>, session: SessionHandle) -> Result<()> {
    let closed = reader.close(session);
    reader.shutdown().await;
    closed.context("Cannot close session")
}

/// Read every pending record without blocking.
async fn drain(reader: &WiegandReader<AnyGpio>, session: SessionHandle) -> Result<Vec<String>> {
    let mut records = Vec::new();
    let mut buf = [0u8; 64];
    loop {
        match reader.read(session, &mut buf, ReadMode::NonBlocking).await {
            Ok(n) => records.push(String::from_utf8_lossy(&buf[..n]).trim_end().to_string()),
            Err(HardwareError::WouldBlock) => return Ok(records),
            Err(error) => return Err(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stimuli_order() {
        let args = SimulateArgs {
            keys: Some("1 2".to_string()),
            card: vec![(12, 4096)],
            pin: Some("123456".to_string()),
            collision: true,
        };

        assert_eq!(
            stimuli(&args),
            vec![
                Stimulus::Key('1'),
                Stimulus::Key('2'),
                Stimulus::Card {
                    facility: 12,
                    code: 4096
                },
                Stimulus::Pin("123456".to_string()),
                Stimulus::Collision,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_drain_collects_records() {
        let config = ReaderConfig::default();
        let (gpio, handle) = MockGpio::new();
        let reader = WiegandReader::start(config.clone(), AnyGpio::Mock(gpio)).unwrap();
        let session = reader.open().unwrap();
        let transmitter = handle.transmitter(config.data0_pin, config.data1_pin);

        for stimulus in [Stimulus::Key('4'), Stimulus::Card { facility: 1, code: 2 }] {
            stimulus.send(&config, &transmitter).unwrap();
            tokio::time::sleep(config.frame_quiet_timeout + SETTLE_MARGIN).await;
        }

        let records = drain(&reader, session).await.unwrap();
        assert_eq!(
            records,
            vec!["R=0, M=0, K='4', L=6", "R=0, M=8, F=1, C=2, L=26"]
        );
        reader.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_close_still_releases_lines() {
        let config = ReaderConfig::default();
        let (gpio, handle) = MockGpio::new();
        let reader = WiegandReader::start(config.clone(), AnyGpio::Mock(gpio)).unwrap();
        let session = reader.open().unwrap();
        reader.close(session).unwrap();

        assert!(finish(&reader, session).await.is_err());
        assert!(!reader.is_running());
        assert_eq!(
            handle.released_pins(),
            vec![config.data1_pin, config.data0_pin, config.power_pin]
        );
    }
}
