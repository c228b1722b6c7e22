//! Wiegand reader device context.
//!
//! [`WiegandReader`] owns everything one physical reader needs: the claimed
//! GPIO lines, the frame and power timers, the event queue and the session.
//!
//! # Architecture
//!
//! ```text
//!  DATA0/DATA1 edge ──▶ EdgeSampler ──atomics──▶ FrameAccumulator
//!                           │ arm                      │ take
//!                           ▼                          ▼
//!                      frame timer task ──▶ FrameCompleter ──▶ EventQueue ──▶ read()
//!                                                 │ frame_seen
//!                                                 ▼
//!  open()/close() ──request──▶ power timer task ──▶ PowerSequencer ──▶ power line
//! ```
//!
//! # Examples
//!
//! ```
//! use wiegand_core::{ReaderConfig, TransmissionFormat};
//! use wiegand_hardware::mock::MockGpio;
//! use wiegand_hardware::{ReadMode, WiegandReader};
//!
//! #[tokio::main(flavor = "current_thread", start_paused = true)]
//! async fn main() -> wiegand_hardware::Result<()> {
//!     let config = ReaderConfig::default();
//!     let (gpio, handle) = MockGpio::new();
//!     let reader = WiegandReader::start(config.clone(), gpio)?;
//!
//!     let session = reader.open()?;
//!     handle
//!         .transmitter(config.data0_pin, config.data1_pin)
//!         .send_key(TransmissionFormat::Skw06Rf, '5')?;
//!
//!     let mut buf = [0u8; 64];
//!     let n = reader.read(session, &mut buf, ReadMode::Blocking).await?;
//!     assert_eq!(&buf[..n], b"R=0, M=0, K='5', L=6\n");
//!
//!     reader.close(session)?;
//!     reader.shutdown().await;
//!     Ok(())
//! }
//! ```

use crate::{
    HardwareError, Result,
    capture::{EdgeSampler, FrameAccumulator},
    completion::FrameCompleter,
    power::{PowerSequencer, PowerState, PowerTiming},
    queue::{EventQueue, ReadMode, SessionId},
    stats::{ReaderStats, StatsSnapshot},
    timer::{self, TimerHandle},
    traits::{EdgeHandler, GpioController},
};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use wiegand_core::ReaderConfig;
use wiegand_protocol::FrameDecoder;

/// Handle of an open consumer session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionHandle {
    id: SessionId,
}

impl SessionHandle {
    pub fn id(&self) -> SessionId {
        self.id
    }
}

impl fmt::Display for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session#{}", self.id)
    }
}

/// One Wiegand reader on three GPIO lines.
pub struct WiegandReader<G> {
    config: ReaderConfig,
    gpio: Arc<G>,
    queue: Arc<EventQueue>,
    power: Arc<PowerSequencer<G>>,
    frame_timer: TimerHandle,
    stats: Arc<ReaderStats>,
    running: AtomicBool,
    /// Serializes session changes with their power request.
    lifecycle: Mutex<()>,
    tasks: Mutex<Option<JoinSet<()>>>,
}

impl<G: GpioController + 'static> WiegandReader<G> {
    /// Validate the configuration, claim the GPIO lines and start the timers.
    ///
    /// Must be called from within a Tokio runtime. The reader stays unpowered
    /// until a session is opened.
    ///
    /// # Errors
    /// - `HardwareError::Configuration` for duplicate pins or a bad format
    /// - `HardwareError::ResourceUnavailable` if a pin does not exist or a line
    ///   cannot be claimed; lines claimed so far are released in reverse order
    pub fn start(config: ReaderConfig, gpio: G) -> Result<Arc<Self>> {
        config
            .validate()
            .map_err(|error| HardwareError::configuration(error.to_string()))?;

        let gpio = Arc::new(gpio);
        for (role, pin) in [
            ("power", config.power_pin),
            ("DATA0", config.data0_pin),
            ("DATA1", config.data1_pin),
        ] {
            if !gpio.is_valid(pin) {
                return Err(HardwareError::resource_unavailable(format!(
                    "GPIO {pin} for {role} does not exist"
                )));
            }
        }

        let stats = Arc::new(ReaderStats::new());
        let queue = Arc::new(EventQueue::new());
        let accumulator = Arc::new(FrameAccumulator::new());
        let (frame_timer, frame_task) = timer::channel();
        let (power_timer, power_task) = timer::channel();

        let power = Arc::new(PowerSequencer::new(
            gpio.clone(),
            config.power_pin,
            PowerTiming::from(&config),
            power_timer,
            stats.clone(),
        ));
        let sampler = Arc::new(EdgeSampler::new(
            gpio.clone(),
            (config.data0_pin, config.data1_pin),
            accumulator.clone(),
            frame_timer.clone(),
            config.frame_quiet_timeout,
            stats.clone(),
        ));
        let completer = FrameCompleter::new(
            accumulator,
            FrameDecoder::new(config.format),
            queue.clone(),
            power.clone(),
            stats.clone(),
        );

        let handler: EdgeHandler = Arc::new(move || sampler.on_edge());
        claim_lines(gpio.as_ref(), &config, &handler)?;

        let mut tasks = JoinSet::new();
        tasks.spawn(frame_task.run(move || completer.complete()));
        let sequencer = power.clone();
        tasks.spawn(power_task.run(move || sequencer.on_timer()));

        info!(
            power = config.power_pin,
            d0 = config.data0_pin,
            d1 = config.data1_pin,
            format = %config.format,
            "Wiegand reader started"
        );

        Ok(Arc::new(Self {
            config,
            gpio,
            queue,
            power,
            frame_timer,
            stats,
            running: AtomicBool::new(true),
            lifecycle: Mutex::new(()),
            tasks: Mutex::new(Some(tasks)),
        }))
    }

    /// Open the consumer session and power the reader.
    ///
    /// # Errors
    /// - `HardwareError::SessionBusy` if a session is already open
    /// - `HardwareError::ResourceUnavailable` after [`shutdown`](Self::shutdown)
    pub fn open(&self) -> Result<SessionHandle> {
        let lifecycle = self.lock_lifecycle();
        if !self.is_running() {
            return Err(HardwareError::resource_unavailable("reader stopped"));
        }
        let id = self.queue.open_session().inspect_err(|_| {
            warn!("Open rejected, session already active");
        })?;
        self.power.request_on();
        drop(lifecycle);

        let handle = SessionHandle { id };
        info!(%handle, "Session opened");
        Ok(handle)
    }

    /// Close the session, discard its pending events and power the reader off.
    ///
    /// # Errors
    /// Returns `HardwareError::BadClose` if `handle` is not the open session.
    pub fn close(&self, handle: SessionHandle) -> Result<()> {
        let lifecycle = self.lock_lifecycle();
        let drained = self.queue.close_session(handle.id).inspect_err(|error| {
            warn!(%handle, %error, "Close rejected");
        })?;
        self.power.request_off();
        drop(lifecycle);

        info!(%handle, drained, "Session closed");
        Ok(())
    }

    fn lock_lifecycle(&self) -> MutexGuard<'_, ()> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Read up to one event record into `buf`.
    ///
    /// See [`EventQueue::read`] for the partial-read and error semantics.
    pub async fn read(&self, handle: SessionHandle, buf: &mut [u8], mode: ReadMode) -> Result<usize> {
        self.queue.read(handle.id, buf, mode).await
    }

    /// Interrupt a blocking read on `handle`.
    ///
    /// # Errors
    /// Returns `HardwareError::SessionNotOpen` if `handle` is not open.
    pub fn interrupt(&self, handle: SessionHandle) -> Result<()> {
        self.queue.interrupt(handle.id)?;
        debug!(%handle, "Read interrupted");
        Ok(())
    }

    /// Stop the reader: close any session, power off, stop the timers and
    /// release the GPIO lines in reverse order of acquisition.
    ///
    /// Calling it again is a no-op.
    pub async fn shutdown(&self) {
        let drained = {
            let _lifecycle = self.lock_lifecycle();
            if !self.running.swap(false, Ordering::AcqRel) {
                return;
            }
            let drained = self.queue.close_all();
            self.frame_timer.stop();
            self.power.shutdown();
            drained
        };

        let tasks = self
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(mut tasks) = tasks {
            while let Some(result) = tasks.join_next().await {
                match result {
                    Ok(()) => {}
                    Err(error) if error.is_cancelled() => {}
                    Err(error) => warn!(%error, "Reader task panicked"),
                }
            }
        }

        for pin in [self.config.data1_pin, self.config.data0_pin, self.config.power_pin] {
            self.gpio.release(pin);
        }
        info!(drained, "Wiegand reader stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    pub fn power_state(&self) -> PowerState {
        self.power.state()
    }

    /// Whether an open session has asked for power.
    pub fn power_requested(&self) -> bool {
        self.power.requested()
    }

    /// Events waiting in the queue.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }
}

impl<G> fmt::Debug for WiegandReader<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WiegandReader")
            .field("config", &self.config)
            .field("running", &self.running.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

/// Claim power, DATA0 and DATA1 and attach the edge handler.
///
/// On failure every line claimed so far is released, last first.
fn claim_lines<G: GpioController>(gpio: &G, config: &ReaderConfig, handler: &EdgeHandler) -> Result<()> {
    let mut claimed = Vec::with_capacity(3);
    let result = try_claim_lines(gpio, config, handler, &mut claimed);

    if let Err(error) = &result {
        warn!(%error, ?claimed, "Reader startup failed, releasing GPIO lines");
        for pin in claimed.iter().rev() {
            gpio.release(*pin);
        }
    }
    result
}

fn try_claim_lines<G: GpioController>(
    gpio: &G,
    config: &ReaderConfig,
    handler: &EdgeHandler,
    claimed: &mut Vec<u32>,
) -> Result<()> {
    gpio.request_output(config.power_pin, false)?;
    claimed.push(config.power_pin);

    for pin in [config.data0_pin, config.data1_pin] {
        gpio.request_input(pin)?;
        claimed.push(pin);
    }
    for pin in [config.data0_pin, config.data1_pin] {
        gpio.on_falling_edge(pin, handler.clone())?;
    }
    Ok(())
}
