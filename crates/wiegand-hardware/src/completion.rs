//! Frame completion.
//!
//! Runs when the data lines have been quiet for the frame timeout: takes the
//! accumulated frame, validates and decodes it, and hands deliverable events
//! to the queue.

use crate::{
    capture::FrameAccumulator, power::PowerSequencer, queue::EventQueue, stats::ReaderStats,
    traits::GpioController,
};
use std::sync::Arc;
use tracing::{debug, info, warn};
use wiegand_protocol::FrameDecoder;

/// Quiet-timeout callback for one reader.
pub struct FrameCompleter<G> {
    accumulator: Arc<FrameAccumulator>,
    decoder: FrameDecoder,
    queue: Arc<EventQueue>,
    power: Arc<PowerSequencer<G>>,
    stats: Arc<ReaderStats>,
}

impl<G: GpioController> FrameCompleter<G> {
    pub fn new(
        accumulator: Arc<FrameAccumulator>,
        decoder: FrameDecoder,
        queue: Arc<EventQueue>,
        power: Arc<PowerSequencer<G>>,
        stats: Arc<ReaderStats>,
    ) -> Self {
        Self {
            accumulator,
            decoder,
            queue,
            power,
            stats,
        }
    }

    /// Close the current frame.
    pub fn complete(&self) {
        let frame = self.accumulator.take().normalize();
        if frame.is_empty() {
            debug!("Frame timer expired without bits");
            return;
        }

        self.stats.record_frame();
        // Any bits at all prove the reader is alive
        self.power.frame_seen();

        let event = match self.decoder.process(&frame) {
            Ok(event) => event,
            Err(error) => {
                self.stats.record_bit_error();
                warn!(%error, %frame, "Frame discarded");
                return;
            }
        };

        self.stats.record_result(event.result);
        if !event.is_delivered() {
            warn!(result = %event.result, %event, "Frame dropped");
            return;
        }

        debug!(%event, "Frame decoded");
        if self.queue.enqueue(event.to_record()) {
            self.stats.record_enqueued();
        } else {
            self.stats.record_discarded();
            info!(%event, "No open session, event discarded");
        }
    }
}
