//! Edge capture.
//!
//! [`EdgeSampler::on_edge`] runs once per falling edge on either data line,
//! in interrupt context: it samples both lines, stores the levels in the
//! [`FrameAccumulator`] and pushes the frame deadline out. It only touches
//! atomics and never blocks.

use crate::{stats::ReaderStats, timer::TimerHandle, traits::GpioController};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tracing::warn;
use wiegand_core::constants::INITIAL_BIT_MASK;
use wiegand_protocol::RawFrame;

/// Lock-free frame accumulator.
///
/// Written by the edge handler only and drained by the frame timer. A frame
/// taken while an edge is being stored can be torn; the complementary-line
/// check catches that.
#[derive(Debug)]
pub struct FrameAccumulator {
    line0: AtomicU32,
    line1: AtomicU32,
    mask: AtomicU32,
}

impl Default for FrameAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameAccumulator {
    pub fn new() -> Self {
        Self {
            line0: AtomicU32::new(0),
            line1: AtomicU32::new(0),
            mask: AtomicU32::new(INITIAL_BIT_MASK),
        }
    }

    /// Store the sampled levels at the current bit position.
    ///
    /// Returns `false` if the 32-bit window is already full.
    pub fn record(&self, level0: bool, level1: bool) -> bool {
        let mask = self.mask.load(Ordering::Acquire);
        if mask == 0 {
            return false;
        }

        // First bit of a frame: start both lines from zero
        if mask == INITIAL_BIT_MASK {
            self.line0.store(0, Ordering::Relaxed);
            self.line1.store(0, Ordering::Relaxed);
        }
        if level0 {
            self.line0.fetch_or(mask, Ordering::Relaxed);
        }
        if level1 {
            self.line1.fetch_or(mask, Ordering::Relaxed);
        }
        self.mask.store(mask >> 1, Ordering::Release);
        true
    }

    /// Take the current frame and reset to the full window.
    pub fn take(&self) -> RawFrame {
        let mask = self.mask.swap(INITIAL_BIT_MASK, Ordering::AcqRel);
        RawFrame {
            line0: self.line0.load(Ordering::Relaxed),
            line1: self.line1.load(Ordering::Relaxed),
            mask,
        }
    }
}

/// Falling-edge handler for both data lines.
pub struct EdgeSampler<G> {
    gpio: Arc<G>,
    data0_pin: u32,
    data1_pin: u32,
    accumulator: Arc<FrameAccumulator>,
    frame_timer: TimerHandle,
    quiet_timeout: Duration,
    stats: Arc<ReaderStats>,
}

impl<G: GpioController> EdgeSampler<G> {
    pub fn new(
        gpio: Arc<G>,
        (data0_pin, data1_pin): (u32, u32),
        accumulator: Arc<FrameAccumulator>,
        frame_timer: TimerHandle,
        quiet_timeout: Duration,
        stats: Arc<ReaderStats>,
    ) -> Self {
        Self {
            gpio,
            data0_pin,
            data1_pin,
            accumulator,
            frame_timer,
            quiet_timeout,
            stats,
        }
    }

    /// Sample both lines and restart the quiet timeout.
    pub fn on_edge(&self) {
        let level0 = self.gpio.read_line(self.data0_pin);
        let level1 = self.gpio.read_line(self.data1_pin);

        self.stats.record_edge();
        if !self.accumulator.record(level0, level1) {
            self.stats.record_dropped_edge();
            warn!("Frame window full, edge dropped");
        }
        self.frame_timer.arm_after(self.quiet_timeout);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockGpio;
    use crate::timer;
    use wiegand_protocol::CapturedFrame;

    #[test]
    fn test_accumulator_matches_raw_frame() {
        let accumulator = FrameAccumulator::new();
        let mut expected = RawFrame::new();
        for bit in [true, false, true, true, false, false] {
            assert!(accumulator.record(bit, !bit));
            expected.push(bit, !bit);
        }
        assert_eq!(accumulator.take(), expected);
    }

    #[test]
    fn test_take_resets_window() {
        let accumulator = FrameAccumulator::new();
        accumulator.record(true, false);
        assert_eq!(accumulator.take().bit_count(), 1);

        let empty = accumulator.take();
        assert!(empty.is_empty());

        // Stale line bits are cleared by the next frame's first edge
        accumulator.record(false, true);
        assert_eq!(accumulator.take().normalize(), CapturedFrame::from_bits(0, 1));
    }

    #[test]
    fn test_full_window_rejects_edges() {
        let accumulator = FrameAccumulator::new();
        for _ in 0..32 {
            assert!(accumulator.record(false, true));
        }
        assert!(!accumulator.record(true, false));
        assert_eq!(accumulator.take().bit_count(), 32);
    }

    #[tokio::test]
    async fn test_sampler_reads_both_lines() {
        let (gpio, handle) = MockGpio::new();
        let gpio = Arc::new(gpio);
        gpio.request_input(4).unwrap();
        gpio.request_input(26).unwrap();

        let accumulator = Arc::new(FrameAccumulator::new());
        let stats = Arc::new(ReaderStats::new());
        let (frame_timer, _task) = timer::channel();
        let sampler = Arc::new(EdgeSampler::new(
            gpio.clone(),
            (4, 26),
            accumulator.clone(),
            frame_timer,
            Duration::from_millis(100),
            stats.clone(),
        ));
        for pin in [4, 26] {
            let sampler = sampler.clone();
            gpio.on_falling_edge(pin, Arc::new(move || sampler.on_edge()))
                .unwrap();
        }

        // DATA1 low is a 1, DATA0 low is a 0
        handle.pulse(26);
        handle.pulse(4);
        handle.pulse_both(4, 26);

        let frame = accumulator.take().normalize();
        assert_eq!(frame.bits, 0b100);
        assert_eq!(frame.complement, 0b010);
        assert!(frame.validate().is_err());
        assert_eq!(stats.snapshot().edges, 3);
    }
}
