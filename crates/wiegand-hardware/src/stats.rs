//! Reader statistics.
//!
//! Counters are bumped from the edge handler and the timer callbacks, so they
//! are plain relaxed atomics: they are diagnostics, not synchronization.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use wiegand_core::ResultCode;

/// Lock-free reader counters.
#[derive(Debug, Default)]
pub struct ReaderStats {
    edges: AtomicU64,
    dropped_edges: AtomicU64,
    frames: AtomicU64,
    bit_errors: AtomicU64,
    parity_errors: AtomicU64,
    data_errors: AtomicU64,
    unsupported: AtomicU64,
    enqueued: AtomicU64,
    discarded: AtomicU64,
    power_cycles: AtomicU64,
    power_retries: AtomicU64,
    power_give_ups: AtomicU64,
    watchdog_recycles: AtomicU64,
}

/// Point-in-time copy of [`ReaderStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    /// Falling edges seen on either data line.
    pub edges: u64,
    /// Edges dropped because the frame window was full.
    pub dropped_edges: u64,
    /// Non-empty frames completed by the quiet timeout.
    pub frames: u64,
    /// Frames failing the complementary-line check.
    pub bit_errors: u64,
    pub parity_errors: u64,
    pub data_errors: u64,
    /// Unsupported format or length records.
    pub unsupported: u64,
    /// Records handed to an open session.
    pub enqueued: u64,
    /// Records dropped because no session was open.
    pub discarded: u64,
    /// Times the power line was asserted from `Off`.
    pub power_cycles: u64,
    pub power_retries: u64,
    pub power_give_ups: u64,
    /// Power recycles forced by the frame-liveness watchdog.
    pub watchdog_recycles: u64,
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

impl ReaderStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_edge(&self) {
        bump(&self.edges);
    }

    pub fn record_dropped_edge(&self) {
        bump(&self.dropped_edges);
    }

    pub fn record_frame(&self) {
        bump(&self.frames);
    }

    pub fn record_bit_error(&self) {
        bump(&self.bit_errors);
    }

    /// Count a decode outcome.
    pub fn record_result(&self, result: ResultCode) {
        match result {
            ResultCode::Ok => {}
            ResultCode::ParityError => bump(&self.parity_errors),
            ResultCode::DataError => bump(&self.data_errors),
            ResultCode::UnsupportedFormat | ResultCode::UnsupportedLength => {
                bump(&self.unsupported)
            }
        }
    }

    pub fn record_enqueued(&self) {
        bump(&self.enqueued);
    }

    pub fn record_discarded(&self) {
        bump(&self.discarded);
    }

    pub fn record_power_cycle(&self) {
        bump(&self.power_cycles);
    }

    pub fn record_power_retry(&self) {
        bump(&self.power_retries);
    }

    pub fn record_power_give_up(&self) {
        bump(&self.power_give_ups);
    }

    pub fn record_watchdog_recycle(&self) {
        bump(&self.watchdog_recycles);
    }

    /// Copy all counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        StatsSnapshot {
            edges: load(&self.edges),
            dropped_edges: load(&self.dropped_edges),
            frames: load(&self.frames),
            bit_errors: load(&self.bit_errors),
            parity_errors: load(&self.parity_errors),
            data_errors: load(&self.data_errors),
            unsupported: load(&self.unsupported),
            enqueued: load(&self.enqueued),
            discarded: load(&self.discarded),
            power_cycles: load(&self.power_cycles),
            power_retries: load(&self.power_retries),
            power_give_ups: load(&self.power_give_ups),
            watchdog_recycles: load(&self.watchdog_recycles),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_result_buckets() {
        let stats = ReaderStats::new();
        stats.record_result(ResultCode::Ok);
        stats.record_result(ResultCode::ParityError);
        stats.record_result(ResultCode::DataError);
        stats.record_result(ResultCode::DataError);
        stats.record_result(ResultCode::UnsupportedFormat);
        stats.record_result(ResultCode::UnsupportedLength);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.parity_errors, 1);
        assert_eq!(snapshot.data_errors, 2);
        assert_eq!(snapshot.unsupported, 2);
    }

    #[test]
    fn test_snapshot_serializes() {
        let stats = ReaderStats::new();
        stats.record_edge();
        stats.record_frame();

        let json = serde_json::to_value(stats.snapshot()).unwrap();
        assert_eq!(json["edges"], 1);
        assert_eq!(json["frames"], 1);
        assert_eq!(json["bit_errors"], 0);
    }
}
