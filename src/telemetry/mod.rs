//! # Telemetry Module
//!
//! Link statistics and JSON reporting.
//!
//! This module handles:
//! - Counting frames submitted, delivered and discarded (by reason)
//! - Wrapping any datagram sink so every outcome is counted
//! - Rendering timestamped snapshots as JSON lines

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{FrameError, Result};
use crate::link::port_trait::DatagramSink;

/// Shared link counters
///
/// Updated with relaxed atomics from the validation path; snapshots are
/// only approximately consistent across fields.
#[derive(Debug, Default)]
pub struct LinkStats {
    submitted: AtomicU64,
    delivered: AtomicU64,
    invalid_symbol: AtomicU64,
    checksum_mismatch: AtomicU64,
    invalid_length: AtomicU64,
    allocation: AtomicU64,
}

/// Point-in-time copy of [`LinkStats`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub submitted: u64,
    pub delivered: u64,
    pub invalid_symbol: u64,
    pub checksum_mismatch: u64,
    pub invalid_length: u64,
    pub allocation: u64,
}

impl StatsSnapshot {
    /// Frames that reached the sink as failures
    pub fn discarded(&self) -> u64 {
        self.invalid_symbol + self.checksum_mismatch + self.invalid_length + self.allocation
    }

    /// Render as a single JSON line
    pub fn to_json_line(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl LinkStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a frame accepted by the writer
    pub fn record_submitted(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a frame delivered to the sink
    pub fn record_delivered(&self) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a discarded frame under its reason
    pub fn record_failure(&self, reason: &FrameError) {
        let counter = match reason {
            FrameError::InvalidSymbol { .. } => &self.invalid_symbol,
            FrameError::ChecksumMismatch { .. } => &self.checksum_mismatch,
            FrameError::InvalidLength(_) => &self.invalid_length,
            FrameError::Allocation(_) => &self.allocation,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a timestamped snapshot
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            timestamp: Utc::now(),
            submitted: self.submitted.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            invalid_symbol: self.invalid_symbol.load(Ordering::Relaxed),
            checksum_mismatch: self.checksum_mismatch.load(Ordering::Relaxed),
            invalid_length: self.invalid_length.load(Ordering::Relaxed),
            allocation: self.allocation.load(Ordering::Relaxed),
        }
    }
}

/// Datagram sink that counts every outcome before forwarding it
#[derive(Debug)]
pub struct CountingSink<S> {
    inner: S,
    stats: Arc<LinkStats>,
}

impl<S: DatagramSink> CountingSink<S> {
    pub fn new(inner: S, stats: Arc<LinkStats>) -> Self {
        Self { inner, stats }
    }

    /// Recover the wrapped sink
    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: DatagramSink> DatagramSink for CountingSink<S> {
    fn on_success(&mut self, payload: Bytes) {
        self.stats.record_delivered();
        self.inner.on_success(payload);
    }

    fn on_failure(&mut self, reason: FrameError) {
        self.stats.record_failure(&reason);
        self.inner.on_failure(reason);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ask::protocol::ReadStage;
    use crate::link::port_trait::mocks::RecordingDatagramSink;

    #[test]
    fn test_counting_sink_forwards_and_counts() {
        let stats = Arc::new(LinkStats::new());
        let recorder = RecordingDatagramSink::new();
        let mut sink = CountingSink::new(recorder.clone(), stats.clone());

        sink.on_success(Bytes::from_static(b"ok"));
        sink.on_failure(FrameError::InvalidSymbol {
            code: 0x3F,
            stage: ReadStage::PayloadSync,
        });
        sink.on_failure(FrameError::ChecksumMismatch { computed: 1, received: 2 });
        sink.on_failure(FrameError::InvalidLength(-5));

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.delivered, 1);
        assert_eq!(snapshot.invalid_symbol, 1);
        assert_eq!(snapshot.checksum_mismatch, 1);
        assert_eq!(snapshot.invalid_length, 1);
        assert_eq!(snapshot.allocation, 0);
        assert_eq!(snapshot.discarded(), 3);

        assert_eq!(recorder.get_outcomes().len(), 4);
    }

    #[test]
    fn test_snapshot_json_line() {
        let stats = LinkStats::new();
        stats.record_submitted();
        stats.record_submitted();
        stats.record_delivered();

        let line = stats.snapshot().to_json_line().unwrap();
        assert!(!line.contains('\n'));

        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["submitted"], 2);
        assert_eq!(value["delivered"], 1);
        assert!(value["timestamp"].is_string());
    }
}
