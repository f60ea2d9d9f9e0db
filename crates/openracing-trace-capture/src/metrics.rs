//! Capture metrics for observability

use core::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of a session's capture counters
///
/// All counters are monotonically increasing for the life of the session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureMetrics {
    /// Samples accepted into producer buffers
    pub samples_recorded: u64,

    /// Samples lost to allocation failure
    pub samples_dropped: u64,

    /// Buffers moved into the shared list
    pub buffers_handed_off: u64,

    /// Completed drains
    pub flushes: u64,

    /// Samples serialized by drains
    pub samples_flushed: u64,

    /// Bytes produced by drains, terminators excluded
    pub bytes_serialized: u64,

    /// End events seen without a matching Begin
    pub unmatched_ends: u64,
}

impl CaptureMetrics {
    /// Samples recorded but neither flushed nor dropped yet
    pub fn samples_pending(&self) -> u64 {
        self.samples_recorded
            .saturating_sub(self.samples_flushed)
            .saturating_sub(self.samples_dropped)
    }

    /// Fraction of recorded samples that were dropped
    pub fn drop_rate(&self) -> f64 {
        if self.samples_recorded == 0 {
            return 0.0;
        }
        (self.samples_dropped as f64) / (self.samples_recorded as f64)
    }

    /// Average samples per flush
    pub fn average_flush_size(&self) -> u64 {
        if self.flushes == 0 {
            return 0;
        }
        self.samples_flushed / self.flushes
    }
}

impl core::fmt::Display for CaptureMetrics {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "CaptureMetrics(recorded={}, flushed={}, dropped={}, handoffs={}, flushes={}, bytes={}, unmatched={})",
            self.samples_recorded,
            self.samples_flushed,
            self.samples_dropped,
            self.buffers_handed_off,
            self.flushes,
            self.bytes_serialized,
            self.unmatched_ends
        )
    }
}

/// Lock-free counters shared by all producers of a session
///
/// Uses `Ordering::Relaxed`; counters are eventually consistent and carry no
/// synchronization with the sample data.
#[derive(Debug, Default)]
pub struct CaptureCounters {
    samples_recorded: AtomicU64,
    samples_dropped: AtomicU64,
    buffers_handed_off: AtomicU64,
    flushes: AtomicU64,
    samples_flushed: AtomicU64,
    bytes_serialized: AtomicU64,
    unmatched_ends: AtomicU64,
}

impl CaptureCounters {
    /// Create zeroed counters
    pub const fn new() -> Self {
        Self {
            samples_recorded: AtomicU64::new(0),
            samples_dropped: AtomicU64::new(0),
            buffers_handed_off: AtomicU64::new(0),
            flushes: AtomicU64::new(0),
            samples_flushed: AtomicU64::new(0),
            bytes_serialized: AtomicU64::new(0),
            unmatched_ends: AtomicU64::new(0),
        }
    }

    /// Add recorded samples
    #[inline]
    pub fn add_recorded(&self, count: u64) {
        self.samples_recorded.fetch_add(count, Ordering::Relaxed);
    }

    /// Add dropped samples
    #[inline]
    pub fn add_dropped(&self, count: u64) {
        self.samples_dropped.fetch_add(count, Ordering::Relaxed);
    }

    /// Record a buffer handoff
    #[inline]
    pub fn inc_handoff(&self) {
        self.buffers_handed_off.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a completed drain
    pub fn record_flush(&self, samples: u64, bytes: u64) {
        self.flushes.fetch_add(1, Ordering::Relaxed);
        self.samples_flushed.fetch_add(samples, Ordering::Relaxed);
        self.bytes_serialized.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Add unmatched End events
    pub fn add_unmatched_ends(&self, count: u64) {
        self.unmatched_ends.fetch_add(count, Ordering::Relaxed);
    }

    /// Read all counters
    pub fn snapshot(&self) -> CaptureMetrics {
        CaptureMetrics {
            samples_recorded: self.samples_recorded.load(Ordering::Relaxed),
            samples_dropped: self.samples_dropped.load(Ordering::Relaxed),
            buffers_handed_off: self.buffers_handed_off.load(Ordering::Relaxed),
            flushes: self.flushes.load(Ordering::Relaxed),
            samples_flushed: self.samples_flushed.load(Ordering::Relaxed),
            bytes_serialized: self.bytes_serialized.load(Ordering::Relaxed),
            unmatched_ends: self.unmatched_ends.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_default() {
        let counters = CaptureCounters::new();
        assert_eq!(counters.snapshot(), CaptureMetrics::default());
    }

    #[test]
    fn test_counters_recording() {
        let counters = CaptureCounters::new();
        counters.add_recorded(10);
        counters.add_dropped(2);
        counters.inc_handoff();
        counters.record_flush(8, 640);
        counters.add_unmatched_ends(1);

        let m = counters.snapshot();
        assert_eq!(m.samples_recorded, 10);
        assert_eq!(m.samples_dropped, 2);
        assert_eq!(m.buffers_handed_off, 1);
        assert_eq!(m.flushes, 1);
        assert_eq!(m.samples_flushed, 8);
        assert_eq!(m.bytes_serialized, 640);
        assert_eq!(m.unmatched_ends, 1);
        assert_eq!(m.samples_pending(), 0);
    }

    #[test]
    fn test_metrics_drop_rate() {
        let mut m = CaptureMetrics::default();
        assert_eq!(m.drop_rate(), 0.0);

        m.samples_recorded = 100;
        m.samples_dropped = 1;
        assert!((m.drop_rate() - 0.01).abs() < 0.0001);
    }

    #[test]
    fn test_metrics_average_flush_size() {
        let m = CaptureMetrics {
            flushes: 4,
            samples_flushed: 4096,
            ..Default::default()
        };
        assert_eq!(m.average_flush_size(), 1024);
        assert_eq!(CaptureMetrics::default().average_flush_size(), 0);
    }

    #[test]
    fn test_metrics_display() {
        let m = CaptureMetrics {
            samples_recorded: 42,
            ..Default::default()
        };
        assert!(m.to_string().contains("recorded=42"));
    }
}
