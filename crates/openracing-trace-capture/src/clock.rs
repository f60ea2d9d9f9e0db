//! Clock and identity sources
//!
//! The capture pipeline reads timestamps and emitter identity through these
//! traits so that sessions can run against the OS or against deterministic
//! sources in tests.

use std::sync::atomic::{AtomicU16, Ordering};
use std::time::Instant;

/// Monotonic microsecond clock
///
/// # Requirements
///
/// - Values must never decrease within a process
/// - Must not allocate or block; it is read on the recording hot path
pub trait Clock: Send + Sync {
    /// Current timestamp in microseconds
    fn now_us(&self) -> u64;
}

/// Source of the process and thread identifiers stamped on each sample
///
/// Identifiers are truncated to 16 bits, matching the trace format.
pub trait IdentitySource: Send + Sync {
    /// Identifier of the current process
    fn process_id(&self) -> u16;

    /// Identifier of the calling thread
    ///
    /// Must be stable for the lifetime of the thread.
    fn thread_id(&self) -> u16;
}

/// Clock measuring microseconds since its own creation
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    epoch: Instant,
}

impl MonotonicClock {
    /// Create a clock whose zero is now
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    #[inline]
    fn now_us(&self) -> u64 {
        u64::try_from(self.epoch.elapsed().as_micros()).unwrap_or(u64::MAX)
    }
}

static NEXT_THREAD_SLOT: AtomicU16 = AtomicU16::new(1);

thread_local! {
    static THREAD_SLOT: u16 = NEXT_THREAD_SLOT.fetch_add(1, Ordering::Relaxed);
}

/// Identity backed by the OS process id and a per-thread slot number
///
/// Thread identifiers are handed out sequentially on first use from each
/// thread, starting at 1. They wrap after 65535 threads.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsIdentity;

impl IdentitySource for OsIdentity {
    fn process_id(&self) -> u16 {
        let [lo, hi, _, _] = std::process::id().to_le_bytes();
        u16::from_le_bytes([lo, hi])
    }

    #[inline]
    fn thread_id(&self) -> u16 {
        THREAD_SLOT.with(|slot| *slot)
    }
}
