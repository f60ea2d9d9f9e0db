//! Per-producer sample buffer

use crate::error::{CaptureError, CaptureResult};
use crate::sample::Sample;

/// Fixed-capacity, append-only sample storage owned by one producer
///
/// The vector length is the write cursor. Storage is reserved lazily on the
/// first push after creation or after [`take`](ThreadBuffer::take), so the
/// per-sample path never allocates.
#[derive(Debug)]
pub struct ThreadBuffer {
    samples: Vec<Sample>,
    capacity: usize,
}

impl ThreadBuffer {
    /// Create an empty buffer holding up to `capacity` samples
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: Vec::new(),
            capacity,
        }
    }

    /// Append a sample, returning `true` when the buffer became full
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::AllocationFailed`] if fresh storage could not
    /// be reserved. The sample is not recorded in that case.
    #[inline]
    pub fn push(&mut self, sample: Sample) -> CaptureResult<bool> {
        if self.samples.capacity() < self.capacity {
            self.reserve()?;
        }
        debug_assert!(self.samples.len() < self.capacity, "push into a full buffer");
        self.samples.push(sample);
        Ok(self.is_full())
    }

    #[cold]
    fn reserve(&mut self) -> CaptureResult<()> {
        let additional = self.capacity.saturating_sub(self.samples.len());
        self.samples
            .try_reserve_exact(additional)
            .map_err(|err| {
                tracing::warn!(%err, additional, "Sample buffer reservation failed");
                CaptureError::AllocationFailed {
                    bytes: additional.saturating_mul(size_of::<Sample>()),
                }
            })
    }

    /// Move the recorded samples out and reset the cursor to zero
    #[inline]
    pub fn take(&mut self) -> Vec<Sample> {
        std::mem::take(&mut self.samples)
    }

    /// Samples recorded since the last take
    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether no samples are pending
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Whether the buffer must be handed off before the next push
    #[inline]
    pub fn is_full(&self) -> bool {
        self.samples.len() >= self.capacity
    }

    /// Maximum samples held before handoff
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Pending samples in recording order
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }
}
