//! Trace session and per-producer recorders

use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, MutexGuard};

use crate::buffer::ThreadBuffer;
use crate::clock::{Clock, IdentitySource, MonotonicClock, OsIdentity};
use crate::config::CaptureConfig;
use crate::error::{CaptureError, CaptureResult};
use crate::list::{BufferList, BufferNode, DrainedBuffers};
use crate::metrics::{CaptureCounters, CaptureMetrics};
use crate::pairing::PairingTracker;
use crate::sample::{EventKind, Label, Sample};
use crate::wire::TraceEncoder;

struct SessionShared {
    config: CaptureConfig,
    list: BufferList,
    counters: CaptureCounters,
    active: AtomicBool,
    clock: Arc<dyn Clock>,
    identity: Arc<dyn IdentitySource>,
    pairing: Option<Mutex<PairingTracker>>,
}

impl SessionShared {
    fn encoder(&self) -> TraceEncoder<'_> {
        TraceEncoder::new(&self.config.tool_name, self.config.label_encoding)
    }

    #[inline]
    fn is_active(&self) -> bool {
        self.active.load(Ordering::Relaxed)
    }
}

/// Capture session context
///
/// Owns the shared buffer list and hands out one [`ThreadRecorder`] per
/// producer. Cloning the session yields another handle to the same state, so
/// a flushing thread can drain while producers record.
///
/// # Example
///
/// ```rust
/// use openracing_trace_capture::{CaptureConfig, TraceSession};
///
/// let session = TraceSession::new(CaptureConfig::default())?;
/// let mut recorder = session.register_thread()?;
///
/// recorder.begin("render", "frame")?;
/// recorder.end("render", "frame")?;
/// recorder.flush_thread_buffer()?;
///
/// let chunk = session.flush_alloc()?;
/// assert_eq!(chunk.sample_count(), 2);
///
/// session.shutdown()?;
/// # Ok::<(), openracing_trace_capture::CaptureError>(())
/// ```
///
/// # Thread Safety
///
/// All session methods take `&self`. The list lock is held only for buffer
/// handoffs, the sizing traversal of
/// [`compute_output_size`](Self::compute_output_size), and the swap-out at the
/// start of a drain; serialization runs outside it.
#[derive(Clone)]
pub struct TraceSession {
    shared: Arc<SessionShared>,
}

impl TraceSession {
    /// Create a session backed by the OS clock and identity
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(config: CaptureConfig) -> CaptureResult<Self> {
        Self::with_sources(config, Arc::new(MonotonicClock::new()), Arc::new(OsIdentity))
    }

    /// Create a session with custom clock and identity sources
    ///
    /// Use this for deterministic tests or for embedding in a host that owns
    /// its own time base.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn with_sources(
        config: CaptureConfig,
        clock: Arc<dyn Clock>,
        identity: Arc<dyn IdentitySource>,
    ) -> CaptureResult<Self> {
        config.validate()?;
        tracing::info!(
            buffer_capacity = config.buffer_capacity,
            tool = %config.tool_name,
            label_encoding = ?config.label_encoding,
            validate_pairing = config.validate_pairing,
            "Trace capture session started"
        );
        let pairing = config
            .validate_pairing
            .then(|| Mutex::new(PairingTracker::new()));
        Ok(Self {
            shared: Arc::new(SessionShared {
                config,
                list: BufferList::new(),
                counters: CaptureCounters::new(),
                active: AtomicBool::new(true),
                clock,
                identity,
                pairing,
            }),
        })
    }

    /// Session configuration
    pub fn config(&self) -> &CaptureConfig {
        &self.shared.config
    }

    /// Whether the session accepts samples and flushes
    pub fn is_active(&self) -> bool {
        self.shared.is_active()
    }

    /// Current timestamp from the session clock
    #[inline]
    pub fn now_us(&self) -> u64 {
        self.shared.clock.now_us()
    }

    /// Obtain a recorder for the calling producer
    ///
    /// Each OS thread should own one recorder. Several recorders on the same
    /// thread act as independent producers whose buffers are handed off
    /// separately.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::NotActive`] after [`shutdown`](Self::shutdown).
    pub fn register_thread(&self) -> CaptureResult<ThreadRecorder> {
        if !self.shared.is_active() {
            return Err(CaptureError::NotActive);
        }
        Ok(ThreadRecorder {
            buffer: ThreadBuffer::new(self.shared.config.buffer_capacity),
            shared: Arc::clone(&self.shared),
        })
    }

    /// Number of buffers queued for the next flush
    pub fn list_size(&self) -> usize {
        self.shared.list.len()
    }

    /// Snapshot of the session counters
    pub fn metrics(&self) -> CaptureMetrics {
        self.shared.counters.snapshot()
    }

    /// Exact bytes a drain of the current list would need
    ///
    /// Includes the terminator. Holds the list lock for the whole traversal.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::NotActive`] after [`shutdown`](Self::shutdown).
    pub fn compute_output_size(&self) -> CaptureResult<usize> {
        let encoder = self.shared.encoder();
        self.shared
            .list
            .inspect(|nodes| encoder.output_size(nodes.iter().flat_map(BufferNode::samples)))
    }

    /// Drain every queued buffer and serialize it into `output`
    ///
    /// The output is NUL-terminated. Returns the number of bytes written,
    /// excluding the terminator.
    ///
    /// # Errors
    ///
    /// - [`CaptureError::NotActive`] after [`shutdown`](Self::shutdown)
    /// - [`CaptureError::OutputTooSmall`] if the drained samples do not fit;
    ///   they are put back at the head of the list and nothing is written
    ///
    /// # Panics
    ///
    /// Panics if the serializer writes a different number of bytes than it
    /// sized, which indicates a defect in the encoder.
    pub fn drain_into(&self, output: &mut [u8]) -> CaptureResult<usize> {
        let mut pairing = self.lock_pairing();
        let drained = self.shared.list.drain()?;
        let required = self.shared.encoder().output_size(drained.samples());
        if required > output.len() {
            tracing::warn!(
                required,
                capacity = output.len(),
                "Trace output buffer too small, buffers restored"
            );
            self.restore(drained);
            return Err(CaptureError::OutputTooSmall {
                required,
                capacity: output.len(),
            });
        }
        self.observe_pairing(pairing.as_deref_mut(), &drained);
        drop(pairing);
        Ok(self.serialize(drained, output, required))
    }

    /// Drain every queued buffer into a freshly allocated chunk
    ///
    /// The chunk is sized exactly once; no reallocation happens while writing.
    ///
    /// # Errors
    ///
    /// - [`CaptureError::NotActive`] after [`shutdown`](Self::shutdown)
    /// - [`CaptureError::AllocationFailed`] if the output could not be
    ///   allocated; the drained buffers are put back at the head of the list
    ///
    /// # Panics
    ///
    /// Panics if the serializer writes a different number of bytes than it
    /// sized, which indicates a defect in the encoder.
    pub fn flush_alloc(&self) -> CaptureResult<TraceChunk> {
        let mut pairing = self.lock_pairing();
        let drained = self.shared.list.drain()?;
        let required = self.shared.encoder().output_size(drained.samples());

        let mut bytes = Vec::new();
        if let Err(err) = bytes.try_reserve_exact(required) {
            tracing::warn!(%err, required, "Trace output allocation failed, buffers restored");
            self.restore(drained);
            return Err(CaptureError::AllocationFailed { bytes: required });
        }
        bytes.resize(required, 0);
        self.observe_pairing(pairing.as_deref_mut(), &drained);
        drop(pairing);

        let sample_count = drained.sample_count();
        self.serialize(drained, &mut bytes, required);
        Ok(TraceChunk {
            bytes,
            sample_count,
        })
    }

    /// Shut the session down and release any queued buffers
    ///
    /// Subsequent recording and flushing fail with
    /// [`CaptureError::NotActive`]. Callers that need the queued samples must
    /// flush before shutting down.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::NotActive`] if the session was already shut down.
    pub fn shutdown(&self) -> CaptureResult<()> {
        if !self.shared.active.swap(false, Ordering::AcqRel) {
            return Err(CaptureError::NotActive);
        }
        let discarded = self.shared.list.close();
        let discarded_samples = discarded.sample_count();
        self.shared.counters.add_dropped(discarded_samples as u64);
        drop(discarded);
        if let Some(tracker) = &self.shared.pairing {
            tracker.lock().reset();
        }

        tracing::info!(
            discarded_samples,
            metrics = %self.shared.counters.snapshot(),
            "Trace capture session shut down"
        );
        Ok(())
    }

    /// Put an undelivered chain back, or count it as dropped if the list
    /// closed in the meantime
    fn restore(&self, drained: DrainedBuffers) {
        if let Some(rejected) = self.shared.list.restore(drained) {
            let lost = rejected.sample_count();
            self.shared.counters.add_dropped(lost as u64);
            tracing::debug!(samples = lost, "Session shut down during flush, samples dropped");
        }
    }

    /// Held from the swap-out until the batch is observed, so the tracker
    /// sees batches in drain order
    fn lock_pairing(&self) -> Option<MutexGuard<'_, PairingTracker>> {
        self.shared.pairing.as_ref().map(|tracker| tracker.lock())
    }

    fn serialize(&self, drained: DrainedBuffers, output: &mut [u8], required: usize) -> usize {
        let sample_count = drained.sample_count();

        let written = self
            .shared
            .encoder()
            .encode_into(drained.into_samples(), output);
        assert_eq!(
            written.map(|w| w + 1),
            Ok(required),
            "trace size computation disagrees with the writer"
        );
        let written = required - 1;

        self.shared
            .counters
            .record_flush(sample_count as u64, written as u64);
        tracing::debug!(samples = sample_count, bytes = written, "Trace buffers flushed");
        written
    }

    fn observe_pairing(&self, tracker: Option<&mut PairingTracker>, drained: &DrainedBuffers) {
        let Some(tracker) = tracker else {
            return;
        };
        let report = tracker.observe_all(drained.samples());
        if report.unmatched_ends > 0 {
            self.shared.counters.add_unmatched_ends(report.unmatched_ends);
            tracing::warn!(
                unmatched_ends = report.unmatched_ends,
                open_begins = report.open_begins,
                "Flushed trace contains End events without a matching Begin"
            );
        }
        if report.evicted_begins > 0 {
            tracing::warn!(
                evicted_begins = report.evicted_begins,
                "Too many open Begin events on one thread, oldest forgotten"
            );
        }
    }
}

impl core::fmt::Debug for TraceSession {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TraceSession")
            .field("config", &self.shared.config)
            .field("active", &self.shared.is_active())
            .field("clock_type", &core::any::type_name_of_val(&*self.shared.clock))
            .field(
                "identity_type",
                &core::any::type_name_of_val(&*self.shared.identity),
            )
            .finish()
    }
}

/// Per-producer recording handle
///
/// Owns the producer's buffer exclusively, so appends take no lock. A full
/// buffer is moved into the session's list under the list lock, once every
/// `buffer_capacity` samples.
///
/// Dropping the recorder flushes any pending samples into the list.
pub struct ThreadRecorder {
    buffer: ThreadBuffer,
    shared: Arc<SessionShared>,
}

impl ThreadRecorder {
    /// Build a sample stamped with this producer's identity
    #[inline]
    pub fn create_sample(
        &self,
        category: impl Into<Label>,
        name: impl Into<Label>,
        timestamp_us: u64,
        kind: EventKind,
    ) -> Sample {
        Sample::capture(category, name, timestamp_us, kind, &*self.shared.identity)
    }

    /// Append a sample to this producer's buffer
    ///
    /// Hands the buffer off to the session list when it becomes full.
    ///
    /// # Errors
    ///
    /// - [`CaptureError::NotActive`] after the session was shut down
    /// - [`CaptureError::AllocationFailed`] if buffer storage or a list node
    ///   could not be allocated; affected samples are counted as dropped
    #[inline]
    pub fn record(&mut self, sample: Sample) -> CaptureResult<()> {
        if !self.shared.is_active() {
            return Err(CaptureError::NotActive);
        }
        self.shared.counters.add_recorded(1);
        match self.buffer.push(sample) {
            Ok(false) => Ok(()),
            Ok(true) => self.hand_off(),
            Err(err) => {
                self.shared.counters.add_dropped(1);
                Err(err)
            }
        }
    }

    /// Record a Begin event timestamped now
    ///
    /// # Errors
    ///
    /// See [`record`](Self::record).
    #[inline]
    pub fn begin(&mut self, category: impl Into<Label>, name: impl Into<Label>) -> CaptureResult<()> {
        self.record_now(category, name, EventKind::Begin)
    }

    /// Record an End event timestamped now
    ///
    /// # Errors
    ///
    /// See [`record`](Self::record).
    #[inline]
    pub fn end(&mut self, category: impl Into<Label>, name: impl Into<Label>) -> CaptureResult<()> {
        self.record_now(category, name, EventKind::End)
    }

    /// Record an Instant event timestamped now
    ///
    /// # Errors
    ///
    /// See [`record`](Self::record).
    #[inline]
    pub fn instant(
        &mut self,
        category: impl Into<Label>,
        name: impl Into<Label>,
    ) -> CaptureResult<()> {
        self.record_now(category, name, EventKind::Instant)
    }

    /// Record a Begin event now and an End event when the guard drops
    ///
    /// The guard dereferences to the recorder, so nested events can be
    /// recorded while it is alive.
    ///
    /// # Errors
    ///
    /// See [`record`](Self::record). No guard is returned if the Begin event
    /// could not be recorded.
    pub fn scope(
        &mut self,
        category: impl Into<Label>,
        name: impl Into<Label>,
    ) -> CaptureResult<SpanGuard<'_>> {
        let category = category.into();
        let name = name.into();
        self.begin(category.clone(), name.clone())?;
        Ok(SpanGuard {
            recorder: self,
            category,
            name,
        })
    }

    /// Move pending samples into the session list, full or not
    ///
    /// Must run before a producer stops recording and before the final
    /// flush, otherwise up to `buffer_capacity - 1` samples stay behind.
    /// Dropping the recorder does this automatically. An empty buffer is not
    /// queued.
    ///
    /// # Errors
    ///
    /// - [`CaptureError::NotActive`] after the session was shut down
    /// - [`CaptureError::AllocationFailed`] if the list node could not be
    ///   allocated; the pending samples are counted as dropped
    pub fn flush_thread_buffer(&mut self) -> CaptureResult<()> {
        if !self.shared.is_active() {
            return Err(CaptureError::NotActive);
        }
        if self.buffer.is_empty() {
            return Ok(());
        }
        self.hand_off()
    }

    /// Whether the owning session still accepts samples
    #[inline]
    pub fn is_active(&self) -> bool {
        self.shared.is_active()
    }

    /// Samples waiting in this producer's buffer
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Handle to the owning session
    pub fn session(&self) -> TraceSession {
        TraceSession {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Record a sample of `kind` timestamped now
    ///
    /// # Errors
    ///
    /// See [`record`](Self::record).
    #[inline]
    pub fn record_now(
        &mut self,
        category: impl Into<Label>,
        name: impl Into<Label>,
        kind: EventKind,
    ) -> CaptureResult<()> {
        let timestamp_us = self.shared.clock.now_us();
        let sample = self.create_sample(category, name, timestamp_us, kind);
        self.record(sample)
    }

    fn hand_off(&mut self) -> CaptureResult<()> {
        let samples = self.buffer.take();
        let count = samples.len() as u64;
        match self.shared.list.push(samples) {
            Ok(()) => {
                self.shared.counters.inc_handoff();
                Ok(())
            }
            Err(err) => {
                self.shared.counters.add_dropped(count);
                Err(err)
            }
        }
    }
}

impl Drop for ThreadRecorder {
    fn drop(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        if !self.shared.is_active() {
            self.shared.counters.add_dropped(self.buffer.len() as u64);
            return;
        }
        if let Err(err) = self.hand_off() {
            tracing::warn!(%err, "Pending samples lost when recorder dropped");
        }
    }
}

impl core::fmt::Debug for ThreadRecorder {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ThreadRecorder")
            .field("pending", &self.buffer.len())
            .field("capacity", &self.buffer.capacity())
            .finish()
    }
}

/// Records the End half of a [`ThreadRecorder::scope`] span on drop
#[derive(Debug)]
pub struct SpanGuard<'a> {
    recorder: &'a mut ThreadRecorder,
    category: Label,
    name: Label,
}

impl Deref for SpanGuard<'_> {
    type Target = ThreadRecorder;

    fn deref(&self) -> &ThreadRecorder {
        self.recorder
    }
}

impl DerefMut for SpanGuard<'_> {
    fn deref_mut(&mut self) -> &mut ThreadRecorder {
        self.recorder
    }
}

impl Drop for SpanGuard<'_> {
    fn drop(&mut self) {
        let category = std::mem::take(&mut self.category);
        let name = std::mem::take(&mut self.name);
        if let Err(err) = self.recorder.end(category, name) {
            tracing::debug!(%err, "Span end not recorded");
        }
    }
}

/// Serialized output of one flush
///
/// Holds the NUL-terminated bytes produced by
/// [`TraceSession::flush_alloc`]. The caller owns the chunk and releases it
/// by dropping it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceChunk {
    bytes: Vec<u8>,
    sample_count: usize,
}

impl TraceChunk {
    /// Encoded events without the terminator
    pub fn as_bytes(&self) -> &[u8] {
        self.bytes
            .split_last()
            .map(|(_, text)| text)
            .unwrap_or_default()
    }

    /// Encoded events including the NUL terminator
    pub fn as_bytes_with_nul(&self) -> &[u8] {
        &self.bytes
    }

    /// Encoded events as text
    ///
    /// # Errors
    ///
    /// Returns an error only if a label contained invalid UTF-8, which safe
    /// `str` labels cannot.
    pub fn to_str(&self) -> Result<&str, core::str::Utf8Error> {
        core::str::from_utf8(self.as_bytes())
    }

    /// Length in bytes, excluding the terminator
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    /// Always false: a flush that found no samples still holds `{}`
    ///
    /// Use [`has_samples`](Self::has_samples) to detect an empty flush.
    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }

    /// Samples encoded in this chunk
    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    /// Whether the flush found no samples and produced the `{}` placeholder
    pub fn has_samples(&self) -> bool {
        self.sample_count > 0
    }

    /// Take the bytes, terminator included
    pub fn into_bytes_with_nul(self) -> Vec<u8> {
        self.bytes
    }
}
