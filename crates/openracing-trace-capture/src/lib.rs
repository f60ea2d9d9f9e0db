//! Low-overhead in-process event capture for OpenRacing
//!
//! Application code marks the begin, end and instant of named, categorized
//! events. Samples are buffered per producer, handed to a shared list once a
//! buffer fills, and rendered on demand into Chrome trace event JSON for
//! chrome://tracing or Perfetto.
//!
//! # Pipeline
//!
//! 1. A [`ThreadRecorder`] appends [`Sample`]s to its own buffer without
//!    locking
//! 2. A full buffer is moved into the session's [`BufferList`] under its lock,
//!    once every `buffer_capacity` samples
//! 3. [`TraceSession::flush_alloc`] (or [`TraceSession::drain_into`]) swaps
//!    the whole list out, sizes the output exactly, and serializes it in one
//!    pass outside the lock
//!
//! # Hot-Path Guarantees
//!
//! - No heap allocation per sample; storage is reserved once per buffer fill
//! - No locking per sample; the list lock is taken once per buffer handoff
//! - Static labels are recorded by reference
//!
//! # Example
//!
//! ```rust
//! use openracing_trace_capture::prelude::*;
//!
//! let session = TraceSession::new(CaptureConfig::default())?;
//! let mut recorder = session.register_thread()?;
//!
//! trace_begin!(recorder, "physics", "integrate")?;
//! trace_instant!(recorder, "physics", "contact")?;
//! trace_end!(recorder, "physics", "integrate")?;
//! recorder.flush_thread_buffer()?;
//!
//! let chunk = session.flush_alloc()?;
//! let document = format!("{TRACE_PREFACE}{}{TRACE_POSTFACE}", chunk.to_str().unwrap_or_default());
//! assert!(document.contains("\"ph\":\"I\""));
//! # Ok::<(), CaptureError>(())
//! ```

#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]
#![warn(missing_docs, missing_debug_implementations)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod buffer;
pub mod clock;
pub mod config;
pub mod error;
pub mod list;
pub mod macros;
pub mod metrics;
pub mod pairing;
pub mod prelude;
pub mod sample;
pub mod session;
pub mod wire;

pub use buffer::ThreadBuffer;
pub use clock::{Clock, IdentitySource, MonotonicClock, OsIdentity};
pub use config::{CaptureConfig, CaptureConfigBuilder, LabelEncoding};
pub use error::{CaptureError, CaptureResult};
pub use list::{BufferList, BufferNode, DrainedBuffers};
pub use metrics::{CaptureCounters, CaptureMetrics};
pub use pairing::{PairingOutcome, PairingReport, PairingTracker};
pub use sample::{EventKind, Label, Sample};
pub use session::{SpanGuard, ThreadRecorder, TraceChunk, TraceSession};
pub use wire::{TRACE_POSTFACE, TRACE_PREFACE, TraceEncoder};
