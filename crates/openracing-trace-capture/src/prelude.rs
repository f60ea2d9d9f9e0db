//! Prelude for openracing-trace-capture
//!
//! This module re-exports the most commonly used types and macros.
//!
//! # Example
//!
//! ```rust
//! use openracing_trace_capture::prelude::*;
//!
//! let session = TraceSession::new(CaptureConfig::default())?;
//! let mut recorder = session.register_thread()?;
//!
//! trace_instant!(recorder, "hid", "report_sent")?;
//! # Ok::<(), CaptureError>(())
//! ```

pub use crate::{
    CaptureConfig, CaptureError, CaptureMetrics, CaptureResult, EventKind, LabelEncoding, Sample,
    SpanGuard, TRACE_POSTFACE, TRACE_PREFACE, ThreadRecorder, TraceChunk, TraceSession,
    trace_begin, trace_end, trace_if_active, trace_instant, trace_scope,
};
