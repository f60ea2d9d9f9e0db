//! Recording macros for convenient sample capture
//!
//! Each macro evaluates to the `CaptureResult` of the underlying recorder
//! call, so callers can propagate it with `?` or discard it explicitly.

/// Record a Begin sample timestamped now
///
/// # Example
///
/// ```rust
/// use openracing_trace_capture::{CaptureConfig, TraceSession, trace_begin};
///
/// let session = TraceSession::new(CaptureConfig::default())?;
/// let mut recorder = session.register_thread()?;
/// trace_begin!(recorder, "render", "frame")?;
/// # Ok::<(), openracing_trace_capture::CaptureError>(())
/// ```
#[macro_export]
macro_rules! trace_begin {
    ($recorder:expr, $category:expr, $name:expr) => {
        $recorder.begin($category, $name)
    };
}

/// Record an End sample timestamped now
///
/// Category and name must match the Begin being closed.
///
/// # Example
///
/// ```rust
/// use openracing_trace_capture::{CaptureConfig, TraceSession, trace_begin, trace_end};
///
/// let session = TraceSession::new(CaptureConfig::default())?;
/// let mut recorder = session.register_thread()?;
/// trace_begin!(recorder, "render", "frame")?;
/// trace_end!(recorder, "render", "frame")?;
/// # Ok::<(), openracing_trace_capture::CaptureError>(())
/// ```
#[macro_export]
macro_rules! trace_end {
    ($recorder:expr, $category:expr, $name:expr) => {
        $recorder.end($category, $name)
    };
}

/// Record an Instant sample timestamped now
///
/// # Example
///
/// ```rust
/// use openracing_trace_capture::{CaptureConfig, TraceSession, trace_instant};
///
/// let session = TraceSession::new(CaptureConfig::default())?;
/// let mut recorder = session.register_thread()?;
/// trace_instant!(recorder, "hid", "report_sent")?;
/// # Ok::<(), openracing_trace_capture::CaptureError>(())
/// ```
#[macro_export]
macro_rules! trace_instant {
    ($recorder:expr, $category:expr, $name:expr) => {
        $recorder.instant($category, $name)
    };
}

/// Open a span that records its End when the returned guard drops
///
/// # Example
///
/// ```rust
/// use openracing_trace_capture::{CaptureConfig, TraceSession, trace_scope};
///
/// let session = TraceSession::new(CaptureConfig::default())?;
/// let mut recorder = session.register_thread()?;
/// {
///     let _span = trace_scope!(recorder, "engine", "tick")?;
/// }
/// assert_eq!(recorder.pending(), 2);
/// # Ok::<(), openracing_trace_capture::CaptureError>(())
/// ```
#[macro_export]
macro_rules! trace_scope {
    ($recorder:expr, $category:expr, $name:expr) => {
        $recorder.scope($category, $name)
    };
}

/// Record a sample only while the owning session is active
///
/// Evaluates to `()`; recording errors are ignored. Use in code paths that
/// may outlive the session.
///
/// # Example
///
/// ```rust
/// use openracing_trace_capture::{CaptureConfig, EventKind, TraceSession, trace_if_active};
///
/// let session = TraceSession::new(CaptureConfig::default())?;
/// let mut recorder = session.register_thread()?;
/// session.shutdown()?;
/// trace_if_active!(recorder, EventKind::Instant, "io", "late");
/// # Ok::<(), openracing_trace_capture::CaptureError>(())
/// ```
#[macro_export]
macro_rules! trace_if_active {
    ($recorder:expr, $kind:expr, $category:expr, $name:expr) => {
        if $recorder.is_active() {
            match $recorder.record_now($category, $name, $kind) {
                Ok(()) | Err(_) => {}
            }
        }
    };
}
