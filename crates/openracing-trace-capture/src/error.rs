//! Capture error types

use core::fmt;

/// Result alias for capture operations
pub type CaptureResult<T> = Result<T, CaptureError>;

/// Errors surfaced by the capture pipeline
///
/// Disagreement between the sizing pass and the write pass is not represented
/// here: it is a defect and panics instead of returning an error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CaptureError {
    /// The session has been shut down
    #[error("Trace session is not active")]
    NotActive,

    /// A buffer-list node or output buffer could not be allocated
    #[error("Trace capture allocation of {bytes} bytes failed")]
    AllocationFailed {
        /// Number of bytes that were requested
        bytes: usize,
    },

    /// The caller-provided output buffer cannot hold the drained samples
    #[error("Trace output buffer too small: {required} bytes required, {capacity} available")]
    OutputTooSmall {
        /// Bytes needed, including the terminator
        required: usize,
        /// Bytes the caller provided
        capacity: usize,
    },

    /// Invalid configuration
    #[error("Invalid trace capture configuration: {0}")]
    InvalidConfiguration(String),
}

impl CaptureError {
    /// Check if this error is recoverable
    ///
    /// Recoverable errors leave the session usable and lose no queued data.
    pub fn is_recoverable(&self) -> bool {
        match self {
            CaptureError::NotActive => false,
            CaptureError::AllocationFailed { .. } => true,
            CaptureError::OutputTooSmall { .. } => true,
            CaptureError::InvalidConfiguration(_) => false,
        }
    }

    /// Create a configuration error with context
    pub fn invalid_configuration(context: impl fmt::Display) -> Self {
        CaptureError::InvalidConfiguration(context.to_string())
    }
}
