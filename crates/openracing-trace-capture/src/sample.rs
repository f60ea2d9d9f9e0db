//! Sample definitions

use core::fmt;
use std::borrow::Cow;

use crate::clock::IdentitySource;

/// Category or name of a sample
///
/// String literals are stored by reference and cost nothing to record;
/// runtime-built labels are owned by the sample.
pub type Label = Cow<'static, str>;

/// Semantic role of a sample on the viewer's timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Opens a duration slice
    Begin,
    /// Closes the most recent matching Begin
    End,
    /// Point event with no duration
    Instant,
}

impl EventKind {
    /// Phase character written to the `ph` field
    #[inline]
    pub const fn phase(self) -> u8 {
        match self {
            EventKind::Begin => b'B',
            EventKind::End => b'E',
            EventKind::Instant => b'I',
        }
    }
}

/// One recorded event
///
/// Immutable once constructed. Identity is captured when the sample is built,
/// so a sample keeps its origin thread even if it is flushed elsewhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    timestamp_us: u64,
    category: Label,
    name: Label,
    process_id: u16,
    thread_id: u16,
    kind: EventKind,
}

impl Sample {
    /// Build a sample stamped with the caller's identity
    #[inline]
    pub fn capture(
        category: impl Into<Label>,
        name: impl Into<Label>,
        timestamp_us: u64,
        kind: EventKind,
        identity: &dyn IdentitySource,
    ) -> Self {
        Self::with_identity(
            category,
            name,
            timestamp_us,
            kind,
            identity.process_id(),
            identity.thread_id(),
        )
    }

    /// Build a sample with explicit identity
    #[inline]
    pub fn with_identity(
        category: impl Into<Label>,
        name: impl Into<Label>,
        timestamp_us: u64,
        kind: EventKind,
        process_id: u16,
        thread_id: u16,
    ) -> Self {
        Self {
            timestamp_us,
            category: category.into(),
            name: name.into(),
            process_id,
            thread_id,
            kind,
        }
    }

    /// Timestamp in microseconds
    #[inline]
    pub fn timestamp_us(&self) -> u64 {
        self.timestamp_us
    }

    /// Event category
    #[inline]
    pub fn category(&self) -> &str {
        &self.category
    }

    /// Event name
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub(crate) fn category_label(&self) -> &Label {
        &self.category
    }

    #[inline]
    pub(crate) fn name_label(&self) -> &Label {
        &self.name
    }

    /// Emitting process
    #[inline]
    pub fn process_id(&self) -> u16 {
        self.process_id
    }

    /// Emitting thread
    #[inline]
    pub fn thread_id(&self) -> u16 {
        self.thread_id
    }

    /// Event kind
    #[inline]
    pub fn kind(&self) -> EventKind {
        self.kind
    }
}

impl fmt::Display for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?}({}/{}, pid={}, tid={}, ts={}us)",
            self.kind, self.category, self.name, self.process_id, self.thread_id, self.timestamp_us
        )
    }
}
