//! Begin/End pairing diagnostics
//!
//! Trace viewers match an End to the most recent open Begin on the same
//! thread. The tracker mirrors that rule over flushed samples so that
//! unmatched events can be reported. It never changes the output.

use std::collections::HashMap;

use crate::sample::{EventKind, Label, Sample};

/// Open Begins remembered per thread before the oldest is forgotten
pub const MAX_OPEN_PER_THREAD: usize = 1024;

/// Result of observing one sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairingOutcome {
    /// A Begin was opened
    Opened,
    /// A Begin was opened and the thread's oldest open Begin was forgotten
    OpenedEvicting,
    /// An End closed a matching Begin
    Closed,
    /// An End had no matching open Begin on its thread
    UnmatchedEnd,
    /// Instant events do not participate in pairing
    Ignored,
}

/// Totals for one batch of observed samples
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PairingReport {
    /// End events in the batch with no matching Begin
    pub unmatched_ends: u64,
    /// Open Begins forgotten during the batch to stay within
    /// [`MAX_OPEN_PER_THREAD`]
    pub evicted_begins: u64,
    /// Begin events still open after the batch, across all threads
    pub open_begins: usize,
}

/// Tracks open Begin events per emitting thread across flushes
#[derive(Debug, Default)]
pub struct PairingTracker {
    open: HashMap<(u16, u16), Vec<(Label, Label)>>,
}

impl PairingTracker {
    /// Create a tracker with no open events
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one sample
    pub fn observe(&mut self, sample: &Sample) -> PairingOutcome {
        let thread = (sample.process_id(), sample.thread_id());
        match sample.kind() {
            EventKind::Instant => PairingOutcome::Ignored,
            EventKind::Begin => {
                let stack = self.open.entry(thread).or_default();
                let evicted = stack.len() >= MAX_OPEN_PER_THREAD;
                if evicted {
                    stack.remove(0);
                }
                stack.push((sample.category_label().clone(), sample.name_label().clone()));
                if evicted {
                    PairingOutcome::OpenedEvicting
                } else {
                    PairingOutcome::Opened
                }
            }
            EventKind::End => {
                let Some(stack) = self.open.get_mut(&thread) else {
                    return PairingOutcome::UnmatchedEnd;
                };
                let position = stack
                    .iter()
                    .rposition(|(cat, name)| cat == sample.category() && name == sample.name());
                match position {
                    Some(index) => {
                        stack.remove(index);
                        if stack.is_empty() {
                            self.open.remove(&thread);
                        }
                        PairingOutcome::Closed
                    }
                    None => PairingOutcome::UnmatchedEnd,
                }
            }
        }
    }

    /// Feed a batch of samples and summarize it
    ///
    /// Batches must be fed in the order they left the buffer list.
    pub fn observe_all<'a>(&mut self, samples: impl IntoIterator<Item = &'a Sample>) -> PairingReport {
        let mut report = PairingReport::default();
        for sample in samples {
            match self.observe(sample) {
                PairingOutcome::UnmatchedEnd => {
                    tracing::debug!(
                        category = sample.category(),
                        name = sample.name(),
                        thread_id = sample.thread_id(),
                        ts = sample.timestamp_us(),
                        "End event without matching Begin"
                    );
                    report.unmatched_ends = report.unmatched_ends.saturating_add(1);
                }
                PairingOutcome::OpenedEvicting => {
                    report.evicted_begins = report.evicted_begins.saturating_add(1);
                }
                PairingOutcome::Opened | PairingOutcome::Closed | PairingOutcome::Ignored => {}
            }
        }
        report.open_begins = self.open_begins();
        report
    }

    /// Begin events not yet closed, across all threads
    pub fn open_begins(&self) -> usize {
        self.open.values().map(Vec::len).sum()
    }

    /// Forget all open events
    pub fn reset(&mut self) {
        self.open.clear();
    }
}
