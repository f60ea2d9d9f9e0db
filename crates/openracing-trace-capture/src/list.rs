//! Shared buffer list
//!
//! Completed producer buffers are queued here until a flush drains them. The
//! list lock is held only for O(1) handoffs, the read-only sizing traversal,
//! and the swap-out at the start of a drain.

use parking_lot::Mutex;

use crate::error::{CaptureError, CaptureResult};
use crate::sample::Sample;

/// One completed producer buffer
#[derive(Debug)]
pub struct BufferNode {
    samples: Vec<Sample>,
}

impl BufferNode {
    /// Samples in recording order
    #[inline]
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Number of samples in this node
    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether this node holds no samples
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Take ownership of the samples
    pub fn into_samples(self) -> Vec<Sample> {
        self.samples
    }
}

/// Buffers removed from the list by a drain, owned by the flush caller
#[derive(Debug, Default)]
pub struct DrainedBuffers {
    nodes: Vec<BufferNode>,
}

impl DrainedBuffers {
    /// Nodes in list insertion order
    pub fn nodes(&self) -> &[BufferNode] {
        &self.nodes
    }

    /// Whether the drain removed nothing
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Total samples across all nodes
    pub fn sample_count(&self) -> usize {
        self.nodes.iter().map(BufferNode::len).sum()
    }

    /// Iterate over every sample in output order
    pub fn samples(&self) -> impl Iterator<Item = &Sample> {
        self.nodes.iter().flat_map(BufferNode::samples)
    }

    /// Consume the chain node by node
    pub fn into_nodes(self) -> std::vec::IntoIter<BufferNode> {
        self.nodes.into_iter()
    }

    /// Consume the chain sample by sample
    ///
    /// Each node's storage is released once its last sample has been yielded.
    pub fn into_samples(self) -> impl Iterator<Item = Sample> {
        self.into_nodes().flat_map(BufferNode::into_samples)
    }
}

#[derive(Debug, Default)]
struct ListState {
    nodes: Vec<BufferNode>,
    closed: bool,
}

/// Lock-protected FIFO of completed buffers
///
/// # Invariants
///
/// - Nodes are appended only at the tail
/// - Nodes leave only through a full drain or [`close`](BufferList::close)
/// - A closed list is empty and accepts no further nodes
#[derive(Debug, Default)]
pub struct BufferList {
    state: Mutex<ListState>,
}

impl BufferList {
    /// Create an empty, open list
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a completed buffer at the tail
    ///
    /// # Errors
    ///
    /// - [`CaptureError::NotActive`] if the list has been closed
    /// - [`CaptureError::AllocationFailed`] if the node slot could not be
    ///   reserved; the samples are dropped
    pub fn push(&self, samples: Vec<Sample>) -> CaptureResult<()> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(CaptureError::NotActive);
        }
        state.nodes.try_reserve(1).map_err(|err| {
            tracing::warn!(%err, "Buffer list node allocation failed");
            CaptureError::AllocationFailed {
                bytes: size_of::<BufferNode>(),
            }
        })?;
        state.nodes.push(BufferNode { samples });
        Ok(())
    }

    /// Number of queued buffers
    pub fn len(&self) -> usize {
        self.state.lock().nodes.len()
    }

    /// Whether no buffers are queued
    pub fn is_empty(&self) -> bool {
        self.state.lock().nodes.is_empty()
    }

    /// Whether the list has been closed
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Run `f` over the queued nodes while holding the lock
    ///
    /// Nodes are not removed. Recording threads that fill a buffer block until
    /// `f` returns.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::NotActive`] if the list has been closed.
    pub fn inspect<R>(&self, f: impl FnOnce(&[BufferNode]) -> R) -> CaptureResult<R> {
        let state = self.state.lock();
        if state.closed {
            return Err(CaptureError::NotActive);
        }
        Ok(f(&state.nodes))
    }

    /// Swap out every queued node, leaving the list empty
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::NotActive`] if the list has been closed.
    pub fn drain(&self) -> CaptureResult<DrainedBuffers> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(CaptureError::NotActive);
        }
        Ok(DrainedBuffers {
            nodes: std::mem::take(&mut state.nodes),
        })
    }

    /// Put a drained chain back at the head of the list
    ///
    /// Nodes queued since the drain stay behind the restored ones, so list
    /// order is preserved. A closed list rejects the chain and hands it back
    /// so the caller can account for its samples.
    #[must_use = "a rejected chain holds samples that were neither flushed nor counted"]
    pub fn restore(&self, drained: DrainedBuffers) -> Option<DrainedBuffers> {
        let mut state = self.state.lock();
        if state.closed {
            return Some(drained);
        }
        let mut nodes = drained.nodes;
        nodes.append(&mut state.nodes);
        state.nodes = nodes;
        None
    }

    /// Close the list and hand back whatever was still queued
    pub fn close(&self) -> DrainedBuffers {
        let mut state = self.state.lock();
        state.closed = true;
        DrainedBuffers {
            nodes: std::mem::take(&mut state.nodes),
        }
    }
}
