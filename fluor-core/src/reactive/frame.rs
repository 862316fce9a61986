//! Evaluation Frames
//!
//! A frame collects the cells read while one expression evaluates. It lives
//! on the context's evaluation stack for exactly the duration of that
//! `get()` and is consumed when the evaluation finishes.
//!
//! Recording keeps first-read order and suppresses duplicates in O(1) via a
//! membership set alongside the ordered list.

use std::collections::HashSet;

use crate::graph::{NodeKey, NodeRef};

/// Ordered, de-duplicated accumulator of callees for one in-flight
/// evaluation.
pub(crate) struct Frame {
    ordered: Vec<NodeRef>,
    seen: HashSet<NodeKey>,
}

impl Frame {
    pub(crate) fn new() -> Self {
        Self {
            ordered: Vec::new(),
            seen: HashSet::new(),
        }
    }

    /// Record a read. Later reads of the same cell are ignored.
    pub(crate) fn record(&mut self, node: NodeRef) {
        if self.seen.insert(node.key()) {
            self.ordered.push(node);
        }
    }

    /// Consume the frame, yielding the recorded cells in first-read order.
    pub(crate) fn into_callees(self) -> Vec<NodeRef> {
        self.ordered
    }
}
