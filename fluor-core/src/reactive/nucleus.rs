//! Cell Nucleus
//!
//! The nucleus is the populated cache payload of a cell: the memoized
//! value, the ordered callee list from the producing evaluation, and the
//! weakly-held ordered caller set.
//!
//! # Ownership
//!
//! Callees are held strongly: a cached cell keeps alive everything its
//! value was computed from. Callers are held weakly: when the last outside
//! reference to a caller cell drops, its entry here becomes dead and is
//! scavenged the next time the caller list is touched. The graph is acyclic
//! by construction (an edge only forms toward an already-cached callee), so
//! the strong direction cannot form a cycle.

use std::cell::{Cell as Flag, RefCell};
use std::rc::{Rc, Weak};

use crate::graph::{CellNode, NodeKey, NodeRef};

/// One weakly-held caller edge.
///
/// `key` is captured while the caller is alive so removal never needs to
/// upgrade, and `seq` pins the insertion order.
struct CallerEntry {
    node: Weak<dyn CellNode>,
    key: NodeKey,
    seq: u64,
}

impl CallerEntry {
    fn is_dead(&self) -> bool {
        self.node.strong_count() == 0
    }
}

/// The cache payload of a cached cell.
pub(crate) struct Nucleus<T> {
    value: T,
    callees: Vec<NodeRef>,
    callers: RefCell<Vec<CallerEntry>>,
    next_seq: Flag<u64>,
}

impl<T: Clone> Nucleus<T> {
    pub(crate) fn new(value: T, callees: Vec<NodeRef>) -> Self {
        Self {
            value,
            callees,
            callers: RefCell::new(Vec::new()),
            next_seq: Flag::new(0),
        }
    }

    pub(crate) fn value(&self) -> T {
        self.value.clone()
    }

    pub(crate) fn callees(&self) -> &[NodeRef] {
        &self.callees
    }

    /// Append `caller` with the next insertion counter.
    pub(crate) fn add_caller(&self, caller: &NodeRef) {
        let seq = self.next_seq.get();
        self.next_seq.set(seq + 1);
        self.callers.borrow_mut().push(CallerEntry {
            node: Rc::downgrade(&caller.0),
            key: caller.key(),
            seq,
        });
    }

    /// Drop `key`'s entry; dead entries met on the way are scavenged too.
    /// No-op if the entry is already gone.
    pub(crate) fn remove_caller(&self, key: NodeKey) {
        self.callers
            .borrow_mut()
            .retain(|entry| !entry.is_dead() && entry.key != key);
    }

    /// Live callers in ascending insertion order. Dead entries are
    /// scavenged as a side effect.
    pub(crate) fn callers(&self) -> Vec<NodeRef> {
        let mut entries = self.callers.borrow_mut();
        entries.retain(|entry| !entry.is_dead());
        debug_assert!(
            entries.windows(2).all(|w| w[0].seq < w[1].seq),
            "caller entries out of insertion order"
        );
        entries
            .iter()
            .filter_map(|entry| entry.node.upgrade().map(NodeRef))
            .collect()
    }
}
