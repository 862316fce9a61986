//! Graph Nodes
//!
//! This module defines the type-erased view of a cell that lives in the
//! dependency graph. A `Cell<T>` is generic over its value type, but edges
//! connect cells of arbitrary value types, so the graph stores cells behind
//! the object-safe [`CellNode`] trait.
//!
//! [`NodeRef`] is the public handle for graph introspection: `callees()` and
//! `callers()` return them, and events carry them. Two `NodeRef`s compare
//! equal exactly when they refer to the same cell.

use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

/// Raw identity of a cell.
///
/// Cells have no numbering scheme; identity is the address of the shared
/// core allocation. Keys are only compared while a strong reference to the
/// cell is held somewhere, so an address is never observed after reuse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct NodeKey(*const ());

/// Object-safe graph surface of a cell.
///
/// Implemented by the typed cell core; everything the engine needs to do to
/// a cell of unknown value type goes through here.
pub(crate) trait CellNode {
    /// Whether the cell currently holds a cached nucleus.
    fn is_cached(&self) -> bool;

    /// The cells read by the evaluation that produced the cached value, in
    /// first-read order. `None` iff uncached.
    fn callees(&self) -> Option<Vec<NodeRef>>;

    /// The cached cells that read this cell, in the order they first became
    /// callers. `None` iff uncached.
    fn callers(&self) -> Option<Vec<NodeRef>>;

    /// Record `caller` as a caller of this cell and fire `CallerAdded`.
    ///
    /// Returns false without wiring anything if this cell is uncached (a
    /// reentrant listener may have torn it down between evaluation and
    /// wiring); the caller must then drop it from its callee list.
    fn add_caller(&self, caller: &NodeRef) -> bool;

    /// Tear down `caller`'s edge and fire `CallerRemoved`. No-op if the
    /// entry is already gone.
    fn remove_caller(&self, caller: &NodeRef);

    /// Transition the cell (and, first, its transitive callers) to uncached.
    fn invalidate(&self);
}

/// A type-erased handle to a cell in the dependency graph.
///
/// Cloning is cheap (reference-counted). Equality is cell identity, not
/// value equality.
#[derive(Clone)]
pub struct NodeRef(pub(crate) Rc<dyn CellNode>);

impl NodeRef {
    /// Whether the referenced cell is cached.
    pub fn is_cached(&self) -> bool {
        self.0.is_cached()
    }

    /// Ordered callee list of the referenced cell; `None` iff uncached.
    pub fn callees(&self) -> Option<Vec<NodeRef>> {
        self.0.callees()
    }

    /// Ordered caller list of the referenced cell; `None` iff uncached.
    pub fn callers(&self) -> Option<Vec<NodeRef>> {
        self.0.callers()
    }

    /// Whether two handles refer to the same cell.
    pub fn ptr_eq(&self, other: &NodeRef) -> bool {
        self.key() == other.key()
    }

    pub(crate) fn key(&self) -> NodeKey {
        // Cast drops the vtable half of the fat pointer; identity is the
        // data address alone.
        NodeKey(Rc::as_ptr(&self.0) as *const ())
    }
}

impl PartialEq for NodeRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for NodeRef {}

impl fmt::Debug for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRef")
            .field("addr", &self.key().0)
            .field("cached", &self.is_cached())
            .finish()
    }
}

/// Dedup helper used when checking callee lists in assertions and tests.
pub(crate) fn distinct(nodes: &[NodeRef]) -> bool {
    let mut seen = HashSet::new();
    nodes.iter().all(|n| seen.insert(n.key()))
}
