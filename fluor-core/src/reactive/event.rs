//! Lifecycle Events
//!
//! Cells with a listener receive an [`Event`] for every externally
//! observable state transition. Delivery is synchronous on the owning
//! thread, immediately after the transition it describes.
//!
//! # Ordering
//!
//! Within one composite operation the engine guarantees:
//!
//! - `CallerAdded` on a callee fires before `Cached` on the reader.
//! - `CallerRemoved` on a callee fires before `Invalidated` on the reader.
//! - `Set` and `Cleared` fire after internal state has settled, and are the
//!   only events the mutated cell itself emits for that operation.
//!
//! A panicking listener is caught, logged at warn level, and ignored; it
//! never corrupts graph state.

use crate::graph::NodeRef;

/// A lifecycle transition of a cell, delivered to its listener.
#[derive(Debug, Clone)]
pub enum Event<T> {
    /// The cell transitioned uncached -> cached by evaluating its
    /// expression. Carries the computed value and the callees the
    /// evaluation read, in first-read order.
    Cached {
        /// The freshly memoized value.
        value: T,
        /// Cells read during the producing evaluation.
        callees: Vec<NodeRef>,
    },

    /// The cell transitioned cached -> uncached because of an upstream
    /// change or an explicit invalidation.
    Invalidated,

    /// The cell's value was explicitly assigned.
    Set(T),

    /// The cell was explicitly cleared.
    Cleared,

    /// A new caller wired itself into this cell.
    CallerAdded(NodeRef),

    /// A caller's edge into this cell was torn down.
    CallerRemoved(NodeRef),
}

impl<T> Event<T> {
    /// Short name of the variant, used in log messages.
    pub fn name(&self) -> &'static str {
        match self {
            Event::Cached { .. } => "cached",
            Event::Invalidated => "invalidated",
            Event::Set(_) => "set",
            Event::Cleared => "cleared",
            Event::CallerAdded(_) => "caller_added",
            Event::CallerRemoved(_) => "caller_removed",
        }
    }
}
