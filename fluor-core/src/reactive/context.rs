//! Evaluation Context
//!
//! The context is the per-thread engine state: the evaluation stack of
//! frames plus the identity that cells are bound to at construction.
//!
//! # Implementation
//!
//! The first engine touch on a thread lazily creates that thread's context
//! in thread-local storage. Every cell captures its creating context's id
//! and re-checks it on each operation, so disjoint cell sets on different
//! threads evolve independently while no cell is ever touched from a
//! foreign thread.
//!
//! The stack doubles as the dependency detector: a read is recorded into
//! the topmost frame whenever the stack is non-empty, regardless of how
//! many plain function calls sit between the evaluating expression and the
//! read. Nested evaluations each push their own frame, so reads land at the
//! correct depth.

use std::cell::RefCell;
use std::sync::atomic::{AtomicU64, Ordering};

use super::frame::Frame;
use crate::graph::NodeRef;

thread_local! {
    static CONTEXT: Context = Context::new();
}

/// Identity of a per-thread context.
///
/// Ids are globally unique across threads for the lifetime of the process,
/// so an id comparison is also a thread-ownership check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(u64);

impl ContextId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// Per-thread engine state: the evaluation stack and the context identity.
pub struct Context {
    id: ContextId,
    stack: RefCell<Vec<Frame>>,
}

impl Context {
    fn new() -> Self {
        Self {
            id: ContextId::next(),
            stack: RefCell::new(Vec::new()),
        }
    }

    /// Run `f` with the current thread's context, creating it on first use.
    pub(crate) fn with<R>(f: impl FnOnce(&Context) -> R) -> R {
        CONTEXT.with(|cx| f(cx))
    }

    /// Identity of the current thread's context.
    pub fn current_id() -> ContextId {
        Self::with(|cx| cx.id)
    }

    /// Whether an evaluation is in progress on the current thread.
    ///
    /// While this is true, `set` and `clear` are rejected.
    pub fn is_evaluating() -> bool {
        Self::with(|cx| !cx.stack.borrow().is_empty())
    }

    pub(crate) fn id(&self) -> ContextId {
        self.id
    }

    /// Record a read into the topmost frame, if any evaluation is in flight.
    pub(crate) fn record(&self, node: &NodeRef) {
        if let Some(frame) = self.stack.borrow_mut().last_mut() {
            frame.record(node.clone());
        }
    }

    pub(crate) fn push_frame(&self) {
        self.stack.borrow_mut().push(Frame::new());
    }

    pub(crate) fn pop_frame(&self) -> Frame {
        self.stack
            .borrow_mut()
            .pop()
            .expect("evaluation stack is non-empty while a frame guard is live")
    }
}
