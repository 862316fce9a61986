//! Cell Implementation
//!
//! A cell is a reactive node: a suspended expression, an optional listener,
//! and a slot that is either empty or holds the cached [`Nucleus`]. All of
//! the engine's state machine lives here.
//!
//! # How Cells Work
//!
//! 1. `get` on an uncached cell pushes a frame, runs the expression, and
//!    collects every cell the expression read (directly or through any
//!    number of plain function calls).
//!
//! 2. The collected callees are wired both ways: the reader appears in each
//!    callee's caller set, the callees in the reader's nucleus.
//!
//! 3. `set` and `clear` first invalidate: every transitive caller is torn
//!    down depth-first, edges are removed, and each affected cell emits a
//!    single terminal event.
//!
//! # Silenced scope
//!
//! Composite operations (`set`, `clear`, upstream invalidation) suppress
//! the mutated cell's own listener while internal bookkeeping runs, so the
//! cell emits exactly one terminal event (`Set`, `Cleared`, or
//! `Invalidated`) instead of a burst of intermediate ones. Listeners on
//! other cells are never suppressed. The suppression flag is restored by a
//! drop guard, so it survives unwinding.
//!
//! # Thread binding
//!
//! A cell is bound to the context of its creating thread and re-checks that
//! binding on every operation. Handles are `!Send` (reference-counted,
//! interior-mutable), so the check cannot fail from safe code; the crate
//! docs carry the compile-fail demonstration.

use std::cell::{Cell as Flag, RefCell};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::{Rc, Weak};

use tracing::warn;

use super::context::{Context, ContextId};
use super::event::Event;
use super::frame::Frame;
use super::nucleus::Nucleus;
use crate::error::{Error, Result};
use crate::graph::{CellNode, NodeRef};

/// A reactive node holding an expression and an optional cached value.
///
/// Handles are cheap to clone and share identity: every clone refers to the
/// same cell in the graph.
///
/// # Example
///
/// ```
/// use fluor_core::{Cell, Result};
///
/// fn main() -> Result<()> {
///     let base = Cell::source(2_i64);
///     let b = base.clone();
///     let doubled = Cell::new(move || Ok(b.get()? * 2));
///
///     assert_eq!(doubled.get()?, 4);
///
///     base.set(10)?;
///     assert_eq!(doubled.get()?, 20);
///     Ok(())
/// }
/// ```
pub struct Cell<T> {
    core: Rc<CellCore<T>>,
}

type Expr<T> = Box<dyn Fn() -> Result<T>>;
type Listener<T> = Box<dyn Fn(&Event<T>)>;

struct CellCore<T> {
    /// Context of the creating thread; checked on every operation.
    ctx: ContextId,
    expr: Expr<T>,
    listener: Option<Listener<T>>,
    /// Listener suppression flag for the silenced scope.
    muted: Flag<bool>,
    /// Empty means uncached; the nucleus is installed atomically at the end
    /// of a successful evaluation.
    slot: RefCell<Option<Nucleus<T>>>,
    /// Self-reference for minting type-erased node handles.
    weak_self: Weak<CellCore<T>>,
}

impl<T: Clone + 'static> Cell<T> {
    /// Create a cell computed by a fallible expression.
    ///
    /// The expression is not run until the first `get`. Cells it reads
    /// while running become its callees automatically.
    pub fn new(expr: impl Fn() -> Result<T> + 'static) -> Self {
        Self::build(Box::new(expr), None)
    }

    /// Like [`Cell::new`], with a listener receiving lifecycle events.
    pub fn with_listener(
        expr: impl Fn() -> Result<T> + 'static,
        listener: impl Fn(&Event<T>) + 'static,
    ) -> Self {
        Self::build(Box::new(expr), Some(Box::new(listener)))
    }

    /// Create a cell whose expression yields a captured initial value.
    ///
    /// This is the source-cell idiom: `get` lazily caches `value`, `set`
    /// overrides it, and `clear` returns the cell to `value` on next read.
    pub fn source(value: T) -> Self {
        Self::new(move || Ok(value.clone()))
    }

    /// Like [`Cell::source`], with a listener.
    pub fn source_with_listener(value: T, listener: impl Fn(&Event<T>) + 'static) -> Self {
        Self::with_listener(move || Ok(value.clone()), listener)
    }

    fn build(expr: Expr<T>, listener: Option<Listener<T>>) -> Self {
        let ctx = Context::current_id();
        let core = Rc::new_cyclic(|weak_self| CellCore {
            ctx,
            expr,
            listener,
            muted: Flag::new(false),
            slot: RefCell::new(None),
            weak_self: weak_self.clone(),
        });
        Self { core }
    }

    /// Return the cached value, evaluating the expression if necessary.
    ///
    /// When called from inside another cell's evaluation, the read is
    /// recorded as a dependency of that cell.
    pub fn get(&self) -> Result<T> {
        self.core.get()
    }

    /// Assign a value, invalidating all transitive callers first.
    ///
    /// The cell ends up cached with no callees, so later upstream changes
    /// do not disturb it until it is cleared.
    pub fn set(&self, value: T) -> Result<()> {
        self.core.set(value)
    }

    /// Drop the cached value, invalidating all transitive callers first.
    /// The next `get` re-evaluates the expression.
    pub fn clear(&self) -> Result<()> {
        self.core.clear()
    }

    /// Whether the cell currently holds a cached value.
    pub fn is_cached(&self) -> bool {
        CellNode::is_cached(&*self.core)
    }

    /// Cells read by the producing evaluation, in first-read order.
    /// `None` iff uncached.
    pub fn callees(&self) -> Option<Vec<NodeRef>> {
        CellNode::callees(&*self.core)
    }

    /// Cached cells that read this cell, in the order they first became
    /// callers. `None` iff uncached.
    pub fn callers(&self) -> Option<Vec<NodeRef>> {
        CellNode::callers(&*self.core)
    }

    /// Type-erased handle to this cell for graph comparisons.
    pub fn node(&self) -> NodeRef {
        NodeRef(self.core.clone())
    }
}

impl<T> Clone for Cell<T> {
    fn clone(&self) -> Self {
        Self {
            core: Rc::clone(&self.core),
        }
    }
}

impl<T: Clone + 'static> super::Readable<T> for Cell<T> {
    fn get(&self) -> Result<T> {
        Cell::get(self)
    }
}

impl<T: Clone + 'static> super::Writable<T> for Cell<T> {
    fn set(&self, value: T) -> Result<()> {
        Cell::set(self, value)
    }
}

impl<T: Clone + 'static> super::Clearable<T> for Cell<T> {
    fn clear(&self) -> Result<()> {
        Cell::clear(self)
    }
}

impl<T: Clone + 'static> fmt::Debug for Cell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slot = self.core.slot.borrow();
        f.debug_struct("Cell")
            .field("cached", &slot.is_some())
            .field(
                "callee_count",
                &slot.as_ref().map(|n| n.callees().len()).unwrap_or(0),
            )
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Core state machine
// ----------------------------------------------------------------------------

impl<T: Clone + 'static> CellCore<T> {
    fn self_node(&self) -> NodeRef {
        NodeRef(self.weak_self.upgrade().expect("live cell has a self reference"))
    }

    fn check_thread(&self) -> Result<()> {
        if Context::current_id() != self.ctx {
            return Err(Error::InvalidThread);
        }
        Ok(())
    }

    fn get(&self) -> Result<T> {
        self.check_thread()?;
        Context::with(|cx| {
            // The read is visible to whichever evaluation is in flight,
            // regardless of how deep in helper calls it happens.
            cx.record(&self.self_node());

            if let Some(nucleus) = self.slot.borrow().as_ref() {
                return Ok(nucleus.value());
            }
            self.evaluate(cx)
        })
    }

    fn evaluate(&self, cx: &Context) -> Result<T> {
        let guard = FrameGuard::push(cx);
        let outcome = (self.expr)();
        let frame = guard.finish();
        // A failed expression leaves the cell uncached with no edges.
        let value = outcome?;

        let self_node = self.self_node();
        let mut callees = Vec::new();
        for callee in frame.into_callees() {
            // Wiring can refuse a callee that is no longer cached (a read
            // whose own evaluation failed and was swallowed, or a reentrant
            // listener teardown). Dropping it keeps edges bidirectional.
            if callee.0.add_caller(&self_node) {
                callees.push(callee);
            }
        }

        debug_assert!(crate::graph::distinct(&callees), "duplicate callee wired");
        *self.slot.borrow_mut() = Some(Nucleus::new(value.clone(), callees.clone()));
        self.emit(&Event::Cached {
            value: value.clone(),
            callees,
        });
        Ok(value)
    }

    fn set(&self, value: T) -> Result<()> {
        self.check_thread()?;
        if Context::is_evaluating() {
            return Err(Error::ForbiddenDuringEvaluation);
        }
        {
            let _quiet = MuteGuard::engage(&self.muted);
            self.invalidate();
            *self.slot.borrow_mut() = Some(Nucleus::new(value.clone(), Vec::new()));
        }
        self.emit(&Event::Set(value));
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.check_thread()?;
        if Context::is_evaluating() {
            return Err(Error::ForbiddenDuringEvaluation);
        }
        {
            let _quiet = MuteGuard::engage(&self.muted);
            self.invalidate();
        }
        self.emit(&Event::Cleared);
        Ok(())
    }

    /// Tear this cell down to uncached, visiting current callers first.
    ///
    /// Caller order is the stored insertion order; each caller is fully
    /// invalidated (depth-first) before the next is visited. No slot borrow
    /// is held across the recursion or across listener callbacks.
    fn invalidate(&self) {
        let callers = match self.slot.borrow().as_ref() {
            None => return,
            Some(nucleus) => nucleus.callers(),
        };

        {
            // Callers tearing themselves down will fire CallerRemoved back
            // at this cell; the silenced scope folds those into the single
            // terminal event emitted below.
            let _quiet = MuteGuard::engage(&self.muted);
            for caller in &callers {
                caller.0.invalidate();
            }
        }

        let callees = match self.slot.borrow().as_ref() {
            // A reentrant listener already tore this cell down.
            None => return,
            Some(nucleus) => nucleus.callees().to_vec(),
        };
        let self_node = self.self_node();
        for callee in &callees {
            callee.0.remove_caller(&self_node);
        }

        *self.slot.borrow_mut() = None;
        self.emit(&Event::Invalidated);
    }

    /// Deliver an event to the listener, unless silenced.
    ///
    /// A panicking listener is logged and ignored; graph state has already
    /// settled by the time any event fires.
    fn emit(&self, event: &Event<T>) {
        if self.muted.get() {
            return;
        }
        let Some(listener) = self.listener.as_ref() else {
            return;
        };
        if panic::catch_unwind(AssertUnwindSafe(|| listener(event))).is_err() {
            warn!(event = event.name(), "cell listener panicked; event dropped");
        }
    }
}

impl<T: Clone + 'static> CellNode for CellCore<T> {
    fn is_cached(&self) -> bool {
        self.slot.borrow().is_some()
    }

    fn callees(&self) -> Option<Vec<NodeRef>> {
        self.slot.borrow().as_ref().map(|n| n.callees().to_vec())
    }

    fn callers(&self) -> Option<Vec<NodeRef>> {
        self.slot.borrow().as_ref().map(|n| n.callers())
    }

    fn add_caller(&self, caller: &NodeRef) -> bool {
        {
            let slot = self.slot.borrow();
            let Some(nucleus) = slot.as_ref() else {
                return false;
            };
            nucleus.add_caller(caller);
        }
        self.emit(&Event::CallerAdded(caller.clone()));
        true
    }

    fn remove_caller(&self, caller: &NodeRef) {
        {
            let slot = self.slot.borrow();
            let Some(nucleus) = slot.as_ref() else {
                return;
            };
            nucleus.remove_caller(caller.key());
        }
        self.emit(&Event::CallerRemoved(caller.clone()));
    }

    fn invalidate(&self) {
        CellCore::invalidate(self);
    }
}

// ----------------------------------------------------------------------------
// Guards
// ----------------------------------------------------------------------------

/// Pops the pushed frame on drop, so the evaluation stack is balanced even
/// when the expression unwinds.
struct FrameGuard<'cx> {
    cx: &'cx Context,
    armed: bool,
}

impl<'cx> FrameGuard<'cx> {
    fn push(cx: &'cx Context) -> Self {
        cx.push_frame();
        Self { cx, armed: true }
    }

    fn finish(mut self) -> Frame {
        self.armed = false;
        self.cx.pop_frame()
    }
}

impl Drop for FrameGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            let _ = self.cx.pop_frame();
        }
    }
}

/// Save-restore suppression of a cell's own listener.
struct MuteGuard<'a> {
    flag: &'a Flag<bool>,
    prev: bool,
}

impl<'a> MuteGuard<'a> {
    fn engage(flag: &'a Flag<bool>) -> Self {
        let prev = flag.replace(true);
        Self { flag, prev }
    }
}

impl Drop for MuteGuard<'_> {
    fn drop(&mut self) {
        self.flag.set(self.prev);
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn counted(value: Rc<Flag<i32>>, count: Rc<Flag<u32>>) -> impl Fn() -> Result<i32> {
        move || {
            count.set(count.get() + 1);
            Ok(value.get())
        }
    }

    #[test]
    fn source_caches_lazily_and_serves_set_values() {
        let cell = Cell::source(5);
        assert!(!cell.is_cached());

        assert_eq!(cell.get().unwrap(), 5);
        assert!(cell.is_cached());

        cell.set(9).unwrap();
        assert_eq!(cell.get().unwrap(), 9);

        cell.clear().unwrap();
        assert!(!cell.is_cached());
        assert_eq!(cell.get().unwrap(), 5);
    }

    #[test]
    fn computed_evaluates_once_until_invalidated() {
        let count = Rc::new(Flag::new(0));
        let value = Rc::new(Flag::new(3));
        let cell = Cell::new(counted(value, count.clone()));

        assert_eq!(cell.get().unwrap(), 3);
        assert_eq!(cell.get().unwrap(), 3);
        assert_eq!(cell.get().unwrap(), 3);
        assert_eq!(count.get(), 1);

        cell.clear().unwrap();
        assert_eq!(cell.get().unwrap(), 3);
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn reads_during_evaluation_become_callees() {
        let a = Cell::source(1);
        let b = Cell::source(2);
        let (a2, b2) = (a.clone(), b.clone());
        let sum = Cell::new(move || Ok(a2.get()? + b2.get()?));

        assert_eq!(sum.get().unwrap(), 3);
        assert_eq!(sum.callees().unwrap(), vec![a.node(), b.node()]);
        assert_eq!(a.callers().unwrap(), vec![sum.node()]);
        assert_eq!(b.callers().unwrap(), vec![sum.node()]);
    }

    #[test]
    fn set_pins_a_computed_cell_until_cleared() {
        let n = Cell::source(1);
        let n2 = n.clone();
        let t = Cell::new(move || Ok(n2.get()? * 10));

        assert_eq!(t.get().unwrap(), 10);
        t.set(99).unwrap();
        assert_eq!(t.callees().unwrap(), Vec::<NodeRef>::new());

        // No edge from n anymore, so changing n does not disturb t.
        n.set(5).unwrap();
        assert!(t.is_cached());
        assert_eq!(t.get().unwrap(), 99);

        t.clear().unwrap();
        assert_eq!(t.get().unwrap(), 50);
    }

    #[test]
    fn failing_expression_leaves_no_trace() {
        let n = Cell::source(1);
        let n2 = n.clone();
        let attempts = Rc::new(Flag::new(0));
        let a2 = attempts.clone();
        let t: Cell<i32> = Cell::new(move || {
            a2.set(a2.get() + 1);
            n2.get()?;
            Err(Error::expression("boom"))
        });

        let err = t.get().unwrap_err();
        assert!(matches!(err, Error::Expression(_)));
        assert!(!t.is_cached());
        assert!(!Context::is_evaluating());
        assert_eq!(attempts.get(), 1);

        // The callee was read and cached, but no edge was installed.
        assert!(n.is_cached());
        assert_eq!(n.callers().unwrap(), Vec::<NodeRef>::new());
    }

    #[test]
    fn swallowed_inner_failure_drops_the_dead_callee() {
        let n = Cell::source(1);
        let n2 = n.clone();
        let broken: Cell<i32> = Cell::new(|| Err(Error::expression("always")));
        let b2 = broken.clone();
        let t = Cell::new(move || {
            let fallback = b2.get().unwrap_or(0);
            Ok(n2.get()? + fallback)
        });

        assert_eq!(t.get().unwrap(), 1);
        assert_eq!(t.callees().unwrap(), vec![n.node()]);
    }

    #[test]
    fn set_and_clear_are_forbidden_during_evaluation() {
        let x = Cell::source(1);
        let y = Cell::source(true);
        let (x2, y2) = (x.clone(), y.clone());
        let z = Cell::new(move || {
            y2.set(false)?;
            Ok(x2.get()? + 1)
        });

        assert!(matches!(
            z.get().unwrap_err(),
            Error::ForbiddenDuringEvaluation
        ));
        assert!(!z.is_cached());
        assert_eq!(y.get().unwrap(), true);
        assert!(!Context::is_evaluating());

        let x3 = x.clone();
        let w = Cell::new(move || {
            x3.clear()?;
            Ok(0)
        });
        assert!(matches!(
            w.get().unwrap_err(),
            Error::ForbiddenDuringEvaluation
        ));
    }

    #[test]
    fn listener_sees_single_terminal_event_per_operation() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let l2 = log.clone();
        let cell = Cell::source_with_listener(4, move |event: &Event<i32>| {
            l2.borrow_mut().push(event.name());
        });

        cell.get().unwrap();
        cell.set(5).unwrap();
        cell.clear().unwrap();

        assert_eq!(*log.borrow(), vec!["cached", "set", "cleared"]);
    }

    #[test]
    fn caller_added_precedes_cached() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let l2 = log.clone();
        let n = Cell::source_with_listener(1, move |event: &Event<i32>| {
            l2.borrow_mut().push(format!("n:{}", event.name()));
        });
        let n2 = n.clone();
        let l3 = log.clone();
        let t = Cell::with_listener(
            move || Ok(n2.get()? + 1),
            move |event: &Event<i32>| {
                l3.borrow_mut().push(format!("t:{}", event.name()));
            },
        );

        t.get().unwrap();
        assert_eq!(*log.borrow(), vec!["n:cached", "n:caller_added", "t:cached"]);
    }

    #[test]
    fn upstream_set_invalidates_callers_depth_first() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let ln = log.clone();
        let n = Cell::source_with_listener(1, move |e: &Event<i32>| {
            ln.borrow_mut().push(format!("n:{}", e.name()));
        });
        let n2 = n.clone();
        let lt = log.clone();
        let t = Cell::with_listener(
            move || Ok(n2.get()? + 1),
            move |e: &Event<i32>| {
                lt.borrow_mut().push(format!("t:{}", e.name()));
            },
        );
        let t2 = t.clone();
        let lu = log.clone();
        let u = Cell::with_listener(
            move || Ok(t2.get()? + 1),
            move |e: &Event<i32>| {
                lu.borrow_mut().push(format!("u:{}", e.name()));
            },
        );

        assert_eq!(u.get().unwrap(), 3);
        log.borrow_mut().clear();

        n.set(10).unwrap();
        // Deepest caller settles first; each mutated cell emits exactly one
        // terminal event.
        assert_eq!(*log.borrow(), vec!["u:invalidated", "t:invalidated", "n:set"]);

        assert!(!t.is_cached());
        assert!(!u.is_cached());
        assert_eq!(u.get().unwrap(), 12);
    }

    #[test]
    fn caller_removed_fires_on_callee_when_caller_invalidates() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let ln = log.clone();
        let n = Cell::source_with_listener(1, move |e: &Event<i32>| {
            ln.borrow_mut().push(e.name());
        });
        let n2 = n.clone();
        let t = Cell::new(move || Ok(n2.get()? + 1));

        t.get().unwrap();
        log.borrow_mut().clear();

        // Tearing down t removes its edge into n while n stays cached.
        t.clear().unwrap();
        assert_eq!(*log.borrow(), vec!["caller_removed"]);
        assert!(n.is_cached());
        assert_eq!(n.callers().unwrap(), Vec::<NodeRef>::new());
    }

    #[test]
    fn panicking_listener_is_contained() {
        let n = Cell::source_with_listener(1, |_e: &Event<i32>| panic!("listener bug"));
        let n2 = n.clone();
        let t = Cell::new(move || Ok(n2.get()? + 1));

        assert_eq!(t.get().unwrap(), 2);
        assert!(n.is_cached());
        assert_eq!(n.callers().unwrap().len(), 1);

        n.set(5).unwrap();
        assert_eq!(t.get().unwrap(), 6);
    }

    #[test]
    fn invalidation_reaches_the_transitive_closure() {
        let a = Cell::source(1);
        let a2 = a.clone();
        let b = Cell::new(move || Ok(a2.get()? + 1));
        let b2 = b.clone();
        let c = Cell::new(move || Ok(b2.get()? + 1));

        assert_eq!(c.get().unwrap(), 3);
        a.set(10).unwrap();

        assert!(a.is_cached());
        assert!(!b.is_cached());
        assert!(!c.is_cached());
        assert_eq!(a.callers().unwrap(), Vec::<NodeRef>::new());
    }
}
