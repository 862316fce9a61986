//! Reactive Primitives
//!
//! This module implements the core of the implicit caching engine: cells,
//! the per-thread evaluation context, lifecycle events, and the capability
//! surface.
//!
//! # Concepts
//!
//! ## Cells
//!
//! A [`Cell`] holds a suspended expression and, once read, its cached
//! value. When a cell's expression reads other cells, those reads are
//! detected automatically and recorded as dependencies; there is no
//! subscription API and no manual dirty-marking.
//!
//! ## Invalidation
//!
//! When a cell is set or cleared, every cell whose cached value was
//! computed from it (transitively) is torn down to uncached, depth-first,
//! before the change lands. Re-reading any of them recomputes from the
//! new state.
//!
//! ## Events
//!
//! A cell constructed with a listener reports its lifecycle transitions as
//! [`Event`] values, synchronously, on the owning thread.
//!
//! # Implementation Notes
//!
//! Dependency detection uses a thread-local stack of frames: while a cell
//! evaluates, every `get` on the thread lands in the topmost frame. This
//! approach (sometimes called "automatic dependency tracking" or
//! "transparent reactivity") means helper functions and third-party code
//! between the expression and the read are invisible to the tracker.

mod access;
mod cell;
mod context;
mod event;
mod frame;
mod keyed;
mod nucleus;
mod proxy;

pub use access::{Clearable, Readable, Writable};
pub use cell::Cell;
pub use context::{Context, ContextId};
pub use event::Event;
pub use keyed::CellMap;
pub use proxy::Proxy;
