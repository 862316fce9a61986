//! Fluor Core
//!
//! This crate provides an implicit reactive caching engine: computations
//! declared as a graph of lazily evaluated *cells*, where reading one cell
//! from another's expression silently records a dependency edge. Cached
//! values are invalidated precisely when something they were computed from
//! changes, with no subscriptions and no manual dirty-marking.
//!
//! # Architecture
//!
//! The crate is organized into a few modules:
//!
//! - `reactive`: cells, the per-thread evaluation context, lifecycle
//!   events, proxies, and the keyed cell map
//! - `graph`: the type-erased node surface that dependency edges are made
//!   of, exposed for introspection as [`NodeRef`]
//! - `error`: the failure surface of cell operations
//!
//! # Example
//!
//! ```
//! use fluor_core::{Cell, Result};
//!
//! fn main() -> Result<()> {
//!     let hours = Cell::source(2_u32);
//!     let rate = Cell::source(50_u32);
//!
//!     let (h, r) = (hours.clone(), rate.clone());
//!     let invoice = Cell::new(move || Ok(h.get()? * r.get()?));
//!
//!     assert_eq!(invoice.get()?, 100);
//!
//!     // Changing an input invalidates the invoice; the next read
//!     // recomputes it.
//!     hours.set(3)?;
//!     assert!(!invoice.is_cached());
//!     assert_eq!(invoice.get()?, 150);
//!     Ok(())
//! }
//! ```
//!
//! # Threading
//!
//! Cells are bound to the thread that created them. Disjoint cell sets on
//! different threads evolve independently; no cell can be touched from a
//! foreign thread, which the handle types enforce at compile time by being
//! `!Send`:
//!
//! ```compile_fail
//! use fluor_core::Cell;
//!
//! let cell = Cell::source(1);
//! std::thread::spawn(move || {
//!     let _ = cell.get();
//! });
//! ```

pub mod error;
pub mod graph;
pub mod reactive;

pub use error::{Error, Result};
pub use graph::NodeRef;
pub use reactive::{Cell, CellMap, Clearable, Context, ContextId, Event, Proxy, Readable, Writable};
