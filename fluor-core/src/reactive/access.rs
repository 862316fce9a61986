//! Capability Traits
//!
//! Three nested capability levels expose reactive values without revealing
//! whether an engine-backed cell or a delegating proxy sits behind them.
//! Graph introspection is deliberately *not* part of these traits: code
//! that only needs read/write/clear access accepts proxies and cells
//! interchangeably, and a composition can swap one for the other without
//! breaking its interface.

use crate::error::Result;

/// Read access to a reactive value.
pub trait Readable<T> {
    /// Return the current value. For engine-backed cells this is the
    /// cached value, computed on demand; reads from inside an evaluation
    /// are recorded as dependencies.
    fn get(&self) -> Result<T>;
}

/// Read and write access.
pub trait Writable<T>: Readable<T> {
    /// Assign a value.
    fn set(&self, value: T) -> Result<()>;
}

/// Read, write, and clear access.
pub trait Clearable<T>: Writable<T> {
    /// Drop the current value.
    fn clear(&self) -> Result<()>;
}
