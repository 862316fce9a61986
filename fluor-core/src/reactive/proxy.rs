//! Proxy Cells
//!
//! A proxy implements the capability traits by delegating to user-supplied
//! callbacks. It holds no nucleus and never appears in the dependency
//! graph itself; it exists so a composition can redirect a cell-typed
//! member somewhere else without interposing an extra graph node.
//!
//! Engine cells read *inside* a proxy's getter are tracked normally:
//! dependency detection only asks whether an evaluation is in flight on
//! the thread, not where in the call chain the read happens.

use crate::error::{Error, Result};
use crate::reactive::{Clearable, Readable, Writable};

type Getter<T> = Box<dyn Fn() -> Result<T>>;
type Setter<T> = Box<dyn Fn(T) -> Result<()>>;
type Clearer = Box<dyn Fn() -> Result<()>>;

/// A capability implementation backed by user callbacks.
///
/// The setter and clearer are optional; invoking a missing one fails with
/// [`Error::Unsupported`].
pub struct Proxy<T> {
    getter: Getter<T>,
    setter: Option<Setter<T>>,
    clearer: Option<Clearer>,
}

impl<T> Proxy<T> {
    /// Create a read-only proxy.
    pub fn new(getter: impl Fn() -> Result<T> + 'static) -> Self {
        Self {
            getter: Box::new(getter),
            setter: None,
            clearer: None,
        }
    }

    /// Attach a setter callback.
    pub fn with_setter(mut self, setter: impl Fn(T) -> Result<()> + 'static) -> Self {
        self.setter = Some(Box::new(setter));
        self
    }

    /// Attach a clearer callback.
    pub fn with_clearer(mut self, clearer: impl Fn() -> Result<()> + 'static) -> Self {
        self.clearer = Some(Box::new(clearer));
        self
    }
}

impl<T> Readable<T> for Proxy<T> {
    fn get(&self) -> Result<T> {
        (self.getter)()
    }
}

impl<T> Writable<T> for Proxy<T> {
    fn set(&self, value: T) -> Result<()> {
        match &self.setter {
            Some(setter) => setter(value),
            None => Err(Error::Unsupported),
        }
    }
}

impl<T> Clearable<T> for Proxy<T> {
    fn clear(&self) -> Result<()> {
        match &self.clearer {
            Some(clearer) => clearer(),
            None => Err(Error::Unsupported),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::Cell;

    #[test]
    fn proxy_delegates_to_callbacks() {
        let backing = Cell::source(3);
        let (r, w, c) = (backing.clone(), backing.clone(), backing.clone());
        let proxy = Proxy::new(move || r.get())
            .with_setter(move |v| w.set(v))
            .with_clearer(move || c.clear());

        assert_eq!(proxy.get().unwrap(), 3);
        proxy.set(8).unwrap();
        assert_eq!(backing.get().unwrap(), 8);
        proxy.clear().unwrap();
        assert!(!backing.is_cached());
    }

    #[test]
    fn missing_callbacks_are_unsupported() {
        let proxy = Proxy::new(|| Ok(1));

        assert!(matches!(proxy.set(2).unwrap_err(), Error::Unsupported));
        assert!(matches!(proxy.clear().unwrap_err(), Error::Unsupported));
        assert_eq!(proxy.get().unwrap(), 1);
    }

    #[test]
    fn reads_through_a_proxy_getter_are_tracked() {
        let backing = Cell::source(5);
        let b2 = backing.clone();
        let proxy = std::rc::Rc::new(Proxy::new(move || b2.get()));

        let p2 = proxy.clone();
        let reader = Cell::new(move || Ok(p2.get()? * 2));

        assert_eq!(reader.get().unwrap(), 10);
        // The proxy is invisible; the edge goes straight to the backing cell.
        assert_eq!(reader.callees().unwrap(), vec![backing.node()]);
        assert_eq!(backing.callers().unwrap(), vec![reader.node()]);

        backing.set(7).unwrap();
        assert!(!reader.is_cached());
        assert_eq!(reader.get().unwrap(), 14);
    }
}
