//! Parameterized Cell Map
//!
//! A `CellMap` derives cell identities from keys: `apply` hands out the
//! cell for a key, creating it from the user's keyed getter on first use.
//!
//! The map listens on every child cell it creates. An `Invalidated` or
//! `Cleared` child is *forgotten entirely* (the key disappears from the
//! map), while a `Set` child persists: an explicitly assigned value is
//! deliberate retention. Every other event is forwarded to the user's
//! listener with the key prepended.
//!
//! Iteration yields the currently cached keys in insertion order.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use super::cell::Cell;
use super::event::Event;
use crate::error::Result;

type KeyedGetter<K, V> = Rc<dyn Fn(&K) -> Result<V>>;
type KeyedListener<K, V> = Rc<dyn Fn(&K, &Event<V>)>;

/// A key -> cell store that creates children on demand and self-evicts on
/// invalidation.
pub struct CellMap<K, V> {
    inner: Rc<MapCore<K, V>>,
}

struct MapCore<K, V> {
    getter: KeyedGetter<K, V>,
    listener: Option<KeyedListener<K, V>>,
    /// Insertion-ordered; linear lookup keeps the single borrow short.
    entries: RefCell<Vec<(K, Cell<V>)>>,
}

impl<K, V> CellMap<K, V>
where
    K: Clone + PartialEq + 'static,
    V: Clone + 'static,
{
    /// Create a map whose children evaluate `getter` at their key.
    pub fn new(getter: impl Fn(&K) -> Result<V> + 'static) -> Self {
        Self::build(Rc::new(getter), None)
    }

    /// Like [`CellMap::new`], with a listener receiving each child's
    /// forwarded events alongside its key.
    pub fn with_listener(
        getter: impl Fn(&K) -> Result<V> + 'static,
        listener: impl Fn(&K, &Event<V>) + 'static,
    ) -> Self {
        Self::build(Rc::new(getter), Some(Rc::new(listener)))
    }

    fn build(getter: KeyedGetter<K, V>, listener: Option<KeyedListener<K, V>>) -> Self {
        Self {
            inner: Rc::new(MapCore {
                getter,
                listener,
                entries: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Return the cell for `key`, creating it if absent.
    ///
    /// Creation is eager for the cell and lazy for its value: the child's
    /// expression runs on its first `get`.
    pub fn apply(&self, key: &K) -> Cell<V> {
        if let Some(cell) = self.lookup(key) {
            return cell;
        }

        let expr_key = key.clone();
        let getter = Rc::clone(&self.inner.getter);
        // The child must not keep the map alive, only the map the child.
        let core = Rc::downgrade(&self.inner);
        let event_key = key.clone();
        let cell = Cell::with_listener(
            move || getter(&expr_key),
            move |event| MapCore::on_child_event(&core, &event_key, event),
        );

        self.inner
            .entries
            .borrow_mut()
            .push((key.clone(), cell.clone()));
        cell
    }

    /// Currently cached keys, in insertion order.
    pub fn keys(&self) -> Vec<K> {
        self.inner
            .entries
            .borrow()
            .iter()
            .filter(|(_, cell)| cell.is_cached())
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Number of currently cached keys.
    pub fn len(&self) -> usize {
        self.inner
            .entries
            .borrow()
            .iter()
            .filter(|(_, cell)| cell.is_cached())
            .count()
    }

    /// Whether no key is currently cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `key` is currently cached.
    pub fn contains(&self, key: &K) -> bool {
        self.lookup(key).map(|cell| cell.is_cached()).unwrap_or(false)
    }

    fn lookup(&self, key: &K) -> Option<Cell<V>> {
        self.inner
            .entries
            .borrow()
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, cell)| cell.clone())
    }
}

impl<K, V> MapCore<K, V>
where
    K: Clone + PartialEq + 'static,
    V: Clone + 'static,
{
    fn on_child_event(core: &Weak<MapCore<K, V>>, key: &K, event: &Event<V>) {
        let Some(core) = core.upgrade() else {
            return;
        };
        match event {
            Event::Invalidated | Event::Cleared => core.evict(key),
            other => {
                if let Some(listener) = &core.listener {
                    listener(key, other);
                }
            }
        }
    }

    fn evict(&self, key: &K) {
        self.entries.borrow_mut().retain(|(k, _)| k != key);
    }
}

impl<K, V> Clone for CellMap<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<K: fmt::Debug + Clone + PartialEq + 'static, V: Clone + 'static> fmt::Debug for CellMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CellMap").field("keys", &self.keys()).finish()
    }
}
