//! Observable maps.
//!
//! Every entry is its own cell, so a reader of one key is not disturbed by
//! writes to another. A keys atom covers the key set: it changes when an
//! entry is added or removed, and it is what a read of a missing key
//! subscribes to, so the reader wakes up once the key appears.

use std::fmt;
use std::hash::Hash;
use std::rc::Rc;
use std::cell::RefCell;

use indexmap::{Equivalent, IndexMap};

use crate::error::Result;
use crate::reactive::{Atom, Observable, Runtime};

struct MapInner<K, V> {
    runtime: Runtime,
    entries: RefCell<IndexMap<K, Observable<V>>>,
    keys: Atom,
}

/// A keyed collection of observable cells, in insertion order.
///
/// Cloning the handle shares the map. Two handles compare equal only if
/// they are the same map.
pub struct ObservableMap<K, V> {
    inner: Rc<MapInner<K, V>>,
}

impl<K, V> Clone for ObservableMap<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<K, V> PartialEq for ObservableMap<K, V> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<K, V> ObservableMap<K, V>
where
    K: Hash + Eq + Clone + 'static,
    V: Clone + PartialEq + 'static,
{
    pub fn new(runtime: &Runtime) -> Self {
        Self::from_iter_in(runtime, std::iter::empty())
    }

    /// Build a map from existing entries without notifying anyone.
    pub fn from_iter_in(runtime: &Runtime, entries: impl IntoIterator<Item = (K, V)>) -> Self {
        let entries = entries
            .into_iter()
            .map(|(key, value)| (key, runtime.cell(value)))
            .collect();

        Self {
            inner: Rc::new(MapInner {
                runtime: runtime.clone(),
                entries: RefCell::new(entries),
                keys: runtime.atom(),
            }),
        }
    }

    pub fn runtime(&self) -> &Runtime {
        &self.inner.runtime
    }

    /// Value under `key`. Tracks that entry, or the key set when the key
    /// is missing.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        Q: ?Sized + Hash + Equivalent<K>,
    {
        match self.cell(key) {
            Some(cell) => Some(cell.get()),
            None => {
                self.inner.keys.report_observed();
                None
            }
        }
    }

    /// The cell under `key`, untracked.
    pub fn cell<Q>(&self, key: &Q) -> Option<Observable<V>>
    where
        Q: ?Sized + Hash + Equivalent<K>,
    {
        self.inner.entries.borrow().get(key).cloned()
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        Q: ?Sized + Hash + Equivalent<K>,
    {
        self.inner.keys.report_observed();
        self.inner.entries.borrow().contains_key(key)
    }

    /// Insert or overwrite. Returns whether anything changed.
    ///
    /// Overwriting goes through the entry's cell, so writing an equal
    /// value notifies nobody and readers of other keys are untouched.
    pub fn insert(&self, key: K, value: V) -> Result<bool> {
        let existing = self.inner.entries.borrow().get(&key).cloned();
        if let Some(cell) = existing {
            return cell.set(value);
        }

        let runtime = &self.inner.runtime;
        runtime.check_write(self.inner.keys.id())?;
        let cell = runtime.cell(value);
        self.inner.entries.borrow_mut().insert(key, cell);
        self.inner.keys.report_changed()?;
        Ok(true)
    }

    /// Remove `key`, returning its last value.
    pub fn remove<Q>(&self, key: &Q) -> Result<Option<V>>
    where
        Q: ?Sized + Hash + Equivalent<K>,
    {
        if !self.inner.entries.borrow().contains_key(key) {
            return Ok(None);
        }

        let runtime = &self.inner.runtime;
        runtime.check_write(self.inner.keys.id())?;

        let _batch = runtime.batch();
        let removed = self.inner.entries.borrow_mut().shift_remove(key);
        let Some(cell) = removed else {
            return Ok(None);
        };
        // Readers of the entry itself see it disappear.
        cell.touch()?;
        self.inner.keys.report_changed()?;
        Ok(Some(cell.get_untracked()))
    }

    /// Keys in insertion order. Tracks the key set.
    pub fn keys(&self) -> Vec<K> {
        self.inner.keys.report_observed();
        self.inner.entries.borrow().keys().cloned().collect()
    }

    /// Tracks the key set.
    pub fn len(&self) -> usize {
        self.inner.keys.report_observed();
        self.inner.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every entry, in insertion order. Tracks the key set and every value.
    pub fn snapshot(&self) -> IndexMap<K, V> {
        self.inner.keys.report_observed();
        let entries: Vec<(K, Observable<V>)> = self
            .inner
            .entries
            .borrow()
            .iter()
            .map(|(key, cell)| (key.clone(), cell.clone()))
            .collect();

        entries
            .into_iter()
            .map(|(key, cell)| (key, cell.get()))
            .collect()
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for ObservableMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.inner.entries.borrow().iter()).finish()
    }
}
