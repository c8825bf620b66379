//! Observable lists.
//!
//! Three levels of tracking:
//!
//! 1. Each element has its own cell; `set(i, ..)` only reaches readers of
//!    that element. A structural operation also touches every cell it moves
//!    or drops, so `get(i)` re-runs only when index `i` is affected.
//! 2. A length cell; `len()` is only invalidated when the length changes.
//!    An indexed read past the end tracks it.
//! 3. A shape atom, changed by every structural operation that changes
//!    something. Whole-list reads (`snapshot`, `iter_cells`) track it.

use std::fmt;
use std::rc::Rc;
use std::cell::RefCell;

use crate::error::{ReactiveError, Result};
use crate::reactive::{Atom, Observable, Runtime};

struct ListInner<T> {
    runtime: Runtime,
    items: RefCell<Vec<Observable<T>>>,
    length: Observable<usize>,
    shape: Atom,
}

/// An ordered list of observable cells.
///
/// Cloning the handle shares the list. Two handles compare equal only if
/// they are the same list.
pub struct ObservableList<T> {
    inner: Rc<ListInner<T>>,
}

impl<T> Clone for ObservableList<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> PartialEq for ObservableList<T> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T: Clone + PartialEq + 'static> ObservableList<T> {
    pub fn new(runtime: &Runtime) -> Self {
        Self::from_iter_in(runtime, std::iter::empty())
    }

    /// Build a list from existing items without notifying anyone.
    pub fn from_iter_in(runtime: &Runtime, items: impl IntoIterator<Item = T>) -> Self {
        let items: Vec<Observable<T>> = items.into_iter().map(|item| runtime.cell(item)).collect();
        let length = runtime.cell(items.len());

        Self {
            inner: Rc::new(ListInner {
                runtime: runtime.clone(),
                items: RefCell::new(items),
                length,
                shape: runtime.atom(),
            }),
        }
    }

    pub fn runtime(&self) -> &Runtime {
        &self.inner.runtime
    }

    /// Number of elements. Tracks the length only.
    pub fn len(&self) -> usize {
        self.inner.length.get()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element at `index`. Tracks that element, or the length when `index`
    /// is out of bounds.
    pub fn get(&self, index: usize) -> Option<T> {
        self.cell(index).map(|cell| cell.get())
    }

    /// The cell currently at `index`. Tracks the length when `index` is out
    /// of bounds; reading the returned cell tracks it.
    pub fn cell(&self, index: usize) -> Option<Observable<T>> {
        let cell = self.inner.items.borrow().get(index).cloned();
        if cell.is_none() {
            self.inner.length.get();
        }
        cell
    }

    /// The current cells, in order. Tracks the shape only; each cell is
    /// tracked when read.
    pub fn iter_cells(&self) -> impl Iterator<Item = Observable<T>> {
        self.inner.shape.report_observed();
        self.inner.items.borrow().clone().into_iter()
    }

    /// Every element, in order. Tracks the shape and every element.
    pub fn snapshot(&self) -> Vec<T> {
        self.inner.shape.report_observed();
        let cells = self.inner.items.borrow().clone();
        cells.iter().map(Observable::get).collect()
    }

    /// Replace the element at `index`. Only readers of that element are
    /// invalidated, and only if the value changed.
    pub fn set(&self, index: usize, value: T) -> Result<bool> {
        let cell = self.inner.items.borrow().get(index).cloned();
        match cell {
            Some(cell) => cell.set(value),
            None => Err(self.out_of_bounds(index)),
        }
    }

    /// Append an element. Only length and shape readers are invalidated.
    pub fn push(&self, value: T) -> Result<()> {
        let cell = self.inner.runtime.cell(value);
        self.restructure(|items| {
            items.push(cell);
            ((), Vec::new())
        })
    }

    /// Remove the last element. A no-op on an empty list.
    pub fn pop(&self) -> Result<Option<T>> {
        self.restructure(|items| match items.pop() {
            Some(cell) => (Some(cell.get_untracked()), vec![cell]),
            None => (None, Vec::new()),
        })
    }

    pub fn insert(&self, index: usize, value: T) -> Result<()> {
        if index > self.inner.items.borrow().len() {
            return Err(self.out_of_bounds(index));
        }
        let cell = self.inner.runtime.cell(value);
        self.restructure(|items| {
            items.insert(index, cell);
            ((), items[index + 1..].to_vec())
        })
    }

    pub fn remove(&self, index: usize) -> Result<T> {
        if index >= self.inner.items.borrow().len() {
            return Err(self.out_of_bounds(index));
        }
        self.restructure(|items| {
            let cell = items.remove(index);
            let mut moved = items[index..].to_vec();
            let value = cell.get_untracked();
            moved.push(cell);
            (value, moved)
        })
    }

    /// Swap two elements. Element cells move with their values; readers
    /// of either index re-run.
    pub fn swap(&self, a: usize, b: usize) -> Result<()> {
        let len = self.inner.items.borrow().len();
        if let Some(index) = [a, b].into_iter().find(|index| *index >= len) {
            return Err(self.out_of_bounds(index));
        }
        if a == b {
            return Ok(());
        }
        self.restructure(|items| {
            items.swap(a, b);
            ((), vec![items[a].clone(), items[b].clone()])
        })
    }

    /// Remove every element. A no-op on an empty list.
    pub fn clear(&self) -> Result<()> {
        self.restructure(|items| ((), std::mem::take(items)))
    }

    /// Replace every element with fresh cells. Replacing an empty list with
    /// nothing is a no-op.
    pub fn replace(&self, values: impl IntoIterator<Item = T>) -> Result<()> {
        let cells: Vec<Observable<T>> = values
            .into_iter()
            .map(|value| self.inner.runtime.cell(value))
            .collect();
        self.restructure(|items| ((), std::mem::replace(items, cells)))
    }

    /// Apply a structural edit that returns the cells it moved or dropped.
    /// Those cells, the length and the shape are published in one batch;
    /// an edit that moved nothing and kept the length publishes nothing.
    fn restructure<R>(
        &self,
        edit: impl FnOnce(&mut Vec<Observable<T>>) -> (R, Vec<Observable<T>>),
    ) -> Result<R> {
        let runtime = &self.inner.runtime;
        runtime.check_write(self.inner.shape.id())?;

        let (result, moved, before, after) = {
            let mut items = self.inner.items.borrow_mut();
            let before = items.len();
            let (result, moved) = edit(&mut items);
            (result, moved, before, items.len())
        };
        if moved.is_empty() && before == after {
            return Ok(result);
        }

        let _batch = runtime.batch();
        for cell in &moved {
            cell.touch()?;
        }
        self.inner.length.set(after)?;
        self.inner.shape.report_changed()?;
        Ok(result)
    }

    fn out_of_bounds(&self, index: usize) -> ReactiveError {
        ReactiveError::IndexOutOfBounds {
            index,
            len: self.inner.items.borrow().len(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for ObservableList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.inner.items.borrow().iter()).finish()
    }
}
