//! Keyed collection reconciliation: add/update/delete diffs between an old
//! and a new version of a collection.
//!
//! [`diff`] classifies every element by the key a caller-supplied extractor
//! assigns to it: keys only in the new collection become additions, keys in
//! both with unequal values become updates (carrying the new-side value),
//! keys only in the old collection become deletions (carrying the old-side
//! value). Unchanged elements are dropped.
//!
//! [`batch_crud`] and [`batch_crud_by_key`] drive the diff straight into
//! caller-supplied change handlers, which typically persist each non-empty
//! change set, often through [`crate::batch::BatchExecutor`] when the sets
//! are large.
//!
//! This module is pure and single-threaded; result lists preserve input
//! iteration order (new-collection order for additions and updates,
//! old-collection order for deletions), so diffs over ordered inputs are
//! deterministic.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::hash::Hash;

use crate::error::BoxError;

/// The three disjoint change sets produced by [`diff`].
///
/// An element appears in at most one list. `to_update` holds new-side
/// values; `to_delete` holds old-side values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffResult<T> {
    pub to_add: Vec<T>,
    pub to_update: Vec<T>,
    pub to_delete: Vec<T>,
}

impl<T> DiffResult<T> {
    /// True when any of the three change sets is non-empty.
    pub fn has_changes(&self) -> bool {
        !(self.to_add.is_empty() && self.to_update.is_empty() && self.to_delete.is_empty())
    }
}

/// Compute the add/update/delete sets between `old` and `new`.
///
/// `key_of` maps an element to its identity key; return `None` for elements
/// without an identity; such elements are always treated as additions on
/// the new side and deletions on the old side. Keys are compared by `K`'s
/// equality, element changes by `T`'s equality.
///
/// When two old elements share a key, the earliest-seen one wins; later
/// duplicates are silently dropped (they reach neither `to_update` nor
/// `to_delete`).
pub fn diff<T, K, F>(old: &[T], new: &[T], key_of: F) -> DiffResult<T>
where
    T: Clone + PartialEq,
    K: Eq + Hash,
    F: Fn(&T) -> Option<K>,
{
    // Positional slots keep `to_delete` in old-collection order; the index
    // is consumed destructively as new-side keys match.
    let mut slots: Vec<Option<&T>> = Vec::with_capacity(old.len());
    let mut index: HashMap<K, usize> = HashMap::with_capacity(old.len());
    for (i, o) in old.iter().enumerate() {
        slots.push(Some(o));
        match key_of(o) {
            None => {}
            Some(k) => match index.entry(k) {
                Entry::Vacant(slot) => {
                    slot.insert(i);
                }
                Entry::Occupied(_) => {
                    slots[i] = None;
                }
            },
        }
    }

    let mut to_add = Vec::new();
    let mut to_update = Vec::new();
    for n in new {
        let Some(k) = key_of(n) else {
            to_add.push(n.clone());
            continue;
        };
        match index.remove(&k) {
            None => to_add.push(n.clone()),
            Some(i) => {
                let o = slots[i].take().expect("diff slot consumed twice");
                if n != o {
                    to_update.push(n.clone());
                }
            }
        }
    }

    let to_delete = slots.into_iter().flatten().cloned().collect();
    DiffResult {
        to_add,
        to_update,
        to_delete,
    }
}

type Handler<'h, X> = Box<dyn FnMut(&[X]) -> Result<(), BoxError> + 'h>;

/// Optional callbacks for [`batch_crud`]; absent handlers are skipped.
pub struct ChangeHandlers<'h, T> {
    on_add: Option<Handler<'h, T>>,
    on_update: Option<Handler<'h, T>>,
    on_delete: Option<Handler<'h, T>>,
}

impl<'h, T> ChangeHandlers<'h, T> {
    pub fn new() -> Self {
        Self {
            on_add: None,
            on_update: None,
            on_delete: None,
        }
    }

    pub fn on_add<F>(mut self, f: F) -> Self
    where
        F: FnMut(&[T]) -> Result<(), BoxError> + 'h,
    {
        self.on_add = Some(Box::new(f));
        self
    }

    pub fn on_update<F>(mut self, f: F) -> Self
    where
        F: FnMut(&[T]) -> Result<(), BoxError> + 'h,
    {
        self.on_update = Some(Box::new(f));
        self
    }

    pub fn on_delete<F>(mut self, f: F) -> Self
    where
        F: FnMut(&[T]) -> Result<(), BoxError> + 'h,
    {
        self.on_delete = Some(Box::new(f));
        self
    }
}

impl<T> Default for ChangeHandlers<'_, T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Optional callbacks for [`batch_crud_by_key`]: deletions are reported as
/// keys rather than full values.
pub struct KeyedChangeHandlers<'h, T, K> {
    on_add: Option<Handler<'h, T>>,
    on_update: Option<Handler<'h, T>>,
    on_delete_keys: Option<Handler<'h, K>>,
}

impl<'h, T, K> KeyedChangeHandlers<'h, T, K> {
    pub fn new() -> Self {
        Self {
            on_add: None,
            on_update: None,
            on_delete_keys: None,
        }
    }

    pub fn on_add<F>(mut self, f: F) -> Self
    where
        F: FnMut(&[T]) -> Result<(), BoxError> + 'h,
    {
        self.on_add = Some(Box::new(f));
        self
    }

    pub fn on_update<F>(mut self, f: F) -> Self
    where
        F: FnMut(&[T]) -> Result<(), BoxError> + 'h,
    {
        self.on_update = Some(Box::new(f));
        self
    }

    pub fn on_delete_keys<F>(mut self, f: F) -> Self
    where
        F: FnMut(&[K]) -> Result<(), BoxError> + 'h,
    {
        self.on_delete_keys = Some(Box::new(f));
        self
    }
}

impl<T, K> Default for KeyedChangeHandlers<'_, T, K> {
    fn default() -> Self {
        Self::new()
    }
}

/// Run [`diff`] and invoke each present handler for its non-empty change
/// set.
///
/// Handler errors propagate unmodified and stop further handlers (add, then
/// update, then delete). The computed [`DiffResult`] is returned either way
/// on success.
pub fn batch_crud<T, K, F>(
    old: &[T],
    new: &[T],
    key_of: F,
    mut handlers: ChangeHandlers<'_, T>,
) -> Result<DiffResult<T>, BoxError>
where
    T: Clone + PartialEq,
    K: Eq + Hash,
    F: Fn(&T) -> Option<K>,
{
    let result = diff(old, new, &key_of);
    if !result.to_add.is_empty() {
        if let Some(h) = handlers.on_add.as_mut() {
            h(&result.to_add)?;
        }
    }
    if !result.to_update.is_empty() {
        if let Some(h) = handlers.on_update.as_mut() {
            h(&result.to_update)?;
        }
    }
    if !result.to_delete.is_empty() {
        if let Some(h) = handlers.on_delete.as_mut() {
            h(&result.to_delete)?;
        }
    }
    Ok(result)
}

/// Like [`batch_crud`], but deletions are passed to the handler as keys
/// (letting the caller delete by identity rather than by full value).
///
/// Old-side elements without a key are still deletions, but contribute no
/// key to the handler's input.
pub fn batch_crud_by_key<T, K, F>(
    old: &[T],
    new: &[T],
    key_of: F,
    mut handlers: KeyedChangeHandlers<'_, T, K>,
) -> Result<DiffResult<T>, BoxError>
where
    T: Clone + PartialEq,
    K: Eq + Hash,
    F: Fn(&T) -> Option<K>,
{
    let result = diff(old, new, &key_of);
    if !result.to_add.is_empty() {
        if let Some(h) = handlers.on_add.as_mut() {
            h(&result.to_add)?;
        }
    }
    if !result.to_update.is_empty() {
        if let Some(h) = handlers.on_update.as_mut() {
            h(&result.to_update)?;
        }
    }
    if !result.to_delete.is_empty() {
        if let Some(h) = handlers.on_delete_keys.as_mut() {
            let keys: Vec<K> = result.to_delete.iter().filter_map(&key_of).collect();
            if !keys.is_empty() {
                h(&keys)?;
            }
        }
    }
    Ok(result)
}
