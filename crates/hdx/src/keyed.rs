// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Ordered child collections keyed by a join field
//!
//! Items keep insertion order for serialization while an index gives direct
//! lookup by key. Adding an item whose key already exists merges the new
//! item's fields onto the existing one in place, so side state held by the
//! existing item survives. Mutable access goes through [`ItemMut`] or
//! [`KeyedList::try_for_each_mut`], which rebuild the index afterwards so a
//! renamed item is found under its new key.

use crate::error::{Error, Result};
use crate::merge::Metadata;
use serde_json::Value;
use std::collections::HashMap;
use std::ops::{Deref, DerefMut};

/// A child entity that can live in a [`KeyedList`]
pub trait Keyed {
    /// Join key, `None` when the item has no key yet
    fn key(&self) -> Option<&str>;

    /// Merge `other` onto `self`, keeping `self`'s identity
    fn absorb(&mut self, other: Self);

    /// Deep copy of the item's metadata
    fn snapshot(&self) -> Metadata;
}

#[derive(Debug, Clone)]
pub struct KeyedList<T> {
    items: Vec<T>,
    index: HashMap<String, usize>,
}

impl<T> Default for KeyedList<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<T: Keyed> KeyedList<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&T> {
        self.index.get(key).map(|&i| &self.items[i])
    }

    pub fn get_mut(&mut self, key: &str) -> Option<ItemMut<'_, T>> {
        let position = *self.index.get(key)?;
        Some(ItemMut {
            list: self,
            position,
        })
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    /// Visit every item mutably, stopping at the first error
    pub fn try_for_each_mut<F>(&mut self, f: F) -> Result<()>
    where
        F: FnMut(&mut T) -> Result<()>,
    {
        let outcome = self.items.iter_mut().try_for_each(f);
        self.reindex();
        outcome
    }

    pub fn keys(&self) -> Vec<String> {
        self.items
            .iter()
            .filter_map(|item| item.key().map(str::to_string))
            .collect()
    }

    /// Merge onto the item with the same key, or append. Returns the item
    /// now held by the list.
    pub fn add_or_update(&mut self, item: T) -> Result<&mut T> {
        let key = item
            .key()
            .ok_or_else(|| Error::validation("Cannot add an item without a name to the list!"))?
            .to_string();
        let position = match self.index.get(&key) {
            Some(&i) => {
                self.items[i].absorb(item);
                i
            }
            None => {
                self.items.push(item);
                let i = self.items.len() - 1;
                let _ = self.index.insert(key, i);
                i
            }
        };
        Ok(&mut self.items[position])
    }

    pub fn remove(&mut self, key: &str) -> Option<T> {
        let i = self.index.remove(key)?;
        let item = self.items.remove(i);
        self.reindex();
        Some(item)
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.index.clear();
    }

    /// Empty the list, handing back the items in order
    pub fn take(&mut self) -> Vec<T> {
        self.index.clear();
        std::mem::take(&mut self.items)
    }

    pub fn snapshot(&self) -> Vec<Metadata> {
        self.items.iter().map(Keyed::snapshot).collect()
    }

    /// The items as a JSON array, the shape sent on the wire
    pub fn to_json(&self) -> Value {
        Value::Array(self.snapshot().into_iter().map(Value::Object).collect())
    }

    /// First occurrence wins when a rename produced a clash
    fn reindex(&mut self) {
        self.index.clear();
        for (i, item) in self.items.iter().enumerate() {
            if let Some(key) = item.key() {
                let _ = self.index.entry(key.to_string()).or_insert(i);
            }
        }
    }
}

/// Mutable handle on one item of a [`KeyedList`]; the index follows any
/// key change when the handle is dropped.
pub struct ItemMut<'a, T: Keyed> {
    list: &'a mut KeyedList<T>,
    position: usize,
}

impl<T: Keyed> Deref for ItemMut<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.list.items[self.position]
    }
}

impl<T: Keyed> DerefMut for ItemMut<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.list.items[self.position]
    }
}

impl<T: Keyed> Drop for ItemMut<'_, T> {
    fn drop(&mut self) {
        let stale = match self.list.items[self.position].key() {
            Some(key) => self.list.index.get(key) != Some(&self.position),
            None => true,
        };
        if stale {
            self.list.reindex();
        }
    }
}

impl<'a, T> IntoIterator for &'a KeyedList<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
