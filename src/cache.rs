// src/cache.rs

//! Insertion-ordered record cache keyed by record id.

use std::collections::HashMap;

use crate::model::Keyed;

/// Records in insertion order with O(1) lookup by key.
///
/// Replacing a record keeps its original position. Removal is O(n).
#[derive(Debug, Clone)]
pub struct RecordCache<T: Keyed> {
    items: Vec<T>,
    index: HashMap<String, usize>,
}

impl<T: Keyed> Default for RecordCache<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<T: Keyed> RecordCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&T> {
        self.index.get(key).map(|&i| &self.items[i])
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut T> {
        match self.index.get(key) {
            Some(&i) => Some(&mut self.items[i]),
            None => None,
        }
    }

    /// Insert or replace; returns the previous record, if any.
    pub fn insert(&mut self, item: T) -> Option<T> {
        match self.index.get(item.key()) {
            Some(&i) => Some(std::mem::replace(&mut self.items[i], item)),
            None => {
                self.index.insert(item.key().to_string(), self.items.len());
                self.items.push(item);
                None
            }
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<T> {
        let i = self.index.remove(key)?;
        let item = self.items.remove(i);
        for slot in self.index.values_mut() {
            if *slot > i {
                *slot -= 1;
            }
        }
        Some(item)
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }
}

impl<T: Keyed> FromIterator<T> for RecordCache<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut cache = Self::new();
        for item in iter {
            cache.insert(item);
        }
        cache
    }
}
