//! In-memory resource store for one entity collection.
//!
//! Holds the latest known list for projects, documents, or messages in the
//! order entities were received or appended (the rendering order). All
//! mutators are pure state transitions — they never fail, they just apply
//! or don't.

use crate::models::Entity;

/// Insertion-ordered id → entity collection.
#[derive(Debug, Clone)]
pub struct ResourceStore<T: Entity> {
    items: Vec<T>,
}

impl<T: Entity> Default for ResourceStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Entity> ResourceStore<T> {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.items.iter().find(|item| item.id() == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    /// Append an entity. If the id is already present the existing entry is
    /// replaced in place instead, keeping its position.
    pub fn insert(&mut self, item: T) {
        match self.items.iter_mut().find(|existing| existing.id() == item.id()) {
            Some(existing) => *existing = item,
            None => self.items.push(item),
        }
    }

    /// Replace the entity with id `match_id` by `value`, keeping its
    /// position. No-op when `match_id` is absent.
    pub fn replace(&mut self, match_id: &str, value: T) {
        if let Some(existing) = self.items.iter_mut().find(|item| item.id() == match_id) {
            *existing = value;
        }
    }

    /// Remove and return the entity with this id, if present.
    pub fn remove(&mut self, id: &str) -> Option<T> {
        let pos = self.items.iter().position(|item| item.id() == id)?;
        Some(self.items.remove(pos))
    }

    /// Apply a partial update to the entity with this id. Returns whether
    /// an entity was found.
    pub fn patch<F: FnOnce(&mut T)>(&mut self, id: &str, f: F) -> bool {
        match self.items.iter_mut().find(|item| item.id() == id) {
            Some(item) => {
                f(item);
                true
            }
            None => false,
        }
    }

    /// Replace the whole collection with an authoritative server listing.
    pub fn set_all(&mut self, items: Vec<T>) {
        self.items = items;
    }

    /// Swap one entity for several in a single mutation: remove `match_id`
    /// and append `values` in their given order, skipping any whose id is
    /// already present. This is the reconciler's commit primitive — at no
    /// point are both the old and the new entities observable.
    pub fn swap(&mut self, match_id: &str, values: Vec<T>) {
        self.items.retain(|item| item.id() != match_id);
        for value in values {
            if !self.contains(value.id()) {
                self.items.push(value);
            }
        }
    }
}
