//! Ordered entity result sets.

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::connection::Connection;
use crate::entity::Entity;
use crate::errors::OrmResult;
use crate::common::Value;
use crate::repository::{Criteria, FindOptions, Repository};

/// Ordered result set of hydrated entities.
///
/// # Purpose
/// What `find_all` returns: the entities in result order, plus the
/// unlimited match count when the query asked for one. Also the unit for
/// batched relation preloading across a whole result set.
#[derive(Debug, Clone, Default)]
pub struct EntityCollection<E> {
    items: Vec<E>,
    total: Option<u64>,
}

impl<E> EntityCollection<E> {
    pub fn new() -> Self {
        EntityCollection {
            items: Vec::new(),
            total: None,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn push(&mut self, item: E) {
        self.items.push(item);
    }

    pub fn get(&self, index: usize) -> Option<&E> {
        self.items.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut E> {
        self.items.get_mut(index)
    }

    pub fn first(&self) -> Option<&E> {
        self.items.first()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, E> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, E> {
        self.items.iter_mut()
    }

    pub fn into_vec(self) -> Vec<E> {
        self.items
    }

    /// The unlimited match count, when the originating query counted one.
    pub fn total(&self) -> Option<u64> {
        self.total
    }

    pub fn set_total(&mut self, total: u64) {
        self.total = Some(total);
    }

    /// Projects every entity through `f` into a plain vector.
    pub fn map<T>(&self, f: impl Fn(&E) -> T) -> Vec<T> {
        self.items.iter().map(f).collect()
    }

    /// Builds a key/value map over the collection, in result order.
    /// Later duplicate keys replace earlier ones.
    pub fn pluck<K, V>(&self, key: impl Fn(&E) -> K, value: impl Fn(&E) -> V) -> IndexMap<K, V>
    where
        K: std::hash::Hash + Eq,
    {
        self.items
            .iter()
            .map(|item| (key(item), value(item)))
            .collect()
    }

    /// Applies `f` to every entity in place.
    pub fn walk(&mut self, mut f: impl FnMut(&mut E)) {
        for item in &mut self.items {
            f(item);
        }
    }
}

impl<E: Entity> EntityCollection<E> {
    /// Batch-loads a related entity for every item in the collection.
    ///
    /// # Behavior
    /// Collects the distinct non-null foreign-key values produced by
    /// `foreign_key`, loads the matching related entities in a single
    /// query through `related`, and hands each item its match via
    /// `assign`. Items whose key has no match are left untouched. The
    /// whole collection costs one additional query.
    pub fn preload_with<R, C>(
        &mut self,
        related: &Repository<R, C>,
        foreign_key: impl Fn(&E) -> Value,
        assign: impl Fn(&mut E, R),
    ) -> OrmResult<()>
    where
        R: Entity,
        C: Connection,
    {
        let primary = match related.table().primary_key() {
            Some(primary) => primary.to_string(),
            None => return Ok(()),
        };

        let mut keys: Vec<Value> = Vec::new();
        for item in &self.items {
            let key = foreign_key(item);
            if !key.is_null() && !keys.contains(&key) {
                keys.push(key);
            }
        }
        if keys.is_empty() {
            return Ok(());
        }

        let criteria = Criteria::new().within(&primary, keys);
        let loaded = related.find_all(&criteria, &FindOptions::new())?;

        let mut by_key: HashMap<String, R> = HashMap::new();
        for entity in loaded {
            if let Some(key) = related.table().primary_value(&entity) {
                by_key.insert(key.to_string(), entity);
            }
        }

        for item in &mut self.items {
            let key = foreign_key(item);
            if key.is_null() {
                continue;
            }
            if let Some(found) = by_key.get(&key.to_string()) {
                assign(item, found.clone());
            }
        }
        Ok(())
    }
}

impl<E> IntoIterator for EntityCollection<E> {
    type Item = E;
    type IntoIter = std::vec::IntoIter<E>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a, E> IntoIterator for &'a EntityCollection<E> {
    type Item = &'a E;
    type IntoIter = std::slice::Iter<'a, E>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<'a, E> IntoIterator for &'a mut EntityCollection<E> {
    type Item = &'a mut E;
    type IntoIter = std::slice::IterMut<'a, E>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter_mut()
    }
}

impl<E> FromIterator<E> for EntityCollection<E> {
    fn from_iter<T: IntoIterator<Item = E>>(iter: T) -> Self {
        EntityCollection {
            items: iter.into_iter().collect(),
            total: None,
        }
    }
}
