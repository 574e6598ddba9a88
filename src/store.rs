//! Instance stores.
//!
//! Every entity type owns one [`InstanceStore`]: its instances in insertion order, plus an index
//! from key to position so point lookups do not scan.

use crate::{
    schema::{ID_SLOT, Schema},
    value::Value,
};
use std::{collections::HashMap, slice::Iter};

/// One stored record.
///
/// Values are positional, following the declaration order of the entity type's scalars. The key
/// is at position 0.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Instance {
    /// The key, duplicated from `values` for cheap access.
    id: i64,
    /// Every scalar value.
    values: Box<[Value]>,
}

impl Instance {
    /// Create an instance from its scalar values. The value at the key position is overwritten
    /// with `id`.
    pub(crate) fn new(id: i64, mut values: Box<[Value]>) -> Self {
        values[ID_SLOT] = Value::Int(id);
        Self { id, values }
    }

    /// The key.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> i64 {
        self.id
    }

    /// Every scalar value, in declaration order.
    #[inline]
    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// The value at a position obtained from the schema.
    pub(crate) fn value(&self, slot: usize) -> &Value {
        &self.values[slot]
    }
}

/// The instances of one entity type.
#[derive(Clone, Debug, Default)]
pub struct InstanceStore {
    /// Instances in insertion order.
    instances: Vec<Instance>,
    /// Positions in `instances` by key.
    index: HashMap<i64, usize>,
    /// The largest key ever stored.
    max_id: Option<i64>,
}

impl InstanceStore {
    /// The number of instances.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    /// Whether there are no instances.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Instances in insertion order.
    #[inline]
    pub fn iter(&self) -> Iter<'_, Instance> {
        self.instances.iter()
    }

    /// Instances in insertion order.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[Instance] {
        &self.instances
    }

    /// The instance with a given key.
    #[inline]
    #[must_use]
    pub fn get(&self, id: i64) -> Option<&Instance> {
        self.index.get(&id).map(|&position| &self.instances[position])
    }

    /// Whether an instance with a given key exists.
    #[inline]
    #[must_use]
    pub fn contains(&self, id: i64) -> bool {
        self.index.contains_key(&id)
    }

    /// The key the next created instance receives: one more than the largest key so far, or 1 for
    /// an empty store. [`None`] if the key space is exhausted.
    #[inline]
    #[must_use]
    pub fn next_id(&self) -> Option<i64> {
        self.max_id.map_or(Some(1), |max| max.checked_add(1))
    }

    /// Append an instance and return it. The caller must have checked that the key is unused.
    pub(crate) fn push(&mut self, instance: Instance) -> &Instance {
        let id = instance.id();
        debug_assert!(!self.contains(id), "key {id} is already in use");

        let position = self.instances.len();
        self.instances.push(instance);
        let _ = self.index.insert(id, position);
        self.max_id = Some(self.max_id.map_or(id, |max| max.max(id)));

        &self.instances[position]
    }
}

impl<'a> IntoIterator for &'a InstanceStore {
    type Item = &'a Instance;
    type IntoIter = Iter<'a, Instance>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// The instance stores of every entity type of a schema, by schema position.
#[derive(Clone, Debug)]
pub(crate) struct Store {
    /// One store per entity type.
    stores: Box<[InstanceStore]>,
}

impl Store {
    /// Create empty stores for every entity type.
    pub(crate) fn new(schema: &Schema) -> Self {
        Self {
            stores: schema.entities().map(|_| InstanceStore::default()).collect(),
        }
    }

    /// The store at a schema position.
    pub(crate) fn get(&self, index: usize) -> &InstanceStore {
        &self.stores[index]
    }

    /// The store at a schema position.
    pub(crate) fn get_mut(&mut self, index: usize) -> &mut InstanceStore {
        &mut self.stores[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// An instance with a key and one text field.
    fn instance(id: i64, name: &str) -> Instance {
        Instance::new(id, vec![Value::Int(0), name.into()].into())
    }

    /// # Panics
    ///
    /// Panics if keys are not assigned as one more than the largest key so far.
    #[test]
    fn next_id() {
        let mut store = InstanceStore::default();
        assert_eq!(store.next_id(), Some(1));

        let _ = store.push(instance(1, "George Orwell"));
        assert_eq!(store.next_id(), Some(2));

        // Explicit keys may leave gaps; the next key follows the maximum, not the count.
        let _ = store.push(instance(7, "J.K. Rowling"));
        let _ = store.push(instance(3, "Aldous Huxley"));
        assert_eq!(store.len(), 3);
        assert_eq!(store.next_id(), Some(8));

        let _ = store.push(instance(i64::MAX, "Last"));
        assert_eq!(store.next_id(), None);
    }

    /// # Panics
    ///
    /// Panics if lookups or iteration order are wrong.
    #[test]
    fn lookup_and_order() {
        let mut store = InstanceStore::default();
        let pushed = store.push(instance(2, "J.K. Rowling")).clone();
        assert_eq!(pushed.values()[0], Value::Int(2));
        let _ = store.push(instance(1, "George Orwell"));

        assert!(store.contains(1));
        assert!(!store.contains(3));
        assert_eq!(store.get(1).map(Instance::id), Some(1));
        assert!(store.get(3).is_none());

        let order = store.iter().map(Instance::id).collect::<Vec<_>>();
        assert_eq!(order, [2, 1]);
    }
}
