//! Handle tables owned by the context.

use std::collections::HashMap;
use std::hash::Hash;
use std::marker::PhantomData;

/// Hands out monotonically increasing ids, starting at 1.
#[derive(Debug)]
pub(crate) struct IdGenerator<K> {
    last: u64,
    _marker: PhantomData<K>,
}

impl<K: From<u64>> IdGenerator<K> {
    pub(crate) fn new() -> Self {
        Self {
            last: 0,
            _marker: PhantomData,
        }
    }

    pub(crate) fn next_id(&mut self) -> K {
        self.last += 1;
        K::from(self.last)
    }
}

/// Maps opaque handles to the records they stand for.
///
/// Ids are never reused, so a handle removed from the table stays invalid.
#[derive(Debug)]
pub(crate) struct Registry<K, V> {
    ids: IdGenerator<K>,
    entries: HashMap<K, V>,
}

impl<K: Copy + Eq + Hash + From<u64>, V> Registry<K, V> {
    pub(crate) fn new() -> Self {
        Self {
            ids: IdGenerator::new(),
            entries: HashMap::new(),
        }
    }

    /// Reserves the next id without registering anything under it.
    pub(crate) fn allocate(&mut self) -> K {
        self.ids.next_id()
    }

    pub(crate) fn insert(&mut self, id: K, value: V) {
        self.entries.insert(id, value);
    }

    pub(crate) fn get(&self, id: &K) -> Option<&V> {
        self.entries.get(id)
    }

    pub(crate) fn get_mut(&mut self, id: &K) -> Option<&mut V> {
        self.entries.get_mut(id)
    }

    pub(crate) fn remove(&mut self, id: &K) -> Option<V> {
        self.entries.remove(id)
    }

    pub(crate) fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.values()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TransactionId;

    #[test]
    fn ids_increase_and_are_not_reused() {
        let mut registry: Registry<TransactionId, &str> = Registry::new();

        let a = registry.allocate();
        registry.insert(a, "a");
        registry.remove(&a);
        let b = registry.allocate();

        assert_eq!(a, TransactionId::new(1));
        assert_eq!(b, TransactionId::new(2));
        assert!(registry.get(&a).is_none());
    }

    #[test]
    fn allocate_without_insert_skips_id() {
        let mut registry: Registry<TransactionId, u8> = Registry::new();
        let _ = registry.allocate();
        let id = registry.allocate();
        registry.insert(id, 5);

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(&id), Some(&5));
        *registry.get_mut(&id).unwrap() += 1;
        assert_eq!(registry.values().copied().collect::<Vec<_>>(), [6]);
    }
}
