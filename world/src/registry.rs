//! Identifier-keyed storage for live entities.

use std::collections::BTreeMap;

use garden_defence_core::{BulletId, BurrowId, CropId, DropId, FenceId, RabbitId};

/// Identifier type that can be handed out in sequence.
pub(crate) trait SequentialId: Copy + Ord {
    /// First identifier issued by a fresh registry.
    const FIRST: Self;

    /// Identifier issued after `self`.
    fn successor(self) -> Self;
}

macro_rules! sequential {
    ($($id:ty),* $(,)?) => {
        $(
            impl SequentialId for $id {
                const FIRST: Self = <$id>::new(0);

                fn successor(self) -> Self {
                    self.next()
                }
            }
        )*
    };
}

sequential!(BulletId, BurrowId, CropId, DropId, FenceId, RabbitId);

/// Registry that stores live entities and manages identifier allocation.
///
/// Iteration follows identifier order, which is also creation order, so every
/// bulk pass over a registry is deterministic.
#[derive(Debug)]
pub(crate) struct Registry<K, T> {
    entries: BTreeMap<K, T>,
    next_id: K,
}

impl<K: SequentialId, T> Registry<K, T> {
    /// Creates an empty registry with a reset identifier counter.
    pub(crate) fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            next_id: K::FIRST,
        }
    }

    /// Reserves the next identifier.
    pub(crate) fn allocate(&mut self) -> K {
        let id = self.next_id;
        self.next_id = id.successor();
        id
    }

    pub(crate) fn insert(&mut self, id: K, entry: T) {
        let _ = self.entries.insert(id, entry);
    }

    /// Removes an entry. Owners remove before disposing so a second disposal finds nothing.
    pub(crate) fn remove(&mut self, id: K) -> Option<T> {
        self.entries.remove(&id)
    }

    pub(crate) fn get(&self, id: K) -> Option<&T> {
        self.entries.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: K) -> Option<&mut T> {
        self.entries.get_mut(&id)
    }

    /// Snapshot of the live identifiers, for passes that may remove entries.
    pub(crate) fn ids(&self) -> Vec<K> {
        self.entries.keys().copied().collect()
    }

    pub(crate) fn values(&self) -> impl Iterator<Item = &T> {
        self.entries.values()
    }

    /// First identifier whose entry matches `predicate`.
    pub(crate) fn find(&self, mut predicate: impl FnMut(&T) -> bool) -> Option<K> {
        self.entries
            .iter()
            .find(|(_, entry)| predicate(entry))
            .map(|(id, _)| *id)
    }

    /// Empties the registry, yielding the entries in identifier order.
    pub(crate) fn drain(&mut self) -> Vec<T> {
        std::mem::take(&mut self.entries).into_values().collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
