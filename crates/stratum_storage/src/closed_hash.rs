//! Closed-capacity hash storage: a single brick that never grows.
//!
//! Same coalesced-hash layout as the pool, but with a hard slot budget.
//! Inserting past capacity fails with `NotSupported` instead of chaining
//! a new brick. Useful where the embedder wants a fixed memory ceiling
//! for a type and would rather see the pressure than absorb it.

use std::collections::BTreeSet;

use stratum_core::{Component, Entity, StorageError};

use crate::brick::{Brick, Probe};
use crate::contract::ComponentStorage;

/// Fixed-capacity coalesced-hash storage for one component type.
#[derive(Debug)]
pub struct ClosedHashStorage<T: Component> {
    brick: Brick<T>,
    capacity: usize,
    ids: BTreeSet<Entity>,
}

impl<T: Component> ClosedHashStorage<T> {
    /// Create a storage that holds at most `capacity` values.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            brick: Brick::with_capacity(capacity),
            capacity,
            ids: BTreeSet::new(),
        }
    }

    /// The hard slot budget this storage was built with.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn slot_of(&self, entity: Entity) -> Option<usize> {
        match self.brick.probe(entity) {
            Probe::Found(idx) => Some(idx),
            // Single brick: a continue sentinel cannot occur, chaining is
            // never requested.
            Probe::Absent | Probe::ContinueNext => None,
        }
    }

    fn insert_new(&mut self, entity: Entity, value: T) -> Result<(), StorageError> {
        match self.brick.insert_new(entity, value, false) {
            Ok(()) => {
                self.ids.insert(entity);
                debug_assert_eq!(self.brick.len(), self.ids.len());
                Ok(())
            }
            Err(_) => Err(StorageError::not_supported::<T>(
                "closed hash storage is full",
            )),
        }
    }
}

impl<T: Component> ComponentStorage<T> for ClosedHashStorage<T> {
    fn get(&self, entity: Entity) -> Option<&T> {
        let idx = self.slot_of(entity)?;
        self.brick.value(idx)
    }

    fn get_mut(&mut self, entity: Entity) -> Option<&mut T> {
        let idx = self.slot_of(entity)?;
        self.brick.value_mut(idx)
    }

    fn acquire(&mut self, entity: Entity) -> Result<(&mut T, bool), StorageError> {
        let (idx, existed) = match self.slot_of(entity) {
            Some(idx) => (idx, true),
            None => {
                self.insert_new(entity, T::default())?;
                let idx = self.slot_of(entity).ok_or_else(|| {
                    StorageError::not_supported::<T>("closed hash lost a fresh insert")
                })?;
                (idx, false)
            }
        };
        let value = self
            .brick
            .value_mut(idx)
            .ok_or_else(|| StorageError::not_supported::<T>("closed hash slot resolved but empty"))?;
        Ok((value, existed))
    }

    fn set(&mut self, entity: Entity, value: T) -> Result<(), StorageError> {
        if let Some(idx) = self.slot_of(entity) {
            if let Some(slot) = self.brick.value_mut(idx) {
                *slot = value;
                return Ok(());
            }
        }
        self.insert_new(entity, value)
    }

    fn remove(&mut self, entity: Entity) -> bool {
        self.take(entity).is_some()
    }

    fn take(&mut self, entity: Entity) -> Option<T> {
        match self.brick.remove(entity) {
            Ok(Some(value)) => {
                self.ids.remove(&entity);
                Some(value)
            }
            Ok(None) | Err(()) => None,
        }
    }

    fn contains(&self, entity: Entity) -> bool {
        self.ids.contains(&entity)
    }

    fn singleton(&self) -> Option<Entity> {
        self.ids.first().copied()
    }

    fn entities(&self) -> Box<dyn Iterator<Item = Entity> + '_> {
        Box::new(self.ids.iter().copied())
    }

    fn len(&self) -> usize {
        self.ids.len()
    }

    fn clear(&mut self) {
        self.brick.clear();
        self.ids.clear();
    }
}
