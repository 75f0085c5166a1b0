//! Dense slot-array storage with stable, generation-checked references.
//!
//! Values live contiguously in a slot vector and never move once placed;
//! a sorted index maps entity ids to slots. Freed slots are found by a
//! ring cursor that resumes where the previous search left off, so
//! allocation cost amortizes even under heavy churn.
//!
//! Because slots are reused, a [`ComponentRef`] captures the slot's
//! generation at creation time and refuses to resolve once the slot has
//! been recycled for another entity.

use std::collections::BTreeMap;
use std::marker::PhantomData;

use stratum_core::{Component, Entity, StorageError};

use crate::contract::ComponentStorage;

#[derive(Debug)]
struct DenseSlot<T> {
    value: Option<T>,
    /// Bumped every time the slot is vacated. A `ComponentRef` minted
    /// against an older generation is stale.
    generation: u32,
}

/// Sparse-set style storage: sorted id index over a dense slot array.
#[derive(Debug)]
pub struct DenseStorage<T: Component> {
    index_of: BTreeMap<Entity, u32>,
    slots: Vec<DenseSlot<T>>,
    /// Ring cursor for the free-slot scan.
    cursor: usize,
}

/// Stable handle to one entity's value inside a [`DenseStorage`].
///
/// Cheap to copy and safe to hold across mutations: resolving checks the
/// slot generation, so a handle to a removed (or removed-and-recycled)
/// value yields `None` instead of someone else's data.
pub struct ComponentRef<T: Component> {
    entity: Entity,
    slot: u32,
    generation: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Component> Clone for ComponentRef<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: Component> Copy for ComponentRef<T> {}

impl<T: Component> std::fmt::Debug for ComponentRef<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentRef")
            .field("entity", &self.entity)
            .field("slot", &self.slot)
            .field("generation", &self.generation)
            .finish()
    }
}

impl<T: Component> ComponentRef<T> {
    /// The entity this handle was minted for.
    #[must_use]
    pub fn entity(&self) -> Entity {
        self.entity
    }
}

impl<T: Component> DenseStorage<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            index_of: BTreeMap::new(),
            slots: Vec::new(),
            cursor: 0,
        }
    }

    /// Mint a stable handle to an entity's value, if present.
    #[must_use]
    pub fn reference(&self, entity: Entity) -> Option<ComponentRef<T>> {
        let slot = *self.index_of.get(&entity)?;
        Some(ComponentRef {
            entity,
            slot,
            generation: self.slots[slot as usize].generation,
            _marker: PhantomData,
        })
    }

    /// Returns `true` if the handle still points at its original value.
    #[must_use]
    pub fn is_valid(&self, r: &ComponentRef<T>) -> bool {
        self.slots
            .get(r.slot as usize)
            .is_some_and(|s| s.generation == r.generation && s.value.is_some())
    }

    /// Borrow the value behind a handle, if it is still current.
    #[must_use]
    pub fn resolve(&self, r: &ComponentRef<T>) -> Option<&T> {
        let slot = self.slots.get(r.slot as usize)?;
        if slot.generation != r.generation {
            return None;
        }
        slot.value.as_ref()
    }

    /// Mutably borrow the value behind a handle, if it is still current.
    pub fn resolve_mut(&mut self, r: &ComponentRef<T>) -> Option<&mut T> {
        let slot = self.slots.get_mut(r.slot as usize)?;
        if slot.generation != r.generation {
            return None;
        }
        slot.value.as_mut()
    }

    /// Find a vacant slot, scanning the ring from the cursor, or append.
    fn place(&mut self, value: T) -> u32 {
        let count = self.slots.len();
        for step in 0..count {
            let idx = (self.cursor + step) % count;
            if self.slots[idx].value.is_none() {
                self.slots[idx].value = Some(value);
                self.cursor = (idx + 1) % count;
                return idx as u32;
            }
        }
        self.slots.push(DenseSlot {
            value: Some(value),
            generation: 0,
        });
        self.cursor = 0;
        (self.slots.len() - 1) as u32
    }

    fn vacate(&mut self, slot: u32) -> Option<T> {
        let s = &mut self.slots[slot as usize];
        let value = s.value.take();
        s.generation = s.generation.wrapping_add(1);
        value
    }
}

impl<T: Component> Default for DenseStorage<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Component> ComponentStorage<T> for DenseStorage<T> {
    fn get(&self, entity: Entity) -> Option<&T> {
        let slot = *self.index_of.get(&entity)?;
        self.slots[slot as usize].value.as_ref()
    }

    fn get_mut(&mut self, entity: Entity) -> Option<&mut T> {
        let slot = *self.index_of.get(&entity)?;
        self.slots[slot as usize].value.as_mut()
    }

    fn acquire(&mut self, entity: Entity) -> Result<(&mut T, bool), StorageError> {
        let (slot, existed) = match self.index_of.get(&entity) {
            Some(&slot) => (slot, true),
            None => {
                let slot = self.place(T::default());
                self.index_of.insert(entity, slot);
                (slot, false)
            }
        };
        let value = self.slots[slot as usize]
            .value
            .as_mut()
            .ok_or_else(|| StorageError::not_supported::<T>("dense index points at a hole"))?;
        Ok((value, existed))
    }

    fn set(&mut self, entity: Entity, value: T) -> Result<(), StorageError> {
        match self.index_of.get(&entity) {
            Some(&slot) => self.slots[slot as usize].value = Some(value),
            None => {
                let slot = self.place(value);
                self.index_of.insert(entity, slot);
            }
        }
        Ok(())
    }

    fn remove(&mut self, entity: Entity) -> bool {
        self.take(entity).is_some()
    }

    fn take(&mut self, entity: Entity) -> Option<T> {
        let slot = self.index_of.remove(&entity)?;
        self.vacate(slot)
    }

    fn contains(&self, entity: Entity) -> bool {
        self.index_of.contains_key(&entity)
    }

    fn singleton(&self) -> Option<Entity> {
        self.index_of.keys().next().copied()
    }

    fn entities(&self) -> Box<dyn Iterator<Item = Entity> + '_> {
        Box::new(self.index_of.keys().copied())
    }

    fn len(&self) -> usize {
        self.index_of.len()
    }

    fn clear(&mut self) {
        let slots: Vec<u32> = self.index_of.values().copied().collect();
        for slot in slots {
            self.vacate(slot);
        }
        self.index_of.clear();
        self.cursor = 0;
    }
}
