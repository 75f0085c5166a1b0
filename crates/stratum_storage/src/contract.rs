//! The typed storage contract every backend implements.
//!
//! A [`ComponentStorage<T>`] owns all values of exactly one component type
//! across all entities. The router layers erase this trait behind
//! `DataLayer`; single-threaded embedders can also use a backend directly
//! through the borrow-returning accessors here.

use stratum_core::{Component, Entity, StorageError};

/// Capability contract for a single-component-type storage backend.
///
/// Implementations guarantee that [`entities`](ComponentStorage::entities)
/// iterates entity ids in strictly ascending order with no duplicates —
/// multi-type sorted-merge queries built on top rely on it.
pub trait ComponentStorage<T: Component>: Send + Sync + 'static {
    /// Copy the component out, if present. Never errors.
    fn try_get(&self, entity: Entity) -> Option<T> {
        self.get(entity).cloned()
    }

    /// Borrow the component, if present.
    fn get(&self, entity: Entity) -> Option<&T>;

    /// Mutably borrow the component, if present.
    fn get_mut(&mut self, entity: Entity) -> Option<&mut T>;

    /// Borrow the component, failing with `NotFound` if absent.
    fn inspect(&self, entity: Entity) -> Result<&T, StorageError> {
        self.get(entity)
            .ok_or_else(|| StorageError::not_found::<T>(entity))
    }

    /// Mutably borrow the component, failing with `NotFound` if absent.
    fn require(&mut self, entity: Entity) -> Result<&mut T, StorageError> {
        self.get_mut(entity)
            .ok_or_else(|| StorageError::not_found::<T>(entity))
    }

    /// Get-or-default-construct the component.
    ///
    /// Returns the borrowed value and `true` if it already existed,
    /// `false` if it was created by this call. Fails with `NotSupported`
    /// only where the backend structurally cannot add the value (bound
    /// singleton, full closed brick).
    fn acquire(&mut self, entity: Entity) -> Result<(&mut T, bool), StorageError>;

    /// Insert or overwrite the component (upsert).
    fn set(&mut self, entity: Entity, value: T) -> Result<(), StorageError>;

    /// Remove the component, dropping the value in place.
    ///
    /// Removing a component the entity does not have is a no-op that
    /// returns `false`.
    fn remove(&mut self, entity: Entity) -> bool;

    /// Remove the component and hand the value back.
    fn take(&mut self, entity: Entity) -> Option<T>;

    /// Returns `true` if the entity has the component.
    fn contains(&self, entity: Entity) -> bool {
        self.get(entity).is_some()
    }

    /// The first entity (in ascending id order) holding a value, if any.
    fn singleton(&self) -> Option<Entity>;

    /// All entities holding a value, in strictly ascending id order.
    fn entities(&self) -> Box<dyn Iterator<Item = Entity> + '_>;

    /// Number of entities holding a value.
    fn len(&self) -> usize;

    /// Returns `true` if no entity holds a value.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every stored value. The backend itself stays usable.
    fn clear(&mut self);
}
