//! Generic convenience surface over any [`DataLayer`].
//!
//! The erased contract moves values as boxes and borrows them through
//! `dyn Any` closures; this extension trait recovers `T` on the caller's
//! side so embedders write `layer.set(e, Health(50.0))` instead of
//! building vtables by hand. Blanket-implemented for every layer,
//! including `dyn DataLayer` itself.

use stratum_core::{AnyComponent, Component, Entity, StorageError};

use crate::layer::DataLayer;
use crate::vtable::ComponentVtable;

fn identity_mismatch<T: Component>() -> StorageError {
    // Only reachable if a layer routed the type index to a backend of a
    // different Rust type, which is a wiring bug, not a data condition.
    StorageError::not_supported::<T>("layer returned a value of a different type")
}

/// Typed operations over any erased layer.
pub trait LayerExt {
    /// Copy the component out, if present.
    fn try_get<T: Component>(&self, entity: Entity) -> Option<T>;

    /// Borrow the component into a closure, failing with `NotFound` if
    /// absent.
    fn inspect<T: Component, R>(
        &self,
        entity: Entity,
        f: impl FnOnce(&T) -> R,
    ) -> Result<R, StorageError>;

    /// Mutably borrow the component into a closure, failing with
    /// `NotFound` if absent.
    fn update<T: Component, R>(
        &mut self,
        entity: Entity,
        f: impl FnOnce(&mut T) -> R,
    ) -> Result<R, StorageError>;

    /// Get-or-default-create. Returns whether the value already existed.
    fn acquire<T: Component>(&mut self, entity: Entity) -> Result<bool, StorageError>;

    /// Get-or-default-create, then borrow the value into a closure along
    /// with whether it already existed.
    fn acquire_with<T: Component, R>(
        &mut self,
        entity: Entity,
        f: impl FnOnce(&mut T, bool) -> R,
    ) -> Result<R, StorageError>;

    /// Insert or overwrite the component (upsert).
    fn set<T: Component>(&mut self, entity: Entity, value: T) -> Result<(), StorageError>;

    /// Remove the component. `Ok(false)` if the entity had none.
    fn remove<T: Component>(&mut self, entity: Entity) -> Result<bool, StorageError>;

    /// Remove the component and hand the value back.
    fn take<T: Component>(&mut self, entity: Entity) -> Result<Option<T>, StorageError>;

    /// Does the entity hold the component?
    fn contains<T: Component>(&self, entity: Entity) -> bool;

    /// First holder of the type in ascending entity order.
    fn singleton<T: Component>(&self) -> Option<Entity>;

    /// Like [`LayerExt::singleton`] but `NotFound` when no entity holds
    /// the type.
    fn require_singleton<T: Component>(&self) -> Result<Entity, StorageError>;

    /// All holders of the type, ascending, no duplicates.
    fn query<T: Component>(&self) -> Vec<Entity>;

    /// Number of holders of the type.
    fn count<T: Component>(&self) -> usize;

    /// Drop every value of the type.
    fn remove_all<T: Component>(&mut self);

    /// Serialized records for every non-marker component the entity holds.
    fn get_all(&self, entity: Entity) -> Result<Vec<AnyComponent>, StorageError>;
}

impl<L: DataLayer + ?Sized> LayerExt for L {
    fn try_get<T: Component>(&self, entity: Entity) -> Option<T> {
        let vt = ComponentVtable::of::<T>();
        let boxed = self.try_get_any(&vt, entity)?;
        boxed.downcast::<T>().ok().map(|value| *value)
    }

    fn inspect<T: Component, R>(
        &self,
        entity: Entity,
        f: impl FnOnce(&T) -> R,
    ) -> Result<R, StorageError> {
        let vt = ComponentVtable::of::<T>();
        let mut f = Some(f);
        let mut out = None;
        self.inspect_any(&vt, entity, &mut |any| {
            if let (Some(value), Some(f)) = (any.downcast_ref::<T>(), f.take()) {
                out = Some(f(value));
            }
        })?;
        out.ok_or_else(identity_mismatch::<T>)
    }

    fn update<T: Component, R>(
        &mut self,
        entity: Entity,
        f: impl FnOnce(&mut T) -> R,
    ) -> Result<R, StorageError> {
        let vt = ComponentVtable::of::<T>();
        let mut f = Some(f);
        let mut out = None;
        self.update_any(&vt, entity, &mut |any| {
            if let (Some(value), Some(f)) = (any.downcast_mut::<T>(), f.take()) {
                out = Some(f(value));
            }
        })?;
        out.ok_or_else(identity_mismatch::<T>)
    }

    fn acquire<T: Component>(&mut self, entity: Entity) -> Result<bool, StorageError> {
        let vt = ComponentVtable::of::<T>();
        self.acquire_any(&vt, entity)
    }

    fn acquire_with<T: Component, R>(
        &mut self,
        entity: Entity,
        f: impl FnOnce(&mut T, bool) -> R,
    ) -> Result<R, StorageError> {
        let vt = ComponentVtable::of::<T>();
        let mut f = Some(f);
        let mut out = None;
        self.acquire_with_any(&vt, entity, &mut |any, existed| {
            if let (Some(value), Some(f)) = (any.downcast_mut::<T>(), f.take()) {
                out = Some(f(value, existed));
            }
        })?;
        out.ok_or_else(identity_mismatch::<T>)
    }

    fn set<T: Component>(&mut self, entity: Entity, value: T) -> Result<(), StorageError> {
        let vt = ComponentVtable::of::<T>();
        self.set_any(&vt, entity, Box::new(value))
    }

    fn remove<T: Component>(&mut self, entity: Entity) -> Result<bool, StorageError> {
        let vt = ComponentVtable::of::<T>();
        self.remove_any(&vt, entity)
    }

    fn take<T: Component>(&mut self, entity: Entity) -> Result<Option<T>, StorageError> {
        let vt = ComponentVtable::of::<T>();
        let boxed = self.take_any(&vt, entity)?;
        Ok(boxed.and_then(|b| b.downcast::<T>().ok()).map(|b| *b))
    }

    fn contains<T: Component>(&self, entity: Entity) -> bool {
        let vt = ComponentVtable::of::<T>();
        self.contains_any(&vt, entity)
    }

    fn singleton<T: Component>(&self) -> Option<Entity> {
        let vt = ComponentVtable::of::<T>();
        self.singleton_any(&vt)
    }

    fn require_singleton<T: Component>(&self) -> Result<Entity, StorageError> {
        self.singleton::<T>()
            .ok_or_else(|| StorageError::missing(Entity::NIL, T::type_name()))
    }

    fn query<T: Component>(&self) -> Vec<Entity> {
        let vt = ComponentVtable::of::<T>();
        self.entities_any(&vt)
    }

    fn count<T: Component>(&self) -> usize {
        let vt = ComponentVtable::of::<T>();
        self.count_any(&vt)
    }

    fn remove_all<T: Component>(&mut self) {
        let vt = ComponentVtable::of::<T>();
        self.clear_type(&vt);
    }

    fn get_all(&self, entity: Entity) -> Result<Vec<AnyComponent>, StorageError> {
        let mut records = Vec::new();
        self.collect_any(entity, &mut records)?;
        Ok(records)
    }
}
