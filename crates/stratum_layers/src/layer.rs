//! The erased layer contract and the typed-backend adapter.
//!
//! [`DataLayer`] is the object-safe trait every node of a storage tree
//! implements: typed backends (through [`TypedLayer`]), the poly-storage
//! router, composite trees and the reactive overlay. Values cross the
//! trait as `Box<dyn Any>` or through borrowed-closure entry points; the
//! generic sugar in [`LayerExt`](crate::ext::LayerExt) recovers `T` on the
//! caller's side.

use std::any::Any;
use std::marker::PhantomData;

use stratum_core::{AnyComponent, Component, Entity, StorageError, TypeIndex};
use stratum_storage::ComponentStorage;

use crate::vtable::ComponentVtable;

/// An erased component value in transit.
pub type BoxedComponent = Box<dyn Any + Send + Sync>;

/// Object-safe contract for one node of a storage tree.
///
/// Methods taking a [`ComponentVtable`] address exactly one component
/// type; the rest address whole entities or the whole layer. Routing
/// nodes forward by `vt.type_index`; a node asked about a type it does
/// not own answers `NotSupported` (for fallible operations) or the empty
/// answer (for infallible ones) and never `NotFound`, which is reserved
/// for "the type is owned here but this entity has no value".
pub trait DataLayer: Send + Sync + 'static {
    /// Would this layer accept operations for the type?
    fn supports(&self, vt: &ComponentVtable) -> bool;

    /// Terminal layers own data; routing layers with `false` only forward.
    fn is_terminal(&self) -> bool;

    /// The layer where new values for this tree are created.
    fn find_terminal(&self) -> Option<&dyn DataLayer>;

    /// Mutable variant of [`DataLayer::find_terminal`].
    fn find_terminal_mut(&mut self) -> Option<&mut dyn DataLayer>;

    /// Copy a value out, boxed. `None` if the entity has no value.
    fn try_get_any(&self, vt: &ComponentVtable, entity: Entity) -> Option<BoxedComponent>;

    /// Borrow a value into the closure. `NotFound` if absent.
    fn inspect_any(
        &self,
        vt: &ComponentVtable,
        entity: Entity,
        f: &mut dyn FnMut(&(dyn Any + Send + Sync)),
    ) -> Result<(), StorageError>;

    /// Mutably borrow a value into the closure. `NotFound` if absent.
    fn update_any(
        &mut self,
        vt: &ComponentVtable,
        entity: Entity,
        f: &mut dyn FnMut(&mut (dyn Any + Send + Sync)),
    ) -> Result<(), StorageError>;

    /// Get-or-default-create. Returns whether the value already existed.
    fn acquire_any(&mut self, vt: &ComponentVtable, entity: Entity)
    -> Result<bool, StorageError>;

    /// Get-or-default-create, then mutably borrow the value into the
    /// closure along with whether it already existed. A single operation,
    /// so layers that observe mutations see one acquire, not an acquire
    /// followed by an update.
    fn acquire_with_any(
        &mut self,
        vt: &ComponentVtable,
        entity: Entity,
        f: &mut dyn FnMut(&mut (dyn Any + Send + Sync), bool),
    ) -> Result<(), StorageError>;

    /// Insert or overwrite (upsert).
    fn set_any(
        &mut self,
        vt: &ComponentVtable,
        entity: Entity,
        value: BoxedComponent,
    ) -> Result<(), StorageError>;

    /// Remove, dropping the value. `Ok(false)` if the entity had none.
    fn remove_any(&mut self, vt: &ComponentVtable, entity: Entity)
    -> Result<bool, StorageError>;

    /// Remove and hand the value back. `Ok(None)` if the entity had none.
    fn take_any(
        &mut self,
        vt: &ComponentVtable,
        entity: Entity,
    ) -> Result<Option<BoxedComponent>, StorageError>;

    /// Does the entity hold a value of the type?
    fn contains_any(&self, vt: &ComponentVtable, entity: Entity) -> bool;

    /// First holder of the type in ascending entity order.
    fn singleton_any(&self, vt: &ComponentVtable) -> Option<Entity>;

    /// All holders of the type, ascending, no duplicates.
    fn entities_any(&self, vt: &ComponentVtable) -> Vec<Entity>;

    /// Number of holders of the type.
    fn count_any(&self, vt: &ComponentVtable) -> usize;

    /// Drop every value of the type.
    fn clear_type(&mut self, vt: &ComponentVtable);

    /// Append serialized records for every non-marker value the entity
    /// holds anywhere in this layer.
    fn collect_any(
        &self,
        entity: Entity,
        out: &mut Vec<AnyComponent>,
    ) -> Result<(), StorageError>;

    /// Drop every value the entity holds anywhere in this layer.
    fn clear_entity(&mut self, entity: Entity);

    /// Drop every value of every type.
    fn clear(&mut self);

    /// Downcast access to the concrete layer type.
    fn as_any(&self) -> &dyn Any;

    /// Mutable downcast access.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Adapter giving a typed [`ComponentStorage`] the erased contract.
pub struct TypedLayer<T: Component, S: ComponentStorage<T>> {
    storage: S,
    index: TypeIndex,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Component, S: ComponentStorage<T>> TypedLayer<T, S> {
    #[must_use]
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            index: TypeIndex::of::<T>(),
            _marker: PhantomData,
        }
    }

    /// Borrow the wrapped backend.
    #[must_use]
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Mutably borrow the wrapped backend.
    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    fn owns(&self, vt: &ComponentVtable) -> bool {
        vt.type_index == self.index
    }

    fn reject(&self, vt: &ComponentVtable) -> StorageError {
        StorageError::unsupported_type(vt.type_name, "routed to a layer of a different type")
    }
}

impl<T: Component, S: ComponentStorage<T>> DataLayer for TypedLayer<T, S> {
    fn supports(&self, vt: &ComponentVtable) -> bool {
        self.owns(vt)
    }

    fn is_terminal(&self) -> bool {
        true
    }

    fn find_terminal(&self) -> Option<&dyn DataLayer> {
        Some(self)
    }

    fn find_terminal_mut(&mut self) -> Option<&mut dyn DataLayer> {
        Some(self)
    }

    fn try_get_any(&self, vt: &ComponentVtable, entity: Entity) -> Option<BoxedComponent> {
        if !self.owns(vt) {
            return None;
        }
        self.storage
            .try_get(entity)
            .map(|value| Box::new(value) as BoxedComponent)
    }

    fn inspect_any(
        &self,
        vt: &ComponentVtable,
        entity: Entity,
        f: &mut dyn FnMut(&(dyn Any + Send + Sync)),
    ) -> Result<(), StorageError> {
        if !self.owns(vt) {
            return Err(self.reject(vt));
        }
        let value = self.storage.inspect(entity)?;
        f(value);
        Ok(())
    }

    fn update_any(
        &mut self,
        vt: &ComponentVtable,
        entity: Entity,
        f: &mut dyn FnMut(&mut (dyn Any + Send + Sync)),
    ) -> Result<(), StorageError> {
        if !self.owns(vt) {
            return Err(self.reject(vt));
        }
        let value = self.storage.require(entity)?;
        f(value);
        Ok(())
    }

    fn acquire_any(
        &mut self,
        vt: &ComponentVtable,
        entity: Entity,
    ) -> Result<bool, StorageError> {
        if !self.owns(vt) {
            return Err(self.reject(vt));
        }
        let (_, existed) = self.storage.acquire(entity)?;
        Ok(existed)
    }

    fn acquire_with_any(
        &mut self,
        vt: &ComponentVtable,
        entity: Entity,
        f: &mut dyn FnMut(&mut (dyn Any + Send + Sync), bool),
    ) -> Result<(), StorageError> {
        if !self.owns(vt) {
            return Err(self.reject(vt));
        }
        let (value, existed) = self.storage.acquire(entity)?;
        f(value, existed);
        Ok(())
    }

    fn set_any(
        &mut self,
        vt: &ComponentVtable,
        entity: Entity,
        value: BoxedComponent,
    ) -> Result<(), StorageError> {
        if !self.owns(vt) {
            return Err(self.reject(vt));
        }
        let value = value
            .downcast::<T>()
            .map_err(|_| StorageError::not_supported::<T>("boxed value is of a different type"))?;
        self.storage.set(entity, *value)
    }

    fn remove_any(
        &mut self,
        vt: &ComponentVtable,
        entity: Entity,
    ) -> Result<bool, StorageError> {
        if !self.owns(vt) {
            return Err(self.reject(vt));
        }
        Ok(self.storage.remove(entity))
    }

    fn take_any(
        &mut self,
        vt: &ComponentVtable,
        entity: Entity,
    ) -> Result<Option<BoxedComponent>, StorageError> {
        if !self.owns(vt) {
            return Err(self.reject(vt));
        }
        Ok(self
            .storage
            .take(entity)
            .map(|value| Box::new(value) as BoxedComponent))
    }

    fn contains_any(&self, vt: &ComponentVtable, entity: Entity) -> bool {
        self.owns(vt) && self.storage.contains(entity)
    }

    fn singleton_any(&self, vt: &ComponentVtable) -> Option<Entity> {
        if !self.owns(vt) {
            return None;
        }
        self.storage.singleton()
    }

    fn entities_any(&self, vt: &ComponentVtable) -> Vec<Entity> {
        if !self.owns(vt) {
            return Vec::new();
        }
        self.storage.entities().collect()
    }

    fn count_any(&self, vt: &ComponentVtable) -> usize {
        if self.owns(vt) { self.storage.len() } else { 0 }
    }

    fn clear_type(&mut self, vt: &ComponentVtable) {
        if self.owns(vt) {
            self.storage.clear();
        }
    }

    fn collect_any(
        &self,
        entity: Entity,
        out: &mut Vec<AnyComponent>,
    ) -> Result<(), StorageError> {
        // Markers are tick-transient signals; snapshots skip them.
        if T::IS_MARKER {
            return Ok(());
        }
        if let Some(value) = self.storage.get(entity) {
            let record = AnyComponent::encode(value)
                .map_err(|_| StorageError::not_supported::<T>("value failed to serialize"))?;
            out.push(record);
        }
        Ok(())
    }

    fn clear_entity(&mut self, entity: Entity) {
        self.storage.remove(entity);
    }

    fn clear(&mut self) {
        self.storage.clear();
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stratum_storage::PoolStorage;

    #[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
    struct Speed(u32);

    impl Component for Speed {
        fn type_name() -> &'static str {
            "Speed"
        }
    }

    #[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
    struct Label(String);

    impl Component for Label {
        fn type_name() -> &'static str {
            "Label"
        }
    }

    #[test]
    fn test_erased_roundtrip() {
        let mut layer = TypedLayer::new(PoolStorage::<Speed>::new());
        let vt = ComponentVtable::of::<Speed>();
        let e = Entity::new();
        layer.set_any(&vt, e, Box::new(Speed(3))).unwrap();
        let boxed = layer.try_get_any(&vt, e).unwrap();
        assert_eq!(boxed.downcast_ref::<Speed>(), Some(&Speed(3)));
        assert_eq!(
            layer
                .take_any(&vt, e)
                .unwrap()
                .unwrap()
                .downcast_ref::<Speed>(),
            Some(&Speed(3))
        );
        assert!(!layer.contains_any(&vt, e));
    }

    #[test]
    fn test_wrong_type_is_rejected_not_missing() {
        let mut layer = TypedLayer::new(PoolStorage::<Speed>::new());
        let wrong = ComponentVtable::of::<Label>();
        let e = Entity::new();
        assert!(matches!(
            layer.set_any(&wrong, e, Box::new(Label::default())),
            Err(StorageError::NotSupported { .. })
        ));
        assert!(matches!(
            layer.remove_any(&wrong, e),
            Err(StorageError::NotSupported { .. })
        ));
        assert!(layer.try_get_any(&wrong, e).is_none());
    }

    #[test]
    fn test_update_missing_is_not_found() {
        let mut layer = TypedLayer::new(PoolStorage::<Speed>::new());
        let vt = ComponentVtable::of::<Speed>();
        let result = layer.update_any(&vt, Entity::new(), &mut |_| {});
        assert!(matches!(result, Err(StorageError::NotFound { .. })));
    }

    #[test]
    fn test_collect_skips_markers() {
        use stratum_core::Created;

        let mut speeds = TypedLayer::new(PoolStorage::<Speed>::new());
        let mut marks = TypedLayer::new(PoolStorage::<Created<Speed>>::new());
        let vt = ComponentVtable::of::<Speed>();
        let mvt = ComponentVtable::of_marker::<Created<Speed>>();
        let e = Entity::new();
        speeds.set_any(&vt, e, Box::new(Speed(9))).unwrap();
        marks
            .set_any(&mvt, e, Box::new(Created::<Speed>::new()))
            .unwrap();

        let mut records = Vec::new();
        speeds.collect_any(e, &mut records).unwrap();
        marks.collect_any(e, &mut records).unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].is::<Speed>());
    }
}
