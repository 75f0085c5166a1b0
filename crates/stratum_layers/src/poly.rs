//! The poly-storage router: one backend per component type, on demand.
//!
//! [`PolyStorage`] maps each component type to its own backend, created
//! lazily by the factory the first time the type is written. Reads and
//! removals of a never-written type do not create a backend; they answer
//! with absence.

use std::any::Any;
use std::collections::HashMap;

use stratum_core::{AnyComponent, Entity, StorageError, TypeIndex};

use crate::factory::{BackendFactory, PoolFactory};
use crate::layer::{BoxedComponent, DataLayer};
use crate::vtable::ComponentVtable;

/// Type-indexed router over lazily created per-type backends.
pub struct PolyStorage<F: BackendFactory = PoolFactory> {
    layers: HashMap<TypeIndex, Box<dyn DataLayer>>,
    factory: F,
}

impl PolyStorage<PoolFactory> {
    /// A router that pools every type.
    #[must_use]
    pub fn new() -> Self {
        Self::with_factory(PoolFactory::new())
    }
}

impl Default for PolyStorage<PoolFactory> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: BackendFactory> PolyStorage<F> {
    /// A router that builds backends with the given factory.
    #[must_use]
    pub fn with_factory(factory: F) -> Self {
        Self {
            layers: HashMap::new(),
            factory,
        }
    }

    /// Number of backends created so far.
    #[must_use]
    pub fn backend_count(&self) -> usize {
        self.layers.len()
    }

    fn backend(&self, vt: &ComponentVtable) -> Option<&dyn DataLayer> {
        self.layers.get(&vt.type_index).map(AsRef::as_ref)
    }

    fn backend_mut(&mut self, vt: &ComponentVtable) -> Option<&mut Box<dyn DataLayer>> {
        self.layers.get_mut(&vt.type_index)
    }

    /// The backend for the type, creating it if the factory allows.
    fn ensure_backend(
        &mut self,
        vt: &ComponentVtable,
    ) -> Result<&mut Box<dyn DataLayer>, StorageError> {
        if !self.layers.contains_key(&vt.type_index) {
            if !self.factory.supports(vt) {
                return Err(StorageError::unsupported_type(
                    vt.type_name,
                    "the backend factory declined this type",
                ));
            }
            tracing::debug!(component = vt.type_name, "creating backend");
            self.layers.insert(vt.type_index, self.factory.build(vt));
        }
        self.backend_mut(vt).ok_or_else(|| {
            StorageError::unsupported_type(vt.type_name, "backend creation did not register")
        })
    }
}

impl<F: BackendFactory> DataLayer for PolyStorage<F> {
    fn supports(&self, vt: &ComponentVtable) -> bool {
        self.layers.contains_key(&vt.type_index) || self.factory.supports(vt)
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
        self.backend(vt)?.try_get_any(vt, entity)
    }

    fn inspect_any(
        &self,
        vt: &ComponentVtable,
        entity: Entity,
        f: &mut dyn FnMut(&(dyn Any + Send + Sync)),
    ) -> Result<(), StorageError> {
        let supported = self.factory.supports(vt);
        match self.backend(vt) {
            Some(layer) => layer.inspect_any(vt, entity, f),
            // An uncreated backend for a supported type reads as absent;
            // a type the factory declines is not wired up at all.
            None if supported => Err(StorageError::missing(entity, vt.type_name)),
            None => Err(StorageError::unsupported_type(
                vt.type_name,
                "the backend factory declined this type",
            )),
        }
    }

    fn update_any(
        &mut self,
        vt: &ComponentVtable,
        entity: Entity,
        f: &mut dyn FnMut(&mut (dyn Any + Send + Sync)),
    ) -> Result<(), StorageError> {
        let supported = self.factory.supports(vt);
        match self.backend_mut(vt) {
            Some(layer) => layer.update_any(vt, entity, f),
            None if supported => Err(StorageError::missing(entity, vt.type_name)),
            None => Err(StorageError::unsupported_type(
                vt.type_name,
                "the backend factory declined this type",
            )),
        }
    }

    fn acquire_any(
        &mut self,
        vt: &ComponentVtable,
        entity: Entity,
    ) -> Result<bool, StorageError> {
        self.ensure_backend(vt)?.acquire_any(vt, entity)
    }

    fn acquire_with_any(
        &mut self,
        vt: &ComponentVtable,
        entity: Entity,
        f: &mut dyn FnMut(&mut (dyn Any + Send + Sync), bool),
    ) -> Result<(), StorageError> {
        self.ensure_backend(vt)?.acquire_with_any(vt, entity, f)
    }

    fn set_any(
        &mut self,
        vt: &ComponentVtable,
        entity: Entity,
        value: BoxedComponent,
    ) -> Result<(), StorageError> {
        self.ensure_backend(vt)?.set_any(vt, entity, value)
    }

    fn remove_any(
        &mut self,
        vt: &ComponentVtable,
        entity: Entity,
    ) -> Result<bool, StorageError> {
        let supported = self.factory.supports(vt);
        match self.backend_mut(vt) {
            Some(layer) => layer.remove_any(vt, entity),
            // No backend means nothing to remove; still distinguish a
            // type the factory would never accept.
            None if supported => Ok(false),
            None => Err(StorageError::unsupported_type(
                vt.type_name,
                "the backend factory declined this type",
            )),
        }
    }

    fn take_any(
        &mut self,
        vt: &ComponentVtable,
        entity: Entity,
    ) -> Result<Option<BoxedComponent>, StorageError> {
        let supported = self.factory.supports(vt);
        match self.backend_mut(vt) {
            Some(layer) => layer.take_any(vt, entity),
            None if supported => Ok(None),
            None => Err(StorageError::unsupported_type(
                vt.type_name,
                "the backend factory declined this type",
            )),
        }
    }

    fn contains_any(&self, vt: &ComponentVtable, entity: Entity) -> bool {
        self.backend(vt)
            .is_some_and(|layer| layer.contains_any(vt, entity))
    }

    fn singleton_any(&self, vt: &ComponentVtable) -> Option<Entity> {
        self.backend(vt)?.singleton_any(vt)
    }

    fn entities_any(&self, vt: &ComponentVtable) -> Vec<Entity> {
        self.backend(vt)
            .map(|layer| layer.entities_any(vt))
            .unwrap_or_default()
    }

    fn count_any(&self, vt: &ComponentVtable) -> usize {
        self.backend(vt).map_or(0, |layer| layer.count_any(vt))
    }

    fn clear_type(&mut self, vt: &ComponentVtable) {
        if let Some(layer) = self.backend_mut(vt) {
            layer.clear_type(vt);
        }
    }

    fn collect_any(
        &self,
        entity: Entity,
        out: &mut Vec<AnyComponent>,
    ) -> Result<(), StorageError> {
        for layer in self.layers.values() {
            layer.collect_any(entity, out)?;
        }
        Ok(())
    }

    fn clear_entity(&mut self, entity: Entity) {
        for layer in self.layers.values_mut() {
            layer.clear_entity(entity);
        }
    }

    fn clear(&mut self) {
        for layer in self.layers.values_mut() {
            layer.clear();
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
