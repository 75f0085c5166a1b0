//! Composite layer trees with memoized type resolution.
//!
//! A [`CompositeStorage`] holds an ordered list of sublayers and routes
//! each component type to the first sublayer (in attachment order) that
//! supports it. The winning sublayer is memoized per type, so steady-state
//! routing is one concurrent-map hit; any structural change to the
//! sublayer list drops the whole memo and resolution starts over.

use std::any::Any;

use dashmap::DashMap;

use stratum_core::{AnyComponent, Entity, StorageError, TypeIndex};

use crate::layer::{BoxedComponent, DataLayer};
use crate::vtable::ComponentVtable;

/// Identifies one attached sublayer within its composite.
///
/// Ids are handed out by [`CompositeStorage::attach`] and never reused by
/// the same composite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId(u64);

impl LayerId {
    /// Rebuild an id from its raw value (e.g. out of a config file).
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw id value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// An ordered tree node routing types to the first supporting sublayer.
pub struct CompositeStorage {
    sublayers: Vec<(LayerId, Box<dyn DataLayer>)>,
    /// Memoized type-to-sublayer resolution. Cleared wholesale on every
    /// attach/detach; entries are only ever re-derived from scratch.
    resolution: DashMap<TypeIndex, LayerId>,
    next_id: u64,
    terminal: bool,
}

impl CompositeStorage {
    /// An empty, non-terminal composite.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sublayers: Vec::new(),
            resolution: DashMap::new(),
            next_id: 0,
            terminal: false,
        }
    }

    /// Mark this composite as the terminal node of its tree: searches for
    /// a creation target stop here instead of descending further.
    #[must_use]
    pub fn terminal(mut self) -> Self {
        self.terminal = true;
        self
    }

    /// Attach a sublayer at the end of the resolution order.
    pub fn attach(&mut self, layer: Box<dyn DataLayer>) -> LayerId {
        let id = LayerId(self.next_id);
        self.next_id += 1;
        self.sublayers.push((id, layer));
        self.resolution.clear();
        tracing::debug!(layer = id.raw(), "sublayer attached");
        id
    }

    /// Detach a sublayer, handing it back with its data intact.
    pub fn detach(&mut self, id: LayerId) -> Option<Box<dyn DataLayer>> {
        let pos = self.sublayers.iter().position(|(lid, _)| *lid == id)?;
        let (_, layer) = self.sublayers.remove(pos);
        self.resolution.clear();
        tracing::debug!(layer = id.raw(), "sublayer detached");
        Some(layer)
    }

    /// Detach every sublayer.
    pub fn clear_sublayers(&mut self) {
        self.sublayers.clear();
        self.resolution.clear();
    }

    /// Borrow an attached sublayer.
    #[must_use]
    pub fn sublayer(&self, id: LayerId) -> Option<&dyn DataLayer> {
        self.sublayers
            .iter()
            .find(|(lid, _)| *lid == id)
            .map(|(_, layer)| layer.as_ref())
    }

    /// Mutably borrow an attached sublayer.
    pub fn sublayer_mut(&mut self, id: LayerId) -> Option<&mut Box<dyn DataLayer>> {
        self.sublayers
            .iter_mut()
            .find(|(lid, _)| *lid == id)
            .map(|(_, layer)| layer)
    }

    /// Attached sublayer ids in resolution order.
    #[must_use]
    pub fn sublayer_ids(&self) -> Vec<LayerId> {
        self.sublayers.iter().map(|(id, _)| *id).collect()
    }

    /// Number of attached sublayers.
    #[must_use]
    pub fn sublayer_count(&self) -> usize {
        self.sublayers.len()
    }

    /// Position of the sublayer owning the type, memoizing the answer.
    fn resolve(&self, vt: &ComponentVtable) -> Option<usize> {
        if let Some(id) = self.resolution.get(&vt.type_index).map(|entry| *entry) {
            if let Some(pos) = self.sublayers.iter().position(|(lid, _)| *lid == id) {
                return Some(pos);
            }
        }
        let pos = self
            .sublayers
            .iter()
            .position(|(_, layer)| layer.supports(vt))?;
        self.resolution.insert(vt.type_index, self.sublayers[pos].0);
        Some(pos)
    }

    fn owner(&self, vt: &ComponentVtable) -> Option<&dyn DataLayer> {
        let pos = self.resolve(vt)?;
        Some(self.sublayers[pos].1.as_ref())
    }

    fn owner_mut(&mut self, vt: &ComponentVtable) -> Option<&mut Box<dyn DataLayer>> {
        let pos = self.resolve(vt)?;
        Some(&mut self.sublayers[pos].1)
    }

    fn unowned(&self, vt: &ComponentVtable) -> StorageError {
        StorageError::unsupported_type(vt.type_name, "no sublayer supports this type")
    }
}

impl Default for CompositeStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLayer for CompositeStorage {
    fn supports(&self, vt: &ComponentVtable) -> bool {
        self.resolve(vt).is_some()
    }

    fn is_terminal(&self) -> bool {
        self.terminal
    }

    fn find_terminal(&self) -> Option<&dyn DataLayer> {
        if self.terminal {
            return Some(self);
        }
        self.sublayers
            .iter()
            .find_map(|(_, layer)| layer.find_terminal())
    }

    fn find_terminal_mut(&mut self) -> Option<&mut dyn DataLayer> {
        if self.terminal {
            return Some(self);
        }
        self.sublayers
            .iter_mut()
            .find_map(|(_, layer)| layer.find_terminal_mut())
    }

    fn try_get_any(&self, vt: &ComponentVtable, entity: Entity) -> Option<BoxedComponent> {
        self.owner(vt)?.try_get_any(vt, entity)
    }

    fn inspect_any(
        &self,
        vt: &ComponentVtable,
        entity: Entity,
        f: &mut dyn FnMut(&(dyn Any + Send + Sync)),
    ) -> Result<(), StorageError> {
        match self.owner(vt) {
            Some(layer) => layer.inspect_any(vt, entity, f),
            None => Err(self.unowned(vt)),
        }
    }

    fn update_any(
        &mut self,
        vt: &ComponentVtable,
        entity: Entity,
        f: &mut dyn FnMut(&mut (dyn Any + Send + Sync)),
    ) -> Result<(), StorageError> {
        match self.owner_mut(vt) {
            Some(layer) => layer.update_any(vt, entity, f),
            None => Err(self.unowned(vt)),
        }
    }

    fn acquire_any(
        &mut self,
        vt: &ComponentVtable,
        entity: Entity,
    ) -> Result<bool, StorageError> {
        match self.owner_mut(vt) {
            Some(layer) => layer.acquire_any(vt, entity),
            None => Err(self.unowned(vt)),
        }
    }

    fn acquire_with_any(
        &mut self,
        vt: &ComponentVtable,
        entity: Entity,
        f: &mut dyn FnMut(&mut (dyn Any + Send + Sync), bool),
    ) -> Result<(), StorageError> {
        match self.owner_mut(vt) {
            Some(layer) => layer.acquire_with_any(vt, entity, f),
            None => Err(self.unowned(vt)),
        }
    }

    fn set_any(
        &mut self,
        vt: &ComponentVtable,
        entity: Entity,
        value: BoxedComponent,
    ) -> Result<(), StorageError> {
        match self.owner_mut(vt) {
            Some(layer) => layer.set_any(vt, entity, value),
            None => Err(self.unowned(vt)),
        }
    }

    fn remove_any(
        &mut self,
        vt: &ComponentVtable,
        entity: Entity,
    ) -> Result<bool, StorageError> {
        match self.owner_mut(vt) {
            Some(layer) => layer.remove_any(vt, entity),
            None => Err(self.unowned(vt)),
        }
    }

    fn take_any(
        &mut self,
        vt: &ComponentVtable,
        entity: Entity,
    ) -> Result<Option<BoxedComponent>, StorageError> {
        match self.owner_mut(vt) {
            Some(layer) => layer.take_any(vt, entity),
            None => Err(self.unowned(vt)),
        }
    }

    fn contains_any(&self, vt: &ComponentVtable, entity: Entity) -> bool {
        self.owner(vt)
            .is_some_and(|layer| layer.contains_any(vt, entity))
    }

    fn singleton_any(&self, vt: &ComponentVtable) -> Option<Entity> {
        self.owner(vt)?.singleton_any(vt)
    }

    fn entities_any(&self, vt: &ComponentVtable) -> Vec<Entity> {
        self.owner(vt)
            .map(|layer| layer.entities_any(vt))
            .unwrap_or_default()
    }

    fn count_any(&self, vt: &ComponentVtable) -> usize {
        self.owner(vt).map_or(0, |layer| layer.count_any(vt))
    }

    fn clear_type(&mut self, vt: &ComponentVtable) {
        if let Some(layer) = self.owner_mut(vt) {
            layer.clear_type(vt);
        }
    }

    fn collect_any(
        &self,
        entity: Entity,
        out: &mut Vec<AnyComponent>,
    ) -> Result<(), StorageError> {
        for (_, layer) in &self.sublayers {
            layer.collect_any(entity, out)?;
        }
        Ok(())
    }

    fn clear_entity(&mut self, entity: Entity) {
        for (_, layer) in &mut self.sublayers {
            layer.clear_entity(entity);
        }
    }

    fn clear(&mut self) {
        for (_, layer) in &mut self.sublayers {
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
