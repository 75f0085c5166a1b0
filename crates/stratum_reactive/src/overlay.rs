//! The reactive overlay: change tagging as a transparent layer.
//!
//! [`ReactiveStorage`] wraps any layer and records every mutation that
//! passes through it by acquiring marker components in the wrapped layer
//! itself: `Created<T>` when an acquire brings a value into existence,
//! `Modified<T>` on sets, updates and repeat acquires, `Removed<T>` on
//! removal, plus the broadcast `Any*` variants on [`Entity::BROADCAST`].
//! Consumers poll the markers with ordinary queries and sweep them when
//! done.
//!
//! Marker bookkeeping never fails a data operation: if the wrapped layer
//! cannot store a marker type, the mutation still succeeds and the miss
//! is logged. Mutations of marker components themselves are not tagged.

use std::any::Any;

use stratum_core::{AnyComponent, Component, Entity, StorageError};
use stratum_layers::{BoxedComponent, ComponentVtable, DataLayer};

/// Which signal a mutation should leave behind.
#[derive(Debug, Clone, Copy)]
enum Signal {
    Created,
    Modified,
    Removed,
}

/// Layer wrapper that tags mutations with marker components.
pub struct ReactiveStorage {
    inner: Box<dyn DataLayer>,
}

impl ReactiveStorage {
    /// Wrap a layer. All operations forward to it; mutations additionally
    /// acquire markers in it.
    #[must_use]
    pub fn new(inner: Box<dyn DataLayer>) -> Self {
        Self { inner }
    }

    /// Unwrap, handing the layer back with markers intact.
    #[must_use]
    pub fn into_inner(self) -> Box<dyn DataLayer> {
        self.inner
    }

    /// Borrow the wrapped layer.
    #[must_use]
    pub fn inner(&self) -> &dyn DataLayer {
        self.inner.as_ref()
    }

    /// Drop all six marker types for component `T`.
    ///
    /// Typically called once per tick after consumers have reacted.
    pub fn clear_markers<T: Component>(&mut self) {
        let vt = ComponentVtable::of::<T>();
        let Some(markers) = vt.markers else {
            return;
        };
        for ctor in [
            markers.created,
            markers.modified,
            markers.removed,
            markers.any_created,
            markers.any_modified,
            markers.any_removed,
        ] {
            self.inner.clear_type(&ctor());
        }
    }

    fn mark(&mut self, vt: &ComponentVtable, entity: Entity, signal: Signal) {
        if vt.is_marker {
            return;
        }
        let Some(markers) = vt.markers else {
            return;
        };
        let (ctor, any_ctor) = match signal {
            Signal::Created => (markers.created, markers.any_created),
            Signal::Modified => (markers.modified, markers.any_modified),
            Signal::Removed => (markers.removed, markers.any_removed),
        };
        for (target, marker_vt) in [(entity, ctor()), (Entity::BROADCAST, any_ctor())] {
            if let Err(err) = self.inner.acquire_any(&marker_vt, target) {
                tracing::warn!(
                    component = vt.type_name,
                    marker = marker_vt.type_name,
                    %err,
                    "marker could not be recorded"
                );
            }
        }
    }
}

impl DataLayer for ReactiveStorage {
    fn supports(&self, vt: &ComponentVtable) -> bool {
        self.inner.supports(vt)
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
        self.inner.try_get_any(vt, entity)
    }

    fn inspect_any(
        &self,
        vt: &ComponentVtable,
        entity: Entity,
        f: &mut dyn FnMut(&(dyn Any + Send + Sync)),
    ) -> Result<(), StorageError> {
        self.inner.inspect_any(vt, entity, f)
    }

    fn update_any(
        &mut self,
        vt: &ComponentVtable,
        entity: Entity,
        f: &mut dyn FnMut(&mut (dyn Any + Send + Sync)),
    ) -> Result<(), StorageError> {
        self.inner.update_any(vt, entity, f)?;
        self.mark(vt, entity, Signal::Modified);
        Ok(())
    }

    fn acquire_any(
        &mut self,
        vt: &ComponentVtable,
        entity: Entity,
    ) -> Result<bool, StorageError> {
        let existed = self.inner.acquire_any(vt, entity)?;
        let signal = if existed {
            Signal::Modified
        } else {
            Signal::Created
        };
        self.mark(vt, entity, signal);
        Ok(existed)
    }

    fn acquire_with_any(
        &mut self,
        vt: &ComponentVtable,
        entity: Entity,
        f: &mut dyn FnMut(&mut (dyn Any + Send + Sync), bool),
    ) -> Result<(), StorageError> {
        let mut pre_existing = false;
        self.inner.acquire_with_any(vt, entity, &mut |value, existed| {
            pre_existing = existed;
            f(value, existed);
        })?;
        let signal = if pre_existing {
            Signal::Modified
        } else {
            Signal::Created
        };
        self.mark(vt, entity, signal);
        Ok(())
    }

    fn set_any(
        &mut self,
        vt: &ComponentVtable,
        entity: Entity,
        value: BoxedComponent,
    ) -> Result<(), StorageError> {
        // An upsert is always an intent to mutate, even when it brings
        // the value into existence.
        self.inner.set_any(vt, entity, value)?;
        self.mark(vt, entity, Signal::Modified);
        Ok(())
    }

    fn remove_any(
        &mut self,
        vt: &ComponentVtable,
        entity: Entity,
    ) -> Result<bool, StorageError> {
        let removed = self.inner.remove_any(vt, entity)?;
        if removed {
            self.mark(vt, entity, Signal::Removed);
        }
        Ok(removed)
    }

    fn take_any(
        &mut self,
        vt: &ComponentVtable,
        entity: Entity,
    ) -> Result<Option<BoxedComponent>, StorageError> {
        let taken = self.inner.take_any(vt, entity)?;
        if taken.is_some() {
            self.mark(vt, entity, Signal::Removed);
        }
        Ok(taken)
    }

    fn contains_any(&self, vt: &ComponentVtable, entity: Entity) -> bool {
        self.inner.contains_any(vt, entity)
    }

    fn singleton_any(&self, vt: &ComponentVtable) -> Option<Entity> {
        self.inner.singleton_any(vt)
    }

    fn entities_any(&self, vt: &ComponentVtable) -> Vec<Entity> {
        self.inner.entities_any(vt)
    }

    fn count_any(&self, vt: &ComponentVtable) -> usize {
        self.inner.count_any(vt)
    }

    fn clear_type(&mut self, vt: &ComponentVtable) {
        self.inner.clear_type(vt);
    }

    fn collect_any(
        &self,
        entity: Entity,
        out: &mut Vec<AnyComponent>,
    ) -> Result<(), StorageError> {
        self.inner.collect_any(entity, out)
    }

    fn clear_entity(&mut self, entity: Entity) {
        self.inner.clear_entity(entity);
    }

    fn clear(&mut self) {
        self.inner.clear();
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
