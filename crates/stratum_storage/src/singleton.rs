//! Singleton storage: at most one entity may hold the value.
//!
//! For genuinely global state (a world clock, a session descriptor) the
//! backend enforces the cardinality instead of trusting callers. The
//! first entity to write binds the storage; writes for any other entity
//! fail with `NotSupported` until the holder releases it.

use stratum_core::{Component, Entity, StorageError};

use crate::contract::ComponentStorage;

/// Single-holder storage for one component type.
#[derive(Debug, Default)]
pub struct SingletonStorage<T: Component> {
    bound: Option<(Entity, T)>,
}

impl<T: Component> SingletonStorage<T> {
    #[must_use]
    pub fn new() -> Self {
        Self { bound: None }
    }

    fn reject_other(&self, entity: Entity) -> Result<(), StorageError> {
        match &self.bound {
            Some((holder, _)) if *holder != entity => Err(StorageError::not_supported::<T>(
                "singleton is bound to another entity",
            )),
            _ => Ok(()),
        }
    }
}

impl<T: Component> ComponentStorage<T> for SingletonStorage<T> {
    fn get(&self, entity: Entity) -> Option<&T> {
        match &self.bound {
            Some((holder, value)) if *holder == entity => Some(value),
            _ => None,
        }
    }

    fn get_mut(&mut self, entity: Entity) -> Option<&mut T> {
        match &mut self.bound {
            Some((holder, value)) if *holder == entity => Some(value),
            _ => None,
        }
    }

    fn acquire(&mut self, entity: Entity) -> Result<(&mut T, bool), StorageError> {
        self.reject_other(entity)?;
        let existed = self.bound.is_some();
        let (_, value) = self.bound.get_or_insert_with(|| (entity, T::default()));
        Ok((value, existed))
    }

    fn set(&mut self, entity: Entity, value: T) -> Result<(), StorageError> {
        self.reject_other(entity)?;
        self.bound = Some((entity, value));
        Ok(())
    }

    fn remove(&mut self, entity: Entity) -> bool {
        self.take(entity).is_some()
    }

    fn take(&mut self, entity: Entity) -> Option<T> {
        match &self.bound {
            Some((holder, _)) if *holder == entity => self.bound.take().map(|(_, value)| value),
            _ => None,
        }
    }

    fn contains(&self, entity: Entity) -> bool {
        matches!(&self.bound, Some((holder, _)) if *holder == entity)
    }

    fn singleton(&self) -> Option<Entity> {
        self.bound.as_ref().map(|(holder, _)| *holder)
    }

    fn entities(&self) -> Box<dyn Iterator<Item = Entity> + '_> {
        Box::new(self.bound.iter().map(|(holder, _)| *holder))
    }

    fn len(&self) -> usize {
        usize::from(self.bound.is_some())
    }

    fn clear(&mut self) {
        self.bound = None;
    }
}
