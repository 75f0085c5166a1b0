//! Pooled storage: a growing chain of coalesced-hash bricks.
//!
//! The default backend for most component types. Values live in
//! fixed-size bricks (see [`brick`](crate::brick)); when every brick is
//! full the pool chains a fresh one of equal capacity onto the end, so
//! growth never moves existing values and never surfaces to the caller.
//!
//! Ascending iteration is served by a separate sorted id set rather than
//! by walking the hash structure; the set also makes `singleton` the
//! first id in order, with no cached-pointer invalidation to get wrong.

use std::collections::BTreeSet;

use stratum_core::{Component, Entity, StorageError};

use crate::brick::{Brick, Probe};
use crate::contract::ComponentStorage;

/// Default number of slots per brick.
pub const DEFAULT_BRICK_CAPACITY: usize = 256;

/// Open-addressing pooled storage for one component type.
#[derive(Debug)]
pub struct PoolStorage<T: Component> {
    bricks: Vec<Brick<T>>,
    brick_capacity: usize,
    ids: BTreeSet<Entity>,
}

impl<T: Component> PoolStorage<T> {
    /// Create a pool with the default brick capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_brick_capacity(DEFAULT_BRICK_CAPACITY)
    }

    /// Create a pool whose bricks hold `capacity` slots each.
    ///
    /// Small capacities are valid (and force collision chains early,
    /// which the tests exploit); the minimum is 4 slots.
    #[must_use]
    pub fn with_brick_capacity(capacity: usize) -> Self {
        Self {
            bricks: vec![Brick::with_capacity(capacity)],
            brick_capacity: capacity,
            ids: BTreeSet::new(),
        }
    }

    /// Number of bricks currently chained. Exposed for growth tests.
    #[must_use]
    pub fn brick_count(&self) -> usize {
        self.bricks.len()
    }

    /// Find the (brick, slot) holding an entity's value.
    fn locate(&self, entity: Entity) -> Option<(usize, usize)> {
        for (bi, brick) in self.bricks.iter().enumerate() {
            match brick.probe(entity) {
                Probe::Found(si) => return Some((bi, si)),
                Probe::Absent => return None,
                Probe::ContinueNext => {}
            }
        }
        None
    }

    /// Insert a key known to be absent, growing the brick chain if every
    /// existing brick refuses it.
    fn insert_new(&mut self, entity: Entity, value: T) {
        let mut value = value;
        for brick in &mut self.bricks {
            match brick.insert_new(entity, value, true) {
                Ok(()) => {
                    self.ids.insert(entity);
                    return;
                }
                Err(back) => value = back,
            }
        }
        let mut brick = Brick::with_capacity(self.brick_capacity);
        // A fresh brick always has room for one value.
        if brick.insert_new(entity, value, true).is_err() {
            unreachable!("fresh brick refused an insert");
        }
        self.bricks.push(brick);
        self.ids.insert(entity);
        tracing::debug!(
            bricks = self.bricks.len(),
            component = T::type_name(),
            "pool grew a brick"
        );
    }
}

impl<T: Component> Default for PoolStorage<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Component> ComponentStorage<T> for PoolStorage<T> {
    fn get(&self, entity: Entity) -> Option<&T> {
        let (bi, si) = self.locate(entity)?;
        self.bricks[bi].value(si)
    }

    fn get_mut(&mut self, entity: Entity) -> Option<&mut T> {
        let (bi, si) = self.locate(entity)?;
        self.bricks[bi].value_mut(si)
    }

    fn acquire(&mut self, entity: Entity) -> Result<(&mut T, bool), StorageError> {
        let located = self.locate(entity);
        let (bi, si, existed) = match located {
            Some((bi, si)) => (bi, si, true),
            None => {
                self.insert_new(entity, T::default());
                let (bi, si) = self
                    .locate(entity)
                    .ok_or_else(|| StorageError::not_supported::<T>("pool lost a fresh insert"))?;
                (bi, si, false)
            }
        };
        let value = self.bricks[bi]
            .value_mut(si)
            .ok_or_else(|| StorageError::not_supported::<T>("pool slot resolved but empty"))?;
        Ok((value, existed))
    }

    fn set(&mut self, entity: Entity, value: T) -> Result<(), StorageError> {
        if let Some((bi, si)) = self.locate(entity) {
            if let Some(slot) = self.bricks[bi].value_mut(si) {
                *slot = value;
                return Ok(());
            }
        }
        self.insert_new(entity, value);
        Ok(())
    }

    fn remove(&mut self, entity: Entity) -> bool {
        // Dropping the returned value in place is the disposal hook.
        self.take(entity).is_some()
    }

    fn take(&mut self, entity: Entity) -> Option<T> {
        let mut taken = None;
        for brick in &mut self.bricks {
            match brick.remove(entity) {
                Ok(value) => {
                    taken = value;
                    break;
                }
                Err(()) => {}
            }
        }
        if taken.is_some() {
            self.ids.remove(&entity);
            // The bricks and the sorted id set must agree on occupancy.
            debug_assert_eq!(
                self.bricks.iter().map(Brick::len).sum::<usize>(),
                self.ids.len()
            );
        }
        taken
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
        self.bricks.truncate(1);
        if let Some(brick) = self.bricks.first_mut() {
            brick.clear();
        }
        self.ids.clear();
    }
}
