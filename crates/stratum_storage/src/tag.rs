//! Tag storage: membership only, one shared value.
//!
//! For marker-like components the value carries no per-entity state, so
//! storing a copy per entity is waste. This backend keeps a single shared
//! value and a sorted set of member ids. All accessors hand out the same
//! value regardless of entity; `get_mut` edits it for every member at
//! once, which is exactly what a tag means.

use std::collections::BTreeSet;

use stratum_core::{Component, Entity, StorageError};

use crate::contract::ComponentStorage;

/// Set-membership storage for one component type.
#[derive(Debug, Default)]
pub struct TagStorage<T: Component> {
    value: T,
    ids: BTreeSet<Entity>,
}

impl<T: Component> TagStorage<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            value: T::default(),
            ids: BTreeSet::new(),
        }
    }
}

impl<T: Component> ComponentStorage<T> for TagStorage<T> {
    fn get(&self, entity: Entity) -> Option<&T> {
        self.ids.contains(&entity).then_some(&self.value)
    }

    fn get_mut(&mut self, entity: Entity) -> Option<&mut T> {
        self.ids.contains(&entity).then_some(&mut self.value)
    }

    fn acquire(&mut self, entity: Entity) -> Result<(&mut T, bool), StorageError> {
        let existed = !self.ids.insert(entity);
        Ok((&mut self.value, existed))
    }

    fn set(&mut self, entity: Entity, value: T) -> Result<(), StorageError> {
        // The last write wins for every member; tags have no per-entity
        // payload.
        self.value = value;
        self.ids.insert(entity);
        Ok(())
    }

    fn remove(&mut self, entity: Entity) -> bool {
        self.ids.remove(&entity)
    }

    fn take(&mut self, entity: Entity) -> Option<T> {
        self.ids.remove(&entity).then(|| self.value.clone())
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
        self.ids.clear();
        self.value = T::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
    struct Frozen;

    impl Component for Frozen {
        fn type_name() -> &'static str {
            "Frozen"
        }
    }

    #[test]
    fn test_membership() {
        let mut tags = TagStorage::new();
        let a = Entity::new();
        let b = Entity::new();
        tags.set(a, Frozen).unwrap();
        assert!(tags.contains(a));
        assert!(!tags.contains(b));
        assert_eq!(tags.len(), 1);
        assert!(tags.remove(a));
        assert!(!tags.remove(a));
        assert!(tags.is_empty());
    }

    #[test]
    fn test_acquire_tracks_membership() {
        let mut tags = TagStorage::<Frozen>::new();
        let e = Entity::new();
        let (_, existed) = tags.acquire(e).unwrap();
        assert!(!existed);
        let (_, existed) = tags.acquire(e).unwrap();
        assert!(existed);
    }

    #[test]
    fn test_all_members_share_the_value() {
        #[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
        struct Team(u8);
        impl Component for Team {
            fn type_name() -> &'static str {
                "Team"
            }
        }

        let mut tags = TagStorage::new();
        let a = Entity::new();
        let b = Entity::new();
        tags.set(a, Team(1)).unwrap();
        tags.set(b, Team(2)).unwrap();
        assert_eq!(tags.try_get(a), Some(Team(2)));
        assert_eq!(tags.try_get(b), Some(Team(2)));
    }

    #[test]
    fn test_entities_ascending() {
        let mut tags = TagStorage::new();
        for _ in 0..10 {
            tags.set(Entity::new(), Frozen).unwrap();
        }
        let ids: Vec<Entity> = tags.entities().collect();
        for pair in ids.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }
}
