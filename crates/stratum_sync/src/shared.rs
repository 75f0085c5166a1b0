//! Thread-safe shared storage trees.
//!
//! [`SharedStorage`] makes a set of sublayers usable from many threads at
//! once, with two separate synchronization regimes:
//!
//! - **Data access** goes through one reader-writer gate for the whole
//!   tree. Reads share it, mutations hold it exclusively. Coarse, but
//!   cross-type operations (`get_all`, `clear_entity`) see a consistent
//!   tree and never deadlock on lock order.
//! - **Membership edits** ([`attach`](SharedStorage::attach) /
//!   [`detach`](SharedStorage::detach)) never touch the gate. The
//!   sublayer list lives behind an atomic snapshot pointer edited
//!   copy-on-write, so attaching a layer does not stall in-flight
//!   per-entity traffic, however long the gate queue is.
//!
//! Every method takes `&self`; wrap the storage in an `Arc` and clone it
//! across threads.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use arc_swap::ArcSwap;
use dashmap::DashMap;
use parking_lot::RwLock;

use stratum_core::{AnyComponent, Component, Entity, StorageError, TypeIndex};
use stratum_layers::{ComponentVtable, DataLayer, LayerExt, LayerId};

/// One attached sublayer.
///
/// The cell makes the boxed layer shareable between snapshot clones while
/// mutation stays possible through `&self` methods of the owner.
struct LayerCell(std::cell::UnsafeCell<Box<dyn DataLayer>>);

// SAFETY: the cell's interior is only ever dereferenced by SharedStorage
// while it holds the gate (shared for `&`, exclusive for `&mut`), or
// after `Arc::try_unwrap` proved sole ownership in `detach`. Membership
// snapshots clone the outer `Arc<LayerCell>` only and never look inside.
unsafe impl Send for LayerCell {}
unsafe impl Sync for LayerCell {}

impl LayerCell {
    fn new(layer: Box<dyn DataLayer>) -> Self {
        Self(std::cell::UnsafeCell::new(layer))
    }

    fn into_inner(self) -> Box<dyn DataLayer> {
        self.0.into_inner()
    }
}

/// Immutable snapshot of the sublayer list, in resolution order.
struct Membership {
    order: Vec<(LayerId, Arc<LayerCell>)>,
}

/// A storage tree shared across threads.
///
/// Component types resolve to the first attached sublayer that supports
/// them, as in `CompositeStorage`; the winning sublayer is memoized per
/// type and the memo is dropped whenever membership changes.
///
/// The closures passed to [`inspect`](SharedStorage::inspect),
/// [`update`](SharedStorage::update) and
/// [`acquire_with`](SharedStorage::acquire_with) run while the gate is
/// held and must not call back into the same storage.
pub struct SharedStorage {
    /// Serializes all access to sublayer interiors.
    gate: RwLock<()>,
    membership: ArcSwap<Membership>,
    resolution: DashMap<TypeIndex, LayerId>,
    next_id: AtomicU64,
}

impl SharedStorage {
    /// An empty shared tree.
    #[must_use]
    pub fn new() -> Self {
        Self {
            gate: RwLock::new(()),
            membership: ArcSwap::from_pointee(Membership { order: Vec::new() }),
            resolution: DashMap::new(),
            next_id: AtomicU64::new(0),
        }
    }

    /// Attach a sublayer at the end of the resolution order.
    ///
    /// Lock-free with respect to data traffic: never blocks on, or
    /// waits for, operations holding the gate.
    pub fn attach(&self, layer: Box<dyn DataLayer>) -> LayerId {
        let id = LayerId::from_raw(self.next_id.fetch_add(1, Ordering::Relaxed));
        let cell = Arc::new(LayerCell::new(layer));
        self.membership.rcu(|current| {
            let mut order = current.order.clone();
            order.push((id, Arc::clone(&cell)));
            Membership { order }
        });
        self.resolution.clear();
        tracing::debug!(layer = id.raw(), "sublayer attached");
        id
    }

    /// Detach a sublayer, handing it back with its data intact.
    ///
    /// The membership edit itself is lock-free; reclaiming the layer then
    /// waits (yielding) for operations still running against the old
    /// snapshot to finish.
    pub fn detach(&self, id: LayerId) -> Option<Box<dyn DataLayer>> {
        let mut removed = None;
        self.membership.rcu(|current| {
            removed = None;
            let mut order = current.order.clone();
            if let Some(pos) = order.iter().position(|(lid, _)| *lid == id) {
                removed = Some(order.remove(pos).1);
            }
            Membership { order }
        });
        self.resolution.clear();
        let mut cell = removed?;
        let cell = loop {
            match Arc::try_unwrap(cell) {
                Ok(sole) => break sole,
                Err(shared) => {
                    cell = shared;
                    std::thread::yield_now();
                }
            }
        };
        tracing::debug!(layer = id.raw(), "sublayer detached");
        Some(cell.into_inner())
    }

    /// Attached sublayer ids in resolution order.
    #[must_use]
    pub fn sublayer_ids(&self) -> Vec<LayerId> {
        self.membership
            .load()
            .order
            .iter()
            .map(|(id, _)| *id)
            .collect()
    }

    /// Number of attached sublayers.
    #[must_use]
    pub fn sublayer_count(&self) -> usize {
        self.membership.load().order.len()
    }

    /// The cell owning the type within a snapshot, resolving and
    /// memoizing on miss.
    ///
    /// Caller must hold the gate: `supports` reads sublayer interiors.
    fn resolve<'a>(
        &self,
        membership: &'a Membership,
        vt: &ComponentVtable,
    ) -> Option<&'a Arc<LayerCell>> {
        if let Some(id) = self.resolution.get(&vt.type_index).map(|entry| *entry) {
            if let Some((_, cell)) = membership.order.iter().find(|(lid, _)| *lid == id) {
                return Some(cell);
            }
        }
        let (id, cell) = membership.order.iter().find(|(_, cell)| {
            // SAFETY: gate held by the caller (see doc above).
            let layer = unsafe { &**cell.0.get() };
            layer.supports(vt)
        })?;
        self.resolution.insert(vt.type_index, *id);
        Some(cell)
    }

    /// Run a read closure against the sublayer owning the type.
    fn read_with<R>(
        &self,
        vt: &ComponentVtable,
        f: impl FnOnce(&dyn DataLayer) -> R,
    ) -> Option<R> {
        let membership = self.membership.load();
        let _shared = self.gate.read();
        let cell = self.resolve(&membership, vt)?;
        // SAFETY: the gate is held shared; all mutation paths hold it
        // exclusively, so the interior cannot be aliased mutably.
        let layer = unsafe { &**cell.0.get() };
        Some(f(layer))
    }

    /// Run a write closure against the sublayer owning the type.
    fn write_with<R>(
        &self,
        vt: &ComponentVtable,
        f: impl FnOnce(&mut dyn DataLayer) -> R,
    ) -> Result<R, StorageError> {
        let membership = self.membership.load();
        let _exclusive = self.gate.write();
        let cell = self.resolve(&membership, vt).ok_or_else(|| {
            StorageError::unsupported_type(vt.type_name, "no sublayer supports this type")
        })?;
        // SAFETY: the gate is held exclusively; no other reference to any
        // sublayer interior exists while it is.
        let layer = unsafe { &mut **cell.0.get() };
        Ok(f(layer))
    }

    /// Copy the component out, if present.
    #[must_use]
    pub fn try_get<T: Component>(&self, entity: Entity) -> Option<T> {
        let vt = ComponentVtable::of::<T>();
        self.read_with(&vt, |layer| layer.try_get::<T>(entity))?
    }

    /// Borrow the component into a closure, failing with `NotFound` if
    /// absent.
    pub fn inspect<T: Component, R>(
        &self,
        entity: Entity,
        f: impl FnOnce(&T) -> R,
    ) -> Result<R, StorageError> {
        let vt = ComponentVtable::of::<T>();
        self.read_with(&vt, |layer| layer.inspect(entity, f))
            .unwrap_or_else(|| Err(StorageError::missing(entity, vt.type_name)))
    }

    /// Mutably borrow the component into a closure, failing with
    /// `NotFound` if absent. The whole closure runs under one exclusive
    /// hold of the gate, so read-modify-write through it is atomic.
    pub fn update<T: Component, R>(
        &self,
        entity: Entity,
        f: impl FnOnce(&mut T) -> R,
    ) -> Result<R, StorageError> {
        let vt = ComponentVtable::of::<T>();
        self.write_with(&vt, |layer| layer.update(entity, f))?
    }

    /// Get-or-default-create. Returns whether the value already existed.
    pub fn acquire<T: Component>(&self, entity: Entity) -> Result<bool, StorageError> {
        let vt = ComponentVtable::of::<T>();
        self.write_with(&vt, |layer| layer.acquire::<T>(entity))?
    }

    /// Get-or-default-create, then borrow the value into a closure along
    /// with whether it already existed, atomically.
    pub fn acquire_with<T: Component, R>(
        &self,
        entity: Entity,
        f: impl FnOnce(&mut T, bool) -> R,
    ) -> Result<R, StorageError> {
        let vt = ComponentVtable::of::<T>();
        self.write_with(&vt, |layer| layer.acquire_with(entity, f))?
    }

    /// Insert or overwrite the component (upsert).
    pub fn set<T: Component>(&self, entity: Entity, value: T) -> Result<(), StorageError> {
        let vt = ComponentVtable::of::<T>();
        self.write_with(&vt, |layer| layer.set(entity, value))?
    }

    /// Remove the component. `Ok(false)` if the entity had none.
    pub fn remove<T: Component>(&self, entity: Entity) -> Result<bool, StorageError> {
        let vt = ComponentVtable::of::<T>();
        self.write_with(&vt, |layer| layer.remove::<T>(entity))?
    }

    /// Remove the component and hand the value back.
    pub fn take<T: Component>(&self, entity: Entity) -> Result<Option<T>, StorageError> {
        let vt = ComponentVtable::of::<T>();
        self.write_with(&vt, |layer| layer.take::<T>(entity))?
    }

    /// Does the entity hold the component?
    #[must_use]
    pub fn contains<T: Component>(&self, entity: Entity) -> bool {
        let vt = ComponentVtable::of::<T>();
        self.read_with(&vt, |layer| layer.contains::<T>(entity))
            .unwrap_or(false)
    }

    /// First holder of the type in ascending entity order.
    #[must_use]
    pub fn singleton<T: Component>(&self) -> Option<Entity> {
        let vt = ComponentVtable::of::<T>();
        self.read_with(&vt, |layer| layer.singleton::<T>())?
    }

    /// Like [`SharedStorage::singleton`] but `NotFound` when no entity
    /// holds the type.
    pub fn require_singleton<T: Component>(&self) -> Result<Entity, StorageError> {
        self.singleton::<T>()
            .ok_or_else(|| StorageError::missing(Entity::NIL, T::type_name()))
    }

    /// All holders of the type, ascending, no duplicates.
    #[must_use]
    pub fn query<T: Component>(&self) -> Vec<Entity> {
        let vt = ComponentVtable::of::<T>();
        self.read_with(&vt, |layer| layer.query::<T>())
            .unwrap_or_default()
    }

    /// Number of holders of the type.
    #[must_use]
    pub fn count<T: Component>(&self) -> usize {
        let vt = ComponentVtable::of::<T>();
        self.read_with(&vt, |layer| layer.count::<T>()).unwrap_or(0)
    }

    /// Drop every value of the type.
    pub fn remove_all<T: Component>(&self) {
        let vt = ComponentVtable::of::<T>();
        let _ = self.write_with(&vt, |layer| layer.remove_all::<T>());
    }

    /// Serialized records for every non-marker component the entity holds
    /// in any sublayer, under one consistent view of the tree.
    pub fn get_all(&self, entity: Entity) -> Result<Vec<AnyComponent>, StorageError> {
        let membership = self.membership.load();
        let _shared = self.gate.read();
        let mut records = Vec::new();
        for (_, cell) in &membership.order {
            // SAFETY: gate held shared, as in `read_with`.
            let layer = unsafe { &**cell.0.get() };
            layer.collect_any(entity, &mut records)?;
        }
        Ok(records)
    }

    /// Drop every value the entity holds in any sublayer.
    pub fn clear_entity(&self, entity: Entity) {
        let membership = self.membership.load();
        let _exclusive = self.gate.write();
        for (_, cell) in &membership.order {
            // SAFETY: gate held exclusively, as in `write_with`.
            let layer = unsafe { &mut **cell.0.get() };
            layer.clear_entity(entity);
        }
    }

    /// Drop every value of every type in every sublayer.
    pub fn clear(&self) {
        let membership = self.membership.load();
        let _exclusive = self.gate.write();
        for (_, cell) in &membership.order {
            // SAFETY: gate held exclusively, as in `write_with`.
            let layer = unsafe { &mut **cell.0.get() };
            layer.clear();
        }
    }
}

impl Default for SharedStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stratum_layers::PolyStorage;

    #[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
    struct Hp(u64);

    impl Component for Hp {
        fn type_name() -> &'static str {
            "Hp"
        }
    }

    #[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
    struct Name(String);

    impl Component for Name {
        fn type_name() -> &'static str {
            "Name"
        }
    }

    fn shared_with_pool() -> SharedStorage {
        let shared = SharedStorage::new();
        shared.attach(Box::new(PolyStorage::new()));
        shared
    }

    #[test]
    fn test_basic_surface_on_shared_ref() {
        let shared = shared_with_pool();
        let e = Entity::new();
        shared.set(e, Hp(10)).unwrap();
        assert_eq!(shared.try_get::<Hp>(e), Some(Hp(10)));
        assert!(shared.contains::<Hp>(e));
        assert_eq!(shared.query::<Hp>(), vec![e]);
        assert_eq!(shared.take::<Hp>(e).unwrap(), Some(Hp(10)));
        assert!(!shared.contains::<Hp>(e));
    }

    #[test]
    fn test_empty_tree_rejects_writes() {
        let shared = SharedStorage::new();
        assert!(matches!(
            shared.set(Entity::new(), Hp(1)),
            Err(StorageError::NotSupported { .. })
        ));
        // An unrouted type is a configuration error for every mutation,
        // never a missing value.
        assert!(matches!(
            shared.update(Entity::new(), |_: &mut Hp| {}),
            Err(StorageError::NotSupported { .. })
        ));
        assert_eq!(shared.try_get::<Hp>(Entity::new()), None);
    }

    #[test]
    fn test_routed_type_without_value_is_not_found() {
        let shared = shared_with_pool();
        assert!(matches!(
            shared.update(Entity::new(), |_: &mut Hp| {}),
            Err(StorageError::NotFound { .. })
        ));
    }

    #[test]
    fn test_update_is_atomic_across_threads() {
        let shared = shared_with_pool();
        let e = Entity::new();
        shared.set(e, Hp(0)).unwrap();

        const THREADS: usize = 8;
        const ROUNDS: u64 = 200;
        std::thread::scope(|s| {
            for _ in 0..THREADS {
                s.spawn(|| {
                    for _ in 0..ROUNDS {
                        shared.update(e, |hp: &mut Hp| hp.0 += 1).unwrap();
                    }
                });
            }
        });
        assert_eq!(shared.try_get::<Hp>(e), Some(Hp(THREADS as u64 * ROUNDS)));
    }

    #[test]
    fn test_acquire_with_counts_without_lost_updates() {
        let shared = shared_with_pool();
        let e = Entity::new();
        const THREADS: usize = 4;
        const ROUNDS: u64 = 100;
        std::thread::scope(|s| {
            for _ in 0..THREADS {
                s.spawn(|| {
                    for _ in 0..ROUNDS {
                        shared
                            .acquire_with(e, |hp: &mut Hp, _existed| hp.0 += 1)
                            .unwrap();
                    }
                });
            }
        });
        assert_eq!(shared.try_get::<Hp>(e), Some(Hp(THREADS as u64 * ROUNDS)));
    }

    #[test]
    fn test_attach_under_read_traffic() {
        let shared = shared_with_pool();
        let e = Entity::new();
        shared.set(e, Hp(1)).unwrap();

        std::thread::scope(|s| {
            let readers: Vec<_> = (0..4)
                .map(|_| {
                    s.spawn(|| {
                        for _ in 0..500 {
                            assert_eq!(shared.try_get::<Hp>(e), Some(Hp(1)));
                        }
                    })
                })
                .collect();
            for _ in 0..16 {
                let id = shared.attach(Box::new(PolyStorage::new()));
                assert!(shared.detach(id).is_some());
            }
            for reader in readers {
                reader.join().unwrap();
            }
        });
        // The original sublayer still owns Hp.
        assert_eq!(shared.try_get::<Hp>(e), Some(Hp(1)));
        assert_eq!(shared.sublayer_count(), 1);
    }

    #[test]
    fn test_detach_hands_data_back() {
        let shared = SharedStorage::new();
        let id = shared.attach(Box::new(PolyStorage::new()));
        let e = Entity::new();
        shared.set(e, Name("kept".into())).unwrap();

        let detached = shared.detach(id).unwrap();
        assert_eq!(detached.try_get::<Name>(e), Some(Name("kept".into())));
        assert_eq!(shared.sublayer_count(), 0);
        assert!(shared.detach(id).is_none());
        assert_eq!(shared.try_get::<Name>(e), None);
    }

    #[test]
    fn test_resolution_sticks_to_first_supporting_layer() {
        let shared = shared_with_pool();
        let e = Entity::new();
        shared.set(e, Hp(1)).unwrap();
        shared.attach(Box::new(PolyStorage::new()));
        shared.set(Entity::new(), Hp(2)).unwrap();
        // Both values route to the first sublayer.
        assert_eq!(shared.count::<Hp>(), 2);
    }

    #[test]
    fn test_get_all_and_clear_entity_span_sublayers() {
        let shared = shared_with_pool();
        let e = Entity::new();
        shared.set(e, Hp(5)).unwrap();
        shared.set(e, Name("x".into())).unwrap();
        let records = shared.get_all(e).unwrap();
        assert_eq!(records.len(), 2);

        shared.clear_entity(e);
        assert!(!shared.contains::<Hp>(e));
        assert!(!shared.contains::<Name>(e));
    }
}
