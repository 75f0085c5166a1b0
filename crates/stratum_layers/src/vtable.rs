//! Per-type vtables bridging generic call sites and erased layers.
//!
//! A [`ComponentVtable`] is a small copyable bundle of everything a
//! type-erased layer needs to know about a component type: its identities,
//! whether it is a reactive marker, constructors for the marker vtables of
//! the type, and a monomorphized backend constructor. Generic entry points
//! build one with [`ComponentVtable::of`] and pass it down; everything
//! below the sugar layer works on the vtable alone.

use stratum_core::{
    AnyCreated, AnyModified, AnyRemoved, Component, ComponentTypeId, Created, Modified, Removed,
    TypeIndex,
};
use stratum_storage::{
    ClosedHashStorage, DenseStorage, PoolStorage, SingletonStorage, TagStorage,
};

use crate::layer::{DataLayer, TypedLayer};

/// Which backend to construct for a component type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendSpec {
    /// Growing coalesced-hash pool. The default.
    Pool {
        /// Slots per brick.
        brick_capacity: usize,
    },
    /// Dense slot array with stable references.
    Dense,
    /// Single fixed-capacity brick; full is an error.
    ClosedHash {
        /// Hard slot budget.
        capacity: usize,
    },
    /// Membership set with one shared value.
    Tag,
    /// At most one holding entity.
    Singleton,
}

impl Default for BackendSpec {
    fn default() -> Self {
        Self::Pool {
            brick_capacity: stratum_storage::DEFAULT_BRICK_CAPACITY,
        }
    }
}

/// Constructors for the marker vtables of a component type.
///
/// The reactive overlay calls these to tag mutations of `T` with
/// `Created<T>` / `Modified<T>` / `Removed<T>` without ever naming `T`.
#[derive(Debug, Clone, Copy)]
pub struct MarkerVtables {
    pub created: fn() -> ComponentVtable,
    pub modified: fn() -> ComponentVtable,
    pub removed: fn() -> ComponentVtable,
    pub any_created: fn() -> ComponentVtable,
    pub any_modified: fn() -> ComponentVtable,
    pub any_removed: fn() -> ComponentVtable,
}

/// Erased description of one component type.
#[derive(Debug, Clone, Copy)]
pub struct ComponentVtable {
    /// Dense registry index; keys every routing table.
    pub type_index: TypeIndex,
    /// Persistence-stable identity (FNV-1a of the name).
    pub type_id: ComponentTypeId,
    /// The component's name, for errors and log lines.
    pub type_name: &'static str,
    /// `true` for reactive marker types; the overlay never tags these.
    pub is_marker: bool,
    /// Marker vtable constructors. `None` on vtables that were themselves
    /// built for marker types, which keeps the constructor chain finite.
    pub markers: Option<MarkerVtables>,
    /// Monomorphized backend constructor for this type.
    pub build_backend: fn(&BackendSpec) -> Box<dyn DataLayer>,
}

impl ComponentVtable {
    /// Build the vtable for a component type.
    #[must_use]
    pub fn of<T: Component>() -> Self {
        Self {
            type_index: TypeIndex::of::<T>(),
            type_id: ComponentTypeId::of::<T>(),
            type_name: T::type_name(),
            is_marker: T::IS_MARKER,
            markers: Some(MarkerVtables {
                created: Self::of_marker::<Created<T>>,
                modified: Self::of_marker::<Modified<T>>,
                removed: Self::of_marker::<Removed<T>>,
                any_created: Self::of_marker::<AnyCreated<T>>,
                any_modified: Self::of_marker::<AnyModified<T>>,
                any_removed: Self::of_marker::<AnyRemoved<T>>,
            }),
            build_backend: build_backend::<T>,
        }
    }

    /// Build a vtable without marker constructors.
    ///
    /// Used for the marker types reachable from [`ComponentVtable::of`];
    /// referencing `of::<Created<T>>` there would chase `Created<Created<
    /// T>>` and so on without end.
    #[must_use]
    pub fn of_marker<M: Component>() -> Self {
        Self {
            type_index: TypeIndex::of::<M>(),
            type_id: ComponentTypeId::of::<M>(),
            type_name: M::type_name(),
            is_marker: M::IS_MARKER,
            markers: None,
            build_backend: build_backend::<M>,
        }
    }
}

fn build_backend<T: Component>(spec: &BackendSpec) -> Box<dyn DataLayer> {
    match *spec {
        BackendSpec::Pool { brick_capacity } => Box::new(TypedLayer::new(
            PoolStorage::<T>::with_brick_capacity(brick_capacity),
        )),
        BackendSpec::Dense => Box::new(TypedLayer::new(DenseStorage::<T>::new())),
        BackendSpec::ClosedHash { capacity } => Box::new(TypedLayer::new(
            ClosedHashStorage::<T>::with_capacity(capacity),
        )),
        BackendSpec::Tag => Box::new(TypedLayer::new(TagStorage::<T>::new())),
        BackendSpec::Singleton => Box::new(TypedLayer::new(SingletonStorage::<T>::new())),
    }
}
