//! # stratum
//!
//! An embeddable, in-process entity-component storage engine.
//!
//! Entities are opaque ids; components are plain serializable values,
//! at most one per type per entity. Each component type is stored by a
//! backend picked for its access pattern (pooled hashing, dense arrays,
//! tags, singletons), backends compose into routed trees, and wrappers
//! add thread safety and reactive change tagging without changing the
//! surface underneath.
//!
//! ```rust
//! use serde::{Serialize, Deserialize};
//! use stratum::prelude::*;
//!
//! #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
//! struct Health { current: f32, max: f32 }
//! impl Component for Health {
//!     fn type_name() -> &'static str { "Health" }
//! }
//!
//! let mut world = PolyStorage::new();
//! let hero = Entity::new();
//! world.set(hero, Health { current: 80.0, max: 100.0 })?;
//! world.update(hero, |h: &mut Health| h.current = h.max)?;
//! assert_eq!(world.try_get::<Health>(hero), Some(Health { current: 100.0, max: 100.0 }));
//! # Ok::<(), stratum::StorageError>(())
//! ```

pub use stratum_core::{
    AnyComponent, AnyCreated, AnyModified, AnyRemoved, Component, ComponentTypeId, Created,
    Entity, Modified, Removed, StorageError, TypeIndex, TypeRegistry,
};
pub use stratum_layers::{
    BackendFactory, BackendSpec, BoxedComponent, ClosedHashFactory, ComponentVtable,
    CompositeStorage, DataLayer, DenseFactory, LayerExt, LayerId, MarkerVtables, PoolFactory,
    PolyStorage, SingletonFactory, StrategyFactory, TagFactory, TypedLayer,
};
pub use stratum_reactive::ReactiveStorage;
pub use stratum_storage::{
    ClosedHashStorage, ComponentRef, ComponentStorage, DenseStorage, PoolStorage,
    SingletonStorage, TagStorage,
};
pub use stratum_sync::SharedStorage;

/// Everything a typical embedder needs in scope.
pub mod prelude {
    pub use stratum_core::{
        AnyCreated, AnyModified, AnyRemoved, Component, Created, Entity, Modified, Removed,
        StorageError,
    };
    pub use stratum_layers::{
        BackendSpec, CompositeStorage, DataLayer, LayerExt, PolyStorage, StrategyFactory,
    };
    pub use stratum_reactive::ReactiveStorage;
    pub use stratum_sync::SharedStorage;
}
