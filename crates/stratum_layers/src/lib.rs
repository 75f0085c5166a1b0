//! # stratum_layers
//!
//! Type-erased routing layers for the stratum storage engine.
//!
//! The crate defines the [`DataLayer`] contract every tree node speaks,
//! and the nodes themselves:
//!
//! - [`TypedLayer`] — adapts one typed backend to the erased contract.
//! - [`PolyStorage`] — routes each component type to its own backend,
//!   created lazily by a [`BackendFactory`].
//! - [`CompositeStorage`] — an ordered tree of sublayers with memoized
//!   first-match type resolution.
//!
//! [`LayerExt`] restores the typed surface on top of any of them.

pub mod composite;
pub mod ext;
pub mod factory;
pub mod layer;
pub mod poly;
pub mod vtable;

pub use composite::{CompositeStorage, LayerId};
pub use ext::LayerExt;
pub use factory::{
    BackendFactory, ClosedHashFactory, DenseFactory, PoolFactory, SingletonFactory,
    StrategyFactory, TagFactory,
};
pub use layer::{BoxedComponent, DataLayer, TypedLayer};
pub use poly::PolyStorage;
pub use vtable::{BackendSpec, ComponentVtable, MarkerVtables};
