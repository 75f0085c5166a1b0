//! # stratum_storage
//!
//! Per-type storage backends for the stratum storage engine. Each backend
//! implements the [`ComponentStorage`] contract for exactly one component
//! type; the routing layers above erase and compose them.
//!
//! Backends:
//!
//! - [`PoolStorage`] — coalesced-hash bricks with a cellar, growing by
//!   whole bricks. The default.
//! - [`DenseStorage`] — sorted index over a dense slot array, with
//!   generation-checked [`ComponentRef`] handles.
//! - [`ClosedHashStorage`] — one fixed-capacity brick; full is an error.
//! - [`TagStorage`] — membership set with a single shared value.
//! - [`SingletonStorage`] — at most one holding entity.

pub mod closed_hash;
pub mod contract;
pub mod dense;
pub mod pool;
pub mod singleton;
pub mod tag;

mod brick;

pub use closed_hash::ClosedHashStorage;
pub use contract::ComponentStorage;
pub use dense::{ComponentRef, DenseStorage};
pub use pool::{DEFAULT_BRICK_CAPACITY, PoolStorage};
pub use singleton::SingletonStorage;
pub use tag::TagStorage;
