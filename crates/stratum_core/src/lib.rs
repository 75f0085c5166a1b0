//! # stratum_core
//!
//! Foundation types for the stratum entity-component storage engine.
//!
//! This crate provides:
//!
//! - [`Entity`] — opaque UUID entity identifiers.
//! - [`Component`] trait and [`ComponentTypeId`] — the contract all
//!   stored data satisfies, with persistence-stable type identity.
//! - [`TypeRegistry`] / [`TypeIndex`] — dense per-type indices that key
//!   every routing table.
//! - [`StorageError`] — the `NotFound` / `NotSupported` error taxonomy.
//! - [`AnyComponent`] — serialized snapshot records for `get_all`.
//! - Reactive marker component types ([`Created`], [`Modified`],
//!   [`Removed`] and their broadcast variants).

pub mod component;
pub mod entity;
pub mod error;
pub mod markers;
pub mod record;
pub mod registry;

pub use component::{Component, ComponentTypeId};
pub use entity::Entity;
pub use error::StorageError;
pub use markers::{AnyCreated, AnyModified, AnyRemoved, Created, Modified, Removed};
pub use record::AnyComponent;
pub use registry::{TypeIndex, TypeRegistry};
