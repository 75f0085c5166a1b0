//! # stratum_reactive
//!
//! Reactive overlay for the stratum storage engine. Wrap any layer in a
//! [`ReactiveStorage`] and every mutation through it leaves `Created<T>`,
//! `Modified<T>` or `Removed<T>` markers behind, plus broadcast `Any*`
//! variants, ready to be consumed with ordinary queries.

pub mod overlay;

pub use overlay::ReactiveStorage;
