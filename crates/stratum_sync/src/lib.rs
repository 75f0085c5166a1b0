//! # stratum_sync
//!
//! Concurrency wrapper for the stratum storage engine. [`SharedStorage`]
//! exposes the full typed surface through `&self`, gating data access
//! behind one tree-wide reader-writer lock while sublayer membership is
//! edited copy-on-write, off the lock.

pub mod shared;

pub use shared::SharedStorage;
