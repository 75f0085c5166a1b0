//! Process-wide registry of dense component type indices.
//!
//! Router tables are keyed by [`TypeIndex`] rather than by
//! `std::any::TypeId` so lookups amount to small-integer map hits and the
//! memo tables stay compact. The registry hands out indices the first time
//! a type is seen and never reuses them for the lifetime of the process.

use std::any::TypeId;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU32, Ordering};

use dashmap::DashMap;

/// A dense, process-lifetime index for a component type.
///
/// Invariants: the same type always yields the same index, indices are
/// assigned contiguously in first-seen order, and an index is never
/// reused for a different type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeIndex(pub u32);

impl TypeIndex {
    /// Look up (or assign) the index for `T` in the global registry.
    #[must_use]
    pub fn of<T: 'static>() -> Self {
        TypeRegistry::global().index_of::<T>()
    }
}

/// Registry assigning dense [`TypeIndex`] values per Rust type.
///
/// A single global instance backs [`TypeIndex::of`]; separate instances
/// are only ever constructed by tests.
#[derive(Debug)]
pub struct TypeRegistry {
    indices: DashMap<TypeId, TypeIndex>,
    next: AtomicU32,
}

impl TypeRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            indices: DashMap::new(),
            next: AtomicU32::new(0),
        }
    }

    /// The process-wide registry.
    #[must_use]
    pub fn global() -> &'static TypeRegistry {
        static GLOBAL: OnceLock<TypeRegistry> = OnceLock::new();
        GLOBAL.get_or_init(TypeRegistry::new)
    }

    /// Returns the index for `T`, assigning the next free one on first
    /// sight. The entry lock makes assignment exactly-once per type even
    /// under concurrent first lookups.
    pub fn index_of<T: 'static>(&self) -> TypeIndex {
        *self
            .indices
            .entry(TypeId::of::<T>())
            .or_insert_with(|| TypeIndex(self.next.fetch_add(1, Ordering::Relaxed)))
    }

    /// Number of distinct types registered so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Returns `true` if no types have been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
