//! Entity identifiers.
//!
//! An [`Entity`] is an opaque 128-bit key. The storage engine never
//! allocates or frees "the entity" as an object — it only holds per-type
//! associations keyed by this identifier, so callers may mint ids wherever
//! is convenient (a spawner, a network session, a save file).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A unique entity identifier.
///
/// Entities are pure identifiers — they carry no data of their own.
/// Components are attached to entities to give them meaning.
///
/// Ids are v4 UUIDs, so they are unique without any central allocator.
/// `Ord` compares the raw bytes; every sorted iteration the engine exposes
/// (`query`, singleton selection) uses this ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Entity(Uuid);

impl Entity {
    /// The null / invalid entity sentinel.
    pub const NIL: Entity = Entity(Uuid::nil());

    /// A reserved id used for "any entity" bookkeeping such as the
    /// broadcast reactive markers. Never use it for real game state.
    pub const BROADCAST: Entity = Entity(Uuid::max());

    /// Mint a fresh, globally unique entity id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create an entity from an existing UUID (e.g. loaded from a save).
    #[must_use]
    pub const fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Returns the raw UUID.
    #[must_use]
    pub const fn as_uuid(self) -> Uuid {
        self.0
    }

    /// Returns `true` if this is a valid (non-nil) entity.
    #[must_use]
    pub fn is_valid(self) -> bool {
        !self.0.is_nil()
    }
}

impl Default for Entity {
    fn default() -> Self {
        Self::NIL
    }
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Entity({})", self.0)
    }
}
