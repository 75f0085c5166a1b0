//! Core [`Component`] trait and type identity.
//!
//! Every value stored by the engine must implement [`Component`]. The trait
//! requires `Send + Sync + 'static` so storage trees can be shared across
//! threads behind the concurrency wrapper, `Serialize`/`Deserialize` so the
//! persistence collaborator can snapshot entities through `get_all`,
//! `Clone` for copy-out reads and `Default` for get-or-create `acquire`.
//!
//! ## Type identity
//!
//! [`ComponentTypeId`] is derived from the component's **string name**
//! using the FNV-1a 64-bit hash algorithm. It is deterministic across
//! processes and therefore the right key for persisted records. The dense
//! in-process [`TypeIndex`](crate::registry::TypeIndex) is a separate,
//! registry-assigned key used for routing tables.

use serde::{Serialize, de::DeserializeOwned};

/// A unique identifier for a component type, derived from its string name
/// using the FNV-1a 64-bit hash algorithm.
///
/// The ID is deterministic: any process that applies FNV-1a to the same
/// UTF-8 name bytes produces the same `ComponentTypeId`, which is what
/// makes serialized snapshots readable across runs.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize, PartialOrd, Ord,
)]
pub struct ComponentTypeId(pub u64);

impl ComponentTypeId {
    /// FNV-1a 64-bit offset basis.
    const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;

    /// FNV-1a 64-bit prime.
    const FNV_PRIME: u64 = 0x0100_0000_01b3;

    /// Compute the [`ComponentTypeId`] from a component's string name.
    ///
    /// # Algorithm (FNV-1a 64-bit)
    ///
    /// ```text
    /// hash = 0xcbf29ce484222325          (offset basis)
    /// for each byte in name.as_bytes():
    ///     hash = hash XOR byte
    ///     hash = hash * 0x00000100000001b3  (prime)
    /// return hash
    /// ```
    #[must_use]
    pub const fn from_name(name: &str) -> Self {
        let bytes = name.as_bytes();
        let mut hash = Self::FNV_OFFSET_BASIS;
        let mut i = 0;
        while i < bytes.len() {
            hash ^= bytes[i] as u64;
            hash = hash.wrapping_mul(Self::FNV_PRIME);
            i += 1;
        }
        Self(hash)
    }

    /// Compute the [`ComponentTypeId`] for a Rust component type `T`.
    #[must_use]
    pub fn of<T: Component>() -> Self {
        Self::from_name(T::type_name())
    }
}

/// The core component trait.
///
/// Component values are opaque to the engine: it never interprets them,
/// only stores, hands out and serializes them. At most one value of a
/// given component type exists per entity.
///
/// # Examples
///
/// ```rust
/// use serde::{Serialize, Deserialize};
/// use stratum_core::Component;
///
/// #[derive(Debug, Clone, Default, Serialize, Deserialize)]
/// struct Health {
///     current: f32,
///     max: f32,
/// }
///
/// impl Component for Health {
///     // Stable name for persisted snapshots. Leaving this out falls
///     // back to the Rust type path, which changes when code moves.
///     fn type_name() -> &'static str { "Health" }
/// }
/// ```
pub trait Component:
    Send + Sync + 'static + Serialize + DeserializeOwned + Clone + Default
{
    /// `true` for reactive marker components (`Created<T>` and friends).
    ///
    /// The reactive overlay consults this to avoid tagging mutations of
    /// markers with further markers.
    const IS_MARKER: bool = false;

    /// A human-readable name for this component type.
    ///
    /// Defaults to the Rust type path. Override it with a stable string
    /// for any component that ends up in persisted snapshots.
    fn type_name() -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Returns the [`ComponentTypeId`] for this component.
    fn component_type_id() -> ComponentTypeId {
        ComponentTypeId::from_name(Self::type_name())
    }
}
