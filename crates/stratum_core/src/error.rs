//! Storage-engine error types.
//!
//! The taxonomy is deliberately small. `NotFound` means "this entity lacks
//! the data"; `NotSupported` means "this type is not wired up here at all"
//! (or the backend structurally cannot perform the operation) and is a
//! configuration error. Capacity growth inside backends is internal and
//! never surfaces as an error.

use crate::component::Component;
use crate::entity::Entity;

/// Errors that can occur during storage operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    /// `require`/`inspect` on a component that does not exist for the
    /// entity. Never raised by `try_get`/`remove`, which report absence
    /// through their return value.
    #[error("entity {entity} has no '{type_name}' component")]
    NotFound {
        /// The entity that was addressed.
        entity: Entity,
        /// The component type that was missing.
        type_name: &'static str,
    },

    /// A component type has no backend configured in the active tree, or
    /// the owning backend structurally cannot support the operation (a
    /// second entity binding a singleton, a full fixed-capacity brick).
    #[error("'{type_name}' is not supported here: {reason}")]
    NotSupported {
        /// The component type that was addressed.
        type_name: &'static str,
        /// What exactly the configuration cannot do.
        reason: &'static str,
    },
}

impl StorageError {
    /// Shorthand for a [`StorageError::NotFound`] for component `T`.
    #[must_use]
    pub fn not_found<T: Component>(entity: Entity) -> Self {
        Self::NotFound {
            entity,
            type_name: T::type_name(),
        }
    }

    /// Shorthand for a [`StorageError::NotSupported`] for component `T`.
    #[must_use]
    pub fn not_supported<T: Component>(reason: &'static str) -> Self {
        Self::NotSupported {
            type_name: T::type_name(),
            reason,
        }
    }

    /// `NotSupported` built from a runtime type name, for the type-erased
    /// router paths where `T` is not in scope.
    #[must_use]
    pub fn unsupported_type(type_name: &'static str, reason: &'static str) -> Self {
        Self::NotSupported { type_name, reason }
    }

    /// `NotFound` built from a runtime type name.
    #[must_use]
    pub fn missing(entity: Entity, type_name: &'static str) -> Self {
        Self::NotFound { entity, type_name }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
    struct Position {
        x: f32,
        y: f32,
    }

    impl Component for Position {
        fn type_name() -> &'static str {
            "Position"
        }
    }

    #[test]
    fn test_not_found_formats_entity_and_type() {
        let e = Entity::new();
        let err = StorageError::not_found::<Position>(e);
        let msg = err.to_string();
        assert!(msg.contains("Position"));
        assert!(msg.contains(&e.to_string()));
    }

    #[test]
    fn test_error_kinds_are_distinguishable() {
        let e = Entity::new();
        let missing = StorageError::not_found::<Position>(e);
        let unwired = StorageError::not_supported::<Position>("no backend configured");
        assert_ne!(missing, unwired);
        assert!(matches!(missing, StorageError::NotFound { .. }));
        assert!(matches!(unwired, StorageError::NotSupported { .. }));
    }
}
