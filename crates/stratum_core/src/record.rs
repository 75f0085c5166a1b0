//! Serialized component records.
//!
//! [`AnyComponent`] is what `get_all(entity)` hands to the persistence
//! collaborator: the component's stable type identity plus its value as
//! MessagePack bytes. Restoring goes through the typed `set` path, so the
//! record only needs enough identity to pick the right `T`.

use serde::{Deserialize, Serialize};

use crate::component::{Component, ComponentTypeId};

/// A type-tagged, serialized component value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnyComponent {
    /// Stable identity of the component type (FNV-1a of its name).
    pub type_id: ComponentTypeId,
    /// The component's name, for humans and log lines.
    pub name: String,
    /// MessagePack-encoded component bytes.
    pub data: Vec<u8>,
}

impl AnyComponent {
    /// Serialize a component value into a record.
    pub fn encode<T: Component>(value: &T) -> Result<Self, rmp_serde::encode::Error> {
        Ok(Self {
            type_id: T::component_type_id(),
            name: T::type_name().to_owned(),
            data: rmp_serde::to_vec_named(value)?,
        })
    }

    /// Returns `true` if this record holds a value of type `T`.
    #[must_use]
    pub fn is<T: Component>(&self) -> bool {
        self.type_id == T::component_type_id()
    }

    /// Deserialize the record back into `T`.
    ///
    /// Callers are expected to check [`AnyComponent::is`] first; decoding
    /// into the wrong type fails with a decode error.
    pub fn decode<T: Component>(&self) -> Result<T, rmp_serde::decode::Error> {
        rmp_serde::from_slice(&self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
    struct Label {
        text: String,
    }

    impl Component for Label {
        fn type_name() -> &'static str {
            "Label"
        }
    }

    #[derive(Debug, Clone, Copy, Default, serde::Serialize, serde::Deserialize)]
    struct Mass(f64);

    impl Component for Mass {
        fn type_name() -> &'static str {
            "Mass"
        }
    }

    #[test]
    fn test_record_roundtrip() {
        let label = Label {
            text: "hero".to_owned(),
        };
        let record = AnyComponent::encode(&label).unwrap();
        assert!(record.is::<Label>());
        assert_eq!(record.name, "Label");
        assert_eq!(record.decode::<Label>().unwrap(), label);
    }

    #[test]
    fn test_record_type_tag_discriminates() {
        let record = AnyComponent::encode(&Mass(9.81)).unwrap();
        assert!(record.is::<Mass>());
        assert!(!record.is::<Label>());
    }

    #[test]
    fn test_record_itself_serializes() {
        // Persistence writes whole records to disk; they must round-trip.
        let record = AnyComponent::encode(&Mass(1.0)).unwrap();
        let bytes = rmp_serde::to_vec_named(&record).unwrap();
        let restored: AnyComponent = rmp_serde::from_slice(&bytes).unwrap();
        assert_eq!(record, restored);
    }
}
