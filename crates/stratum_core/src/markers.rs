//! Reactive change-marker components.
//!
//! The reactive overlay records every mutation by acquiring one of these
//! marker components on the mutated entity: `Created<T>` the first time
//! `T` appears, `Modified<T>` on subsequent writes, `Removed<T>` when it
//! is removed. The `Any*` variants are the same signals recorded against
//! [`Entity::BROADCAST`](crate::entity::Entity::BROADCAST), so a consumer
//! can cheaply ask "did anything of type `T` change this tick" without
//! scanning.
//!
//! Markers are ordinary components stored in ordinary backends. Their
//! values carry no information — presence is the signal — and consumers
//! are expected to sweep them (e.g. once per tick) with `remove_all`.

use std::marker::PhantomData;

use serde::{Deserialize, Serialize};

use crate::component::Component;

macro_rules! marker_component {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Serialize, Deserialize)]
        #[serde(bound = "")]
        pub struct $name<T>(PhantomData<fn() -> T>);

        impl<T> $name<T> {
            /// The marker value. All instances are identical.
            #[must_use]
            pub const fn new() -> Self {
                Self(PhantomData)
            }
        }

        // Manual impls: the derives would demand `T: Clone` etc., but the
        // phantom carrier needs nothing from `T`.
        impl<T> Clone for $name<T> {
            fn clone(&self) -> Self {
                Self::new()
            }
        }

        impl<T> Copy for $name<T> {}

        impl<T> Default for $name<T> {
            fn default() -> Self {
                Self::new()
            }
        }

        impl<T> PartialEq for $name<T> {
            fn eq(&self, _other: &Self) -> bool {
                true
            }
        }

        impl<T> Eq for $name<T> {}

        impl<T> std::fmt::Debug for $name<T> {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(concat!(stringify!($name), "<..>"))
            }
        }

        impl<T: Component> Component for $name<T> {
            const IS_MARKER: bool = true;
        }
    };
}

marker_component! {
    /// Present on an entity whose `T` component was created this tick.
    Created
}

marker_component! {
    /// Present on an entity whose `T` component was written (or read with
    /// intent to mutate) this tick.
    Modified
}

marker_component! {
    /// Present on an entity whose `T` component was removed this tick.
    Removed
}

marker_component! {
    /// Present on [`Entity::BROADCAST`](crate::entity::Entity::BROADCAST)
    /// when any entity gained a `T` this tick.
    AnyCreated
}

marker_component! {
    /// Present on the broadcast entity when any `T` was written this tick.
    AnyModified
}

marker_component! {
    /// Present on the broadcast entity when any `T` was removed this tick.
    AnyRemoved
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::ComponentTypeId;

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
    fn test_markers_are_marker_components() {
        assert!(Created::<Position>::IS_MARKER);
        assert!(Modified::<Position>::IS_MARKER);
        assert!(Removed::<Position>::IS_MARKER);
        assert!(!Position::IS_MARKER);
    }

    #[test]
    fn test_marker_identities_differ_per_kind_and_type() {
        #[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
        struct Velocity;
        impl Component for Velocity {}

        let ids = [
            ComponentTypeId::of::<Created<Position>>(),
            ComponentTypeId::of::<Modified<Position>>(),
            ComponentTypeId::of::<Removed<Position>>(),
            ComponentTypeId::of::<Created<Velocity>>(),
            ComponentTypeId::of::<AnyCreated<Position>>(),
        ];
        for (i, a) in ids.iter().enumerate() {
            for b in &ids[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_marker_serializes_as_unit_payload() {
        let marker = Created::<Position>::new();
        let bytes = rmp_serde::to_vec_named(&marker).unwrap();
        let restored: Created<Position> = rmp_serde::from_slice(&bytes).unwrap();
        assert_eq!(marker, restored);
    }

    #[test]
    fn test_nested_markers_are_expressible() {
        // The overlay never creates these (marker mutations are not
        // themselves tagged), but the types must still be well-formed.
        assert!(Modified::<Modified<Position>>::IS_MARKER);
    }
}
