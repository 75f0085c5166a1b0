//! Backend factories for the poly-storage router.
//!
//! The router creates a backend the first time a type is written. Which
//! backend it creates is the factory's call: the stock factories apply
//! one strategy to every type, while [`StrategyFactory`] routes chosen
//! types to chosen backends and everything else to a default.

use std::collections::HashMap;

use stratum_core::{Component, TypeIndex};
use stratum_storage::DEFAULT_BRICK_CAPACITY;

use crate::layer::DataLayer;
use crate::vtable::{BackendSpec, ComponentVtable};

/// Decides and constructs the backend for each component type.
pub trait BackendFactory: Send + Sync + 'static {
    /// Whether this factory will build a backend for the type. Routers
    /// treat a `false` here as "type not supported".
    fn supports(&self, _vt: &ComponentVtable) -> bool {
        true
    }

    /// Construct the backend. Only called when
    /// [`supports`](BackendFactory::supports) returned `true`.
    fn build(&self, vt: &ComponentVtable) -> Box<dyn DataLayer>;
}

/// Builds a coalesced-hash pool for every type. The default factory.
#[derive(Debug, Clone)]
pub struct PoolFactory {
    brick_capacity: usize,
}

impl PoolFactory {
    #[must_use]
    pub fn new() -> Self {
        Self {
            brick_capacity: DEFAULT_BRICK_CAPACITY,
        }
    }

    /// Use `capacity` slots per brick in every built pool.
    #[must_use]
    pub fn with_brick_capacity(capacity: usize) -> Self {
        Self {
            brick_capacity: capacity,
        }
    }
}

impl Default for PoolFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl BackendFactory for PoolFactory {
    fn build(&self, vt: &ComponentVtable) -> Box<dyn DataLayer> {
        (vt.build_backend)(&BackendSpec::Pool {
            brick_capacity: self.brick_capacity,
        })
    }
}

/// Builds a dense slot-array backend for every type.
#[derive(Debug, Clone, Copy, Default)]
pub struct DenseFactory;

impl BackendFactory for DenseFactory {
    fn build(&self, vt: &ComponentVtable) -> Box<dyn DataLayer> {
        (vt.build_backend)(&BackendSpec::Dense)
    }
}

/// Builds a fixed-capacity closed-hash backend for every type.
#[derive(Debug, Clone, Copy)]
pub struct ClosedHashFactory {
    capacity: usize,
}

impl ClosedHashFactory {
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self { capacity }
    }
}

impl BackendFactory for ClosedHashFactory {
    fn build(&self, vt: &ComponentVtable) -> Box<dyn DataLayer> {
        (vt.build_backend)(&BackendSpec::ClosedHash {
            capacity: self.capacity,
        })
    }
}

/// Builds a tag backend for every type.
#[derive(Debug, Clone, Copy, Default)]
pub struct TagFactory;

impl BackendFactory for TagFactory {
    fn build(&self, vt: &ComponentVtable) -> Box<dyn DataLayer> {
        (vt.build_backend)(&BackendSpec::Tag)
    }
}

/// Builds a singleton backend for every type.
#[derive(Debug, Clone, Copy, Default)]
pub struct SingletonFactory;

impl BackendFactory for SingletonFactory {
    fn build(&self, vt: &ComponentVtable) -> Box<dyn DataLayer> {
        (vt.build_backend)(&BackendSpec::Singleton)
    }
}

/// Routes chosen component types to chosen backends, everything else to
/// a default.
///
/// ```rust
/// use serde::{Serialize, Deserialize};
/// use stratum_core::Component;
/// use stratum_layers::{BackendSpec, StrategyFactory};
///
/// #[derive(Debug, Clone, Default, Serialize, Deserialize)]
/// struct WorldClock(u64);
/// impl Component for WorldClock {}
///
/// let factory = StrategyFactory::new()
///     .route::<WorldClock>(BackendSpec::Singleton);
/// ```
#[derive(Debug, Clone, Default)]
pub struct StrategyFactory {
    default: BackendSpec,
    overrides: HashMap<TypeIndex, BackendSpec>,
}

impl StrategyFactory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Change the backend built for unrouted types.
    #[must_use]
    pub fn with_default(mut self, spec: BackendSpec) -> Self {
        self.default = spec;
        self
    }

    /// Route component type `T` to a specific backend.
    #[must_use]
    pub fn route<T: Component>(mut self, spec: BackendSpec) -> Self {
        self.overrides.insert(TypeIndex::of::<T>(), spec);
        self
    }

    fn spec_for(&self, vt: &ComponentVtable) -> BackendSpec {
        self.overrides
            .get(&vt.type_index)
            .copied()
            .unwrap_or(self.default)
    }
}

impl BackendFactory for StrategyFactory {
    fn build(&self, vt: &ComponentVtable) -> Box<dyn DataLayer> {
        let spec = self.spec_for(vt);
        tracing::debug!(component = vt.type_name, ?spec, "building backend");
        (vt.build_backend)(&spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ext::LayerExt;
    use stratum_core::{Entity, StorageError};

    #[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
    struct Clock(u64);

    impl Component for Clock {
        fn type_name() -> &'static str {
            "Clock"
        }
    }

    #[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
    struct Hp(u32);

    impl Component for Hp {
        fn type_name() -> &'static str {
            "Hp"
        }
    }

    #[test]
    fn test_strategy_routes_per_type() {
        let factory = StrategyFactory::new().route::<Clock>(BackendSpec::Singleton);

        let clock_vt = ComponentVtable::of::<Clock>();
        let mut clocks = factory.build(&clock_vt);
        clocks.set(Entity::new(), Clock(0)).unwrap();
        assert!(matches!(
            clocks.set(Entity::new(), Clock(1)),
            Err(StorageError::NotSupported { .. })
        ));

        // Unrouted types get the default pool.
        let hp_vt = ComponentVtable::of::<Hp>();
        let mut hps = factory.build(&hp_vt);
        hps.set(Entity::new(), Hp(1)).unwrap();
        hps.set(Entity::new(), Hp(2)).unwrap();
        assert_eq!(hps.count::<Hp>(), 2);
    }

    #[test]
    fn test_closed_hash_factory_caps_capacity() {
        let factory = ClosedHashFactory::with_capacity(4);
        let vt = ComponentVtable::of::<Hp>();
        let mut layer = factory.build(&vt);
        for _ in 0..4 {
            layer.set(Entity::new(), Hp(0)).unwrap();
        }
        assert!(matches!(
            layer.set(Entity::new(), Hp(0)),
            Err(StorageError::NotSupported { .. })
        ));
    }
}
