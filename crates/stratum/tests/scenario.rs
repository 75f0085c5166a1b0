//! End-to-end walkthroughs of the typed surface on a routed tree.

use serde::{Deserialize, Serialize};
use stratum::prelude::*;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Position {
    x: i32,
    y: i32,
}

impl Component for Position {
    fn type_name() -> &'static str {
        "Position"
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Health {
    current: f32,
    max: f32,
}

impl Component for Health {
    fn type_name() -> &'static str {
        "Health"
    }
}

fn world() -> CompositeStorage {
    let mut tree = CompositeStorage::new();
    tree.attach(Box::new(PolyStorage::new()));
    tree
}

#[test]
fn test_entity_lifecycle() {
    let mut world = world();
    let e1 = Entity::new();

    let existed = world.acquire::<Position>(e1).unwrap();
    assert!(!existed);

    world.set(e1, Position { x: 1, y: 2 }).unwrap();
    assert_eq!(world.try_get::<Position>(e1), Some(Position { x: 1, y: 2 }));

    assert!(world.remove::<Position>(e1).unwrap());
    assert_eq!(world.try_get::<Position>(e1), None);
    assert_eq!(world.singleton::<Position>(), None);
}

#[test]
fn test_acquire_existence_flag_until_removed() {
    let mut world = world();
    let e = Entity::new();
    assert!(!world.acquire::<Health>(e).unwrap());
    assert!(world.acquire::<Health>(e).unwrap());
    assert!(world.acquire::<Health>(e).unwrap());
    world.remove::<Health>(e).unwrap();
    assert!(!world.acquire::<Health>(e).unwrap());
}

#[test]
fn test_query_ascending_under_churn() {
    let mut world = world();
    let mut ids: Vec<Entity> = (0..64).map(|_| Entity::new()).collect();
    for &e in &ids {
        world.set(e, Position::default()).unwrap();
    }
    // Remove a scattered half.
    for &e in ids.iter().step_by(2) {
        assert!(world.remove::<Position>(e).unwrap());
    }
    ids = ids.into_iter().skip(1).step_by(2).collect();
    ids.sort();

    let mut queried = world.query::<Position>();
    assert_eq!(queried.len(), ids.len());
    for pair in queried.windows(2) {
        assert!(pair[0] < pair[1]);
    }
    queried.sort();
    assert_eq!(queried, ids);
}

#[test]
fn test_singleton_moves_after_holder_removed() {
    let mut world = world();
    let mut ids: Vec<Entity> = (0..4).map(|_| Entity::new()).collect();
    ids.sort();
    for &e in &ids {
        world.set(e, Health::default()).unwrap();
    }
    assert_eq!(world.singleton::<Health>(), Some(ids[0]));
    world.remove::<Health>(ids[0]).unwrap();
    assert_eq!(world.singleton::<Health>(), Some(ids[1]));
}

#[test]
fn test_missing_data_vs_missing_backend() {
    let mut world = world();
    let e = Entity::new();

    // Owned type, absent value: NotFound.
    world.set(Entity::new(), Health::default()).unwrap();
    assert!(matches!(
        world.update(e, |_: &mut Health| {}),
        Err(StorageError::NotFound { .. })
    ));

    // Empty tree: nothing owns any type, a configuration error.
    let mut empty = CompositeStorage::new();
    assert!(matches!(
        empty.set(e, Health::default()),
        Err(StorageError::NotSupported { .. })
    ));
}

#[test]
fn test_per_type_strategies_in_one_tree() {
    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct WorldClock(u64);
    impl Component for WorldClock {
        fn type_name() -> &'static str {
            "WorldClock"
        }
    }

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct Burning;
    impl Component for Burning {
        fn type_name() -> &'static str {
            "Burning"
        }
    }

    let mut tree = CompositeStorage::new();
    tree.attach(Box::new(PolyStorage::with_factory(
        StrategyFactory::new()
            .route::<WorldClock>(BackendSpec::Singleton)
            .route::<Burning>(BackendSpec::Tag),
    )));

    let clock_holder = Entity::new();
    tree.set(clock_holder, WorldClock(0)).unwrap();
    assert!(matches!(
        tree.set(Entity::new(), WorldClock(1)),
        Err(StorageError::NotSupported { .. })
    ));

    let a = Entity::new();
    let b = Entity::new();
    tree.set(a, Burning).unwrap();
    tree.set(b, Burning).unwrap();
    assert_eq!(tree.count::<Burning>(), 2);

    // Plain components still pool.
    tree.set(a, Position { x: 1, y: 1 }).unwrap();
    assert_eq!(tree.try_get::<Position>(a), Some(Position { x: 1, y: 1 }));
}

#[test]
fn test_clear_entity_spans_types() {
    let mut world = world();
    let e = Entity::new();
    let other = Entity::new();
    world.set(e, Position { x: 1, y: 1 }).unwrap();
    world.set(e, Health::default()).unwrap();
    world.set(other, Position { x: 2, y: 2 }).unwrap();

    world.clear_entity(e);
    assert!(!world.contains::<Position>(e));
    assert!(!world.contains::<Health>(e));
    assert!(world.contains::<Position>(other));

    world.clear();
    assert!(!world.contains::<Position>(other));
}
