//! Change tagging through the reactive overlay, consumed like a renderer
//! deciding what to re-upload each frame.

use serde::{Deserialize, Serialize};
use stratum::prelude::*;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Mesh(u32);

impl Component for Mesh {
    fn type_name() -> &'static str {
        "Mesh"
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Transform {
    x: f32,
    y: f32,
}

impl Component for Transform {
    fn type_name() -> &'static str {
        "Transform"
    }
}

fn reactive_world() -> ReactiveStorage {
    ReactiveStorage::new(Box::new(PolyStorage::new()))
}

#[test]
fn test_tagging_matrix() {
    let mut world = reactive_world();
    let e = Entity::new();

    // Fresh acquire: Created only.
    assert!(!world.acquire::<Mesh>(e).unwrap());
    assert_eq!(world.query::<Created<Mesh>>(), vec![e]);
    assert!(world.query::<Modified<Mesh>>().is_empty());

    // Second acquire: Modified joins, Created is not duplicated.
    assert!(world.acquire::<Mesh>(e).unwrap());
    assert_eq!(world.query::<Created<Mesh>>(), vec![e]);
    assert_eq!(world.query::<Modified<Mesh>>(), vec![e]);

    // Remove: Removed.
    assert!(world.remove::<Mesh>(e).unwrap());
    assert_eq!(world.query::<Removed<Mesh>>(), vec![e]);
}

#[test]
fn test_set_and_update_both_tag_modified() {
    let mut world = reactive_world();
    let e = Entity::new();
    // An upsert is an intent to mutate, even the one that creates.
    world.set(e, Transform::default()).unwrap();
    assert!(world.contains::<Modified<Transform>>(e));
    assert!(!world.contains::<Created<Transform>>(e));
    world.remove_all::<Modified<Transform>>();
    world.remove_all::<AnyModified<Transform>>();

    world.update(e, |t: &mut Transform| t.x += 1.0).unwrap();
    assert!(world.contains::<Modified<Transform>>(e));
    assert!(world.contains::<AnyModified<Transform>>(Entity::BROADCAST));
}

#[test]
fn test_frame_loop_consumption() {
    let mut world = reactive_world();
    let meshes: Vec<Entity> = (0..4).map(|_| Entity::new()).collect();

    // Frame 1: everything appears, everything uploads.
    for (i, &e) in meshes.iter().enumerate() {
        world
            .acquire_with(e, |m: &mut Mesh, _existed| m.0 = i as u32)
            .unwrap();
        world.acquire::<Transform>(e).unwrap();
    }
    let uploads = world.query::<Created<Mesh>>();
    assert_eq!(uploads.len(), 4);
    world.clear_markers::<Mesh>();
    world.clear_markers::<Transform>();

    // Frame 2: one entity moves; only it re-uploads.
    world
        .update(meshes[2], |t: &mut Transform| t.x = 5.0)
        .unwrap();
    assert_eq!(world.query::<Modified<Transform>>(), vec![meshes[2]]);
    assert!(world.query::<Created<Mesh>>().is_empty());

    // The broadcast marker answers "did anything move" without a scan.
    assert!(world.contains::<AnyModified<Transform>>(Entity::BROADCAST));
    world.clear_markers::<Transform>();
    assert!(!world.contains::<AnyModified<Transform>>(Entity::BROADCAST));
}

#[test]
fn test_overlay_inside_a_shared_tree() {
    let storage = SharedStorage::new();
    storage.attach(Box::new(ReactiveStorage::new(Box::new(
        PolyStorage::new(),
    ))));

    let e = Entity::new();
    assert!(!storage.acquire::<Mesh>(e).unwrap());
    assert!(storage.contains::<Created<Mesh>>(e));

    storage.update(e, |m: &mut Mesh| m.0 = 8).unwrap();
    assert_eq!(storage.try_get::<Mesh>(e), Some(Mesh(8)));
    assert!(storage.contains::<Modified<Mesh>>(e));
}

#[test]
fn test_overlay_is_terminal_inside_a_composite() {
    // The overlay claims everything beneath it; a composite must route
    // whole operations to it rather than descending past it, or marker
    // writes would bypass tagging.
    let mut tree = CompositeStorage::new();
    tree.attach(Box::new(ReactiveStorage::new(Box::new(
        PolyStorage::new(),
    ))));

    let e = Entity::new();
    tree.set(e, Mesh(1)).unwrap();
    assert!(tree.contains::<Modified<Mesh>>(e));
    assert!(tree.remove::<Mesh>(e).unwrap());
    assert!(tree.contains::<Removed<Mesh>>(e));
}

#[test]
fn test_snapshots_exclude_markers() {
    let mut world = reactive_world();
    let e = Entity::new();
    world.set(e, Mesh(1)).unwrap();
    world.set(e, Transform::default()).unwrap();

    let records = world.get_all(e).unwrap();
    assert_eq!(records.len(), 2);
    assert!(records.iter().any(|r| r.is::<Mesh>()));
    assert!(records.iter().any(|r| r.is::<Transform>()));
}
