//! Cross-thread behavior of the shared storage tree.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use stratum::prelude::*;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Counter(u64);

impl Component for Counter {
    fn type_name() -> &'static str {
        "Counter"
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Score(i64);

impl Component for Score {
    fn type_name() -> &'static str {
        "Score"
    }
}

fn shared() -> Arc<SharedStorage> {
    let storage = SharedStorage::new();
    storage.attach(Box::new(PolyStorage::new()));
    Arc::new(storage)
}

#[test]
fn test_no_lost_updates_under_contention() {
    const THREADS: u64 = 8;
    const INCREMENTS: u64 = 500;

    let storage = shared();
    let e = Entity::new();

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let storage = Arc::clone(&storage);
            std::thread::spawn(move || {
                for _ in 0..INCREMENTS {
                    storage
                        .acquire_with(e, |c: &mut Counter, _existed| c.0 += 1)
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(storage.try_get::<Counter>(e), Some(Counter(THREADS * INCREMENTS)));
}

#[test]
fn test_disjoint_entities_written_in_parallel() {
    let storage = shared();
    let ids: Vec<Entity> = (0..16).map(|_| Entity::new()).collect();

    std::thread::scope(|s| {
        for (i, &e) in ids.iter().enumerate() {
            let storage = &storage;
            s.spawn(move || {
                for round in 0..100 {
                    storage.set(e, Score(i as i64 * 1000 + round)).unwrap();
                }
            });
        }
    });

    for (i, &e) in ids.iter().enumerate() {
        assert_eq!(storage.try_get::<Score>(e), Some(Score(i as i64 * 1000 + 99)));
    }
}

#[test]
fn test_membership_edits_do_not_corrupt_traffic() {
    let storage = shared();
    let e = Entity::new();
    storage.set(e, Counter(0)).unwrap();

    std::thread::scope(|s| {
        let writer = s.spawn(|| {
            for _ in 0..1000 {
                storage.update(e, |c: &mut Counter| c.0 += 1).unwrap();
            }
        });
        let editor = s.spawn(|| {
            for _ in 0..32 {
                let id = storage.attach(Box::new(PolyStorage::new()));
                assert!(storage.detach(id).is_some());
            }
        });
        writer.join().unwrap();
        editor.join().unwrap();
    });

    assert_eq!(storage.try_get::<Counter>(e), Some(Counter(1000)));
    assert_eq!(storage.sublayer_count(), 1);
}

#[test]
fn test_readers_see_consistent_snapshots() {
    let storage = shared();
    let e = Entity::new();
    storage.set(e, Counter(0)).unwrap();
    storage.set(e, Score(0)).unwrap();

    std::thread::scope(|s| {
        let writer = s.spawn(|| {
            for i in 1..=200 {
                // Both components advance together under one write hold
                // per component; readers snapshot via get_all.
                storage.update(e, |c: &mut Counter| c.0 = i).unwrap();
                storage.update(e, |sc: &mut Score| sc.0 = i as i64).unwrap();
            }
        });
        let reader = s.spawn(|| {
            for _ in 0..200 {
                let records = storage.get_all(e).unwrap();
                assert_eq!(records.len(), 2);
            }
        });
        writer.join().unwrap();
        reader.join().unwrap();
    });
}
