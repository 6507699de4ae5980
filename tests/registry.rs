use cichlid_peers::{new_store, sweeper};
use std::collections::HashSet;
use std::thread;
use std::time::Duration;

#[test]
fn touched_peer_survives_prune_at_touch_time() {
    let store = new_store();
    store.upsert("p1", "hello");
    store.upsert("p2", "world");
    let t0 = store.get("p2").unwrap().last_seen;

    thread::sleep(Duration::from_millis(10));
    assert!(store.touch("p1"));
    let t1 = store.get("p1").unwrap().last_seen;
    assert!(t1 > t0);

    let dropped = store.prune_older_than(t1);

    assert_eq!(dropped, vec!["p2".to_string()]);
    assert!(store.contains("p1"));
    assert!(!store.contains("p2"));
}

#[test]
fn concurrent_upserts_on_distinct_ids_all_land() {
    let store = new_store();
    let threads = 16;
    let per_thread = 250;

    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let store = store.clone();
            thread::spawn(move || {
                for i in 0..per_thread {
                    store.upsert(format!("peer-{t}-{i}"), format!("content-{t}-{i}"));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let snapshot = store.snapshot();
    assert_eq!(snapshot.len(), threads * per_thread);
    for t in 0..threads {
        for i in 0..per_thread {
            assert_eq!(snapshot[&format!("peer-{t}-{i}")].content, format!("content-{t}-{i}"));
        }
    }
}

#[test]
fn concurrent_mixed_operations_keep_registry_consistent() {
    let store = new_store();
    for i in 0..100 {
        store.upsert(format!("peer-{i}"), "seed");
    }

    let writers: Vec<_> = (0..4)
        .map(|w| {
            let store = store.clone();
            thread::spawn(move || {
                for i in 0..100 {
                    let id = format!("peer-{i}");
                    match (i + w) % 4 {
                        0 => store.upsert(id, format!("writer-{w}")),
                        1 => {
                            store.touch(&id);
                        }
                        2 => {
                            store.remove(&id);
                        }
                        _ => {
                            let _ = store.snapshot();
                        }
                    }
                }
            })
        })
        .collect();
    for writer in writers {
        writer.join().unwrap();
    }

    let snapshot = store.snapshot();
    assert_eq!(snapshot.len(), store.len());
    assert!(snapshot.len() <= 100);

    thread::sleep(Duration::from_millis(5));
    let dropped: HashSet<String> = sweeper::sweep_once(&store, Duration::ZERO).into_iter().collect();
    let expected: HashSet<String> = snapshot.into_keys().collect();
    assert_eq!(dropped, expected);
    assert!(store.is_empty());
}
