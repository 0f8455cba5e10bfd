mod support;

use std::sync::Arc;

use anisub::error::PreviewError;
use anisub::pool::{DEFAULT_POOL_CAPACITY, HandlePool, VideoKey};
use support::ScriptedOpener;

fn pool_with(capacity: usize, opener: Arc<ScriptedOpener>) -> HandlePool {
    HandlePool::new(opener, capacity)
}

fn key(name: &str) -> VideoKey {
    VideoKey::new(format!("/library/show/{name}.mkv"))
}

#[test]
fn seventh_distinct_key_evicts_the_first() {
    let opener = Arc::new(ScriptedOpener::new(640, 360, 10_000));
    let pool = pool_with(DEFAULT_POOL_CAPACITY, Arc::clone(&opener));

    for i in 1..=7 {
        pool.acquire(&key(&format!("k{i}"))).unwrap();
        assert!(pool.resident_count() <= DEFAULT_POOL_CAPACITY);
    }

    assert!(!pool.is_resident(&key("k1")), "oldest insertion must go");
    for i in 2..=7 {
        assert!(pool.is_resident(&key(&format!("k{i}"))));
    }

    // Re-acquiring the evicted key is a fresh open, not a cache hit.
    assert_eq!(opener.open_count(), 7);
    pool.acquire(&key("k1")).unwrap();
    assert_eq!(opener.open_count(), 8);
}

#[test]
fn hits_do_not_reopen() {
    let opener = Arc::new(ScriptedOpener::new(640, 360, 10_000));
    let pool = pool_with(DEFAULT_POOL_CAPACITY, Arc::clone(&opener));

    let first = pool.acquire(&key("ep")).unwrap();
    let second = pool.acquire(&key("ep")).unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(opener.open_count(), 1);
}

#[test]
fn eviction_ignores_recency() {
    let opener = Arc::new(ScriptedOpener::new(640, 360, 10_000));
    let pool = pool_with(3, Arc::clone(&opener));

    pool.acquire(&key("a")).unwrap();
    pool.acquire(&key("b")).unwrap();
    pool.acquire(&key("c")).unwrap();

    // Touch "a" repeatedly; FIFO must still evict it first.
    for _ in 0..5 {
        pool.acquire(&key("a")).unwrap();
    }
    pool.acquire(&key("d")).unwrap();

    assert!(!pool.is_resident(&key("a")));
    assert!(pool.is_resident(&key("b")));
}

#[test]
fn open_failure_counts_nothing_against_capacity() {
    let opener = Arc::new(ScriptedOpener::new(640, 360, 10_000));
    let pool = pool_with(2, Arc::clone(&opener));

    pool.acquire(&key("a")).unwrap();
    pool.acquire(&key("b")).unwrap();

    let err = pool.acquire(&key("missing")).unwrap_err();
    assert!(matches!(err, PreviewError::MediaMissing { .. }));
    assert_eq!(pool.resident_count(), 2);
    assert!(pool.is_resident(&key("a")));
    assert!(pool.is_resident(&key("b")));
}

#[test]
fn release_all_closes_everything() {
    let opener = Arc::new(ScriptedOpener::new(640, 360, 10_000));
    let pool = pool_with(4, Arc::clone(&opener));

    pool.acquire(&key("a")).unwrap();
    pool.acquire(&key("b")).unwrap();
    assert_eq!(pool.resident_count(), 2);

    pool.release_all();
    assert_eq!(pool.resident_count(), 0);
}

#[test]
fn concurrent_distinct_keys_all_land() {
    let opener = Arc::new(ScriptedOpener::new(640, 360, 10_000));
    let pool = Arc::new(pool_with(DEFAULT_POOL_CAPACITY, Arc::clone(&opener)));

    let mut workers = Vec::new();
    for i in 0..DEFAULT_POOL_CAPACITY {
        let pool = Arc::clone(&pool);
        workers.push(std::thread::spawn(move || {
            pool.acquire(&key(&format!("k{i}"))).unwrap();
        }));
    }
    for worker in workers {
        worker.join().unwrap();
    }

    assert_eq!(pool.resident_count(), DEFAULT_POOL_CAPACITY);
    assert_eq!(opener.open_count(), DEFAULT_POOL_CAPACITY);
}
