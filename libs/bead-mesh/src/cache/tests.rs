//! # Mesh Cache Tests

use super::*;
use crate::ops::sweep::Lod;
use glam::DVec3;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Barrier};
use std::thread;
use std::time::Duration;

fn key(series_hash: u64, version: u64) -> Fingerprint {
    Fingerprint {
        series_hash,
        color_column: "Color".to_string(),
        lod: Lod::Medium,
        calibration_version: version,
        params_digest: 0,
    }
}

fn mesh(tag: f64) -> MeshBuffer {
    let mut mesh = MeshBuffer::new();
    mesh.add_vertex(DVec3::splat(tag), tag);
    mesh
}

fn counting(calls: &AtomicUsize, tag: f64) -> impl FnOnce() -> MeshResult<Option<MeshBuffer>> + '_ {
    move || {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(Some(mesh(tag)))
    }
}

/// Spins until another caller is waiting on the current computation.
fn await_waiter(cache: &MeshCache) {
    while cache.stats().coalesced == 0 {
        thread::yield_now();
    }
}

#[test]
fn test_generator_called_once_per_key() {
    let cache = MeshCache::new(8);
    let calls = AtomicUsize::new(0);

    let first = cache.get_or_generate(&key(1, 0), counting(&calls, 1.0)).unwrap();
    let second = cache.get_or_generate(&key(1, 0), counting(&calls, 2.0)).unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(Arc::ptr_eq(first.as_ref().unwrap(), second.as_ref().unwrap()));
    let stats = cache.stats();
    assert_eq!((stats.hits, stats.misses, stats.computations), (1, 1, 1));
    assert_eq!(stats.hit_rate(), 0.5);
}

#[test]
fn test_calibration_version_bump_misses() {
    let cache = MeshCache::new(8);
    let calls = AtomicUsize::new(0);

    cache.get_or_generate(&key(1, 0), counting(&calls, 1.0)).unwrap();
    let after = cache.get_or_generate(&key(1, 1), counting(&calls, 2.0)).unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(after.unwrap().vertex_colors(), &[2.0]);
}

#[test]
fn test_empty_results_are_cached() {
    let cache = MeshCache::new(8);
    let calls = AtomicUsize::new(0);
    let empty = || {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(None)
    };

    assert!(cache.get_or_generate(&key(1, 0), empty).unwrap().is_none());
    assert!(cache
        .get_or_generate(&key(1, 0), counting(&calls, 1.0))
        .unwrap()
        .is_none());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_lru_eviction() {
    let cache = MeshCache::new(2);
    let calls = AtomicUsize::new(0);

    cache.get_or_generate(&key(1, 0), counting(&calls, 1.0)).unwrap();
    cache.get_or_generate(&key(2, 0), counting(&calls, 2.0)).unwrap();
    // Touch 1 so 2 becomes least recently used
    cache.get_or_generate(&key(1, 0), counting(&calls, 1.0)).unwrap();
    cache.get_or_generate(&key(3, 0), counting(&calls, 3.0)).unwrap();

    assert_eq!(cache.len(), 2);
    assert!(cache.contains(&key(1, 0)));
    assert!(!cache.contains(&key(2, 0)));
    assert!(cache.contains(&key(3, 0)));
    assert_eq!(cache.stats().evictions, 1);
}

#[test]
fn test_default_capacity() {
    let cache = MeshCache::default();
    assert_eq!(cache.capacity(), 8);
    for i in 0..20 {
        cache.get_or_generate(&key(i, 0), || Ok(None)).unwrap();
    }
    assert_eq!(cache.len(), 8);
    assert_eq!(MeshCache::new(0).capacity(), 1);
}

#[test]
fn test_errors_are_not_stored() {
    let cache = MeshCache::new(8);
    let err = cache
        .get_or_generate(&key(1, 0), || Err(MeshError::degenerate("flat")))
        .unwrap_err();
    assert!(matches!(err, MeshError::DegenerateGeometry { .. }));
    assert!(cache.is_empty());
    assert_eq!(cache.stats().failures, 1);

    let calls = AtomicUsize::new(0);
    assert!(cache.get_or_generate(&key(1, 0), counting(&calls, 1.0)).unwrap().is_some());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_panicking_generator_is_reported() {
    let cache = MeshCache::new(8);
    let result = cache.get_or_generate(&key(1, 0), || panic!("boom"));
    assert_eq!(result.unwrap_err(), MeshError::GeneratorPanicked);
    assert!(cache.is_empty());

    // The key is free again
    assert!(cache.get_or_generate(&key(1, 0), || Ok(Some(mesh(1.0)))).is_ok());
}

#[test]
fn test_invalidate_and_clear() {
    let cache = MeshCache::new(8);
    cache.get_or_generate(&key(1, 0), || Ok(None)).unwrap();
    cache.get_or_generate(&key(2, 0), || Ok(None)).unwrap();

    assert!(cache.invalidate(&key(1, 0)));
    assert!(!cache.invalidate(&key(1, 0)));
    assert_eq!(cache.len(), 1);

    cache.clear();
    assert!(cache.is_empty());
}

#[test]
fn test_concurrent_requests_coalesce() {
    let cache = Arc::new(MeshCache::new(8));
    let calls = Arc::new(AtomicUsize::new(0));
    let barrier = Arc::new(Barrier::new(8));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let cache = Arc::clone(&cache);
            let calls = Arc::clone(&calls);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                cache
                    .get_or_generate(&key(7, 0), || {
                        calls.fetch_add(1, Ordering::SeqCst);
                        thread::sleep(Duration::from_millis(50));
                        Ok(Some(mesh(7.0)))
                    })
                    .unwrap()
                    .unwrap()
            })
        })
        .collect();

    let meshes: Vec<Arc<MeshBuffer>> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(meshes.iter().all(|m| Arc::ptr_eq(m, &meshes[0])));
    let stats = cache.stats();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits + stats.coalesced, 7);
}

#[test]
fn test_waiters_share_leader_failure() {
    let cache = Arc::new(MeshCache::new(8));
    let (started_tx, started_rx) = mpsc::channel();

    let leader = {
        let cache = Arc::clone(&cache);
        thread::spawn(move || {
            cache.get_or_generate(&key(1, 0), || {
                started_tx.send(()).unwrap();
                await_waiter(&cache);
                Err(MeshError::degenerate("no bead"))
            })
        })
    };

    started_rx.recv().unwrap();
    let calls = AtomicUsize::new(0);
    let waited = cache.get_or_generate(&key(1, 0), counting(&calls, 1.0));

    assert!(matches!(waited, Err(MeshError::DegenerateGeometry { .. })));
    assert!(leader.join().unwrap().is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(cache.is_empty());
}

#[test]
fn test_waiter_retries_after_cancelled_leader() {
    let cache = Arc::new(MeshCache::new(8));
    let (started_tx, started_rx) = mpsc::channel();

    let leader = {
        let cache = Arc::clone(&cache);
        thread::spawn(move || {
            cache.get_or_generate(&key(1, 0), || {
                started_tx.send(()).unwrap();
                await_waiter(&cache);
                Err(MeshError::Cancelled)
            })
        })
    };

    started_rx.recv().unwrap();
    let calls = AtomicUsize::new(0);
    let waited = cache.get_or_generate(&key(1, 0), counting(&calls, 2.0));

    assert_eq!(leader.join().unwrap(), Err(MeshError::Cancelled));
    assert!(waited.unwrap().is_some());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(cache.contains(&key(1, 0)));
}
