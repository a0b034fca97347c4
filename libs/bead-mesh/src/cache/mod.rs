//! # Mesh Cache
//!
//! Memoizes swept meshes per [`Fingerprint`] with LRU eviction and request
//! coalescing.
//!
//! ## Features
//!
//! - **At most one computation per key**: concurrent callers for a key
//!   that is being computed wait for that computation
//! - **LRU eviction**: least recently used entry goes when full
//! - **Empty results are cached** like meshes
//! - **Failures are shared, not stored**: waiters see the leader's error;
//!   cancelled or panicked computations are retried by a waiter
//!
//! ## Example
//!
//! ```rust
//! use bead_mesh::{Fingerprint, Lod, MeshBuffer, MeshCache};
//! use bead_model::SampleSeries;
//!
//! let cache = MeshCache::new(8);
//! let key = Fingerprint::new(&SampleSeries::new(Vec::new()).unwrap(), "Color", Lod::Low, 0);
//!
//! let first = cache.get_or_generate(&key, || Ok(Some(MeshBuffer::new()))).unwrap();
//! let second = cache.get_or_generate(&key, || unreachable!()).unwrap();
//! assert!(first.is_some() && second.is_some());
//! assert_eq!(cache.stats().computations, 1);
//! ```

mod fingerprint;

#[cfg(test)]
mod tests;

pub use fingerprint::{hash_value, params_digest, Fingerprint};

use crate::error::{MeshError, MeshResult};
use crate::mesh::MeshBuffer;
use config::constants::{EngineConfig, DEFAULT_CACHE_CAPACITY};
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

/// A cached build result: a shared mesh, or `None` for "nothing to extrude".
pub type CachedMesh = Option<Arc<MeshBuffer>>;

/// Cache entry with metadata.
#[derive(Debug, Clone)]
struct CacheEntry {
    /// The cached result
    mesh: CachedMesh,
    /// Access tick for LRU
    last_used: u64,
}

/// Cache statistics for monitoring.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Requests answered from a stored entry
    pub hits: u64,
    /// Requests that started a computation
    pub misses: u64,
    /// Requests that waited on another caller's computation
    pub coalesced: u64,
    /// Number of evictions
    pub evictions: u64,
    /// Generator invocations
    pub computations: u64,
    /// Generator invocations that failed
    pub failures: u64,
}

impl CacheStats {
    /// Computes the hit rate (0.0 to 1.0).
    ///
    /// Coalesced waits count as hits.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.coalesced + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits + self.coalesced) as f64 / total as f64
        }
    }
}

#[derive(Debug, Clone)]
enum FlightOutcome {
    Ready(CachedMesh),
    Failed(MeshError),
    /// Leader gave up (cancelled or panicked); waiters retry
    Abandoned,
}

/// One in-progress computation that other callers can wait on.
#[derive(Debug, Default)]
struct Flight {
    outcome: Mutex<Option<FlightOutcome>>,
    done: Condvar,
}

impl Flight {
    fn wait(&self) -> FlightOutcome {
        let guard = self.outcome.lock().unwrap_or_else(PoisonError::into_inner);
        let guard = self
            .done
            .wait_while(guard, |outcome| outcome.is_none())
            .unwrap_or_else(PoisonError::into_inner);
        guard.clone().unwrap_or(FlightOutcome::Abandoned)
    }

    fn publish(&self, outcome: FlightOutcome) {
        *self.outcome.lock().unwrap_or_else(PoisonError::into_inner) = Some(outcome);
        self.done.notify_all();
    }
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<Fingerprint, CacheEntry>,
    in_flight: HashMap<Fingerprint, Arc<Flight>>,
    /// Access counter for LRU ordering
    tick: u64,
    stats: CacheStats,
}

enum Role {
    Hit(CachedMesh),
    Lead(Arc<Flight>),
    Wait(Arc<Flight>),
}

/// Thread-safe mesh cache with LRU eviction and request coalescing.
///
/// All state sits behind one lock; generators run outside it.
#[derive(Debug)]
pub struct MeshCache {
    state: Mutex<CacheState>,
    capacity: usize,
}

impl Default for MeshCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl MeshCache {
    /// Creates a cache holding at most `capacity` entries (at least one).
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(CacheState::default()),
            capacity: capacity.max(1),
        }
    }

    /// Creates a cache sized by an engine configuration.
    pub fn from_engine(engine: &EngineConfig) -> Self {
        Self::new(engine.cache_capacity)
    }

    /// Returns the cached result for `key`, computing it with `generator`
    /// on a miss.
    ///
    /// Concurrent calls with the same key run `generator` once; the others
    /// block until it finishes and share its result. A generator error is
    /// returned to every waiting caller and nothing is stored. A panic in
    /// `generator` is caught and reported as
    /// [`MeshError::GeneratorPanicked`] to this caller.
    pub fn get_or_generate<F>(&self, key: &Fingerprint, generator: F) -> MeshResult<CachedMesh>
    where
        F: FnOnce() -> MeshResult<Option<MeshBuffer>>,
    {
        let mut generator = Some(generator);
        loop {
            match self.claim(key) {
                Role::Hit(mesh) => return Ok(mesh),
                Role::Wait(flight) => match flight.wait() {
                    FlightOutcome::Ready(mesh) => return Ok(mesh),
                    FlightOutcome::Failed(error) => return Err(error),
                    FlightOutcome::Abandoned => {
                        log::trace!("cache retry {:016x}: computation abandoned", key.digest());
                    }
                },
                Role::Lead(flight) => {
                    let Some(generator) = generator.take() else {
                        // The leader returns below, so the generator is taken once
                        return Err(MeshError::invalid_request("generator already consumed"));
                    };
                    let result = panic::catch_unwind(AssertUnwindSafe(generator))
                        .unwrap_or(Err(MeshError::GeneratorPanicked));
                    return self.complete(key, &flight, result);
                }
            }
        }
    }

    fn claim(&self, key: &Fingerprint) -> Role {
        let mut guard = self.lock();
        let state = &mut *guard;
        state.tick += 1;

        if let Some(entry) = state.entries.get_mut(key) {
            entry.last_used = state.tick;
            state.stats.hits += 1;
            log::trace!("cache hit {:016x}", key.digest());
            return Role::Hit(entry.mesh.clone());
        }

        if let Some(flight) = state.in_flight.get(key) {
            state.stats.coalesced += 1;
            log::trace!("cache wait {:016x}", key.digest());
            return Role::Wait(Arc::clone(flight));
        }

        state.stats.misses += 1;
        state.stats.computations += 1;
        log::trace!("cache miss {:016x}", key.digest());
        let flight = Arc::new(Flight::default());
        state.in_flight.insert(key.clone(), Arc::clone(&flight));
        Role::Lead(flight)
    }

    fn complete(
        &self,
        key: &Fingerprint,
        flight: &Flight,
        result: MeshResult<Option<MeshBuffer>>,
    ) -> MeshResult<CachedMesh> {
        let result = result.map(|mesh| mesh.map(Arc::new));
        {
            let mut guard = self.lock();
            let state = &mut *guard;
            state.in_flight.remove(key);
            match &result {
                Ok(mesh) => {
                    while state.entries.len() >= self.capacity {
                        Self::evict_lru(state);
                    }
                    state.tick += 1;
                    state.entries.insert(
                        key.clone(),
                        CacheEntry {
                            mesh: mesh.clone(),
                            last_used: state.tick,
                        },
                    );
                }
                Err(error) => {
                    state.stats.failures += 1;
                    log::debug!("cache: computation for {:016x} failed: {}", key.digest(), error);
                }
            }
        }

        flight.publish(match &result {
            Ok(mesh) => FlightOutcome::Ready(mesh.clone()),
            Err(error) if error.is_transient() => FlightOutcome::Abandoned,
            Err(error) => FlightOutcome::Failed(error.clone()),
        });
        result
    }

    /// Evicts the least recently used entry.
    fn evict_lru(state: &mut CacheState) {
        let lru_key = state
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_used)
            .map(|(key, _)| key.clone());

        if let Some(key) = lru_key {
            state.entries.remove(&key);
            state.stats.evictions += 1;
            log::trace!("cache evict {:016x}", key.digest());
        }
    }

    /// Returns true if a result for `key` is stored. Does not touch LRU
    /// order or statistics.
    pub fn contains(&self, key: &Fingerprint) -> bool {
        self.lock().entries.contains_key(key)
    }

    /// Removes the entry for `key`; returns whether one was stored.
    pub fn invalidate(&self, key: &Fingerprint) -> bool {
        self.lock().entries.remove(key).is_some()
    }

    /// Clears all stored entries. In-flight computations still complete.
    pub fn clear(&self) {
        self.lock().entries.clear();
    }

    /// Returns the current number of stored entries.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    /// Maximum number of stored entries.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns a snapshot of the statistics.
    pub fn stats(&self) -> CacheStats {
        self.lock().stats.clone()
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
