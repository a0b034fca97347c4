//! # Cancellation
//!
//! Cooperative cancellation for long sweeps. Workers poll a [`CancelToken`]
//! every few thousand samples; [`LatestRequest`] gives callers "latest
//! request wins" semantics per logical plot.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;

/// Returned by work that observed a cancelled token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("operation cancelled")]
pub struct Cancelled;

/// Shared cancellation flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Creates a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// Returns true once cancellation was requested.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Returns `Err(Cancelled)` once cancellation was requested.
    #[inline]
    pub fn check(&self) -> Result<(), Cancelled> {
        if self.is_cancelled() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Hands out one live token per key, cancelling the previous one.
///
/// # Example
///
/// ```rust
/// use bead_model::LatestRequest;
///
/// let requests = LatestRequest::new();
/// let first = requests.begin("plot-1");
/// let second = requests.begin("plot-1");
///
/// assert!(first.is_cancelled());
/// assert!(!second.is_cancelled());
/// ```
#[derive(Debug)]
pub struct LatestRequest<K> {
    live: Mutex<HashMap<K, CancelToken>>,
}

impl<K: Eq + Hash> Default for LatestRequest<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash> LatestRequest<K> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            live: Mutex::new(HashMap::new()),
        }
    }

    /// Starts a request for `key`, cancelling any request still running
    /// for it.
    pub fn begin(&self, key: K) -> CancelToken {
        let token = CancelToken::new();
        let mut live = self.live.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = live.insert(key, token.clone()) {
            previous.cancel();
        }
        token
    }

    /// Marks the request as finished. Only removes the entry if `token`
    /// is still the live one for `key`.
    pub fn finish(&self, key: &K, token: &CancelToken) {
        let mut live = self.live.lock().unwrap_or_else(PoisonError::into_inner);
        if live
            .get(key)
            .is_some_and(|current| Arc::ptr_eq(&current.flag, &token.flag))
        {
            live.remove(key);
        }
    }

    /// Number of requests currently live.
    pub fn in_flight(&self) -> usize {
        self.live.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}
