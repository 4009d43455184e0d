//! Cache-or-fetch orchestration for one resource type.
//!
//! The orchestrator owns the per-key fetch state machine
//! (`Idle -> Fetching -> Ready | Failed`) and guarantees:
//!
//! - a cache hit is served without touching the network;
//! - concurrent requests for the same key share a single API call;
//! - a refresh bypasses the cache and supersedes any in-flight fetch, with
//!   a generation counter so only the most recent fetch may write its
//!   result (a superseded result is handed to its awaiters but discarded
//!   from cache and state);
//! - a failed refresh restores the previous cached value instead of wiping
//!   it (last-known-good retention).

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::api::{ApiEnvelope, ApiError};
use crate::cache::{CacheEntry, Persist, SharedCache};
use crate::normalize::NormalizeError;

/// Caching and freshness rules for one resource type.
#[derive(Debug, Clone, Copy)]
pub struct ResourcePolicy {
    /// How long a cached value stays valid; `None` means until refreshed.
    pub ttl: Option<chrono::Duration>,
    /// Window during which an in-memory result is reused without even
    /// consulting the cache.
    pub stale_time: chrono::Duration,
    /// Whether cached values survive restarts.
    pub persist: Persist,
}

/// Per-key fetch lifecycle, exposed to the query layer.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchState<T> {
    Idle,
    Fetching,
    Ready { value: T, fetched_at: DateTime<Utc> },
    Failed(String),
}

type SharedFetch<T> = Shared<BoxFuture<'static, Result<T, String>>>;

struct Inner<T> {
    states: HashMap<String, FetchState<T>>,
    in_flight: HashMap<String, SharedFetch<T>>,
    generations: HashMap<String, u64>,
}

/// Per-resource cache-or-fetch engine. Cheap to clone; clones share state.
pub struct FetchOrchestrator<T> {
    cache: SharedCache,
    policy: ResourcePolicy,
    normalize: fn(&Value) -> Result<T, NormalizeError>,
    inner: Arc<Mutex<Inner<T>>>,
}

impl<T> Clone for FetchOrchestrator<T> {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
            policy: self.policy,
            normalize: self.normalize,
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> FetchOrchestrator<T>
where
    T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    pub fn new(
        cache: SharedCache,
        policy: ResourcePolicy,
        normalize: fn(&Value) -> Result<T, NormalizeError>,
    ) -> Self {
        Self {
            cache,
            policy,
            normalize,
            inner: Arc::new(Mutex::new(Inner {
                states: HashMap::new(),
                in_flight: HashMap::new(),
                generations: HashMap::new(),
            })),
        }
    }

    pub fn policy(&self) -> ResourcePolicy {
        self.policy
    }

    /// Handle to the injected cache, for application-level lifecycle work
    /// (clearing everything on logout, for instance).
    pub fn cache_handle(&self) -> SharedCache {
        Arc::clone(&self.cache)
    }

    /// Current state for `key` without blocking on any fetch.
    pub async fn state(&self, key: &str) -> FetchState<T> {
        self.inner
            .lock()
            .await
            .states
            .get(key)
            .cloned()
            .unwrap_or(FetchState::Idle)
    }

    /// Read the cached value for `key`, if any unexpired entry exists.
    pub async fn cached(&self, key: &str) -> Option<T> {
        self.cache.lock().await.get(key)
    }

    /// Serve `key` from the cache, or run `fetch` through the normalizer and
    /// cache the result. A second `load` for a key already in flight joins
    /// the pending request instead of issuing another API call; `fetch` is
    /// then dropped unpolled.
    pub async fn load<F>(&self, key: &str, fetch: F) -> Result<T, String>
    where
        F: Future<Output = Result<ApiEnvelope, ApiError>> + Send + 'static,
    {
        let cached: Option<T> = { self.cache.lock().await.get(key) };
        if let Some(value) = cached {
            debug!(key, "Cache hit");
            let mut inner = self.inner.lock().await;
            inner.states.insert(
                key.to_string(),
                FetchState::Ready {
                    value: value.clone(),
                    fetched_at: Utc::now(),
                },
            );
            return Ok(value);
        }

        let shared = {
            let mut inner = self.inner.lock().await;
            if let Some(existing) = inner.in_flight.get(key) {
                debug!(key, "Joining in-flight fetch");
                existing.clone()
            } else {
                let generation = *inner.generations.entry(key.to_string()).or_insert(0);
                let shared = self.spawn_fetch(key.to_string(), generation, fetch, None);
                inner.states.insert(key.to_string(), FetchState::Fetching);
                inner.in_flight.insert(key.to_string(), shared.clone());
                shared
            }
        };
        shared.await
    }

    /// Force a genuine network round-trip: the cached entry is removed up
    /// front and any in-flight fetch is superseded. On failure the removed
    /// entry is put back so consumers keep the last known good value.
    pub async fn refresh<F>(&self, key: &str, fetch: F) -> Result<T, String>
    where
        F: Future<Output = Result<ApiEnvelope, ApiError>> + Send + 'static,
    {
        let previous = { self.cache.lock().await.take_entry(key) };

        let shared = {
            let mut inner = self.inner.lock().await;
            inner.in_flight.remove(key);
            let generation = {
                let counter = inner.generations.entry(key.to_string()).or_insert(0);
                *counter += 1;
                *counter
            };
            let shared = self.spawn_fetch(key.to_string(), generation, fetch, previous);
            inner.states.insert(key.to_string(), FetchState::Fetching);
            inner.in_flight.insert(key.to_string(), shared.clone());
            shared
        };
        shared.await
    }

    fn spawn_fetch<F>(
        &self,
        key: String,
        generation: u64,
        fetch: F,
        restore: Option<CacheEntry>,
    ) -> SharedFetch<T>
    where
        F: Future<Output = Result<ApiEnvelope, ApiError>> + Send + 'static,
    {
        let cache = Arc::clone(&self.cache);
        let inner = Arc::clone(&self.inner);
        let normalize = self.normalize;
        let policy = self.policy;

        async move {
            let result = resolve(fetch, normalize).await;

            let mut guard = inner.lock().await;
            let current = guard.generations.get(&key).copied().unwrap_or(0);
            if current != generation {
                // A newer load/refresh owns this key now; hand the result to
                // whoever awaited this fetch but do not write it anywhere.
                debug!(key = %key, "Superseded fetch result discarded");
                return result;
            }
            guard.in_flight.remove(&key);

            match &result {
                Ok(value) => {
                    cache.lock().await.set(&key, value, policy.ttl, policy.persist);
                    guard.states.insert(
                        key.clone(),
                        FetchState::Ready {
                            value: value.clone(),
                            fetched_at: Utc::now(),
                        },
                    );
                }
                Err(message) => {
                    warn!(key = %key, error = %message, "Fetch failed");
                    if let Some(entry) = restore {
                        cache.lock().await.restore_entry(&key, entry);
                    }
                    guard.states.insert(key.clone(), FetchState::Failed(message.clone()));
                }
            }
            result
        }
        .boxed()
        .shared()
    }
}

/// Collapse the envelope and the normalizer into one readable error string.
/// Consumers cannot distinguish a transport error, a `success: false`
/// response, and a top-level normalization failure.
async fn resolve<T, F>(
    fetch: F,
    normalize: fn(&Value) -> Result<T, NormalizeError>,
) -> Result<T, String>
where
    F: Future<Output = Result<ApiEnvelope, ApiError>>,
{
    let envelope = match fetch.await {
        Ok(envelope) => envelope,
        Err(e) => return Err(e.to_string()),
    };
    if !envelope.success {
        return Err(envelope
            .error
            .unwrap_or_else(|| "Request failed".to_string()));
    }
    // `success` does not guarantee well-formed data; normalize regardless.
    let data = envelope.data.unwrap_or(Value::Null);
    normalize(&data).map_err(|e| e.to_string())
}

// ============================================================================
// Tests
// ============================================================================
