//! The `QueryClient`: one orchestrator per resource type behind a uniform
//! query/refresh API.

use chrono::{Duration, Utc};
use tracing::warn;

use crate::api::ApiClient;
use crate::cache::{Persist, SharedCache, TtlCache};
use crate::config::Config;
use crate::fetch::{FetchOrchestrator, FetchState, ResourcePolicy};
use crate::models::{
    CanonicalOverview, DatasetMatrix, ForecastParams, ForecastSeries, ModelExists, Pollutant,
};
use crate::normalize::{
    normalize_dataset_matrix, normalize_forecast_series, normalize_model_exists,
    normalize_overview,
};

use super::{forecast_key, model_exists_key, QueryResult, DATASETS_KEY, OVERVIEW_KEY};

/// The overview never self-expires; freshness is driven by explicit refresh.
/// Within the stale window re-renders reuse the in-memory result outright.
const OVERVIEW_STALE_MINUTES: i64 = 5;

/// Model availability changes only when someone trains or deletes a model.
const MODEL_EXISTS_TTL_MINUTES: i64 = 10;
const MODEL_EXISTS_STALE_MINUTES: i64 = 10;

/// Dataset availability changes only on uploads.
const DATASETS_TTL_MINUTES: i64 = 30;
const DATASETS_STALE_MINUTES: i64 = 5;

/// Forecasts are recomputed server-side and are cheap to re-request; they
/// are also the one resource kept out of the disk snapshot.
const FORECAST_TTL_MINUTES: i64 = 5;
const FORECAST_STALE_MINUTES: i64 = 5;

/// Entry point for consumers: owns the API client, the shared cache, and one
/// orchestrator per resource type.
pub struct QueryClient {
    api: ApiClient,
    overview: FetchOrchestrator<CanonicalOverview>,
    datasets: FetchOrchestrator<DatasetMatrix>,
    model_exists: FetchOrchestrator<ModelExists>,
    forecast: FetchOrchestrator<ForecastSeries>,
}

impl QueryClient {
    /// Build from configuration: API client against the configured base URL
    /// and a cache rehydrated from the configured snapshot path.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let cache = match config.cache_path() {
            Ok(path) => TtlCache::load(path),
            Err(e) => {
                warn!(error = %e, "No cache directory available, caching in memory only");
                TtlCache::in_memory()
            }
        };
        let api = ApiClient::new(&config.api_base_url)?;
        Ok(Self::with_parts(api, cache.into_shared()))
    }

    /// Wire the orchestrators onto an existing client and cache. Useful when
    /// the application manages the cache lifecycle itself (e.g. clearing it
    /// on logout).
    pub fn with_parts(api: ApiClient, cache: SharedCache) -> Self {
        let overview = FetchOrchestrator::new(
            cache.clone(),
            ResourcePolicy {
                ttl: None,
                stale_time: Duration::minutes(OVERVIEW_STALE_MINUTES),
                persist: Persist::Durable,
            },
            normalize_overview,
        );
        let datasets = FetchOrchestrator::new(
            cache.clone(),
            ResourcePolicy {
                ttl: Some(Duration::minutes(DATASETS_TTL_MINUTES)),
                stale_time: Duration::minutes(DATASETS_STALE_MINUTES),
                persist: Persist::Durable,
            },
            normalize_dataset_matrix,
        );
        let model_exists = FetchOrchestrator::new(
            cache.clone(),
            ResourcePolicy {
                ttl: Some(Duration::minutes(MODEL_EXISTS_TTL_MINUTES)),
                stale_time: Duration::minutes(MODEL_EXISTS_STALE_MINUTES),
                persist: Persist::Durable,
            },
            normalize_model_exists,
        );
        let forecast = FetchOrchestrator::new(
            cache,
            ResourcePolicy {
                ttl: Some(Duration::minutes(FORECAST_TTL_MINUTES)),
                stale_time: Duration::minutes(FORECAST_STALE_MINUTES),
                persist: Persist::SessionOnly,
            },
            normalize_forecast_series,
        );
        Self {
            api,
            overview,
            datasets,
            model_exists,
            forecast,
        }
    }

    // ===== Dashboard overview =====

    pub async fn overview(&self) -> QueryResult<CanonicalOverview> {
        let api = self.api.clone();
        Self::run(&self.overview, OVERVIEW_KEY, async move {
            api.fetch_overview().await
        })
        .await
    }

    pub async fn refresh_overview(&self) -> QueryResult<CanonicalOverview> {
        let api = self.api.clone();
        let result = self
            .overview
            .refresh(OVERVIEW_KEY, async move { api.fetch_overview().await })
            .await;
        Self::finish(&self.overview, OVERVIEW_KEY, result).await
    }

    /// Non-blocking view of the overview resource, for consumers polling a
    /// fetch already in flight.
    pub async fn overview_snapshot(&self) -> QueryResult<CanonicalOverview> {
        Self::snapshot(&self.overview, OVERVIEW_KEY).await
    }

    // ===== Dataset availability =====

    pub async fn available_datasets(&self) -> QueryResult<DatasetMatrix> {
        let api = self.api.clone();
        Self::run(&self.datasets, DATASETS_KEY, async move {
            api.fetch_available_datasets().await
        })
        .await
    }

    pub async fn refresh_available_datasets(&self) -> QueryResult<DatasetMatrix> {
        let api = self.api.clone();
        let result = self
            .datasets
            .refresh(DATASETS_KEY, async move {
                api.fetch_available_datasets().await
            })
            .await;
        Self::finish(&self.datasets, DATASETS_KEY, result).await
    }

    // ===== Model existence =====

    pub async fn model_exists(
        &self,
        region: &str,
        pollutant: Pollutant,
        frequency: &str,
    ) -> QueryResult<ModelExists> {
        let key = model_exists_key(region, pollutant, frequency);
        let api = self.api.clone();
        let region = region.to_string();
        let frequency = frequency.to_string();
        Self::run(&self.model_exists, &key, async move {
            api.check_model_exists(&region, pollutant, &frequency).await
        })
        .await
    }

    pub async fn refresh_model_exists(
        &self,
        region: &str,
        pollutant: Pollutant,
        frequency: &str,
    ) -> QueryResult<ModelExists> {
        let key = model_exists_key(region, pollutant, frequency);
        let api = self.api.clone();
        let region = region.to_string();
        let frequency = frequency.to_string();
        let result = self
            .model_exists
            .refresh(&key, async move {
                api.check_model_exists(&region, pollutant, &frequency).await
            })
            .await;
        Self::finish(&self.model_exists, &key, result).await
    }

    // ===== Forecast =====

    pub async fn forecast(&self, params: &ForecastParams) -> QueryResult<ForecastSeries> {
        let key = forecast_key(params);
        let api = self.api.clone();
        let params = params.clone();
        Self::run(&self.forecast, &key, async move {
            api.fetch_forecast(&params).await
        })
        .await
    }

    pub async fn refresh_forecast(&self, params: &ForecastParams) -> QueryResult<ForecastSeries> {
        let key = forecast_key(params);
        let api = self.api.clone();
        let params = params.clone();
        let result = self
            .forecast
            .refresh(&key, async move { api.fetch_forecast(&params).await })
            .await;
        Self::finish(&self.forecast, &key, result).await
    }

    // ===== Shared plumbing =====

    /// Stale-time gate, then the orchestrator's cache-or-fetch path. Within
    /// the stale window the in-memory result is reused without even
    /// consulting the cache, so rapid re-renders cost nothing.
    async fn run<T, F>(
        orchestrator: &FetchOrchestrator<T>,
        key: &str,
        fetch: F,
    ) -> QueryResult<T>
    where
        T: Clone + serde::Serialize + serde::de::DeserializeOwned + Send + Sync + 'static,
        F: std::future::Future<Output = Result<crate::api::ApiEnvelope, crate::api::ApiError>>
            + Send
            + 'static,
    {
        if let FetchState::Ready { value, fetched_at } = orchestrator.state(key).await {
            if Utc::now() - fetched_at < orchestrator.policy().stale_time {
                return QueryResult::ready(value);
            }
        }
        let result = orchestrator.load(key, fetch).await;
        Self::finish(orchestrator, key, result).await
    }

    /// Fold a load/refresh outcome into the consumer contract. On failure
    /// the cache's last known good value (if any) rides along with the error.
    async fn finish<T>(
        orchestrator: &FetchOrchestrator<T>,
        key: &str,
        result: Result<T, String>,
    ) -> QueryResult<T>
    where
        T: Clone + serde::Serialize + serde::de::DeserializeOwned + Send + Sync + 'static,
    {
        match result {
            Ok(value) => QueryResult::ready(value),
            Err(error) => QueryResult {
                data: orchestrator.cached(key).await,
                loading: false,
                error: Some(error),
            },
        }
    }

    async fn snapshot<T>(orchestrator: &FetchOrchestrator<T>, key: &str) -> QueryResult<T>
    where
        T: Clone + serde::Serialize + serde::de::DeserializeOwned + Send + Sync + 'static,
    {
        match orchestrator.state(key).await {
            FetchState::Idle => QueryResult {
                data: orchestrator.cached(key).await,
                loading: false,
                error: None,
            },
            FetchState::Fetching => QueryResult {
                data: None,
                loading: true,
                error: None,
            },
            FetchState::Ready { value, .. } => QueryResult::ready(value),
            FetchState::Failed(error) => QueryResult {
                data: orchestrator.cached(key).await,
                loading: false,
                error: Some(error),
            },
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiEnvelope, ApiError};
    use crate::normalize::NormalizeError;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn norm_string(value: &Value) -> Result<String, NormalizeError> {
        value
            .as_str()
            .map(str::to_string)
            .ok_or(NormalizeError::NotAnObject("test"))
    }

    fn orchestrator(stale_minutes: i64) -> FetchOrchestrator<String> {
        FetchOrchestrator::new(
            TtlCache::in_memory().into_shared(),
            ResourcePolicy {
                ttl: Some(Duration::minutes(10)),
                stale_time: Duration::minutes(stale_minutes),
                persist: Persist::Durable,
            },
            norm_string,
        )
    }

    fn counted_ok(
        calls: &Arc<AtomicUsize>,
        value: &str,
    ) -> impl std::future::Future<Output = Result<ApiEnvelope, ApiError>> + Send + 'static {
        let calls = Arc::clone(calls);
        let value = value.to_string();
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(ApiEnvelope::ok(json!(value)))
        }
    }

    #[tokio::test]
    async fn test_stale_window_reuses_memory_without_cache_lookup() {
        let orch = orchestrator(5);
        let calls = Arc::new(AtomicUsize::new(0));

        let first = QueryClient::run(&orch, "k", counted_ok(&calls, "v1")).await;
        assert_eq!(first.data.as_deref(), Some("v1"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Wipe the cache underneath; within the stale window the gate must
        // serve purely from memory and never notice.
        orch_cache(&orch).lock().await.clear_all();

        let second = QueryClient::run(&orch, "k", counted_ok(&calls, "v2")).await;
        assert_eq!(second.data.as_deref(), Some("v1"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(second.error.is_none());
    }

    #[tokio::test]
    async fn test_zero_stale_window_falls_through_to_cache() {
        let orch = orchestrator(0);
        let calls = Arc::new(AtomicUsize::new(0));

        QueryClient::run(&orch, "k", counted_ok(&calls, "v1")).await;
        // Past the (zero-width) stale window: falls through to the cache,
        // which still holds v1, so no second network call either.
        let second = QueryClient::run(&orch, "k", counted_ok(&calls, "v2")).await;
        assert_eq!(second.data.as_deref(), Some("v1"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Now also clear the cache: the same query must hit the network.
        orch_cache(&orch).lock().await.clear_all();
        let third = QueryClient::run(&orch, "k", counted_ok(&calls, "v3")).await;
        assert_eq!(third.data.as_deref(), Some("v3"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_refresh_reports_error_with_last_known_good() {
        let orch = orchestrator(0);
        let calls = Arc::new(AtomicUsize::new(0));

        QueryClient::run(&orch, "k", counted_ok(&calls, "good")).await;

        let result = orch
            .refresh("k", async { Ok(ApiEnvelope::failure("backend down")) })
            .await;
        let folded = QueryClient::finish(&orch, "k", result).await;

        assert_eq!(folded.error.as_deref(), Some("backend down"));
        assert_eq!(folded.data.as_deref(), Some("good"));
        assert!(!folded.loading);
    }

    #[tokio::test]
    async fn test_failed_load_without_history_has_no_data() {
        let orch = orchestrator(0);
        let result = orch
            .load("k", async { Ok(ApiEnvelope::failure("nope")) })
            .await;
        let folded = QueryClient::finish(&orch, "k", result).await;
        assert_eq!(folded.data, None);
        assert_eq!(folded.error.as_deref(), Some("nope"));
    }

    #[tokio::test]
    async fn test_snapshot_reflects_state_machine() {
        let orch = orchestrator(5);

        let idle = QueryClient::snapshot(&orch, "k").await;
        assert!(idle.data.is_none() && idle.error.is_none() && !idle.loading);

        orch.load("k", async { Ok(ApiEnvelope::ok(json!("v"))) })
            .await
            .unwrap();
        let ready = QueryClient::snapshot(&orch, "k").await;
        assert_eq!(ready.data.as_deref(), Some("v"));
        assert!(!ready.loading);
    }

    #[test]
    fn test_with_parts_builds_offline() {
        let api = ApiClient::new("http://localhost:8000").unwrap();
        let client = QueryClient::with_parts(api, TtlCache::in_memory().into_shared());
        // No network activity on construction.
        drop(client);
    }

    /// Test-only access to the orchestrator's shared cache handle.
    fn orch_cache<T>(orch: &FetchOrchestrator<T>) -> SharedCache
    where
        T: Clone + serde::Serialize + serde::de::DeserializeOwned + Send + Sync + 'static,
    {
        orch.cache_handle()
    }
}
