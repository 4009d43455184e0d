//! Declarative query layer over the fetch orchestrators.
//!
//! Maps each resource's identity to a stable cache key, applies stale-time
//! gating, and exposes the four-field consumer contract
//! (`data` / `loading` / `error` / refresh).

mod client;

pub use client::QueryClient;

use crate::models::{ForecastParams, Pollutant};

/// Cache key for the dashboard overview resource.
pub const OVERVIEW_KEY: &str = "dashboard-overview";

/// Cache key for the dataset availability matrix.
pub const DATASETS_KEY: &str = "insight-datasets";

/// Stable key for one model-existence check.
pub fn model_exists_key(region: &str, pollutant: Pollutant, frequency: &str) -> String {
    format!("model-exists-{}-{}-{}", region, pollutant.as_str(), frequency)
}

/// Stable key for one forecast request; every parameter participates.
pub fn forecast_key(params: &ForecastParams) -> String {
    format!(
        "forecast-{}-{}-{}-{}-{}",
        params.region, params.pollutant.as_str(), params.frequency, params.start_date, params.end_date
    )
}

/// What a consumer sees for one resource. This is the sole outward surface:
/// rendering code never receives raw errors or partial payloads.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult<T> {
    /// Normalized data, or the last known good value after a failed refresh.
    pub data: Option<T>,
    pub loading: bool,
    pub error: Option<String>,
}

impl<T> QueryResult<T> {
    pub(crate) fn ready(value: T) -> Self {
        Self {
            data: Some(value),
            loading: false,
            error: None,
        }
    }
}
