//! HTTP client for the air-quality forecasting API.
//!
//! Every endpoint resolves to an [`ApiEnvelope`]: HTTP-level failures are
//! folded into `success: false` with a readable error string, while
//! transport failures (DNS, connect, timeout) surface as [`ApiError`]. No
//! endpoint interprets its payload here; raw JSON goes to `crate::normalize`.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use crate::models::{ForecastParams, Pollutant};

use super::{ApiEnvelope, ApiError};

/// HTTP request timeout in seconds.
/// 30s allows for slow forecast generation while still failing fast enough
/// that a consumer is never stuck loading.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// API client for the forecasting service.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Arc<String>,
    token: Option<Arc<String>>,
}

impl ApiClient {
    /// Create a client against `base_url` (no trailing slash).
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: Arc::new(base_url.into()),
            token: None,
        })
    }

    /// Client carrying a bearer token, sharing the connection pool.
    pub fn with_token(&self, token: impl Into<String>) -> Self {
        Self {
            client: self.client.clone(),
            base_url: Arc::clone(&self.base_url),
            token: Some(Arc::new(token.into())),
        }
    }

    async fn get_envelope(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<ApiEnvelope, ApiError> {
        let url = format!("{}{}", self.base_url, path);

        let mut request = self.client.get(&url).query(query);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token.as_str());
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        debug!(path, %status, "API response received");

        if !status.is_success() {
            return Ok(ApiEnvelope::failure(
                ApiError::from_status(status, &body).to_string(),
            ));
        }

        match serde_json::from_str::<Value>(&body) {
            Ok(data) => Ok(ApiEnvelope::ok(data)),
            Err(e) => Err(ApiError::InvalidResponse(format!(
                "{} returned invalid JSON: {}",
                path, e
            ))),
        }
    }

    /// Fetch the dashboard overview (current readings, forecast preview,
    /// personalized trend, advisory tip).
    pub async fn fetch_overview(&self) -> Result<ApiEnvelope, ApiError> {
        self.get_envelope("/dashboard/overview/", &[]).await
    }

    /// Fetch which region/pollutant/year datasets exist.
    pub async fn fetch_available_datasets(&self) -> Result<ApiEnvelope, ApiError> {
        self.get_envelope("/insights/available-datasets/", &[]).await
    }

    /// Ask whether a trained model exists for the combination.
    pub async fn check_model_exists(
        &self,
        region: &str,
        pollutant: Pollutant,
        frequency: &str,
    ) -> Result<ApiEnvelope, ApiError> {
        let query = [
            ("region", region.to_string()),
            ("pollutant", pollutant.as_str().to_string()),
            ("frequency", frequency.to_string()),
        ];
        self.get_envelope("/models/check-exists/", &query).await
    }

    /// Fetch a forecast for the given request identity.
    pub async fn fetch_forecast(&self, params: &ForecastParams) -> Result<ApiEnvelope, ApiError> {
        let query = [
            ("region", params.region.clone()),
            ("pollutant", params.pollutant.as_str().to_string()),
            ("frequency", params.frequency.clone()),
            ("start_date", params.start_date.clone()),
            ("end_date", params.end_date.clone()),
        ];
        self.get_envelope("/models/predict/", &query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_construction_and_token_sharing() {
        let api = ApiClient::new("http://localhost:8000").unwrap();
        assert!(api.token.is_none());

        let with_token = api.with_token("secret");
        assert_eq!(with_token.token.as_deref().map(String::as_str), Some("secret"));
        // Base client is untouched.
        assert!(api.token.is_none());
    }
}
