//! API client module for the air-quality forecasting service.

mod client;
mod error;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use client::ApiClient;
pub use error::ApiError;

/// The uniform `{success, data, error}` envelope every endpoint resolves to.
///
/// `success` is authoritative: the orchestration layer checks it explicitly
/// and still runs `data` through a normalizer, never trusting that the
/// absence of `error` implies a well-formed payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEnvelope {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ApiEnvelope {
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_constructors() {
        let ok = ApiEnvelope::ok(json!({"a": 1}));
        assert!(ok.success && ok.error.is_none());

        let failed = ApiEnvelope::failure("boom");
        assert!(!failed.success);
        assert_eq!(failed.error.as_deref(), Some("boom"));
        assert!(failed.data.is_none());
    }

    #[test]
    fn test_envelope_tolerates_missing_fields() {
        let parsed: ApiEnvelope = serde_json::from_str(r#"{"success": true}"#).unwrap();
        assert!(parsed.success);
        assert!(parsed.data.is_none());
        assert!(parsed.error.is_none());
    }
}
