//! Canonical dashboard overview schema.
//!
//! These types are the fixed shape every consumer sees. All four sections
//! (`current`, `forecast`, `personalized`, `ai_tip`) are always present;
//! anything the server omitted or malformed is replaced by the defaults
//! defined here. The substitution rules live in `crate::normalize`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Unit reported when the server omits one.
pub const DEFAULT_UNIT: &str = "μg/m³";

/// Advisory text substituted when no tip is available.
pub const DEFAULT_TIP: &str = "No tips available at the moment.";

/// Label used wherever the server gives no usable category or region.
pub const UNKNOWN_LABEL: &str = "unknown";

/// The normalized dashboard overview payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalOverview {
    #[serde(default = "unknown_label")]
    pub region: String,
    #[serde(default)]
    pub current: CurrentConditions,
    #[serde(default)]
    pub forecast: Vec<ForecastPoint>,
    #[serde(default)]
    pub personalized: PersonalizedSeries,
    #[serde(default)]
    pub ai_tip: AiTip,
}

/// Latest pollutant readings plus the overall AQI category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    #[serde(default)]
    pub pollutants: BTreeMap<String, f64>,
    #[serde(default = "unknown_label")]
    pub aqi_category: String,
}

impl Default for CurrentConditions {
    fn default() -> Self {
        Self {
            pollutants: BTreeMap::new(),
            aqi_category: unknown_label(),
        }
    }
}

/// One predicted observation. Field names follow the forecasting backend's
/// output (`ds` = date stamp, `yhat` = predicted value).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    #[serde(default)]
    pub ds: String,
    #[serde(default)]
    pub yhat: f64,
    #[serde(default = "unknown_label")]
    pub category: String,
}

impl Default for ForecastPoint {
    fn default() -> Self {
        Self {
            ds: String::new(),
            yhat: 0.0,
            category: unknown_label(),
        }
    }
}

/// Per-user multi-year trend: parallel label/value/delta sequences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonalizedSeries {
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub values: Vec<f64>,
    #[serde(default)]
    pub deltas: Vec<Option<f64>>,
    #[serde(default = "default_unit")]
    pub unit: String,
    #[serde(default)]
    pub meta: PersonalizedMeta,
}

impl Default for PersonalizedSeries {
    fn default() -> Self {
        Self {
            labels: Vec::new(),
            values: Vec::new(),
            deltas: Vec::new(),
            unit: default_unit(),
            meta: PersonalizedMeta::default(),
        }
    }
}

impl PersonalizedSeries {
    /// Default series tagged with the region the payload was for.
    pub fn default_for_region(region: &str) -> Self {
        Self {
            meta: PersonalizedMeta::default_for_region(region),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonalizedMeta {
    #[serde(rename = "type", default = "trend_kind")]
    pub kind: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default = "unknown_label")]
    pub region: String,
}

impl Default for PersonalizedMeta {
    fn default() -> Self {
        Self {
            kind: trend_kind(),
            user_id: String::new(),
            region: unknown_label(),
        }
    }
}

impl PersonalizedMeta {
    pub fn default_for_region(region: &str) -> Self {
        Self {
            region: region.to_string(),
            ..Self::default()
        }
    }
}

/// Advisory text with a risk-level label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiTip {
    #[serde(default = "default_tip")]
    pub tip: String,
    #[serde(rename = "riskLevel", default = "unknown_label")]
    pub risk_level: String,
    #[serde(default)]
    pub personalized: bool,
}

impl Default for AiTip {
    fn default() -> Self {
        Self {
            tip: default_tip(),
            risk_level: unknown_label(),
            personalized: false,
        }
    }
}

fn unknown_label() -> String {
    UNKNOWN_LABEL.to_string()
}

fn default_unit() -> String {
    DEFAULT_UNIT.to_string()
}

fn default_tip() -> String {
    DEFAULT_TIP.to_string()
}

fn trend_kind() -> String {
    "trend".to_string()
}
