//! Forecast request parameters and the normalized forecast response.

use serde::{Deserialize, Serialize};

use super::insight::Pollutant;
use super::overview::ForecastPoint;

/// Identity of one forecast request. The full tuple participates in the
/// cache key, so two requests differing in any field are distinct resources.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ForecastParams {
    pub region: String,
    pub pollutant: Pollutant,
    pub frequency: String,
    pub start_date: String,
    pub end_date: String,
}

/// Normalized response from the forecast endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForecastSeries {
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub pollutant: String,
    #[serde(default)]
    pub forecast: Vec<ForecastPoint>,
}
