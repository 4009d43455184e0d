//! Dataset availability metadata and model lookups.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Pollutants the forecasting service tracks. The wire names follow the
/// dataset column names (`no2_conc`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Pollutant {
    #[serde(rename = "no2_conc")]
    No2,
    #[serde(rename = "o3_conc")]
    O3,
    #[serde(rename = "so2_conc")]
    So2,
    #[serde(rename = "co_conc")]
    Co,
    #[serde(rename = "no_conc")]
    No,
}

impl Pollutant {
    /// Wire name used in API query parameters and dataset metadata keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            Pollutant::No2 => "no2_conc",
            Pollutant::O3 => "o3_conc",
            Pollutant::So2 => "so2_conc",
            Pollutant::Co => "co_conc",
            Pollutant::No => "no_conc",
        }
    }
}

impl fmt::Display for Pollutant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which datasets exist, as `region -> pollutant -> years with data`.
///
/// Serializes transparently as the nested mapping the server sends.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetMatrix(pub BTreeMap<String, BTreeMap<String, Vec<i64>>>);

impl DatasetMatrix {
    pub fn regions(&self) -> Vec<&str> {
        self.0.keys().map(String::as_str).collect()
    }

    pub fn pollutants(&self, region: &str) -> Vec<&str> {
        self.0
            .get(region)
            .map(|p| p.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn years(&self, region: &str, pollutant: &str) -> &[i64] {
        self.0
            .get(region)
            .and_then(|p| p.get(pollutant))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// True when the region (and, if given, pollutant/year) has data.
    pub fn is_valid_combination(
        &self,
        region: &str,
        pollutant: Option<&str>,
        year: Option<i64>,
    ) -> bool {
        let Some(by_pollutant) = self.0.get(region) else {
            return false;
        };
        match pollutant {
            None => true,
            Some(pollutant) => match by_pollutant.get(pollutant) {
                None => false,
                Some(years) => year.map(|y| years.contains(&y)).unwrap_or(true),
            },
        }
    }
}

/// Answer from the model-existence check for a region/pollutant/frequency.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelExists {
    #[serde(default)]
    pub exists: bool,
}
