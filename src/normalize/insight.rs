//! Normalization for dataset availability, model lookups, and forecasts.

use serde_json::Value;

use crate::models::{DatasetMatrix, ForecastSeries, ModelExists, UNKNOWN_LABEL};

use super::overview::normalize_forecast;
use super::{seq_or_empty, NormalizeError};

/// Reshape the available-datasets payload into `region -> pollutant -> years`.
///
/// Year lists arrive either as plain arrays or wrapped as `{"years": [...]}`;
/// both forms normalize to a sorted list, anything else to an empty one.
pub fn normalize_dataset_matrix(raw: &Value) -> Result<DatasetMatrix, NormalizeError> {
    let payload = super::require_object(raw)?;
    let mut matrix = DatasetMatrix::default();

    for (region, pollutants) in payload {
        let mut by_pollutant = std::collections::BTreeMap::new();
        if let Some(pollutants) = pollutants.as_object() {
            for (pollutant, years) in pollutants {
                by_pollutant.insert(pollutant.clone(), normalize_year_list(years));
            }
        }
        matrix.0.insert(region.clone(), by_pollutant);
    }
    Ok(matrix)
}

fn normalize_year_list(value: &Value) -> Vec<i64> {
    let mut years: Vec<i64> = match value {
        Value::Array(_) => seq_or_empty(Some(value)),
        Value::Object(wrapper) => seq_or_empty(wrapper.get("years")),
        _ => Vec::new(),
    };
    years.sort_unstable();
    years
}

/// Reduce the model-existence payload to its boolean answer. Anything but
/// an explicit `true` counts as "no model".
pub fn normalize_model_exists(raw: &Value) -> Result<ModelExists, NormalizeError> {
    let payload = super::require_object(raw)?;
    Ok(ModelExists {
        exists: payload
            .get("exists")
            .and_then(Value::as_bool)
            .unwrap_or(false),
    })
}

/// Reshape a forecast response; the embedded table goes through the same
/// shape sniffing as the overview's forecast section.
pub fn normalize_forecast_series(raw: &Value) -> Result<ForecastSeries, NormalizeError> {
    let payload = super::require_object(raw)?;
    Ok(ForecastSeries {
        region: payload
            .get("region")
            .and_then(Value::as_str)
            .unwrap_or(UNKNOWN_LABEL)
            .to_string(),
        pollutant: payload
            .get("pollutant")
            .and_then(Value::as_str)
            .unwrap_or(UNKNOWN_LABEL)
            .to_string(),
        forecast: normalize_forecast(payload.get("forecast")),
    })
}
