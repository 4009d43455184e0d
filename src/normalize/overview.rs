//! Defensive normalization of the dashboard overview payload.
//!
//! Every section is resolved independently: a malformed `forecast` never
//! touches a valid `current`, and no malformation below the top level is an
//! error. The one failure case is a top-level payload that is not an object,
//! since there is nothing sensible to default from.

use serde_json::Value;

use crate::models::{
    AiTip, CanonicalOverview, CurrentConditions, ForecastPoint, PersonalizedMeta,
    PersonalizedSeries, DEFAULT_TIP, DEFAULT_UNIT, UNKNOWN_LABEL,
};

use super::table::{to_record_sequence, TableShape};
use super::{seq_or_empty, NormalizeError};

/// Reshape a raw overview payload into the canonical schema.
pub fn normalize_overview(raw: &Value) -> Result<CanonicalOverview, NormalizeError> {
    let payload = super::require_object(raw)?;
    let region = string_or(payload.get("region"), UNKNOWN_LABEL);

    Ok(CanonicalOverview {
        current: normalize_current(payload.get("current")),
        forecast: normalize_forecast(payload.get("forecast")),
        personalized: normalize_personalized(payload.get("personalized"), &region),
        ai_tip: normalize_tip(payload.get("ai_tip")),
        region,
    })
}

/// Forecast section: absent or unrecognizable shapes become an empty
/// sequence; a transposition is rebuilt into row records first.
pub(crate) fn normalize_forecast(value: Option<&Value>) -> Vec<ForecastPoint> {
    let Some(value) = value else {
        return Vec::new();
    };
    match TableShape::classify(value) {
        TableShape::Rows(rows) => rows.iter().filter_map(forecast_point).collect(),
        TableShape::Transposed(table) => to_record_sequence(table)
            .iter()
            .filter_map(forecast_point)
            .collect(),
        TableShape::Other => Vec::new(),
    }
}

fn forecast_point(record: &Value) -> Option<ForecastPoint> {
    let record = record.as_object()?;
    Some(ForecastPoint {
        ds: string_or(record.get("ds"), ""),
        yhat: record.get("yhat").and_then(Value::as_f64).unwrap_or(0.0),
        category: string_or(record.get("category"), UNKNOWN_LABEL),
    })
}

fn normalize_current(value: Option<&Value>) -> CurrentConditions {
    let Some(section) = value.and_then(Value::as_object) else {
        return CurrentConditions::default();
    };
    let pollutants = section
        .get("pollutants")
        .and_then(Value::as_object)
        .map(|readings| {
            readings
                .iter()
                .filter_map(|(name, reading)| reading.as_f64().map(|v| (name.clone(), v)))
                .collect()
        })
        .unwrap_or_default();
    CurrentConditions {
        pollutants,
        aqi_category: string_or(section.get("aqi_category"), UNKNOWN_LABEL),
    }
}

/// The three sequences are fixed up independently, not all-or-nothing: a
/// bad `deltas` leaves valid `labels`/`values` untouched.
fn normalize_personalized(value: Option<&Value>, region: &str) -> PersonalizedSeries {
    let Some(section) = value.and_then(Value::as_object) else {
        return PersonalizedSeries::default_for_region(region);
    };
    PersonalizedSeries {
        labels: seq_or_empty(section.get("labels")),
        values: seq_or_empty(section.get("values")),
        deltas: seq_or_empty(section.get("deltas")),
        unit: string_or(section.get("unit"), DEFAULT_UNIT),
        meta: normalize_meta(section.get("meta"), region),
    }
}

fn normalize_meta(value: Option<&Value>, region: &str) -> PersonalizedMeta {
    let Some(meta) = value.and_then(Value::as_object) else {
        return PersonalizedMeta::default_for_region(region);
    };
    PersonalizedMeta {
        kind: string_or(meta.get("type"), "trend"),
        user_id: string_or(meta.get("user_id"), ""),
        region: string_or(meta.get("region"), region),
    }
}

fn normalize_tip(value: Option<&Value>) -> AiTip {
    let Some(section) = value.and_then(Value::as_object) else {
        return AiTip::default();
    };
    AiTip {
        tip: string_or(section.get("tip"), DEFAULT_TIP),
        risk_level: string_or(section.get("riskLevel"), UNKNOWN_LABEL),
        personalized: section
            .get("personalized")
            .and_then(Value::as_bool)
            .unwrap_or(false),
    }
}

fn string_or(value: Option<&Value>, fallback: &str) -> String {
    value
        .and_then(Value::as_str)
        .unwrap_or(fallback)
        .to_string()
}
