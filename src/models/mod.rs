//! Data models for the dashboard data layer.
//!
//! - `CanonicalOverview` and its sections: the always-fully-populated
//!   overview schema consumers render from
//! - `DatasetMatrix`, `ModelExists`: dataset/model availability metadata
//! - `ForecastParams`, `ForecastSeries`: forecast request identity and result

pub mod forecast;
pub mod insight;
pub mod overview;

pub use forecast::{ForecastParams, ForecastSeries};
pub use insight::{DatasetMatrix, ModelExists, Pollutant};
pub use overview::{
    AiTip, CanonicalOverview, CurrentConditions, ForecastPoint, PersonalizedMeta,
    PersonalizedSeries, DEFAULT_TIP, DEFAULT_UNIT, UNKNOWN_LABEL,
};
