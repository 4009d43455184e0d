//! Aircache - the client-side data layer for an air-quality forecasting
//! dashboard.
//!
//! The crate sits between a messy remote API and rendering code that must
//! never crash on a malformed payload. It provides:
//!
//! - a persisted TTL cache so repeated navigation does not re-hit the
//!   network ([`cache::TtlCache`]);
//! - defensive normalization of heterogeneous payloads into a canonical
//!   schema ([`normalize`], [`models::CanonicalOverview`]);
//! - per-resource fetch orchestration with request de-duplication and
//!   last-known-good retention ([`fetch::FetchOrchestrator`]);
//! - a query layer exposing the `data`/`loading`/`error`/refresh contract
//!   ([`query::QueryClient`]).
//!
//! Consumers typically construct one [`query::QueryClient`] at startup and
//! share it; everything else is plumbing behind it.

pub mod api;
pub mod cache;
pub mod config;
pub mod fetch;
pub mod models;
pub mod normalize;
pub mod query;

pub use api::{ApiClient, ApiEnvelope, ApiError};
pub use cache::{Persist, SharedCache, TtlCache};
pub use config::Config;
pub use fetch::{FetchOrchestrator, FetchState, ResourcePolicy};
pub use models::{CanonicalOverview, DatasetMatrix, ForecastParams, ModelExists, Pollutant};
pub use normalize::{normalize_overview, NormalizeError};
pub use query::{QueryClient, QueryResult};
