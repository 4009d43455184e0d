//! Per-resource fetch orchestration (cache-or-fetch, refresh, request
//! de-duplication).

mod orchestrator;

pub use orchestrator::{FetchOrchestrator, FetchState, ResourcePolicy};
