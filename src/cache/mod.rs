//! Persisted TTL cache shared by every fetch orchestrator.

mod store;

use std::sync::Arc;

use tokio::sync::Mutex;

pub use store::{CacheEntry, Persist, TtlCache};

/// Handle used to inject one cache instance into the orchestrators. Locks
/// are held only for synchronous map operations, never across awaits.
pub type SharedCache = Arc<Mutex<TtlCache>>;
