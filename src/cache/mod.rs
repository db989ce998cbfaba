//! Request-level response cache.
//!
//! This module memoizes HTTP GET results keyed by the request's identity:
//! - Keys are derived from the URL, headers and body (see [`CacheKey`])
//! - Entries live for a fixed TTL (5 minutes unless configured otherwise)
//! - Stale entries are only replaced lazily, by the next successful fetch
//! - Failed fetches are never cached

mod clock;
mod key;
mod layer;
mod storage;
mod traits;

pub use clock::{Clock, ManualClock, SystemClock};
pub use key::CacheKey;
pub use layer::{default_ttl, RequestCache, DEFAULT_TTL_MS};
pub use storage::{CacheEntry, CacheStore, MemoryStore, NoopStore};
pub use traits::{CacheResult, CacheSource};
