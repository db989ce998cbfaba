//! In-memory response cache for HTTP GET requests.
//!
//! ```ignore
//! let client = ReqwestClient::new(&HttpConfig::default())?;
//! let cache = RequestCache::new(client, MemoryStore::new());
//!
//! // Network
//! let first = cache.fetch("https://api.example.com/data", None, None).await?;
//! // Memory, for the next 5 minutes
//! let second = cache.fetch("https://api.example.com/data", None, None).await?;
//! ```

pub mod cache;
pub mod config;
pub mod http;
pub mod logging;

pub use cache::{CacheKey, CacheResult, CacheSource, MemoryStore, NoopStore, RequestCache};
pub use config::{Config, HttpConfig};
pub use http::{Headers, HttpClient, ReqwestClient};
