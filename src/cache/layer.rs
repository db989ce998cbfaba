//! Cache layer that orchestrates caching logic with network fetching.

use chrono::Duration;
use color_eyre::{eyre::eyre, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

use super::clock::{Clock, SystemClock};
use super::key::CacheKey;
use super::storage::{CacheEntry, CacheStore};
use super::traits::CacheResult;
use crate::http::{Headers, HttpClient, RequestConfig};

/// How long a fetched payload is served from memory by default (5 minutes).
pub const DEFAULT_TTL_MS: i64 = 300_000;

pub fn default_ttl() -> Duration {
  Duration::milliseconds(DEFAULT_TTL_MS)
}

/// Cache in front of an HTTP client.
///
/// Identical requests (same URL, headers and body) made within the TTL are
/// answered from the store; anything else goes to the network and the result
/// is stored. Failed fetches are never cached.
pub struct RequestCache<C, S>
where
  C: HttpClient,
  S: CacheStore<C::Payload>,
{
  client: Arc<C>,
  storage: Arc<S>,
  clock: Arc<dyn Clock>,
  /// How long a fetched payload stays valid
  ttl: Duration,
  /// Per-key locks, present when single-flight is enabled
  inflight: Option<Arc<InFlight>>,
}

impl<C, S> RequestCache<C, S>
where
  C: HttpClient,
  S: CacheStore<C::Payload>,
{
  /// Create a new cache with the given client and storage backend.
  pub fn new(client: C, storage: S) -> Self {
    Self {
      client: Arc::new(client),
      storage: Arc::new(storage),
      clock: Arc::new(SystemClock),
      ttl: default_ttl(),
      inflight: None,
    }
  }

  /// Set how long fetched payloads stay valid.
  pub fn with_ttl(mut self, ttl: Duration) -> Self {
    self.ttl = ttl;
    self
  }

  /// Replace the time source.
  pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
    self.clock = Arc::new(clock);
    self
  }

  /// Coalesce concurrent misses for the same key into a single fetch.
  ///
  /// Off by default: concurrent misses each hit the network and the last
  /// one to finish wins.
  pub fn with_single_flight(mut self, enabled: bool) -> Self {
    self.inflight = enabled.then(|| Arc::new(InFlight::default()));
    self
  }

  pub fn ttl(&self) -> Duration {
    self.ttl
  }

  /// Return the cached payload for this request if still valid, otherwise
  /// fetch it and cache the result.
  pub async fn fetch(
    &self,
    url: &str,
    headers: Option<&Headers>,
    body: Option<&Value>,
  ) -> Result<C::Payload> {
    let result = self.fetch_with_source(url, headers, body).await?;
    Ok(result.data)
  }

  /// Like [`fetch`](Self::fetch), but also reports whether the payload was
  /// served from cache.
  pub async fn fetch_with_source(
    &self,
    url: &str,
    headers: Option<&Headers>,
    body: Option<&Value>,
  ) -> Result<CacheResult<C::Payload>> {
    if url.is_empty() {
      return Err(eyre!("Cannot fetch an empty URL"));
    }

    let key = CacheKey::derive(url, headers, body)?;

    if let Some(hit) = self.lookup(&key)? {
      debug!(url, key = %key.digest(), "cache hit");
      return Ok(hit);
    }

    let Some(inflight) = &self.inflight else {
      return self.fetch_and_store(url, &key, headers, body).await;
    };

    let lock = inflight.lock_for(&key)?;
    let result = {
      let _guard = lock.lock().await;
      self.lookup_or_fetch(url, &key, headers, body).await
    };
    inflight.release(&key, lock)?;

    result
  }

  /// Re-check the store before fetching; another caller holding the key lock
  /// may have filled it while we waited.
  async fn lookup_or_fetch(
    &self,
    url: &str,
    key: &CacheKey,
    headers: Option<&Headers>,
    body: Option<&Value>,
  ) -> Result<CacheResult<C::Payload>> {
    if let Some(hit) = self.lookup(key)? {
      debug!(url, key = %key.digest(), "cache hit after waiting on in-flight fetch");
      return Ok(hit);
    }
    self.fetch_and_store(url, key, headers, body).await
  }

  /// Get a valid entry for the key, if any.
  fn lookup(&self, key: &CacheKey) -> Result<Option<CacheResult<C::Payload>>> {
    let Some(entry) = self.storage.get(key)? else {
      return Ok(None);
    };

    if !entry.is_valid(self.clock.now()) {
      // Left in place; the next successful fetch overwrites it
      return Ok(None);
    }

    Ok(Some(CacheResult::from_cache(entry.payload, entry.cached_at)))
  }

  async fn fetch_and_store(
    &self,
    url: &str,
    key: &CacheKey,
    headers: Option<&Headers>,
    body: Option<&Value>,
  ) -> Result<CacheResult<C::Payload>> {
    debug!(url, key = %key.digest(), "cache miss, fetching");

    let config = RequestConfig {
      headers: headers.cloned(),
      data: body.cloned(),
    };

    let response = match self.client.get(url, config).await {
      Ok(response) => response,
      Err(e) => {
        warn!(url, key = %key.digest(), error = %e, "fetch failed, nothing cached");
        return Err(e);
      }
    };

    let entry = CacheEntry::new(response.body.clone(), self.clock.now(), self.ttl);
    debug!(url, key = %key.digest(), expires_at = %entry.expires_at, "cached response");
    self.storage.store(key, entry)?;

    Ok(CacheResult::from_network(response.body))
  }
}

impl<C, S> RequestCache<C, S>
where
  C: HttpClient<Payload = Value>,
  S: CacheStore<Value>,
{
  /// Fetch through the cache and decode the JSON payload into `D`.
  ///
  /// A decode failure is returned as an error; the raw payload stays cached.
  pub async fn fetch_json<D: DeserializeOwned>(
    &self,
    url: &str,
    headers: Option<&Headers>,
    body: Option<&Value>,
  ) -> Result<D> {
    let payload = self.fetch(url, headers, body).await?;
    serde_json::from_value(payload)
      .map_err(|e| eyre!("Failed to decode response from {}: {}", url, e))
  }
}

impl<C, S> Clone for RequestCache<C, S>
where
  C: HttpClient,
  S: CacheStore<C::Payload>,
{
  fn clone(&self) -> Self {
    Self {
      client: Arc::clone(&self.client),
      storage: Arc::clone(&self.storage),
      clock: Arc::clone(&self.clock),
      ttl: self.ttl,
      inflight: self.inflight.clone(),
    }
  }
}

/// Per-key async locks for single-flight fetching.
#[derive(Default)]
struct InFlight {
  locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl InFlight {
  fn lock_for(&self, key: &CacheKey) -> Result<Arc<tokio::sync::Mutex<()>>> {
    let mut locks = self
      .locks
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    Ok(Arc::clone(
      locks.entry(key.as_str().to_string()).or_default(),
    ))
  }

  /// Drop the key's lock from the map once no other caller holds it.
  fn release(&self, key: &CacheKey, lock: Arc<tokio::sync::Mutex<()>>) -> Result<()> {
    let mut locks = self
      .locks
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    // One reference in the map, one in `lock`
    if Arc::strong_count(&lock) == 2 {
      locks.remove(key.as_str());
    }
    Ok(())
  }
}
