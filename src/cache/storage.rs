//! Cache storage trait and in-memory implementation.

use chrono::{DateTime, Duration, Utc};
use color_eyre::{eyre::eyre, Result};
use std::collections::HashMap;
use std::sync::Mutex;

use super::key::CacheKey;

/// A cached response payload.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry<T> {
  /// The decoded response body
  pub payload: T,
  /// When the entry was written
  pub cached_at: DateTime<Utc>,
  /// The entry is stale from this instant on
  pub expires_at: DateTime<Utc>,
}

impl<T> CacheEntry<T> {
  /// Create an entry written at `now` that lives for `ttl`.
  pub fn new(payload: T, now: DateTime<Utc>, ttl: Duration) -> Self {
    let expires_at = now
      .checked_add_signed(ttl)
      .unwrap_or(DateTime::<Utc>::MAX_UTC);

    Self {
      payload,
      cached_at: now,
      expires_at,
    }
  }

  /// An entry is valid strictly before its expiry.
  pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
    now < self.expires_at
  }
}

/// Trait for cache storage backends.
///
/// Stores never evict on their own; a stale entry stays until a newer one is
/// written under the same key.
pub trait CacheStore<T>: Send + Sync {
  /// Get the entry for a key, valid or not.
  fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry<T>>>;

  /// Insert or overwrite the entry for a key.
  fn store(&self, key: &CacheKey, entry: CacheEntry<T>) -> Result<()>;
}

/// Storage implementation that doesn't cache anything.
/// Used when caching is disabled - every fetch goes to the network.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopStore;

impl<T> CacheStore<T> for NoopStore {
  fn get(&self, _key: &CacheKey) -> Result<Option<CacheEntry<T>>> {
    Ok(None) // Always miss
  }

  fn store(&self, _key: &CacheKey, _entry: CacheEntry<T>) -> Result<()> {
    Ok(()) // Discard
  }
}

/// In-memory storage, lives as long as its owner.
#[derive(Debug)]
pub struct MemoryStore<T> {
  entries: Mutex<HashMap<String, CacheEntry<T>>>,
}

impl<T> MemoryStore<T> {
  pub fn new() -> Self {
    Self {
      entries: Mutex::new(HashMap::new()),
    }
  }
}

impl<T> Default for MemoryStore<T> {
  fn default() -> Self {
    Self::new()
  }
}

impl<T: Clone + Send> CacheStore<T> for MemoryStore<T> {
  fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry<T>>> {
    let entries = self
      .entries
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    Ok(entries.get(key.as_str()).cloned())
  }

  fn store(&self, key: &CacheKey, entry: CacheEntry<T>) -> Result<()> {
    let mut entries = self
      .entries
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    entries.insert(key.as_str().to_string(), entry);
    Ok(())
  }
}
