//! Time sources for entry expiry.

use chrono::{DateTime, Duration, Utc};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Source of the current time.
pub trait Clock: Send + Sync {
  fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> DateTime<Utc> {
    Utc::now()
  }
}

/// A clock that only moves when told to.
///
/// Clones share the same time, so a test can keep one handle and give another
/// to the cache.
#[derive(Debug, Clone)]
pub struct ManualClock {
  millis: Arc<AtomicI64>,
}

impl ManualClock {
  pub fn new(start: DateTime<Utc>) -> Self {
    Self {
      millis: Arc::new(AtomicI64::new(start.timestamp_millis())),
    }
  }

  /// Clock starting at the Unix epoch.
  pub fn at_epoch() -> Self {
    Self::new(DateTime::<Utc>::UNIX_EPOCH)
  }

  pub fn advance(&self, by: Duration) {
    self.millis.fetch_add(by.num_milliseconds(), Ordering::SeqCst);
  }

  pub fn set(&self, to: DateTime<Utc>) {
    self.millis.store(to.timestamp_millis(), Ordering::SeqCst);
  }
}

impl Clock for ManualClock {
  fn now(&self) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(self.millis.load(Ordering::SeqCst)).unwrap_or_default()
  }
}
