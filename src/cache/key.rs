//! Cache key derivation.

use color_eyre::{eyre::eyre, Result};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fmt;

use crate::http::Headers;

const KEY_DELIMITER: &str = "|";

/// Identity of a request: URL, headers and body.
///
/// The key is the URL followed by the compact JSON of the headers (if given)
/// and of the body (if given and truthy), joined with `|`. Header order is the
/// caller's insertion order, so `{a, b}` and `{b, a}` are different keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
  pub fn derive(url: &str, headers: Option<&Headers>, body: Option<&Value>) -> Result<Self> {
    let mut parts = vec![url.to_string()];

    // An empty header map still counts as provided
    if let Some(headers) = headers {
      let json = serde_json::to_string(headers)
        .map_err(|e| eyre!("Failed to serialize headers for cache key: {}", e))?;
      parts.push(json);
    }

    if let Some(body) = body.filter(|b| is_truthy(b)) {
      parts.push(body.to_string());
    }

    Ok(Self(parts.join(KEY_DELIMITER)))
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }

  /// SHA256 of the key, safe to log (headers may carry credentials).
  pub fn digest(&self) -> String {
    let mut hasher = Sha256::new();
    hasher.update(self.0.as_bytes());
    hex::encode(hasher.finalize())
  }
}

impl fmt::Display for CacheKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// Whether a body takes part in the key.
///
/// `null`, `false`, `0` and `""` are treated as no body at all. Empty objects
/// and arrays are kept.
fn is_truthy(value: &Value) -> bool {
  match value {
    Value::Null => false,
    Value::Bool(b) => *b,
    Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
    Value::String(s) => !s.is_empty(),
    Value::Array(_) | Value::Object(_) => true,
  }
}
