//! Insertion-ordered request headers.

use serde::ser::{Serialize, SerializeMap, Serializer};

/// Request headers as an ordered name → value mapping.
///
/// Order is the order in which names were first inserted. Re-inserting an
/// existing name replaces its value in place, so the serialized form (and with
/// it the cache key) only depends on what the caller built, never on hashing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
  entries: Vec<(String, String)>,
}

impl Headers {
  pub fn new() -> Self {
    Self::default()
  }

  /// Insert a header, replacing the value of an existing name in place.
  pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
    let name = name.into();
    let value = value.into();
    match self.entries.iter_mut().find(|(n, _)| *n == name) {
      Some(entry) => entry.1 = value,
      None => self.entries.push((name, value)),
    }
  }

  /// Builder-style insert.
  pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
    self.insert(name, value);
    self
  }

  pub fn get(&self, name: &str) -> Option<&str> {
    self
      .entries
      .iter()
      .find(|(n, _)| n == name)
      .map(|(_, v)| v.as_str())
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
    self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
  }

  /// Parse a `Name: value` line as given on the command line.
  pub fn parse_line(line: &str) -> Option<(String, String)> {
    let (name, value) = line.split_once(':')?;
    let name = name.trim();
    if name.is_empty() {
      return None;
    }
    Some((name.to_string(), value.trim().to_string()))
  }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Headers {
  fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
    let mut headers = Headers::new();
    for (name, value) in iter {
      headers.insert(name, value);
    }
    headers
  }
}

impl Serialize for Headers {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(self.entries.len()))?;
    for (name, value) in &self.entries {
      map.serialize_entry(name, value)?;
    }
    map.end()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_serializes_in_insertion_order() {
    let headers = Headers::new().with("b", "2").with("a", "1");
    assert_eq!(serde_json::to_string(&headers).unwrap(), r#"{"b":"2","a":"1"}"#);
  }

  #[test]
  fn test_reinsert_keeps_position() {
    let headers = Headers::new()
      .with("b", "2")
      .with("a", "1")
      .with("b", "3");
    assert_eq!(headers.len(), 2);
    assert_eq!(serde_json::to_string(&headers).unwrap(), r#"{"b":"3","a":"1"}"#);
  }

  #[test]
  fn test_empty_serializes_to_empty_object() {
    assert_eq!(serde_json::to_string(&Headers::new()).unwrap(), "{}");
  }

  #[test]
  fn test_parse_line() {
    assert_eq!(
      Headers::parse_line("Accept: application/json"),
      Some(("Accept".to_string(), "application/json".to_string()))
    );
    assert_eq!(
      Headers::parse_line("X-Time: 12:30"),
      Some(("X-Time".to_string(), "12:30".to_string()))
    );
    assert_eq!(Headers::parse_line("no-colon"), None);
    assert_eq!(Headers::parse_line(": value"), None);
  }
}
