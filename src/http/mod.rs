//! HTTP collaborator used by the request cache.
//!
//! The cache only needs one capability from the network: issue a GET for a URL
//! with some headers and an optional payload, and hand back the decoded body.
//! [`HttpClient`] is that seam; [`ReqwestClient`] is the production
//! implementation.

mod client;
mod headers;

use color_eyre::Result;
use serde_json::Value;
use std::future::Future;

pub use client::ReqwestClient;
pub use headers::Headers;

/// Per-request options passed to the collaborator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestConfig {
  /// Request headers, sent as-is
  pub headers: Option<Headers>,
  /// Payload attached to the request, even for GET
  pub data: Option<Value>,
}

/// A successful response.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse<T> {
  pub status: u16,
  pub body: T,
}

/// Trait for HTTP backends.
///
/// Any `Ok` return is treated as success. Connection errors, timeouts and
/// non-success statuses must be surfaced as `Err`.
pub trait HttpClient: Send + Sync {
  /// Decoded response body type
  type Payload: Clone + Send + Sync + 'static;

  /// Issue a GET request.
  fn get(
    &self,
    url: &str,
    config: RequestConfig,
  ) -> impl Future<Output = Result<HttpResponse<Self::Payload>>> + Send;
}
