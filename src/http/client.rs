use color_eyre::{eyre::eyre, Result};
use serde_json::Value;
use std::future::Future;
use std::time::Duration;
use url::Url;

use super::{HttpClient, HttpResponse, RequestConfig};
use crate::config::HttpConfig;

const DEFAULT_USER_AGENT: &str = concat!("reqcache/", env!("CARGO_PKG_VERSION"));

/// reqwest-backed HTTP client
#[derive(Clone)]
pub struct ReqwestClient {
  client: reqwest::Client,
}

impl ReqwestClient {
  pub fn new(config: &HttpConfig) -> Result<Self> {
    let user_agent = config
      .user_agent
      .clone()
      .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());

    let mut builder = reqwest::Client::builder().user_agent(user_agent);
    if let Some(secs) = config.timeout_secs {
      builder = builder.timeout(Duration::from_secs(secs));
    }

    let client = builder
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self { client })
  }
}

impl HttpClient for ReqwestClient {
  type Payload = Value;

  fn get(
    &self,
    url: &str,
    config: RequestConfig,
  ) -> impl Future<Output = Result<HttpResponse<Value>>> + Send {
    let client = self.client.clone();
    let url = url.to_string();

    async move {
      let parsed = Url::parse(&url).map_err(|e| eyre!("Invalid URL '{}': {}", url, e))?;

      let mut request = client.get(parsed);
      if let Some(headers) = &config.headers {
        for (name, value) in headers.iter() {
          request = request.header(name, value);
        }
      }
      // GET with a body is unusual but callers rely on it being forwarded
      if let Some(data) = &config.data {
        request = request.json(data);
      }

      let response = request
        .send()
        .await
        .map_err(|e| eyre!("Failed to fetch {}: {}", url, e))?
        .error_for_status()
        .map_err(|e| eyre!("Request to {} failed: {}", url, e))?;

      let status = response.status().as_u16();
      let text = response
        .text()
        .await
        .map_err(|e| eyre!("Failed to read response body from {}: {}", url, e))?;

      Ok(HttpResponse {
        status,
        body: decode_body(text),
      })
    }
  }
}

/// Decode a response body: JSON when it parses, the raw text otherwise.
fn decode_body(text: String) -> Value {
  if text.is_empty() {
    return Value::String(text);
  }
  serde_json::from_str(&text).unwrap_or(Value::String(text))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::http::Headers;
  use serde_json::json;
  use wiremock::matchers::{body_json, header, method, path};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  fn client() -> ReqwestClient {
    ReqwestClient::new(&HttpConfig::default()).expect("failed to create client")
  }

  #[test]
  fn test_decode_body() {
    assert_eq!(decode_body(r#"{"a":1}"#.to_string()), json!({"a": 1}));
    assert_eq!(decode_body("[1,2]".to_string()), json!([1, 2]));
    assert_eq!(decode_body("plain text".to_string()), json!("plain text"));
    assert_eq!(decode_body(String::new()), json!(""));
  }

  #[tokio::test]
  async fn test_get_sends_headers_and_body() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
      .and(path("/data"))
      .and(header("x-api-key", "secret"))
      .and(body_json(json!({"q": "rust"})))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": [1, 2, 3]})))
      .expect(1)
      .mount(&server)
      .await;

    let config = RequestConfig {
      headers: Some(Headers::new().with("x-api-key", "secret")),
      data: Some(json!({"q": "rust"})),
    };
    let response = client()
      .get(&format!("{}/data", server.uri()), config)
      .await
      .expect("fetch failed");

    assert_eq!(response.status, 200);
    assert_eq!(response.body, json!({"items": [1, 2, 3]}));
  }

  #[tokio::test]
  async fn test_get_text_body() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
      .and(path("/text"))
      .respond_with(ResponseTemplate::new(200).set_body_string("hello"))
      .mount(&server)
      .await;

    let response = client()
      .get(&format!("{}/text", server.uri()), RequestConfig::default())
      .await
      .expect("fetch failed");

    assert_eq!(response.body, json!("hello"));
  }

  #[tokio::test]
  async fn test_error_status_is_err() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
      .and(path("/broken"))
      .respond_with(ResponseTemplate::new(503))
      .mount(&server)
      .await;

    let result = client()
      .get(&format!("{}/broken", server.uri()), RequestConfig::default())
      .await;

    assert!(result.is_err());
  }

  #[tokio::test]
  async fn test_cache_in_front_of_client_fetches_once() {
    use crate::cache::{MemoryStore, RequestCache};

    let server = MockServer::start().await;

    Mock::given(method("GET"))
      .and(path("/cached"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
      .expect(1)
      .mount(&server)
      .await;

    let cache = RequestCache::new(client(), MemoryStore::new());
    let url = format!("{}/cached", server.uri());

    for _ in 0..3 {
      let payload = cache.fetch(&url, None, None).await.expect("fetch failed");
      assert_eq!(payload, json!({"ok": true}));
    }
  }

  #[tokio::test]
  async fn test_invalid_url_is_err() {
    let result = client().get("not a url", RequestConfig::default()).await;
    let err = result.expect_err("expected invalid URL error");
    assert!(err.to_string().contains("Invalid URL"));
  }
}
