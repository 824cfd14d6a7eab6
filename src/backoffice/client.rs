//! Remote Call Gateway: HTTP calls to the backoffice API.
//!
//! Every call attaches the bearer credential from the Token Store when one
//! is present. Non-2xx answers become [`ServiceError::Status`] with the
//! body's `message` (or `HTTP <status>`), and `204 No Content` yields no
//! body.

use reqwest::{Method, RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use tracing::debug;
use url::Url;

use super::api_types::{Envelope, ErrorBody};
use crate::config::ApiConfig;
use crate::error::ServiceError;
use crate::session::TokenStore;

/// User agent for gateway requests.
const USER_AGENT_VALUE: &str = concat!("stockroom/", env!("CARGO_PKG_VERSION"));

/// Backoffice API client
#[derive(Clone)]
pub struct ApiClient {
  http: reqwest::Client,
  /// Base URL without trailing slash; paths are appended verbatim
  base_url: String,
  tokens: Arc<dyn TokenStore>,
}

impl ApiClient {
  pub fn new(config: &ApiConfig, tokens: Arc<dyn TokenStore>) -> Result<Self, ServiceError> {
    Url::parse(&config.url).map_err(|e| ServiceError::InvalidRequest {
      message: format!("invalid base URL {}: {}", config.url, e),
    })?;

    let http = reqwest::Client::builder()
      .timeout(config.timeout())
      .user_agent(USER_AGENT_VALUE)
      .build()
      .map_err(|e| ServiceError::Network {
        message: format!("failed to create HTTP client: {}", e),
      })?;

    Ok(Self {
      http,
      base_url: config.url.trim_end_matches('/').to_string(),
      tokens,
    })
  }

  pub fn base_url(&self) -> &str {
    &self.base_url
  }

  /// `scheme://host:port` of the gateway, the scope of stored credentials.
  pub fn origin(&self) -> String {
    origin_of(&self.base_url)
  }

  pub fn tokens(&self) -> &Arc<dyn TokenStore> {
    &self.tokens
  }

  pub fn get(&self, path: &str) -> Call {
    self.call(Method::GET, path)
  }

  pub fn post(&self, path: &str) -> Call {
    self.call(Method::POST, path)
  }

  pub fn put(&self, path: &str) -> Call {
    self.call(Method::PUT, path)
  }

  pub fn delete(&self, path: &str) -> Call {
    self.call(Method::DELETE, path)
  }

  pub fn call(&self, method: Method, path: &str) -> Call {
    let request = Url::parse(&format!("{}{}", self.base_url, path))
      .map_err(|e| ServiceError::InvalidRequest {
        message: format!("invalid path {}: {}", path, e),
      })
      .map(|url| {
        let request = self.http.request(method.clone(), url);
        match self.tokens.get().filter(|token| !token.is_empty()) {
          Some(token) => request.bearer_auth(token),
          None => request,
        }
      });

    Call {
      request,
      method,
      path: path.to_string(),
    }
  }
}

impl std::fmt::Debug for ApiClient {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ApiClient")
      .field("base_url", &self.base_url)
      .finish_non_exhaustive()
  }
}

/// One pending gateway call.
#[must_use = "a call does nothing until it is sent"]
pub struct Call {
  request: Result<RequestBuilder, ServiceError>,
  method: Method,
  path: String,
}

impl Call {
  /// Append query parameters. Serialization errors surface when sent.
  pub fn query<Q: Serialize + ?Sized>(mut self, query: &Q) -> Self {
    self.request = self.request.map(|request| request.query(query));
    self
  }

  /// JSON request body.
  pub fn body<B: Serialize + ?Sized>(mut self, body: &B) -> Self {
    self.request = self.request.map(|request| request.json(body));
    self
  }

  /// Decode the body as `T` directly.
  pub async fn json<T: DeserializeOwned>(self) -> Result<T, ServiceError> {
    let path = self.path.clone();
    let body = self.send().await?;
    decode(&path, body.as_deref())
  }

  /// Decode the body as an [`Envelope`] and return its `data`.
  pub async fn data<T: DeserializeOwned>(self) -> Result<T, ServiceError> {
    let envelope: Envelope<T> = self.json().await?;
    envelope.into_result()
  }

  /// Discard the body; an envelope, if present, must not be a rejection.
  pub async fn empty(self) -> Result<(), ServiceError> {
    let body = self.send().await?;
    if let Some(bytes) = body {
      if let Ok(envelope) = serde_json::from_slice::<Envelope<serde_json::Value>>(&bytes) {
        envelope.check()?;
      }
    }
    Ok(())
  }

  async fn send(self) -> Result<Option<Vec<u8>>, ServiceError> {
    let Call {
      request,
      method,
      path,
    } = self;
    let response = request?.send().await?;
    let status = response.status();
    debug!(%method, path = %path, status = status.as_u16(), "gateway call");

    if !status.is_success() {
      let body = response.bytes().await.unwrap_or_default();
      return Err(ServiceError::Status {
        status: status.as_u16(),
        message: error_message(status, &body),
      });
    }

    if status == StatusCode::NO_CONTENT {
      return Ok(None);
    }

    let body = response.bytes().await?;
    if body.is_empty() {
      Ok(None)
    } else {
      Ok(Some(body.to_vec()))
    }
  }
}

/// The body's `message` when it has one, else `HTTP <status>`.
fn error_message(status: StatusCode, body: &[u8]) -> String {
  serde_json::from_slice::<ErrorBody>(body)
    .ok()
    .and_then(|body| body.message)
    .filter(|message| !message.is_empty())
    .unwrap_or_else(|| format!("HTTP {}", status.as_u16()))
}

/// A missing body decodes as JSON `null`.
fn decode<T: DeserializeOwned>(path: &str, body: Option<&[u8]>) -> Result<T, ServiceError> {
  serde_json::from_slice(body.unwrap_or(b"null".as_slice())).map_err(|e| ServiceError::InvalidResponse {
    message: format!("failed to parse response from {}: {}", path, e),
  })
}

/// `scheme://host:port` of a base URL; unparseable input is returned as is.
pub fn origin_of(base_url: &str) -> String {
  Url::parse(base_url)
    .map(|url| url.origin().ascii_serialization())
    .unwrap_or_else(|_| base_url.to_string())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::session::{MemoryTokenStore, NoopTokenStore};
  use serde::Deserialize;
  use serde_json::json;
  use wiremock::matchers::{body_json, header, method, path, query_param};
  use wiremock::{Mock, MockServer, Request, ResponseTemplate};

  #[derive(Debug, Deserialize, PartialEq)]
  struct Item {
    id: u64,
  }

  fn client(server: &MockServer, tokens: Arc<dyn TokenStore>) -> ApiClient {
    ApiClient::new(&ApiConfig::with_url(server.uri()), tokens).unwrap()
  }

  #[tokio::test]
  async fn test_bearer_token_attached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/api/products/1"))
      .and(header("authorization", "Bearer secret"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true, "data": {"id": 1}})))
      .mount(&server)
      .await;

    let api = client(&server, Arc::new(MemoryTokenStore::with_token("secret")));
    let item: Item = api.get("/api/products/1").data().await.unwrap();
    assert_eq!(item, Item { id: 1 });
  }

  #[tokio::test]
  async fn test_no_token_sends_no_authorization() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/api/products"))
      .respond_with(|request: &Request| {
        let authorized = request.headers.contains_key("authorization");
        ResponseTemplate::new(200).set_body_json(json!({"data": authorized}))
      })
      .mount(&server)
      .await;

    let api = client(&server, Arc::new(NoopTokenStore));
    let authorized: bool = api.get("/api/products").data().await.unwrap();
    assert!(!authorized);
  }

  #[tokio::test]
  async fn test_error_message_from_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/api/imports/4/approve"))
      .respond_with(ResponseTemplate::new(400).set_body_json(json!({"message": "Phiếu không ở trạng thái chờ duyệt"})))
      .mount(&server)
      .await;

    let api = client(&server, Arc::new(NoopTokenStore));
    let err = api
      .post("/api/imports/4/approve")
      .data::<Item>()
      .await
      .unwrap_err();
    assert_eq!(
      err,
      ServiceError::Status {
        status: 400,
        message: "Phiếu không ở trạng thái chờ duyệt".to_string(),
      }
    );
  }

  #[tokio::test]
  async fn test_error_without_message_uses_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/api/customers"))
      .respond_with(ResponseTemplate::new(503).set_body_string("<html>down</html>"))
      .mount(&server)
      .await;

    let api = client(&server, Arc::new(NoopTokenStore));
    let err = api.get("/api/customers").json::<Vec<Item>>().await.unwrap_err();
    assert_eq!(err.message(), "HTTP 503");
    assert!(err.is_retryable());
  }

  #[tokio::test]
  async fn test_envelope_rejection_on_success_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/api/inventory-checks/2"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": false, "message": "Không tìm thấy", "data": null})))
      .mount(&server)
      .await;

    let api = client(&server, Arc::new(NoopTokenStore));
    let err = api.get("/api/inventory-checks/2").data::<Item>().await.unwrap_err();
    assert_eq!(
      err,
      ServiceError::Envelope {
        message: "Không tìm thấy".to_string()
      }
    );
    assert!(!err.is_retryable());
  }

  #[tokio::test]
  async fn test_no_content_and_envelope_on_empty() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
      .and(path("/api/products/3"))
      .respond_with(ResponseTemplate::new(204))
      .mount(&server)
      .await;
    Mock::given(method("DELETE"))
      .and(path("/api/products/4"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": false, "message": "Đang được sử dụng"})))
      .mount(&server)
      .await;

    let api = client(&server, Arc::new(NoopTokenStore));
    api.delete("/api/products/3").empty().await.unwrap();
    let err = api.delete("/api/products/4").empty().await.unwrap_err();
    assert_eq!(err.message(), "Đang được sử dụng");
  }

  #[tokio::test]
  async fn test_query_and_body_are_sent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/api/inventory-checks/9/reject"))
      .and(query_param("notify", "true"))
      .and(body_json(json!({"reason": "Sai số lượng"})))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"id": 9}})))
      .mount(&server)
      .await;

    let api = client(&server, Arc::new(NoopTokenStore));
    let item: Item = api
      .post("/api/inventory-checks/9/reject")
      .query(&[("notify", "true")])
      .body(&json!({"reason": "Sai số lượng"}))
      .data()
      .await
      .unwrap();
    assert_eq!(item.id, 9);
  }

  #[tokio::test]
  async fn test_undecodable_body_is_invalid_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/api/products/search"))
      .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
      .mount(&server)
      .await;

    let api = client(&server, Arc::new(NoopTokenStore));
    let err = api.get("/api/products/search").json::<Item>().await.unwrap_err();
    assert!(matches!(err, ServiceError::InvalidResponse { .. }));
  }

  #[tokio::test]
  async fn test_unreachable_gateway_is_network_error() {
    let api = ApiClient::new(
      &ApiConfig::with_url("http://127.0.0.1:9"),
      Arc::new(NoopTokenStore),
    )
    .unwrap();
    let err = api.get("/api/products").json::<Vec<Item>>().await.unwrap_err();
    assert!(matches!(err, ServiceError::Network { .. }));
  }

  #[test]
  fn test_origin_strips_path() {
    assert_eq!(origin_of("https://shop.example.com/backoffice"), "https://shop.example.com");
    assert_eq!(origin_of("http://localhost:8080"), "http://localhost:8080");
  }

  #[test]
  fn test_invalid_base_url_rejected() {
    let result = ApiClient::new(&ApiConfig::with_url("::nope"), Arc::new(NoopTokenStore));
    assert!(matches!(result, Err(ServiceError::InvalidRequest { .. })));
  }
}
