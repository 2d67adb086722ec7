use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ProtocolError, ProtocolResult};
use crate::http::{headers, HttpRequest, HttpResponse, Method};

/// Sends HTTP requests to a pod.
///
/// Implementations return every response, whatever its status; status
/// classification happens in the layer above.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> ProtocolResult<HttpResponse>;
}

/// Settings for [`ReqwestTransport`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Per-request timeout in milliseconds; `0` disables it.
    pub request_timeout_ms: u64,
    pub user_agent: String,
    /// Sent as `Authorization: Bearer <token>` on every request.
    pub bearer_token: Option<String>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: 30_000,
            user_agent: concat!("podline/", env!("CARGO_PKG_VERSION")).to_string(),
            bearer_token: None,
        }
    }
}

/// [`HttpTransport`] backed by `reqwest`.
pub struct ReqwestTransport {
    client: Client,
    bearer_token: Option<String>,
}

impl ReqwestTransport {
    pub fn new(config: &TransportConfig) -> ProtocolResult<Self> {
        let mut builder = Client::builder().user_agent(config.user_agent.clone());
        if config.request_timeout_ms > 0 {
            builder = builder.timeout(Duration::from_millis(config.request_timeout_ms));
        }
        let client = builder
            .build()
            .map_err(|e| ProtocolError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            bearer_token: config.bearer_token.clone(),
        })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client, bearer_token: None }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

fn reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Head => reqwest::Method::HEAD,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> ProtocolResult<HttpResponse> {
        let mut builder = self.client.request(reqwest_method(request.method), &request.uri);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(token) = &self.bearer_token {
            builder = builder.header(headers::AUTHORIZATION, format!("Bearer {token}"));
        }
        if !request.body.is_empty() {
            builder = builder.body(request.body.clone());
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                ProtocolError::Timeout { uri: request.uri.clone() }
            } else {
                ProtocolError::Transport(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let response_headers = header_pairs(response.headers());
        let body = response
            .bytes()
            .await
            .map_err(|e| ProtocolError::Transport(e.to_string()))?;

        debug!(method = %request.method, uri = %request.uri, status, "http exchange");
        Ok(HttpResponse {
            status,
            headers: response_headers,
            body,
        })
    }
}

/// Header values as text. Values that are not valid UTF-8 are decoded
/// lossily rather than failing the exchange.
fn header_pairs(map: &HeaderMap) -> Vec<(String, String)> {
    map.iter()
        .map(|(name, value)| {
            let text = match value.to_str() {
                Ok(text) => text.to_string(),
                Err(_) => String::from_utf8_lossy(value.as_bytes()).into_owned(),
            };
            (name.to_string(), text)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn opaque_header_values_are_kept() {
        let mut map = HeaderMap::new();
        map.insert("content-type", HeaderValue::from_static("text/turtle"));
        map.insert(
            "content-disposition",
            HeaderValue::from_bytes("attachment; filename=\"r\u{e9}sum\u{e9}.ttl\"".as_bytes()).unwrap(),
        );

        let pairs = header_pairs(&map);
        assert_eq!(pairs.len(), 2);
        assert!(pairs.contains(&("content-type".to_string(), "text/turtle".to_string())));
        assert!(pairs.contains(&(
            "content-disposition".to_string(),
            "attachment; filename=\"r\u{e9}sum\u{e9}.ttl\"".to_string()
        )));
    }

    #[test]
    fn default_config() {
        let config = TransportConfig::default();
        assert_eq!(config.request_timeout_ms, 30_000);
        assert!(config.user_agent.starts_with("podline/"));
        assert!(config.bearer_token.is_none());
    }

    #[test]
    fn builds_client_without_timeout() {
        let config = TransportConfig {
            request_timeout_ms: 0,
            ..TransportConfig::default()
        };
        assert!(ReqwestTransport::new(&config).is_ok());
    }

    #[test]
    fn method_mapping() {
        assert_eq!(reqwest_method(Method::Patch), reqwest::Method::PATCH);
        assert_eq!(reqwest_method(Method::Head), reqwest::Method::HEAD);
    }
}
