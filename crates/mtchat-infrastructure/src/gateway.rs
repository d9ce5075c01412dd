//! Remote API Gateway - the single outbound request path to the entity API.
//!
//! Every call:
//! - sends `Content-Type: application/json`
//! - attaches `Authorization: Bearer <token>` when the session store holds one
//! - maps non-2xx responses to `MtchatError::Http`
//! - on 401 clears the session, fires the expiry handler and returns
//!   `MtchatError::SessionExpired`

use std::sync::Arc;
use std::time::Duration;

use mtchat_core::config::ClientConfig;
use mtchat_core::notice::SessionExpiryHandler;
use mtchat_core::session::TokenStore;
use mtchat_core::{MtchatError, Result};
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, Method, StatusCode};
use serde::Serialize;
use serde_json::Value;

/// Decoded success body.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse {
    /// `application/json` body.
    Json(Value),
    /// Any other non-empty body.
    Text(String),
    /// Empty body.
    Empty,
}

impl ApiResponse {
    /// JSON view of the body: text becomes a JSON string, empty becomes `{}`.
    pub fn into_json(self) -> Value {
        match self {
            ApiResponse::Json(value) => value,
            ApiResponse::Text(text) => Value::String(text),
            ApiResponse::Empty => Value::Object(Default::default()),
        }
    }
}

/// Per-call options.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    pub body: Option<Value>,
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            method: Method::GET,
            body: None,
            headers: Vec::new(),
            query: Vec::new(),
        }
    }
}

impl RequestOptions {
    pub fn method(method: Method) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }

    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    pub fn query(mut self, pairs: Vec<(String, String)>) -> Self {
        self.query = pairs;
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Outbound HTTP client bound to one session store.
#[derive(Clone)]
pub struct ApiGateway {
    client: Client,
    base_url: String,
    tokens: Arc<dyn TokenStore>,
    expiry: Arc<dyn SessionExpiryHandler>,
}

impl ApiGateway {
    /// Creates a gateway for `config.api_base_url`.
    pub fn new(
        config: &ClientConfig,
        tokens: Arc<dyn TokenStore>,
        expiry: Arc<dyn SessionExpiryHandler>,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| MtchatError::config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self::with_client(client, &config.api_base_url, tokens, expiry))
    }

    /// Creates a gateway around an existing client.
    pub fn with_client(
        client: Client,
        base_url: &str,
        tokens: Arc<dyn TokenStore>,
        expiry: Arc<dyn SessionExpiryHandler>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            tokens,
            expiry,
        }
    }

    /// Same client and base URL, different session. Used per BFF request.
    pub fn for_session(
        &self,
        tokens: Arc<dyn TokenStore>,
        expiry: Arc<dyn SessionExpiryHandler>,
    ) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            tokens,
            expiry,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn tokens(&self) -> &Arc<dyn TokenStore> {
        &self.tokens
    }

    /// Absolute endpoints (`http...`) are used verbatim; others are joined to
    /// the base URL.
    fn resolve(&self, endpoint: &str) -> String {
        if endpoint.starts_with("http") {
            endpoint.to_string()
        } else if endpoint.starts_with('/') {
            format!("{}{}", self.base_url, endpoint)
        } else {
            format!("{}/{}", self.base_url, endpoint)
        }
    }

    /// Issues one request and decodes the response.
    pub async fn request(&self, endpoint: &str, options: RequestOptions) -> Result<ApiResponse> {
        let url = self.resolve(endpoint);
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let mut builder = self
            .client
            .request(options.method.clone(), &url)
            .headers(headers);
        if let Some(token) = self.tokens.token() {
            builder = builder.bearer_auth(token);
        }
        for (name, value) in &options.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if !options.query.is_empty() {
            builder = builder.query(&options.query);
        }
        if let Some(body) = &options.body {
            builder = builder.body(serde_json::to_vec(body)?);
        }

        tracing::debug!("[Gateway] {} {}", options.method, url);
        let response = builder
            .send()
            .await
            .map_err(|e| MtchatError::network(format!("{} {}: {}", options.method, url, e)))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            tracing::warn!("[Gateway] 401 from {}; clearing session", url);
            self.tokens.clear_token();
            self.expiry.on_session_expired();
            return Err(MtchatError::SessionExpired);
        }

        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.contains("application/json"));
        let body = response
            .text()
            .await
            .map_err(|e| MtchatError::network(format!("failed to read response body: {e}")))?;

        if !status.is_success() {
            let err = map_http_error(status, &body);
            tracing::warn!("[Gateway] {} {} failed: {}", options.method, url, err);
            return Err(err);
        }

        if body.trim().is_empty() {
            return Ok(ApiResponse::Empty);
        }
        if is_json {
            return Ok(ApiResponse::Json(serde_json::from_str(&body)?));
        }
        Ok(ApiResponse::Text(body))
    }

    /// Issues a request and returns the body as JSON.
    pub async fn request_json(&self, endpoint: &str, options: RequestOptions) -> Result<Value> {
        Ok(self.request(endpoint, options).await?.into_json())
    }

    pub async fn get(&self, endpoint: &str, query: Vec<(String, String)>) -> Result<Value> {
        self.request_json(endpoint, RequestOptions::default().query(query))
            .await
    }

    pub async fn post<T: Serialize + ?Sized>(&self, endpoint: &str, body: &T) -> Result<Value> {
        self.request_json(endpoint, RequestOptions::method(Method::POST).json(body)?)
            .await
    }
}

/// Message of a failed response: JSON `message` or `error`, else the body
/// text, else `HTTP <code>: <reason>`.
pub fn extract_error_message(status: StatusCode, body: &str) -> String {
    let from_json = serde_json::from_str::<Value>(body).ok().and_then(|value| {
        ["message", "error"]
            .iter()
            .find_map(|key| value.get(*key).and_then(Value::as_str).map(str::to_string))
    });
    from_json
        .or_else(|| Some(body.trim().to_string()).filter(|b| !b.is_empty()))
        .unwrap_or_else(|| {
            format!(
                "HTTP {}: {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            )
        })
}

fn map_http_error(status: StatusCode, body: &str) -> MtchatError {
    MtchatError::http(
        status.as_u16(),
        status.canonical_reason().unwrap_or("Unknown"),
        extract_error_message(status, body),
    )
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::storage::MemoryTokenStore;

    /// Counts expiry notifications.
    #[derive(Default)]
    pub struct CountingExpiry(pub AtomicUsize);

    impl SessionExpiryHandler for CountingExpiry {
        fn on_session_expired(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl CountingExpiry {
        pub fn count(&self) -> usize {
            self.0.load(Ordering::SeqCst)
        }
    }

    /// Serves `router` on an ephemeral local port and returns its base URL.
    pub async fn serve(router: axum::Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    pub fn gateway(
        base: &str,
        token: Option<&str>,
    ) -> (ApiGateway, Arc<MemoryTokenStore>, Arc<CountingExpiry>) {
        let tokens = Arc::new(match token {
            Some(t) => MemoryTokenStore::with_token(t),
            None => MemoryTokenStore::new(),
        });
        let expiry = Arc::new(CountingExpiry::default());
        let gateway = ApiGateway::with_client(
            Client::new(),
            base,
            tokens.clone() as Arc<dyn TokenStore>,
            expiry.clone() as Arc<dyn SessionExpiryHandler>,
        );
        (gateway, tokens, expiry)
    }
}
