//! HTTP transport for the engine API

use super::endpoints;
use super::types::LoginResponse;
use crate::config::ApiConfig;
use crate::errors::{ClientError, ClientResult};
use crate::logger::{self, LogTag};
use crate::session::Session;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Read/write surface of the engine the client depends on
///
/// GETs return a snapshot document; POSTs trigger a side effect and return
/// an acknowledgement (or an error carrying the server message).
#[async_trait]
pub trait EngineApi: Send + Sync {
    async fn get(&self, path: &str) -> ClientResult<Value>;

    async fn post(&self, path: &str, body: Value) -> ClientResult<Value>;
}

/// GET and decode into a typed document
pub async fn get_as<T: DeserializeOwned>(api: &dyn EngineApi, path: &str) -> ClientResult<T> {
    let value = api.get(path).await?;
    serde_json::from_value(value)
        .map_err(|e| ClientError::Parse(format!("{}: {}", path, e)))
}

/// Exchange credentials for a token; the caller stores it in the session
pub async fn login(api: &dyn EngineApi, username: &str, password: &str) -> ClientResult<LoginResponse> {
    let body = serde_json::json!({ "username": username, "password": password });
    let value = api.post(endpoints::AUTH_LOGIN, body).await?;
    serde_json::from_value(value)
        .map_err(|e| ClientError::Parse(format!("{}: {}", endpoints::AUTH_LOGIN, e)))
}

/// HTTP client wrapper with timeout
pub struct HttpClient {
    client: Client,
    timeout: Duration,
}

impl HttpClient {
    pub fn new(timeout_secs: u64) -> ClientResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ClientError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            timeout: Duration::from_secs(timeout_secs),
        })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// `EngineApi` over HTTP with bearer authentication from the session
pub struct HttpEngineApi {
    http: HttpClient,
    base_url: String,
    session: Arc<Session>,
}

impl HttpEngineApi {
    pub fn new(config: &ApiConfig, session: Arc<Session>) -> ClientResult<Self> {
        url::Url::parse(&config.base_url)?;
        Ok(Self {
            http: HttpClient::new(config.timeout_secs)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.session.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, path: &str, request: RequestBuilder) -> ClientResult<Value> {
        let started = std::time::Instant::now();
        let response = self.authorize(request).send().await.map_err(|e| {
            if e.is_timeout() {
                ClientError::Network(format!(
                    "{} timed out after {}s",
                    path,
                    self.http.timeout().as_secs()
                ))
            } else {
                ClientError::from(e)
            }
        })?;

        logger::debug(
            LogTag::Api,
            &format!("{} -> {} ({}ms)", path, response.status(), started.elapsed().as_millis()),
        );

        decode_response(path, response).await
    }
}

#[async_trait]
impl EngineApi for HttpEngineApi {
    async fn get(&self, path: &str) -> ClientResult<Value> {
        let request = self.http.client().get(self.url(path));
        self.send(path, request).await
    }

    async fn post(&self, path: &str, body: Value) -> ClientResult<Value> {
        let request = self.http.client().post(self.url(path)).json(&body);
        self.send(path, request).await
    }
}

async fn decode_response(path: &str, response: Response) -> ClientResult<Value> {
    let status = response.status().as_u16();
    let body = response.text().await?;
    decode(path, status, &body)
}

/// Map a raw response onto the client's result type
///
/// Non-2xx becomes `Status` carrying the server message; an empty 2xx body
/// is `Null`.
fn decode(path: &str, status: u16, body: &str) -> ClientResult<Value> {
    if !(200..300).contains(&status) {
        return Err(ClientError::Status {
            endpoint: path.to_string(),
            status,
            message: extract_server_message(body),
        });
    }

    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(body).map_err(|e| ClientError::Parse(format!("{}: {}", path, e)))
}

/// Pull a human-readable message out of an error body
///
/// Engines answer with `{"error": ...}`, `{"message": ...}` or
/// `{"detail": ...}`; anything else yields `None`.
pub fn extract_server_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    ["error", "message", "detail"]
        .iter()
        .filter_map(|key| value.get(*key))
        .find_map(|field| match field {
            Value::String(text) if !text.trim().is_empty() => Some(text.clone()),
            Value::Object(inner) => inner
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string),
            _ => None,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_server_message_variants() {
        assert_eq!(
            extract_server_message(r#"{"error":"Signal not found"}"#).as_deref(),
            Some("Signal not found")
        );
        assert_eq!(
            extract_server_message(r#"{"detail":"Engine is stopped"}"#).as_deref(),
            Some("Engine is stopped")
        );
        assert_eq!(
            extract_server_message(r#"{"error":{"code":7,"message":"Position locked"}}"#).as_deref(),
            Some("Position locked")
        );
        assert_eq!(extract_server_message(r#"{"error":""}"#), None);
        assert_eq!(extract_server_message("<html>502</html>"), None);
    }

    #[test]
    fn test_error_status_carries_server_message() {
        let err = decode(endpoints::QUEUE, 409, r#"{"error":"Signal locked"}"#).unwrap_err();
        assert_eq!(
            err,
            ClientError::Status {
                endpoint: endpoints::QUEUE.to_string(),
                status: 409,
                message: Some("Signal locked".to_string()),
            }
        );
        assert_eq!(err.user_message(), "Signal locked");

        let bare = decode(endpoints::QUEUE, 502, "<html>Bad Gateway</html>").unwrap_err();
        assert!(matches!(bare, ClientError::Status { status: 502, message: None, .. }));
    }

    #[test]
    fn test_empty_success_body_is_null() {
        assert_eq!(decode(endpoints::ENGINE_FORCE_START, 204, ""), Ok(Value::Null));
        assert_eq!(decode(endpoints::ENGINE_FORCE_START, 200, "  \n"), Ok(Value::Null));
        assert_eq!(
            decode(endpoints::QUEUE, 200, r#"[{"id":"s1"}]"#),
            Ok(serde_json::json!([{ "id": "s1" }]))
        );
    }

    #[test]
    fn test_malformed_success_body_is_parse_error() {
        let err = decode(endpoints::QUEUE, 200, "{not json").unwrap_err();
        assert!(matches!(err, ClientError::Parse(ref m) if m.starts_with("/api/queue")));
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let session = Arc::new(Session::in_memory());
        let config = ApiConfig {
            base_url: "http://engine.local:8000/".to_string(),
            ..ApiConfig::default()
        };
        let api = HttpEngineApi::new(&config, session).unwrap();
        assert_eq!(api.url(endpoints::QUEUE), "http://engine.local:8000/api/queue");
    }
}
