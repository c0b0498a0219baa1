//! Remote assistant backend: health probe and chat call.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument};

#[derive(Debug, Error)]
pub enum BackendError {
    /// Connection refused, DNS, timeout and the like.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("backend returned HTTP {0}")]
    Status(reqwest::StatusCode),
    #[error("malformed response: {0}")]
    Malformed(String),
    /// The backend answered but flagged its own failure.
    #[error("backend reported failure: {0}")]
    Rejected(String),
}

impl BackendError {
    /// True when the backend could not be reached at all.
    pub fn is_transport(&self) -> bool {
        matches!(self, BackendError::Transport(_))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest<'a> {
    pub message: &'a str,
    pub session_id: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    pub success: bool,
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ChatResponse {
    /// Collapses the envelope into the reply text or the embedded failure.
    pub fn into_reply(self) -> Result<String, BackendError> {
        if !self.success {
            return Err(BackendError::Rejected(
                self.error.unwrap_or_else(|| "Error desconocido".to_string()),
            ));
        }
        self.response
            .ok_or_else(|| BackendError::Malformed("success without `response`".to_string()))
    }
}

#[async_trait]
pub trait Backend: Send + Sync {
    async fn health(&self) -> Result<(), BackendError>;
    async fn chat(&self, message: &str, session_id: &str) -> Result<String, BackendError>;
}

pub struct HttpBackend {
    base_url: String,
    health_timeout: Duration,
    client: Client,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>, health_timeout: Duration) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            health_timeout,
            client: Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl Backend for HttpBackend {
    #[instrument(skip(self), fields(base_url = %self.base_url))]
    async fn health(&self) -> Result<(), BackendError> {
        let response = self
            .client
            .get(self.url("/api/health"))
            .timeout(self.health_timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(BackendError::Status(response.status()));
        }
        Ok(())
    }

    #[instrument(skip(self, message), fields(len = message.len()))]
    async fn chat(&self, message: &str, session_id: &str) -> Result<String, BackendError> {
        let response = self
            .client
            .post(self.url("/api/chat"))
            .json(&ChatRequest { message, session_id })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        debug!(%status, bytes = body.len(), "Chat response received");

        // The body carries its own success flag, so it is parsed regardless of status.
        let parsed: ChatResponse = serde_json::from_str(&body).map_err(|e| {
            if status.is_success() {
                BackendError::Malformed(e.to_string())
            } else {
                BackendError::Status(status)
            }
        })?;
        parsed.into_reply()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn backend(server: &MockServer) -> HttpBackend {
        HttpBackend::new(server.uri(), Duration::from_secs(2))
    }

    #[tokio::test]
    async fn health_accepts_any_2xx() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/health"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        assert!(backend(&server).health().await.is_ok());
    }

    #[tokio::test]
    async fn health_rejects_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/health"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = backend(&server).health().await.unwrap_err();
        assert!(matches!(err, BackendError::Status(s) if s.as_u16() == 503));
    }

    #[tokio::test]
    async fn health_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/health"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let backend = HttpBackend::new(server.uri(), Duration::from_millis(100));
        let err = backend.health().await.unwrap_err();
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn health_unreachable_is_transport_error() {
        let backend = HttpBackend::new("http://127.0.0.1:1", Duration::from_secs(1));
        assert!(backend.health().await.unwrap_err().is_transport());
    }

    #[tokio::test]
    async fn chat_posts_message_and_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_json(json!({"message": "hola", "session_id": "session_1_abc"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "response": "¡Hola desde el backend!"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let reply = backend(&server).chat("hola", "session_1_abc").await.unwrap();
        assert_eq!(reply, "¡Hola desde el backend!");
    }

    #[tokio::test]
    async fn chat_surfaces_embedded_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({
                "success": false,
                "error": "Error interno del sistema"
            })))
            .mount(&server)
            .await;

        let err = backend(&server).chat("hola", "s").await.unwrap_err();
        assert!(matches!(err, BackendError::Rejected(ref m) if m == "Error interno del sistema"));
        assert!(!err.is_transport());
    }

    #[tokio::test]
    async fn chat_rejects_non_json_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = backend(&server).chat("hola", "s").await.unwrap_err();
        assert!(matches!(err, BackendError::Malformed(_)));
    }

    #[test]
    fn success_without_response_is_malformed() {
        let parsed: ChatResponse = serde_json::from_value(json!({"success": true})).unwrap();
        assert!(matches!(parsed.into_reply(), Err(BackendError::Malformed(_))));
    }

    #[test]
    fn failure_without_error_gets_placeholder() {
        let parsed: ChatResponse = serde_json::from_value(json!({"success": false})).unwrap();
        match parsed.into_reply() {
            Err(BackendError::Rejected(m)) => assert_eq!(m, "Error desconocido"),
            other => panic!("unexpected: {:?}", other),
        }
    }
}
