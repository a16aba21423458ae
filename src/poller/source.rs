// Where the polling client gets snapshots from: the HTTP endpoints in production.

use async_trait::async_trait;
use std::time::Duration;

use crate::routes::ErrorEnvelope;
use crate::widget::{Widget, WidgetSnapshot};

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("malformed snapshot: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("no response within {0:?}")]
    Timeout(Duration),
    #[error("expected a {expected} snapshot, got {got}")]
    WrongWidget { expected: Widget, got: Widget },
}

#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch(&self, widget: Widget) -> Result<WidgetSnapshot, FetchError>;
}

/// Reads snapshots from a citypulse server.
pub struct HttpSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSource {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl SnapshotSource for HttpSource {
    async fn fetch(&self, widget: Widget) -> Result<WidgetSnapshot, FetchError> {
        let url = format!("{}{}", self.base_url, widget.path());
        let response = self
            .client
            .get(&url)
            .header(reqwest::header::CACHE_CONTROL, "no-store")
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        if !status.is_success() {
            let message = serde_json::from_slice::<ErrorEnvelope>(&body)
                .map(|env| env.error)
                .unwrap_or_else(|_| format!("Failed: {}", url));
            return Err(FetchError::Status {
                status: status.as_u16(),
                message,
            });
        }
        Ok(widget.decode(&body)?)
    }
}
