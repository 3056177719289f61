//! HTTP client for the Ollama backend.
//!
//! The [`ChatBackend`] port is the seam between the gateway and the
//! inference server: the catalog, the readiness probe, and the chat relay
//! all go through it, so tests can swap in a scripted backend.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use reqwest::Client;
use tracing::debug;

use crate::error::UpstreamError;
use crate::models::{ChatOptions, ChatPayload, ChatRequest, RawModel, TagsResponse};
use crate::ndjson;

/// Lazy stream of decoded NDJSON lines from a chat call.
pub type RecordStream = BoxStream<'static, Result<String, UpstreamError>>;

/// Backend operations needed by the gateway.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Fetch the raw model list from the tag-listing endpoint.
    async fn list_models(&self) -> Result<Vec<RawModel>, UpstreamError>;

    /// Open a streaming chat completion.
    ///
    /// A non-success HTTP status fails the call before any record is
    /// yielded; transport failures after that surface through the stream.
    async fn stream_chat(&self, request: &ChatRequest) -> Result<RecordStream, UpstreamError>;

    /// Single readiness check against the tag-listing endpoint.
    async fn is_ready(&self) -> bool;
}

/// Reqwest-backed [`ChatBackend`] talking to a local Ollama server.
pub struct UpstreamClient {
    client: Client,
    base_url: String,
    options: ChatOptions,
}

impl UpstreamClient {
    /// Connect timeout for every backend call. The chat stream itself is
    /// unbounded once established.
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

    pub fn new(client: Client, base_url: impl Into<String>, options: ChatOptions) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            options,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

#[async_trait]
impl ChatBackend for UpstreamClient {
    async fn list_models(&self) -> Result<Vec<RawModel>, UpstreamError> {
        let url = self.url("/api/tags");
        debug!("GET {url}");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| UpstreamError::Unreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Http(status.as_u16()));
        }

        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| UpstreamError::Malformed(e.to_string()))?;
        Ok(tags.models)
    }

    async fn stream_chat(&self, request: &ChatRequest) -> Result<RecordStream, UpstreamError> {
        let url = self.url("/api/chat");
        let payload = ChatPayload {
            model: request.model.clone(),
            messages: request.messages.clone(),
            stream: true,
            options: self.options,
        };
        debug!(model = %payload.model, "POST {url}");

        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| UpstreamError::Unreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Http(status.as_u16()));
        }

        Ok(ndjson::lines(response.bytes_stream()).boxed())
    }

    async fn is_ready(&self) -> bool {
        let url = self.url("/api/tags");
        match self.client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}
