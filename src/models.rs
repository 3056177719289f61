//! Wire types for the client-facing API and the Ollama backend API.
//!
//! Every payload that crosses a process boundary has an explicit struct
//! here; defaulting rules for optional backend fields are declared once on
//! the struct rather than at each use site.

use serde::{Deserialize, Serialize};

// ── Client-facing types ────────────────────────────────────────────────

/// Inbound chat frame from the web client.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChatRequest {
    /// Model to run the conversation against.
    #[serde(default)]
    pub model: String,
    /// Full conversation so far, oldest first.
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

impl ChatRequest {
    /// A request is relayable only with a model and at least one message.
    pub fn is_valid(&self) -> bool {
        !self.model.is_empty() && !self.messages.is_empty()
    }
}

/// A single chat turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role: "system", "user", or "assistant".
    pub role: String,
    /// Message text.
    pub content: String,
}

/// One row of the `GET /models` response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelEntry {
    pub name: String,
    /// Install timestamp, formatted, or empty when unknown.
    pub installed: String,
    /// Size in the configured presentation unit (0 when unknown).
    pub size: f64,
}

// ── Ollama backend types ───────────────────────────────────────────────

/// Response body of `GET /api/tags`.
#[derive(Debug, Deserialize)]
pub struct TagsResponse {
    #[serde(default)]
    pub models: Vec<RawModel>,
}

/// One model record as reported by the backend.
#[derive(Debug, Clone, Deserialize)]
pub struct RawModel {
    #[serde(default = "RawModel::unnamed")]
    pub name: String,
    #[serde(default)]
    pub modified_at: String,
    /// Size in bytes; 0 when the backend omits it.
    #[serde(default)]
    pub size: u64,
}

impl RawModel {
    fn unnamed() -> String {
        "Unnamed".to_string()
    }
}

/// Body of `POST /api/chat`.
#[derive(Debug, Serialize)]
pub struct ChatPayload {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
    pub options: ChatOptions,
}

/// Sampling options forwarded with every chat call.
///
/// Fixed at construction of the upstream client; per-request overrides are
/// deliberately not exposed.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ChatOptions {
    pub temperature: f32,
    pub num_ctx: u32,
}

impl Default for ChatOptions {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            num_ctx: 4096,
        }
    }
}

/// One decoded line of a streaming chat response.
///
/// Ollama emits a full status object per line; only the message content is
/// relayed, everything else is ignored on decode.
#[derive(Debug, Default, Deserialize)]
pub struct StreamRecord {
    #[serde(default)]
    pub message: RecordMessage,
}

/// The `message` object inside a stream record.
#[derive(Debug, Default, Deserialize)]
pub struct RecordMessage {
    #[serde(default)]
    pub content: String,
}
