//! Error taxonomy for calls against the Ollama backend.

use thiserror::Error;

/// Failure of an upstream backend call.
///
/// The display strings double as client-facing error messages, so they
/// name the backend and the failure without internal detail dumps.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// The backend could not be reached, or the connection broke mid-stream.
    #[error("cannot reach Ollama server: {0}")]
    Unreachable(String),

    /// The backend answered with a non-success HTTP status.
    #[error("Ollama server returned HTTP {0}")]
    Http(u16),

    /// The backend body could not be decoded as the expected payload.
    #[error("malformed response from Ollama server: {0}")]
    Malformed(String),
}
