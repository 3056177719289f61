//! Per-request chat relay: upstream NDJSON records → ordered session events.
//!
//! A session run emits zero or more `Delta` events followed by exactly one
//! terminal event and nothing after it. Individual malformed records are
//! skipped so a garbled line never kills an otherwise healthy stream; only
//! call-level failures terminate with `Error`.

use futures_util::StreamExt;
use futures_util::stream::{self, BoxStream};
use tracing::debug;

use crate::models::{ChatRequest, StreamRecord};
use crate::upstream::{ChatBackend, RecordStream};

/// One event in a relay session's ordered output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Incremental fragment of assistant output.
    Delta(String),
    /// The upstream stream ended normally.
    Done,
    /// The request failed; the connection stays usable.
    Error(String),
}

impl SessionEvent {
    /// `Done` and `Error` close the event sequence.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Delta(_))
    }

    /// Encode as the client-facing JSON frame.
    pub fn to_frame(&self) -> String {
        match self {
            Self::Delta(content) => serde_json::json!({ "chunk": content }).to_string(),
            Self::Done => serde_json::json!({ "done": true }).to_string(),
            Self::Error(message) => serde_json::json!({ "error": message }).to_string(),
        }
    }
}

/// State threaded through the `unfold` stream.
struct SessionState {
    records: RecordStream,
    done: bool,
}

/// Open the upstream chat stream and relay it as session events.
///
/// Dropping the returned stream aborts the in-flight upstream request,
/// which is how client disconnects propagate.
pub async fn session_events(
    backend: &dyn ChatBackend,
    request: &ChatRequest,
) -> BoxStream<'static, SessionEvent> {
    let records = match backend.stream_chat(request).await {
        Ok(records) => records,
        Err(e) => {
            // The call failed before any record: one terminal Error.
            return stream::once(async move { SessionEvent::Error(e.to_string()) }).boxed();
        }
    };

    let state = SessionState {
        records,
        done: false,
    };

    stream::unfold(state, |mut st| async move {
        if st.done {
            return None;
        }

        loop {
            match st.records.next().await {
                Some(Ok(line)) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    let record: StreamRecord = match serde_json::from_str(&line) {
                        Ok(record) => record,
                        Err(e) => {
                            debug!("skipping malformed stream line: {e}");
                            continue;
                        }
                    };
                    if record.message.content.is_empty() {
                        continue;
                    }
                    return Some((SessionEvent::Delta(record.message.content), st));
                }
                Some(Err(e)) => {
                    st.done = true;
                    return Some((SessionEvent::Error(e.to_string()), st));
                }
                None => {
                    st.done = true;
                    return Some((SessionEvent::Done, st));
                }
            }
        }
    })
    .boxed()
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::error::UpstreamError;
    use crate::models::{ChatMessage, RawModel};

    /// Backend whose chat stream replays a scripted line sequence.
    struct ScriptedBackend {
        lines: Vec<Result<String, &'static str>>,
    }

    impl ScriptedBackend {
        fn from_lines(lines: &[&str]) -> Self {
            Self {
                lines: lines.iter().map(|l| Ok((*l).to_string())).collect(),
            }
        }
    }

    #[async_trait]
    impl ChatBackend for ScriptedBackend {
        async fn list_models(&self) -> Result<Vec<RawModel>, UpstreamError> {
            Ok(Vec::new())
        }

        async fn stream_chat(&self, _request: &ChatRequest) -> Result<RecordStream, UpstreamError> {
            let items: Vec<Result<String, UpstreamError>> = self
                .lines
                .iter()
                .map(|entry| match entry {
                    Ok(line) => Ok(line.clone()),
                    Err(msg) => Err(UpstreamError::Unreachable((*msg).to_string())),
                })
                .collect();
            Ok(stream::iter(items).boxed())
        }

        async fn is_ready(&self) -> bool {
            true
        }
    }

    /// Backend whose chat call fails outright.
    struct RefusingBackend {
        error: fn() -> UpstreamError,
    }

    #[async_trait]
    impl ChatBackend for RefusingBackend {
        async fn list_models(&self) -> Result<Vec<RawModel>, UpstreamError> {
            Err((self.error)())
        }

        async fn stream_chat(&self, _request: &ChatRequest) -> Result<RecordStream, UpstreamError> {
            Err((self.error)())
        }

        async fn is_ready(&self) -> bool {
            false
        }
    }

    fn request() -> ChatRequest {
        ChatRequest {
            model: "llama3".to_string(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: "hi".to_string(),
            }],
        }
    }

    async fn collect(backend: &dyn ChatBackend) -> Vec<SessionEvent> {
        session_events(backend, &request()).await.collect().await
    }

    #[tokio::test]
    async fn relays_deltas_in_order_then_done() {
        let backend = ScriptedBackend::from_lines(&[
            r#"{"message":{"content":"Hi"}}"#,
            r#"{"message":{"content":" there"}}"#,
        ]);

        let events = collect(&backend).await;
        assert_eq!(
            events,
            vec![
                SessionEvent::Delta("Hi".to_string()),
                SessionEvent::Delta(" there".to_string()),
                SessionEvent::Done,
            ]
        );
    }

    #[tokio::test]
    async fn empty_stream_emits_just_done() {
        let backend = ScriptedBackend::from_lines(&[]);
        assert_eq!(collect(&backend).await, vec![SessionEvent::Done]);
    }

    #[tokio::test]
    async fn malformed_and_blank_lines_are_skipped() {
        let backend = ScriptedBackend::from_lines(&[
            "",
            "   ",
            "not json at all",
            r#"{"message":{"content":"ok"}}"#,
            r#"{"truncated": "#,
            r#"{"done":true}"#,
        ]);

        let events = collect(&backend).await;
        assert_eq!(
            events,
            vec![SessionEvent::Delta("ok".to_string()), SessionEvent::Done]
        );
    }

    #[tokio::test]
    async fn records_without_content_emit_no_delta() {
        let backend = ScriptedBackend::from_lines(&[
            r#"{"message":{"content":""}}"#,
            r#"{"message":{"role":"assistant"}}"#,
            r#"{"done":true}"#,
        ]);

        assert_eq!(collect(&backend).await, vec![SessionEvent::Done]);
    }

    #[tokio::test]
    async fn upstream_http_error_yields_single_error_event() {
        let backend = RefusingBackend {
            error: || UpstreamError::Http(500),
        };

        let events = collect(&backend).await;
        assert_eq!(events.len(), 1);
        assert_eq!(
            events[0],
            SessionEvent::Error("Ollama server returned HTTP 500".to_string())
        );
    }

    #[tokio::test]
    async fn unreachable_backend_yields_single_error_event() {
        let backend = RefusingBackend {
            error: || UpstreamError::Unreachable("connection refused".to_string()),
        };

        let events = collect(&backend).await;
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], SessionEvent::Error(msg)
            if msg.starts_with("cannot reach Ollama server")));
    }

    #[tokio::test]
    async fn mid_stream_failure_terminates_with_error() {
        let backend = ScriptedBackend {
            lines: vec![
                Ok(r#"{"message":{"content":"partial"}}"#.to_string()),
                Err("connection reset"),
            ],
        };

        let events = collect(&backend).await;
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], SessionEvent::Delta("partial".to_string()));
        assert!(events[1].is_terminal());
        assert!(matches!(&events[1], SessionEvent::Error(_)));
    }

    /// Zero or more deltas, then exactly one terminal event, never more.
    #[tokio::test]
    async fn exactly_one_terminal_event_per_run() {
        let scripts: Vec<ScriptedBackend> = vec![
            ScriptedBackend::from_lines(&[]),
            ScriptedBackend::from_lines(&[r#"{"message":{"content":"a"}}"#]),
            ScriptedBackend {
                lines: vec![Err("reset")],
            },
        ];

        for backend in scripts {
            let events = collect(&backend).await;
            let terminals = events.iter().filter(|e| e.is_terminal()).count();
            assert_eq!(terminals, 1);
            assert!(events.last().unwrap().is_terminal());
        }
    }

    #[test]
    fn frames_match_the_wire_protocol() {
        assert_eq!(
            SessionEvent::Delta("Hi".to_string()).to_frame(),
            r#"{"chunk":"Hi"}"#
        );
        assert_eq!(SessionEvent::Done.to_frame(), r#"{"done":true}"#);
        assert_eq!(
            SessionEvent::Error("boom".to_string()).to_frame(),
            r#"{"error":"boom"}"#
        );
    }
}
