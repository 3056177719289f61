//! End-to-end relay tests: raw backend byte fragments through the real
//! reframer into session events.

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{StreamExt, stream};

use chatbridge::error::UpstreamError;
use chatbridge::models::{ChatMessage, ChatRequest, RawModel};
use chatbridge::ndjson;
use chatbridge::session::{SessionEvent, session_events};
use chatbridge::upstream::{ChatBackend, RecordStream};

/// Backend whose chat response body is a scripted sequence of byte chunks,
/// decoded through the production reframer.
struct ByteScriptBackend {
    chunks: Vec<&'static [u8]>,
}

#[async_trait]
impl ChatBackend for ByteScriptBackend {
    async fn list_models(&self) -> Result<Vec<RawModel>, UpstreamError> {
        Ok(Vec::new())
    }

    async fn stream_chat(&self, _request: &ChatRequest) -> Result<RecordStream, UpstreamError> {
        let fragments: Vec<Result<Bytes, reqwest::Error>> = self
            .chunks
            .iter()
            .map(|chunk| Ok(Bytes::from_static(chunk)))
            .collect();
        Ok(ndjson::lines(stream::iter(fragments)).boxed())
    }

    async fn is_ready(&self) -> bool {
        true
    }
}

fn request() -> ChatRequest {
    ChatRequest {
        model: "llama3".to_string(),
        messages: vec![ChatMessage {
            role: "user".to_string(),
            content: "say hi".to_string(),
        }],
    }
}

async fn run(chunks: Vec<&'static [u8]>) -> Vec<SessionEvent> {
    let backend = ByteScriptBackend { chunks };
    session_events(&backend, &request()).await.collect().await
}

#[tokio::test]
async fn clean_two_record_stream_relays_both_deltas() {
    let events = run(vec![
        b"{\"message\":{\"content\":\"Hi\"}}\n{\"message\":{\"content\":\" there\"}}\n",
    ])
    .await;

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
async fn records_split_mid_json_are_reassembled() {
    let events = run(vec![
        b"{\"message\":{\"con",
        b"tent\":\"Hi\"}}\n{\"messa",
        b"ge\":{\"content\":\" there\"}}\n",
    ])
    .await;

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
async fn garbage_lines_do_not_break_the_stream() {
    let events = run(vec![
        b"not json\n",
        b"\n",
        b"{\"message\":{\"content\":\"ok\"}}\n",
        b"{\"done\":true}\n",
    ])
    .await;

    assert_eq!(
        events,
        vec![SessionEvent::Delta("ok".to_string()), SessionEvent::Done]
    );
}

#[tokio::test]
async fn truncated_final_record_is_dropped() {
    // The backend died mid-record: the complete line is relayed, the
    // incomplete residual is not.
    let events = run(vec![
        b"{\"message\":{\"content\":\"partial answer\"}}\n{\"message\":{\"cont",
    ])
    .await;

    assert_eq!(
        events,
        vec![
            SessionEvent::Delta("partial answer".to_string()),
            SessionEvent::Done,
        ]
    );
}

#[tokio::test]
async fn every_run_ends_with_exactly_one_terminal_event() {
    let scripts: Vec<Vec<&'static [u8]>> = vec![
        vec![],
        vec![b"\n\n\n"],
        vec![b"{\"message\":{\"content\":\"a\"}}\n"],
        vec![b"junk"],
    ];

    for chunks in scripts {
        let events = run(chunks).await;
        assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
        assert!(events.last().unwrap().is_terminal());
    }
}
