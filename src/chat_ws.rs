//! WebSocket chat relay endpoint.
//!
//! `GET /ws/chat` upgrades the connection to a WebSocket carrying one JSON
//! text frame per client request and one JSON text frame per relayed event:
//!
//! | Direction | Frame |
//! |---|---|
//! | Client → Server | `{"model": "...", "messages": [{"role", "content"}, ...]}` |
//! | Server → Client | `{"chunk": "..."}` zero or more times |
//! | Server → Client | `{"done": true}` or `{"error": "..."}` exactly once |
//!
//! Requests on one connection run strictly in sequence; after a terminal
//! frame the same connection may carry the next request. A rejected frame
//! (malformed JSON, missing model/messages) produces an error frame and
//! leaves the connection open. A transport close at any point ends the
//! session silently and aborts any in-flight upstream request.

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::ChatRequest;
use crate::server::AppState;
use crate::session::{SessionEvent, session_events};
use crate::upstream::ChatBackend;

/// Error frame for a frame that is not valid JSON.
const MSG_INVALID_FORMAT: &str = "invalid message format";

/// Error frame for a request missing its model or messages.
const MSG_MISSING_FIELDS: &str = "model and messages are required";

/// `GET /ws/chat` — WebSocket upgrade endpoint for the chat relay.
pub async fn chat_ws(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_chat_socket(socket, state))
}

/// Why a relay loop ended.
enum RelayEnd {
    /// Terminal event delivered; the connection can take the next request.
    Complete,
    /// The client went away mid-stream.
    ClientGone,
}

async fn handle_chat_socket(socket: WebSocket, state: AppState) {
    let session_id = Uuid::new_v4();
    info!(%session_id, "chat session opened");

    let (mut sender, mut receiver) = socket.split();

    while let Some(msg) = receiver.next().await {
        let text = match msg {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) | Err(_) => break,
            // Ping/pong are handled by axum; binary frames are not part of
            // the protocol and are ignored.
            Ok(_) => continue,
        };

        let request = match parse_request(&text) {
            Ok(request) => request,
            Err(reason) => {
                debug!(%session_id, reason, "rejected client frame");
                if send_event(&mut sender, &SessionEvent::Error(reason.to_string()))
                    .await
                    .is_err()
                {
                    break;
                }
                continue;
            }
        };

        info!(
            %session_id,
            model = %request.model,
            turns = request.messages.len(),
            "relaying chat request"
        );

        match relay(&mut sender, &mut receiver, state.backend.as_ref(), &request).await {
            RelayEnd::Complete => {}
            RelayEnd::ClientGone => break,
        }
    }

    info!(%session_id, "chat session closed");
}

/// Parse and validate one inbound client frame.
fn parse_request(text: &str) -> Result<ChatRequest, &'static str> {
    let request: ChatRequest = serde_json::from_str(text).map_err(|_| MSG_INVALID_FORMAT)?;
    if !request.is_valid() {
        return Err(MSG_MISSING_FIELDS);
    }
    Ok(request)
}

/// Relay one validated request, watching the receive half for disconnects.
///
/// The select keeps the socket's close signal live while events stream;
/// dropping the event stream on `ClientGone` aborts the upstream request
/// instead of draining it.
async fn relay(
    sender: &mut SplitSink<WebSocket, Message>,
    receiver: &mut SplitStream<WebSocket>,
    backend: &dyn ChatBackend,
    request: &ChatRequest,
) -> RelayEnd {
    let mut events = session_events(backend, request).await;

    loop {
        tokio::select! {
            event = events.next() => {
                let Some(event) = event else {
                    return RelayEnd::Complete;
                };
                let terminal = event.is_terminal();
                if send_event(sender, &event).await.is_err() {
                    return RelayEnd::ClientGone;
                }
                if terminal {
                    return RelayEnd::Complete;
                }
            }
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => {
                        return RelayEnd::ClientGone;
                    }
                    // Stray frames mid-stream are ignored; the next request
                    // is only read after the terminal event.
                    Some(Ok(_)) => {}
                }
            }
        }
    }
}

async fn send_event(
    sender: &mut SplitSink<WebSocket, Message>,
    event: &SessionEvent,
) -> Result<(), axum::Error> {
    sender.send(Message::Text(event.to_frame())).await
}
