//! Axum HTTP server wiring for the gateway.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::catalog::{ModelCatalog, SortKey};
use crate::chat_ws;
use crate::upstream::ChatBackend;

/// Shared application state — cloneable, injected via axum `State`.
#[derive(Clone)]
pub struct AppState {
    /// Backend port used by the chat relay.
    pub backend: Arc<dyn ChatBackend>,
    /// Catalog service for `/models`.
    pub catalog: Arc<ModelCatalog>,
}

/// Build the gateway router over the given state.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/models", get(list_models))
        .route("/ws/chat", get(chat_ws::chat_ws))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct ModelsQuery {
    sort: Option<String>,
}

/// `GET /models` — sorted model listing. Never fails visibly; backend
/// trouble is masked with placeholder data inside the catalog.
async fn list_models(
    State(state): State<AppState>,
    Query(query): Query<ModelsQuery>,
) -> impl IntoResponse {
    let sort = SortKey::parse(query.sort.as_deref());
    debug!(?sort, "GET /models");
    Json(state.catalog.list(sort).await)
}

/// Run the gateway until the cancellation token fires.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let addr = listener.local_addr()?;
    info!("gateway listening on {addr}");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await?;

    info!("gateway shut down");
    Ok(())
}
