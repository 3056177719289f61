//! chatbridge binary — local chat gateway in front of Ollama.

use std::sync::Arc;

use reqwest::Client;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use chatbridge::catalog::ModelCatalog;
use chatbridge::config::GatewayConfig;
use chatbridge::probe::{self, BackendLauncher, CommandLauncher};
use chatbridge::server::{self, AppState};
use chatbridge::upstream::{ChatBackend, UpstreamClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    dotenvy::dotenv().ok();

    let config = GatewayConfig::from_env();
    info!(backend = %config.ollama_url, "starting chatbridge");

    let client = Client::builder()
        .connect_timeout(UpstreamClient::CONNECT_TIMEOUT)
        .pool_max_idle_per_host(10)
        .build()?;
    let backend: Arc<dyn ChatBackend> = Arc::new(UpstreamClient::new(
        client,
        config.ollama_url.clone(),
        config.chat_options,
    ));

    // Best-effort backend start; only the probe outcome matters.
    CommandLauncher::ollama().attempt_start();

    let ready = probe::wait_until_ready(
        backend.as_ref(),
        config.probe_attempts,
        config.probe_interval,
    )
    .await;
    if !ready {
        warn!(
            "Ollama backend is not responding; model listing and chat will \
             serve fallbacks until it comes up"
        );
    }

    let catalog = Arc::new(ModelCatalog::new(Arc::clone(&backend), config.size_unit));
    let state = AppState { backend, catalog };

    let listener = TcpListener::bind(&config.bind_addr).await?;

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown requested");
            shutdown.cancel();
        }
    });

    server::serve(listener, state, cancel).await
}
