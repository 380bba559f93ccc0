use std::net::SocketAddr;
use std::sync::Arc;

use api_server::http::{AppState, build_router};
use shared::attachments::{AttachmentRelay, HttpBlobStore};
use shared::config::{AppConfig, load_dotenv};
use shared::lead::{ConversationOrchestrator, WebhookDispatcher};
use shared::llm::ChatCompletionsGateway;
use tracing::{error, info, warn};

const DEFAULT_LOG_FILTER: &str = "api_server=debug,shared=info,tower_http=info";

#[tokio::main]
async fn main() {
    let dotenv_loaded = load_dotenv();
    init_tracing();
    if let Err(err) = dotenv_loaded {
        error!("failed to load .env: {err}");
        std::process::exit(1);
    }

    let config = match AppConfig::from_env() {
        Ok(cfg) => cfg,
        Err(err) => {
            error!("failed to read config: {err}");
            std::process::exit(1);
        }
    };

    let gateway = match ChatCompletionsGateway::new(config.llm.clone()) {
        Ok(gateway) => gateway,
        Err(err) => {
            error!("failed to build completion provider client: {err}");
            std::process::exit(1);
        }
    };

    if config.webhook.url.is_none() {
        warn!("LEAD_WEBHOOK_URL is not set; completed records will not be delivered");
    }
    let dispatcher = match WebhookDispatcher::new(config.webhook.clone()) {
        Ok(dispatcher) => dispatcher,
        Err(err) => {
            error!("failed to build webhook dispatcher: {err}");
            std::process::exit(1);
        }
    };

    if config.blob.token.is_none() {
        warn!("BLOB_READ_WRITE_TOKEN is not set; uploads will fail");
    }
    let blob_store = match HttpBlobStore::new(config.blob.clone()) {
        Ok(store) => store,
        Err(err) => {
            error!("failed to build blob store client: {err}");
            std::process::exit(1);
        }
    };

    info!(
        profile = config.profile.as_str(),
        model = %config.llm.model,
        dispatch_mode = ?config.webhook.mode,
        fields = ?config.schema.field_names().collect::<Vec<_>>(),
        "lead intake configured"
    );

    let orchestrator = ConversationOrchestrator::new(
        Arc::new(gateway),
        Arc::new(dispatcher),
        config.schema.clone(),
        config.preamble.clone(),
    );
    let app = build_router(AppState {
        orchestrator: Arc::new(orchestrator),
        attachments: AttachmentRelay::new(Arc::new(blob_store)),
        max_upload_bytes: config.max_upload_bytes,
    });

    let addr: SocketAddr = match config.bind_addr.parse() {
        Ok(addr) => addr,
        Err(err) => {
            error!("invalid API_BIND_ADDR '{}': {err}", config.bind_addr);
            std::process::exit(1);
        }
    };

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            error!("failed to bind {addr}: {err}");
            std::process::exit(1);
        }
    };

    info!(
        "api server listening on {}",
        listener.local_addr().unwrap_or(addr)
    );
    if let Err(err) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("server exited with error: {err}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_string());
    let json = std::env::var("LOG_FORMAT")
        .map(|format| format.trim().eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
