//! HTTP front end: scan trigger, health check and static files

use std::net::SocketAddr;
use std::path::Path;

use axum::Router;
use axum::extract::State;
use axum::routing::get;
use tower_http::services::ServeDir;
use tracing::{error, info};

use crate::worker::coordinator::ScanTrigger;

pub fn router(trigger: ScanTrigger, static_dir: &Path) -> Router {
    Router::new()
        .route("/", get(trigger_scan).post(trigger_scan))
        .route("/health", get(health))
        .nest_service("/static", ServeDir::new(static_dir))
        .with_state(trigger)
}

/// Serve `router` on `addr` until Ctrl-C
pub async fn serve(addr: SocketAddr, router: Router) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn trigger_scan(State(trigger): State<ScanTrigger>) -> &'static str {
    trigger.trigger();
    "OK"
}

async fn health() -> &'static str {
    "OK"
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("failed to listen for shutdown signal: {}", e);
        // Without a signal handler the server keeps running
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
