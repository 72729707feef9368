//! HTTP surface
//!
//! Thin axum layer over [`TaskRegistry`]: create a task, poll its status,
//! check liveness. Nothing here waits on a worker.

pub mod error;
pub mod handlers;

use std::time::Duration;

use axum::{Router, routing::get};
use tokio::net::TcpListener;

use crate::error::Result;
use crate::registry::TaskRegistry;

pub use error::{ApiError, ApiResult};
pub use handlers::{CreateTaskRequest, CreateTaskResponse, HealthResponse};

#[derive(Clone, Debug)]
pub struct AppState {
    pub registry: TaskRegistry,
}

impl AppState {
    pub fn new(registry: TaskRegistry) -> Self {
        Self { registry }
    }
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route(
            "/scrape-cv",
            get(handlers::create_task_from_query).post(handlers::create_task),
        )
        .route("/status/:task_id", get(handlers::get_status))
        .route("/health", get(handlers::health))
        .with_state(state)
}

/// Serve until Ctrl-C, sweeping expired tasks in the background
pub async fn serve(bind_addr: &str, registry: TaskRegistry, sweep_interval: Duration) -> Result<()> {
    let listener = TcpListener::bind(bind_addr).await?;
    log::info!("Listening on {}", listener.local_addr()?);

    let sweeper = registry.spawn_sweeper(sweep_interval);
    let app = routes(AppState::new(registry));

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    sweeper.abort();
    log::info!("Server stopped");
    Ok(served?)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    log::info!("Shutdown signal received");
}
