//! HTTP server implementation using Axum.

use axum::{Router, routing::get};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use reportflow_core::error::Result;
use reportflow_scheduler::{Executor, ReportScheduler};
use reportflow_store::Store;

/// Shared state for the gateway server.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub executor: Arc<Executor>,
    pub scheduler: ReportScheduler,
}

/// Build the Axum router with all routes.
pub fn build_router(state: AppState) -> Router {
    let shared = Arc::new(state);
    Router::new()
        .route("/health", get(super::routes::health_check))
        .route(
            "/api/scheduler",
            get(super::routes::scheduler_status).post(super::routes::scheduler_trigger),
        )
        .route(
            "/api/reports/{id}/run",
            get(super::routes::run_status).post(super::routes::run_report),
        )
        .route("/api/reports/{id}/history", get(super::routes::report_history))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(shared)
}

/// Bind and serve until the process exits.
pub async fn serve(state: AppState, bind: &str, port: u16) -> Result<()> {
    let addr = format!("{bind}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("🌐 Gateway listening on {addr}");
    axum::serve(listener, build_router(state)).await?;
    Ok(())
}
