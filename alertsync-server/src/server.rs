//! Axum server setup and router configuration.

use crate::api;
use crate::state::AppState;
use axum::{
    Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::get,
};
use serde::Serialize;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::sync::watch;

/// Build the main application router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(ready_check))
        .nest("/admin", api::admin::router())
        .with_state(state)
}

/// Health check response.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Simple health check - returns OK if the server is running.
async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Ready check response.
#[derive(Serialize)]
struct ReadyResponse {
    status: &'static str,
    database: &'static str,
    index: &'static str,
}

fn probe<E: std::fmt::Display>(component: &str, result: Result<(), E>) -> &'static str {
    match result {
        Ok(()) => "up",
        Err(e) => {
            tracing::warn!(component, error = %e, "Readiness probe failed");
            "down"
        }
    }
}

/// Readiness: both the database and the index store answer.
async fn ready_check(State(state): State<AppState>) -> impl IntoResponse {
    let database = probe(
        "database",
        sqlx::query("SELECT 1").execute(&state.db).await.map(|_| ()),
    );
    let index = probe("index", state.index.ping().await);

    let ready = database == "up" && index == "up";
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        status,
        Json(ReadyResponse {
            status: if ready { "ready" } else { "not_ready" },
            database,
            index,
        }),
    )
}

/// Run the server until `shutdown_rx` turns `true`.
pub async fn run_server(
    router: Router,
    addr: SocketAddr,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Result<(), std::io::Error> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.wait_for(|stop| *stop).await;
        })
        .await
}
