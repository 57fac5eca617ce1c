//! HTTP surface: the merged calendar and a health check.
//!
//! - `GET /tucan.ics` - the merged calendar, `503` until the first pass
//! - `GET /health` - liveness plus cache statistics

use std::future::Future;
use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use campuscal_core::CalendarStore;
use serde_json::json;
use tokio::net::TcpListener;
use tracing::info;

pub const CALENDAR_PATH: &str = "/tucan.ics";
pub const HEALTH_PATH: &str = "/health";

const CALENDAR_CONTENT_TYPE: &str = "text/calendar; charset=utf-8";

pub fn create_router(store: CalendarStore) -> Router {
    Router::new()
        .route(CALENDAR_PATH, get(serve_calendar))
        .route(HEALTH_PATH, get(health_check))
        .with_state(store)
}

async fn serve_calendar(State(store): State<CalendarStore>) -> Response {
    match store.merged().await {
        Some(merged) => (
            [(header::CONTENT_TYPE, CALENDAR_CONTENT_TYPE)],
            merged.as_str().to_string(),
        )
            .into_response(),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            "Calendar not available yet, first fetch still pending",
        )
            .into_response(),
    }
}

async fn health_check(State(store): State<CalendarStore>) -> impl IntoResponse {
    let status = store.status().await;
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "months_cached": status.months_cached,
        "last_updated": status.age_display(),
    }))
}

/// Serve until `shutdown` resolves.
pub async fn serve<F>(addr: SocketAddr, store: CalendarStore, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!(address = %addr, "HTTP server listening");

    axum::serve(listener, create_router(store))
        .with_graceful_shutdown(shutdown)
        .await
        .context("HTTP server failed")?;

    info!("HTTP server stopped");
    Ok(())
}
