//! HTTP surface of the screenshot service
//!
//! Thin axum handlers over [`ScreenshotService`]. Every response body is a
//! JSON object with a `status` field of `success`, `error` or `alive`.

use crate::{CrawlError, ScreenshotService};
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};

const INVALID_PARAMETERS: &str = "Invalid parameters";
const NO_SCREENSHOTS: &str = "No screenshots found for the given ID";

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ScreenshotService>,
    /// Present when the Prometheus recorder is installed.
    pub metrics: Option<PrometheusHandle>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SingleQuery {
    pub url: Option<String>,
}

pub fn router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/isalive", get(is_alive))
        .route("/screenshot", get(single_screenshot))
        .route("/screenshots", post(submit_crawl))
        .route("/screenshots/{run_id}", get(list_screenshots));

    if state.metrics.is_some() {
        router = router.route("/metrics", get(render_metrics));
    }

    router.with_state(state)
}

/// Serve `state` on `addr` until SIGINT or SIGTERM.
pub async fn serve(addr: &str, state: AppState) -> Result<(), CrawlError> {
    let listener = TcpListener::bind(addr).await?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({"status": "error", "message": message}))).into_response()
}

pub async fn is_alive(State(state): State<AppState>) -> Response {
    Json(state.service.is_alive()).into_response()
}

pub async fn single_screenshot(
    State(state): State<AppState>,
    Query(query): Query<SingleQuery>,
) -> Response {
    match state.service.capture_single(query.url.as_deref()).await {
        Ok(path) => Json(json!({"status": "success", "path": path})).into_response(),
        Err(e) if e.is_client_error() => {
            error_response(StatusCode::BAD_REQUEST, &e.to_string())
        }
        Err(e) => {
            error!("Single screenshot failed: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string())
        }
    }
}

pub async fn submit_crawl(State(state): State<AppState>, body: Bytes) -> Response {
    let body: Value = match serde_json::from_slice(&body) {
        Ok(body) => body,
        Err(e) => {
            warn!("Rejected unparseable crawl submission: {}", e);
            return error_response(StatusCode::BAD_REQUEST, INVALID_PARAMETERS);
        }
    };

    match state.service.submit(&body) {
        Ok(run_id) => Json(json!({"status": "success", "run_id": run_id})).into_response(),
        Err(CrawlError::InvalidParameters(reason)) => {
            warn!("Rejected crawl submission: {}", reason);
            error_response(StatusCode::BAD_REQUEST, INVALID_PARAMETERS)
        }
        Err(e) => {
            error!("Failed to start crawl job: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string())
        }
    }
}

pub async fn list_screenshots(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> Response {
    match state.service.screenshots(&run_id).await {
        Ok(paths) => Json(json!({"status": "success", "screenshots": paths})).into_response(),
        Err(CrawlError::NotFound(_)) => error_response(StatusCode::NOT_FOUND, NO_SCREENSHOTS),
        Err(e) => {
            error!("Failed to look up screenshots for {}: {}", run_id, e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string())
        }
    }
}

pub async fn render_metrics(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => handle.render().into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn shutdown_signal() {
    let interrupt = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for SIGINT: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = interrupt => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
