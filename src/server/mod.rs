//! HTTP layer: the monitoring endpoint, the rolling "latest days" alias
//! routes, and a static-file fallback for everything else. Every response
//! passes through the timing middleware feeding the request monitor.

use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::services::{ServeDir, ServeFile};
use tracing::{info, warn};

use crate::config::Config;
use crate::server::alias::{Alias, AliasRegistry};
use crate::server::monitor::{MonitorHandle, ResponseInfo};

pub mod alias;
pub mod monitor;

/// Builds the full router. The registry lives for the process lifetime and
/// is shared with the scheduler, which swaps the alias targets.
pub fn build_router(
    cfg: &Config,
    registry: Arc<AliasRegistry>,
    monitor: MonitorHandle,
) -> Router {
    let today = registry.clone();
    let one_day = registry.clone();
    let two_days = registry;

    Router::new()
        .route("/api/monitor", get(monitor_endpoint))
        .route(
            "/data/daily_reports/today.json",
            get(move |request: Request<Body>| {
                serve_alias_file(today.slot(0).get_path(), request)
            }),
        )
        .route(
            "/data/daily_reports/-1day.json",
            get(move |request: Request<Body>| {
                serve_alias_file(one_day.slot(1).get_path(), request)
            }),
        )
        .route(
            "/data/daily_reports/-2day.json",
            get(move |request: Request<Body>| {
                serve_alias_file(two_days.slot(2).get_path(), request)
            }),
        )
        .fallback_service(ServeDir::new(&cfg.public_path))
        .layer(middleware::from_fn_with_state(
            monitor.clone(),
            track_response,
        ))
        .with_state(monitor)
}

/// Serves until `shutdown` flips, then drains in-flight requests.
pub async fn serve(
    bind_addr: &str,
    app: Router,
    mut shutdown: watch::Receiver<bool>,
) -> std::io::Result<()> {
    let listener = TcpListener::bind(bind_addr).await?;
    info!(addr = bind_addr, "server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.changed().await;
            info!("server shutting down");
        })
        .await
}

/// GET /api/monitor: the last completed minute's counters. A stalled or
/// stopped monitor maps to a 500 with a generic message.
async fn monitor_endpoint(State(monitor): State<MonitorHandle>) -> Response {
    match monitor.snapshot().await {
        Ok(summary) => Json(summary).into_response(),
        Err(err) => {
            warn!(error = %err, "monitor snapshot failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "monitoring data unavailable").into_response()
        }
    }
}

/// Streams the aliased file resolved *before* the open: if a publish swaps
/// the pointer mid-request, this request still serves the file it
/// resolved, which remains on disk. Late dataset days run to several MB,
/// so the body is streamed rather than buffered whole.
async fn serve_alias_file(path: std::path::PathBuf, request: Request<Body>) -> Response {
    let mut service = ServeFile::new(&path);
    match service.try_call(request).await {
        Ok(response) => response.map(Body::new).into_response(),
        Err(err) => {
            warn!(file = %path.display(), error = %err, "alias target unreadable");
            StatusCode::NOT_FOUND.into_response()
        }
    }
}

/// Times every response and hands the result to the monitor actor.
async fn track_response(
    State(monitor): State<MonitorHandle>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let method = request.method().to_string();
    let uri = request.uri().to_string();
    let user_agent = request
        .headers()
        .get(header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);

    let started = Instant::now();
    let response = next.run(request).await;

    monitor
        .record(ResponseInfo {
            method,
            uri,
            status: response.status().as_u16(),
            elapsed: started.elapsed(),
            user_agent,
        })
        .await;
    response
}
