// Web server — Axum-based read API over the hotspot store.
//
// Routes:
//   GET /           welcome message
//   GET /health     liveness + crate version
//   GET /hotspots/  criteria query (also served without the trailing slash)
//
// CORS is wide open (any origin, GET only). Every request is traced.

use std::sync::Arc;

use anyhow::Result;
use axum::http::{header, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::db::Database;
use crate::query::HotspotQueryService;

pub mod handlers;

/// Shared application state threaded through all Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: HotspotQueryService,
}

impl AppState {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self {
            service: HotspotQueryService::new(db),
        }
    }
}

/// Start the Axum web server and block until it exits.
pub async fn run_server(db: Arc<dyn Database>, port: u16, bind: &str) -> Result<()> {
    let app = build_router(AppState::new(db));

    let addr = format!("{bind}:{port}");
    info!("GEIH API listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root::root))
        .route("/health", get(handlers::root::health))
        .route("/hotspots", get(handlers::hotspots::list_hotspots))
        .route("/hotspots/", get(handlers::hotspots::list_hotspots))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::OPTIONS])
                .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Typed JSON error response helper.
pub fn api_error(status: StatusCode, message: &str) -> Response {
    (status, axum::Json(serde_json::json!({ "error": message }))).into_response()
}
