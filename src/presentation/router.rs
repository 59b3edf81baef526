// Route table
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{health_check, history, root, ws_handler};
use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

pub fn build_router(state: Arc<AppState>) -> Router {
    let assets = ServeDir::new(&state.static_dir);

    Router::new()
        .route("/", get(root))
        .route("/ws", get(ws_handler))
        .route("/healthz", get(health_check))
        .route("/history", get(history))
        .fallback_service(assets)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
