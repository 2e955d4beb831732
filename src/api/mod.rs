//! HTTP API module
//!
//! This module contains all HTTP endpoint handlers and response structures.

pub mod handlers;
pub mod responses;

use std::sync::Arc;
use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use handlers::*;

/// Create the HTTP router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/timers", get(list_handler).post(add_handler))
        .route("/timers/:id", get(get_handler).delete(remove_handler))
        .route("/timers/:id/start", post(start_handler))
        .route("/timers/:id/pause", post(pause_handler))
        .route("/timers/:id/stop", post(stop_handler))
        .route("/timers/:id/name", put(rename_handler))
        .route("/reorder", post(move_handler))
        .route("/reset", post(reset_handler))
        .route("/save", post(save_handler))
        // Host lifecycle forwarding, for hosts without Unix signals
        .route("/lifecycle/suspend", post(suspend_handler))
        .route("/lifecycle/resume", post(resume_handler))
        .route("/status", get(status_handler))
        .route("/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
