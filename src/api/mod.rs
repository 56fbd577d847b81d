//! HTTP API module - REST endpoints for the roster and combat tracker

mod combat;
mod error;
mod roster;

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;

use crate::combat::CombatManager;
use crate::db::Database;
use crate::roster::RosterStore;
pub use error::ErrorResponse;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub roster: Arc<RosterStore>,
    pub combat: Arc<CombatManager>,
}

/// Build the API router
pub fn router(db: Arc<Database>) -> Router {
    let roster = Arc::new(RosterStore::new(db.pool().clone()));
    let combat = Arc::new(CombatManager::new(db.pool().clone()));

    let state = AppState { db, roster, combat };

    Router::new()
        .route("/health", get(health_check))
        .route("/", get(root))
        .merge(roster::router())
        .merge(combat::router())
        .with_state(state)
}

/// Root endpoint
async fn root() -> impl IntoResponse {
    Json(RootResponse {
        name: "trackerd",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Serialize)]
struct RootResponse {
    name: &'static str,
    version: &'static str,
}

/// Health check endpoint
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.db.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "healthy",
                database: "ok",
            }),
        ),
        Err(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthResponse {
                status: "unhealthy",
                database: "error",
            }),
        ),
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    database: &'static str,
}
