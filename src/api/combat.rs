//! Combat API endpoints

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use super::error::{combat_error, rejection_response};
use super::AppState;
use crate::combat::{CombatSession, CombatView, HpChange, InitiativeRolls};

/// Build combat router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/encounters/{id}/start", post(start_combat))
        .route("/encounters/{id}/combat", get(combat_view))
        .route("/encounters/{id}/next-turn", post(next_turn))
        .route("/encounters/{id}/end-combat", post(end_combat))
        .route("/participants/{id}/hp", post(update_hp))
}

/// Start response
#[derive(Debug, Serialize)]
pub struct StartResponse {
    pub created: bool,
    pub session: CombatSession,
}

/// Start combat; 201 for a new session, 200 when one already existed
async fn start_combat(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<InitiativeRolls>, JsonRejection>,
) -> impl IntoResponse {
    let Json(rolls) = match payload {
        Ok(body) => body,
        Err(rejection) => return rejection_response(rejection),
    };
    match state.combat.start_combat(&id, &rolls).await {
        Ok(started) => {
            let status = if started.is_created() {
                StatusCode::CREATED
            } else {
                StatusCode::OK
            };
            let created = started.is_created();
            (
                status,
                Json(StartResponse {
                    created,
                    session: started.into_session(),
                }),
            )
                .into_response()
        }
        Err(e) => combat_error(e),
    }
}

/// Combat view response
#[derive(Debug, Serialize)]
pub struct ViewResponse {
    pub title: String,
    #[serde(flatten)]
    pub view: CombatView,
}

async fn combat_view(State(state): State<AppState>, Path(id): Path<String>) -> impl IntoResponse {
    match state.combat.combat_view(&id).await {
        Ok(view) => (
            StatusCode::OK,
            Json(ViewResponse {
                title: view.to_string(),
                view,
            }),
        )
            .into_response(),
        Err(e) => combat_error(e),
    }
}

async fn next_turn(State(state): State<AppState>, Path(id): Path<String>) -> impl IntoResponse {
    match state.combat.advance_turn(&id).await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => combat_error(e),
    }
}

async fn end_combat(State(state): State<AppState>, Path(id): Path<String>) -> impl IntoResponse {
    match state.combat.end_combat(&id).await {
        Ok(session) => (StatusCode::OK, Json(session)).into_response(),
        Err(e) => combat_error(e),
    }
}

async fn update_hp(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<HpChange>, JsonRejection>,
) -> impl IntoResponse {
    let Json(change) = match payload {
        Ok(body) => body,
        Err(rejection) => return rejection_response(rejection),
    };
    match state.combat.apply_hp_change(&id, &change).await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => combat_error(e),
    }
}
