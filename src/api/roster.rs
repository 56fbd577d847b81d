//! Roster API endpoints

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use super::error::{error_response, rejection_response, roster_error};
use super::AppState;
use crate::roster::{NewCampaign, NewEncounter, NewMonster, NewPlayer};

/// Build roster router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/campaigns", post(create_campaign))
        .route("/players", post(create_player))
        .route("/monsters", post(create_monster))
        .route("/encounters", post(create_encounter))
        .route("/encounters/{id}", get(get_encounter).delete(delete_encounter))
}

async fn create_campaign(
    State(state): State<AppState>,
    payload: Result<Json<NewCampaign>, JsonRejection>,
) -> impl IntoResponse {
    let Json(req) = match payload {
        Ok(body) => body,
        Err(rejection) => return rejection_response(rejection),
    };
    match state.roster.create_campaign(&req).await {
        Ok(campaign) => (StatusCode::CREATED, Json(campaign)).into_response(),
        Err(e) => roster_error(e),
    }
}

async fn create_player(
    State(state): State<AppState>,
    payload: Result<Json<NewPlayer>, JsonRejection>,
) -> impl IntoResponse {
    let Json(req) = match payload {
        Ok(body) => body,
        Err(rejection) => return rejection_response(rejection),
    };
    match state.roster.create_player(&req).await {
        Ok(player) => (StatusCode::CREATED, Json(player)).into_response(),
        Err(e) => roster_error(e),
    }
}

async fn create_monster(
    State(state): State<AppState>,
    payload: Result<Json<NewMonster>, JsonRejection>,
) -> impl IntoResponse {
    let Json(req) = match payload {
        Ok(body) => body,
        Err(rejection) => return rejection_response(rejection),
    };
    match state.roster.create_monster(&req).await {
        Ok(monster) => (StatusCode::CREATED, Json(monster)).into_response(),
        Err(e) => roster_error(e),
    }
}

async fn create_encounter(
    State(state): State<AppState>,
    payload: Result<Json<NewEncounter>, JsonRejection>,
) -> impl IntoResponse {
    let Json(req) = match payload {
        Ok(body) => body,
        Err(rejection) => return rejection_response(rejection),
    };
    match state.roster.create_encounter(&req).await {
        Ok(encounter) => (StatusCode::CREATED, Json(encounter)).into_response(),
        Err(e) => roster_error(e),
    }
}

async fn get_encounter(State(state): State<AppState>, Path(id): Path<String>) -> impl IntoResponse {
    match state.roster.get_encounter(&id).await {
        Ok(Some(encounter)) => (StatusCode::OK, Json(encounter)).into_response(),
        Ok(None) => error_response(StatusCode::NOT_FOUND, format!("encounter not found: {}", id)),
        Err(e) => roster_error(e),
    }
}

/// Delete an encounter along with any combat session it has
async fn delete_encounter(State(state): State<AppState>, Path(id): Path<String>) -> impl IntoResponse {
    match state.roster.delete_encounter(&id).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => error_response(StatusCode::NOT_FOUND, format!("encounter not found: {}", id)),
        Err(e) => roster_error(e),
    }
}
