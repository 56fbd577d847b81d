//! Error responses shared by the API handlers

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

use crate::combat::CombatError;
use crate::roster::RosterError;
use crate::validation::FieldError;

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    /// Present only for validation failures
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldError>,
}

/// Build an error response with a plain message
pub fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
            fields: Vec::new(),
        }),
    )
        .into_response()
}

fn validation_response(fields: Vec<FieldError>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: "invalid input".to_string(),
            fields,
        }),
    )
        .into_response()
}

/// Map a body the `Json` extractor refused onto a `{error, fields}` body.
///
/// Malformed or mistyped JSON is a 400 like any other invalid input; a
/// missing content type keeps the extractor's own status.
pub fn rejection_response(rejection: JsonRejection) -> Response {
    let status = match rejection {
        JsonRejection::JsonDataError(_) | JsonRejection::JsonSyntaxError(_) => StatusCode::BAD_REQUEST,
        _ => rejection.status(),
    };
    (
        status,
        Json(ErrorResponse {
            error: "invalid input".to_string(),
            fields: vec![FieldError::new("body", rejection.body_text())],
        }),
    )
        .into_response()
}

/// Map a combat error onto a status code and body
pub fn combat_error(e: CombatError) -> Response {
    match e {
        CombatError::Validation(fields) => validation_response(fields),
        CombatError::EncounterNotFound(_)
        | CombatError::SessionNotFound(_)
        | CombatError::ParticipantNotFound(_) => error_response(StatusCode::NOT_FOUND, e.to_string()),
        CombatError::NoActiveParticipants | CombatError::CombatEnded => {
            error_response(StatusCode::CONFLICT, e.to_string())
        }
        CombatError::InvalidRow { .. } | CombatError::Database(_) => {
            error!("Combat request failed: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// Map a roster error onto a status code and body
pub fn roster_error(e: RosterError) -> Response {
    match e {
        RosterError::Validation(fields) => validation_response(fields),
        RosterError::NotFound { .. } => error_response(StatusCode::NOT_FOUND, e.to_string()),
        RosterError::Database(_) => {
            error!("Roster request failed: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}
