//! Combat tracker errors

use thiserror::Error;

use crate::roster::RosterError;
use crate::validation::{join_field_errors, FieldError};

/// Errors from combat session operations
#[derive(Debug, Error)]
pub enum CombatError {
    /// Rejected before any state was touched
    #[error("invalid input: {}", join_field_errors(.0))]
    Validation(Vec<FieldError>),

    #[error("encounter not found: {0}")]
    EncounterNotFound(String),

    #[error("no combat session for encounter: {0}")]
    SessionNotFound(String),

    #[error("combat participant not found: {0}")]
    ParticipantNotFound(String),

    /// Everyone in the session is dead; turns cannot advance
    #[error("no active participants in combat")]
    NoActiveParticipants,

    #[error("combat has already ended")]
    CombatEnded,

    #[error("invalid participant row {id}: {reason}")]
    InvalidRow { id: String, reason: String },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<RosterError> for CombatError {
    fn from(e: RosterError) -> Self {
        match e {
            RosterError::Validation(errors) => CombatError::Validation(errors),
            RosterError::NotFound { kind: "encounter", id } => CombatError::EncounterNotFound(id),
            RosterError::NotFound { kind, id } => CombatError::InvalidRow {
                id,
                reason: format!("referenced {} is missing", kind),
            },
            RosterError::Database(e) => CombatError::Database(e),
        }
    }
}
