//! Combat session manager
//!
//! Loads and saves sessions and participants, running the turn state machine
//! inside one transaction per operation:
//! - starting combat from an encounter roster (all rows or none)
//! - reading the combat view, reconciling a stale turn pointer
//! - advancing turns, applying HP changes, ending combat

use std::fmt;

use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use super::error::CombatError;
use super::hp::{HpChange, HpOutcome};
use super::initiative::{Initiative, InitiativeRolls};
use super::participant::{alive_order, sort_turn_order, CombatParticipant, Combatant, ParticipantKind, StatRef};
use super::session::{CombatSession, TurnAdvance};
use crate::roster::RosterStore;

/// Outcome of a start request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Started {
    /// A new session was created
    Created(CombatSession),
    /// The encounter was already in combat; its session is returned unchanged
    Resumed(CombatSession),
}

impl Started {
    pub fn session(&self) -> &CombatSession {
        match self {
            Started::Created(s) | Started::Resumed(s) => s,
        }
    }

    pub fn into_session(self) -> CombatSession {
        match self {
            Started::Created(s) | Started::Resumed(s) => s,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, Started::Created(_))
    }
}

/// Everything the combat screen shows
#[derive(Debug, Clone, Serialize)]
pub struct CombatView {
    pub encounter_id: String,
    pub encounter_name: String,
    pub session: CombatSession,
    /// All participants, dead included, in turn order
    pub participants: Vec<CombatParticipant>,
    /// IDs of living participants in turn order
    pub alive_ids: Vec<String>,
    /// `None` when nobody is alive or the pointer is out of range
    pub current_participant: Option<CombatParticipant>,
    /// The turn pointer was corrected while building this view
    pub reconciled: bool,
}

impl CombatView {
    /// Living participants in turn order
    pub fn alive(&self) -> impl Iterator<Item = &CombatParticipant> {
        self.participants.iter().filter(|p| !p.is_dead)
    }
}

impl fmt::Display for CombatView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Combat: {} - Round {}",
            self.encounter_name, self.session.current_round
        )
    }
}

/// Result of a turn advance
#[derive(Debug, Clone, Serialize)]
pub struct TurnReport {
    pub session: CombatSession,
    #[serde(flatten)]
    pub advance: TurnAdvance,
}

/// Result of an HP change
#[derive(Debug, Clone, Serialize)]
pub struct HpReport {
    pub participant: CombatParticipant,
    pub outcome: HpOutcome,
    pub message: String,
}

/// Combat manager over the shared database pool
#[derive(Clone)]
pub struct CombatManager {
    pool: SqlitePool,
    roster: RosterStore,
}

impl CombatManager {
    /// Create a new combat manager
    pub fn new(pool: SqlitePool) -> Self {
        let roster = RosterStore::new(pool.clone());
        Self { pool, roster }
    }

    /// Start combat for an encounter.
    ///
    /// If the encounter already has a session (active or ended) it is
    /// returned unchanged and the rolls are not looked at. Otherwise every
    /// roster member needs a valid roll, and the session and all its
    /// participants are written in one transaction.
    pub async fn start_combat(
        &self,
        encounter_id: &str,
        rolls: &InitiativeRolls,
    ) -> Result<Started, CombatError> {
        let encounter = self.roster.require_encounter(encounter_id).await?;

        if let Some(session) = self.get_session(encounter_id).await? {
            info!("Encounter '{}' is already in combat", encounter.name);
            return Ok(Started::Resumed(session));
        }

        let entrants = rolls.resolve(&encounter).map_err(CombatError::Validation)?;

        let session = CombatSession::begin(&encounter.id);
        let participants: Vec<CombatParticipant> = entrants
            .into_iter()
            .enumerate()
            .map(|(seq, e)| {
                CombatParticipant::enlist(&session.id, seq as i64, e.combatant, e.initiative, e.hit_points)
            })
            .collect();

        let mut tx = self.pool.begin().await?;

        match insert_session(&mut tx, &session).await {
            Ok(()) => {}
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                // Lost a race with another start for the same encounter
                tx.rollback().await?;
                warn!("Concurrent combat start for encounter {}", encounter_id);
                return match self.get_session(encounter_id).await? {
                    Some(existing) => Ok(Started::Resumed(existing)),
                    None => Err(CombatError::SessionNotFound(encounter_id.to_string())),
                };
            }
            Err(e) => return Err(e.into()),
        }

        for participant in &participants {
            insert_participant(&mut tx, participant).await?;
        }

        tx.commit().await?;

        info!(
            "Combat started for '{}' ({}) with {} participants",
            encounter.name,
            session.id,
            participants.len()
        );
        Ok(Started::Created(session))
    }

    /// Build the combat view, reconciling a stale turn pointer first.
    ///
    /// Reconciliation only runs on an active session with at least one
    /// living participant, and is persisted before the view is returned.
    pub async fn combat_view(&self, encounter_id: &str) -> Result<CombatView, CombatError> {
        let encounter = self.roster.require_encounter(encounter_id).await?;

        let mut tx = self.pool.begin().await?;
        let mut session = fetch_session(&mut tx, encounter_id)
            .await?
            .ok_or_else(|| CombatError::SessionNotFound(encounter_id.to_string()))?;
        let participants = fetch_participants(&mut tx, &session.id).await?;

        let reconciled = reconcile_in(&mut tx, &mut session, &participants).await?;
        tx.commit().await?;

        let current_participant = session.current_participant(&participants).cloned();
        let alive_ids = alive_order(&participants)
            .into_iter()
            .map(|i| participants[i].id.clone())
            .collect();

        Ok(CombatView {
            encounter_id: encounter.id,
            encounter_name: encounter.name,
            session,
            participants,
            alive_ids,
            current_participant,
            reconciled,
        })
    }

    /// Correct a stale turn pointer without building a view.
    /// Returns whether anything changed.
    pub async fn reconcile(&self, encounter_id: &str) -> Result<bool, CombatError> {
        let mut tx = self.pool.begin().await?;
        let mut session = fetch_session(&mut tx, encounter_id)
            .await?
            .ok_or_else(|| CombatError::SessionNotFound(encounter_id.to_string()))?;
        let participants = fetch_participants(&mut tx, &session.id).await?;

        let reconciled = reconcile_in(&mut tx, &mut session, &participants).await?;
        tx.commit().await?;
        Ok(reconciled)
    }

    /// Finish the current turn and move to the next living participant
    pub async fn advance_turn(&self, encounter_id: &str) -> Result<TurnReport, CombatError> {
        let mut tx = self.pool.begin().await?;
        let mut session = fetch_session(&mut tx, encounter_id)
            .await?
            .ok_or_else(|| CombatError::SessionNotFound(encounter_id.to_string()))?;
        let mut participants = fetch_participants(&mut tx, &session.id).await?;

        let before: Vec<bool> = participants.iter().map(|p| p.turn_completed).collect();

        // On error the transaction is dropped and rolled back untouched
        let advance = session.advance_turn(&mut participants)?;

        save_session(&mut tx, &session).await?;
        for (participant, was_completed) in participants.iter().zip(before) {
            if participant.turn_completed != was_completed {
                save_turn_completed(&mut tx, participant).await?;
            }
        }
        tx.commit().await?;

        if advance.new_round {
            info!(
                "Round {} begins for encounter {}",
                session.current_round, encounter_id
            );
        } else {
            debug!(
                "Turn completed in round {} for encounter {}, next index {}",
                session.current_round, encounter_id, session.current_turn_index
            );
        }

        Ok(TurnReport { session, advance })
    }

    /// Apply damage or healing to a participant.
    ///
    /// Any participant may be changed at any time: out of turn, while dead,
    /// or after combat has ended. Notes are logged, never stored.
    pub async fn apply_hp_change(
        &self,
        participant_id: &str,
        change: &HpChange,
    ) -> Result<HpReport, CombatError> {
        let (kind, amount) = change.validate().map_err(CombatError::Validation)?;

        let mut tx = self.pool.begin().await?;
        let mut participant = fetch_participant(&mut tx, participant_id)
            .await?
            .ok_or_else(|| CombatError::ParticipantNotFound(participant_id.to_string()))?;

        let outcome = participant.apply_hp_change(kind, amount);
        save_hp(&mut tx, &participant).await?;
        tx.commit().await?;

        info!(
            participant = %participant.id,
            change = %kind,
            notes = change.notes.as_deref().unwrap_or(""),
            "{}",
            outcome
        );

        let message = outcome.to_string();
        Ok(HpReport {
            participant,
            outcome,
            message,
        })
    }

    /// End combat. Calling it again returns the ended session unchanged.
    pub async fn end_combat(&self, encounter_id: &str) -> Result<CombatSession, CombatError> {
        let mut tx = self.pool.begin().await?;
        let mut session = fetch_session(&mut tx, encounter_id)
            .await?
            .ok_or_else(|| CombatError::SessionNotFound(encounter_id.to_string()))?;

        if session.end() {
            save_session(&mut tx, &session).await?;
            info!(
                "Combat ended for encounter {} after {} rounds",
                encounter_id, session.current_round
            );
        }
        tx.commit().await?;

        Ok(session)
    }

    /// Get the session for an encounter, if combat was ever started
    pub async fn get_session(&self, encounter_id: &str) -> Result<Option<CombatSession>, CombatError> {
        let mut conn = self.pool.acquire().await?;
        fetch_session(&mut conn, encounter_id).await
    }

    /// Get all participants of a session in turn order
    pub async fn participants(&self, session_id: &str) -> Result<Vec<CombatParticipant>, CombatError> {
        let mut conn = self.pool.acquire().await?;
        fetch_participants(&mut conn, session_id).await
    }

    /// Get a participant by ID
    pub async fn get_participant(
        &self,
        participant_id: &str,
    ) -> Result<Option<CombatParticipant>, CombatError> {
        let mut conn = self.pool.acquire().await?;
        fetch_participant(&mut conn, participant_id).await
    }
}

async fn reconcile_in(
    conn: &mut SqliteConnection,
    session: &mut CombatSession,
    participants: &[CombatParticipant],
) -> Result<bool, CombatError> {
    if !session.is_active {
        return Ok(false);
    }

    let alive = alive_order(participants).len();
    if !session.reconcile(alive) {
        return Ok(false);
    }

    save_session(conn, session).await?;
    info!(
        "Turn pointer reset for encounter {}: round {} starts",
        session.encounter_id, session.current_round
    );
    Ok(true)
}

const SESSION_COLUMNS: &str =
    "id, encounter_id, current_round, current_turn_index, is_active, started_at, ended_at";

async fn fetch_session(
    conn: &mut SqliteConnection,
    encounter_id: &str,
) -> Result<Option<CombatSession>, CombatError> {
    let sql = format!("SELECT {} FROM combat_sessions WHERE encounter_id = ?", SESSION_COLUMNS);
    let row: Option<SessionRow> = sqlx::query_as(&sql)
        .bind(encounter_id)
        .fetch_optional(&mut *conn)
        .await?;
    row.map(SessionRow::into_session).transpose()
}

async fn insert_session(conn: &mut SqliteConnection, session: &CombatSession) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO combat_sessions (id, encounter_id, current_round, current_turn_index, is_active, started_at, ended_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&session.id)
    .bind(&session.encounter_id)
    .bind(i64::from(session.current_round))
    .bind(session.current_turn_index as i64)
    .bind(session.is_active)
    .bind(&session.started_at)
    .bind(&session.ended_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn save_session(conn: &mut SqliteConnection, session: &CombatSession) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE combat_sessions
        SET current_round = ?, current_turn_index = ?, is_active = ?, ended_at = ?
        WHERE id = ?
        "#,
    )
    .bind(i64::from(session.current_round))
    .bind(session.current_turn_index as i64)
    .bind(session.is_active)
    .bind(&session.ended_at)
    .bind(&session.id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

const PARTICIPANT_SELECT: &str = r#"
    SELECT cp.id, cp.session_id, cp.seq, cp.participant_type, cp.player_id, cp.monster_id,
           cp.initiative, cp.current_hp, cp.max_hp, cp.is_dead, cp.turn_completed,
           p.character_name AS player_name, p.armor_class AS player_ac,
           m.name AS monster_name, m.armor_class AS monster_ac
    FROM combat_participants cp
    LEFT JOIN players p ON p.id = cp.player_id
    LEFT JOIN monsters m ON m.id = cp.monster_id
"#;

async fn fetch_participants(
    conn: &mut SqliteConnection,
    session_id: &str,
) -> Result<Vec<CombatParticipant>, CombatError> {
    let sql = format!("{} WHERE cp.session_id = ?", PARTICIPANT_SELECT);
    let rows: Vec<ParticipantRow> = sqlx::query_as(&sql)
        .bind(session_id)
        .fetch_all(&mut *conn)
        .await?;

    let mut participants = rows
        .into_iter()
        .map(ParticipantRow::into_participant)
        .collect::<Result<Vec<_>, _>>()?;
    sort_turn_order(&mut participants);
    Ok(participants)
}

async fn fetch_participant(
    conn: &mut SqliteConnection,
    participant_id: &str,
) -> Result<Option<CombatParticipant>, CombatError> {
    let sql = format!("{} WHERE cp.id = ?", PARTICIPANT_SELECT);
    let row: Option<ParticipantRow> = sqlx::query_as(&sql)
        .bind(participant_id)
        .fetch_optional(&mut *conn)
        .await?;
    row.map(ParticipantRow::into_participant).transpose()
}

async fn insert_participant(
    conn: &mut SqliteConnection,
    participant: &CombatParticipant,
) -> Result<(), sqlx::Error> {
    let (player_id, monster_id) = match &participant.combatant {
        Combatant::Player(r) => (Some(r.id.as_str()), None),
        Combatant::Monster(r) => (None, Some(r.id.as_str())),
    };

    sqlx::query(
        r#"
        INSERT INTO combat_participants
            (id, session_id, seq, participant_type, player_id, monster_id, initiative, current_hp, max_hp, is_dead, turn_completed)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&participant.id)
    .bind(&participant.session_id)
    .bind(participant.seq)
    .bind(participant.kind().as_str())
    .bind(player_id)
    .bind(monster_id)
    .bind(i64::from(participant.initiative.value()))
    .bind(participant.current_hp)
    .bind(participant.max_hp)
    .bind(participant.is_dead)
    .bind(participant.turn_completed)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn save_turn_completed(
    conn: &mut SqliteConnection,
    participant: &CombatParticipant,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE combat_participants SET turn_completed = ? WHERE id = ?")
        .bind(participant.turn_completed)
        .bind(&participant.id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

async fn save_hp(conn: &mut SqliteConnection, participant: &CombatParticipant) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE combat_participants SET current_hp = ?, is_dead = ? WHERE id = ?")
        .bind(participant.current_hp)
        .bind(participant.is_dead)
        .bind(&participant.id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Row type for session queries
#[derive(sqlx::FromRow)]
struct SessionRow {
    id: String,
    encounter_id: String,
    current_round: i64,
    current_turn_index: i64,
    is_active: bool,
    started_at: String,
    ended_at: Option<String>,
}

impl SessionRow {
    fn into_session(self) -> Result<CombatSession, CombatError> {
        let invalid = |reason: &str| CombatError::InvalidRow {
            id: self.id.clone(),
            reason: reason.to_string(),
        };
        let current_round = u32::try_from(self.current_round)
            .ok()
            .filter(|&r| r >= 1)
            .ok_or_else(|| invalid("round out of range"))?;
        let current_turn_index =
            usize::try_from(self.current_turn_index).map_err(|_| invalid("negative turn index"))?;

        Ok(CombatSession {
            id: self.id,
            encounter_id: self.encounter_id,
            current_round,
            current_turn_index,
            is_active: self.is_active,
            started_at: self.started_at,
            ended_at: self.ended_at,
        })
    }
}

/// Row type for participant queries, joined with the stat records
#[derive(sqlx::FromRow)]
struct ParticipantRow {
    id: String,
    session_id: String,
    seq: i64,
    participant_type: String,
    player_id: Option<String>,
    monster_id: Option<String>,
    initiative: i64,
    current_hp: i32,
    max_hp: i32,
    is_dead: bool,
    turn_completed: bool,
    player_name: Option<String>,
    player_ac: Option<i32>,
    monster_name: Option<String>,
    monster_ac: Option<i32>,
}

impl ParticipantRow {
    fn into_participant(self) -> Result<CombatParticipant, CombatError> {
        let invalid = |reason: String| CombatError::InvalidRow {
            id: self.id.clone(),
            reason,
        };

        let kind = ParticipantKind::parse(&self.participant_type)
            .ok_or_else(|| invalid(format!("unknown participant type '{}'", self.participant_type)))?;

        let combatant = match (kind, self.player_id, self.monster_id) {
            (ParticipantKind::Player, Some(id), None) => Combatant::Player(StatRef {
                id,
                name: self.player_name.unwrap_or_default(),
                armor_class: self.player_ac.unwrap_or_default(),
            }),
            (ParticipantKind::Monster, None, Some(id)) => Combatant::Monster(StatRef {
                id,
                name: self.monster_name.unwrap_or_default(),
                armor_class: self.monster_ac.unwrap_or_default(),
            }),
            _ => return Err(invalid("references do not match participant type".to_string())),
        };

        let initiative = Initiative::new(self.initiative)
            .ok_or_else(|| invalid(format!("initiative {} out of range", self.initiative)))?;

        Ok(CombatParticipant {
            id: self.id,
            session_id: self.session_id,
            seq: self.seq,
            combatant,
            initiative,
            current_hp: self.current_hp,
            max_hp: self.max_hp,
            is_dead: self.is_dead,
            turn_completed: self.turn_completed,
        })
    }
}
