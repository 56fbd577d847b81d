//! Combat session state machine
//!
//! A session walks the living participants of an encounter through
//! initiative order:
//! - `current_turn_index` points into the *alive* ordering, which is
//!   recomputed on every call because deaths happen between turns
//! - a pointer left past the end by deaths is corrected by starting a new
//!   round at index 0 ([`CombatSession::reconcile`])
//! - completed-turn flags are per round and reset on rollover

use serde::Serialize;

use super::error::CombatError;
use super::participant::{alive_order, CombatParticipant};

/// The live state of an encounter in combat
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CombatSession {
    pub id: String,
    pub encounter_id: String,
    /// Starts at 1
    pub current_round: u32,
    /// Zero-based index into the alive turn order
    pub current_turn_index: usize,
    /// Cleared by [`CombatSession::end`], never set again
    pub is_active: bool,
    pub started_at: String,
    pub ended_at: Option<String>,
}

/// What a single turn advance did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TurnAdvance {
    /// Participant whose turn was marked complete
    pub completed: String,
    /// A stale pointer was corrected before advancing
    pub reconciled: bool,
    /// The advance rolled over into a new round
    pub new_round: bool,
}

impl CombatSession {
    /// Round 1, first turn, active
    pub fn begin(encounter_id: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            encounter_id: encounter_id.to_string(),
            current_round: 1,
            current_turn_index: 0,
            is_active: true,
            started_at: chrono::Utc::now().to_rfc3339(),
            ended_at: None,
        }
    }

    /// Correct a turn pointer left past the end of the alive order.
    ///
    /// Starts a new round at index 0 and returns true if it changed
    /// anything. Running it again on the corrected state is a no-op, and it
    /// never touches a session with nobody alive.
    pub fn reconcile(&mut self, alive_count: usize) -> bool {
        if alive_count == 0 || self.current_turn_index < alive_count {
            return false;
        }
        self.current_turn_index = 0;
        self.current_round = self.current_round.saturating_add(1);
        true
    }

    /// The living participant whose turn it is, if the pointer is in range
    pub fn current_participant<'a>(
        &self,
        participants: &'a [CombatParticipant],
    ) -> Option<&'a CombatParticipant> {
        alive_order(participants)
            .get(self.current_turn_index)
            .map(|&i| &participants[i])
    }

    /// Finish the current turn and move to the next living participant.
    ///
    /// Fails without touching anything when the session has ended or when
    /// nobody is alive.
    pub fn advance_turn(
        &mut self,
        participants: &mut [CombatParticipant],
    ) -> Result<TurnAdvance, CombatError> {
        if !self.is_active {
            return Err(CombatError::CombatEnded);
        }

        let order = alive_order(participants);
        if order.is_empty() {
            return Err(CombatError::NoActiveParticipants);
        }

        let reconciled = self.reconcile(order.len());

        let current = &mut participants[order[self.current_turn_index]];
        current.turn_completed = true;
        let completed = current.id.clone();

        self.current_turn_index += 1;

        let new_round = self.current_turn_index >= order.len();
        if new_round {
            self.current_turn_index = 0;
            self.current_round = self.current_round.saturating_add(1);
            // Dead participants keep whatever flag they died with
            for &i in &order {
                participants[i].turn_completed = false;
            }
        }

        Ok(TurnAdvance {
            completed,
            reconciled,
            new_round,
        })
    }

    /// Mark combat as over. Returns false if it had already ended.
    pub fn end(&mut self) -> bool {
        if !self.is_active {
            return false;
        }
        self.is_active = false;
        self.ended_at = Some(chrono::Utc::now().to_rfc3339());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::hp::HpChangeKind;
    use crate::combat::participant::tests::{monster, player};
    use crate::combat::participant::sort_turn_order;

    fn names_completed(participants: &[CombatParticipant]) -> Vec<(&str, bool)> {
        participants
            .iter()
            .map(|p| (p.name(), p.turn_completed))
            .collect()
    }

    #[test]
    fn test_begin() {
        let session = CombatSession::begin("e1");
        assert_eq!(session.current_round, 1);
        assert_eq!(session.current_turn_index, 0);
        assert!(session.is_active);
        assert!(session.ended_at.is_none());
    }

    #[test]
    fn test_advance_within_round() {
        let mut session = CombatSession::begin("e1");
        let mut participants = vec![monster("A", 20, 10), monster("B", 10, 10)];

        let advance = session.advance_turn(&mut participants).unwrap();
        assert_eq!(advance.completed, participants[0].id);
        assert!(!advance.new_round);
        assert_eq!(session.current_turn_index, 1);
        assert_eq!(session.current_round, 1);
        assert!(participants[0].turn_completed);
    }

    #[test]
    fn test_round_rollover_resets_flags() {
        let mut session = CombatSession::begin("e1");
        let mut participants = vec![monster("A", 20, 10), monster("B", 10, 10)];
        participants[0].turn_completed = true;
        session.current_turn_index = 1;

        let advance = session.advance_turn(&mut participants).unwrap();
        assert!(advance.new_round);
        assert_eq!(session.current_turn_index, 0);
        assert_eq!(session.current_round, 2);
        assert_eq!(names_completed(&participants), vec![("A", false), ("B", false)]);
    }

    #[test]
    fn test_death_mid_round_lands_on_next_alive() {
        let mut session = CombatSession::begin("e1");
        let mut participants = vec![
            monster("A", 30, 10),
            monster("B", 20, 10),
            monster("C", 10, 10),
        ];

        // A is acting; B dies before A's turn ends
        participants[1].apply_hp_change(HpChangeKind::Damage, 10);
        session.advance_turn(&mut participants).unwrap();

        assert_eq!(session.current_turn_index, 1);
        assert_eq!(session.current_participant(&participants).unwrap().name(), "C");
    }

    #[test]
    fn test_stale_pointer_is_reconciled_before_advancing() {
        let mut session = CombatSession::begin("e1");
        let mut participants = vec![
            monster("A", 30, 10),
            monster("B", 20, 10),
            monster("C", 10, 10),
        ];
        session.current_turn_index = 2;
        participants[2].is_dead = true;

        let advance = session.advance_turn(&mut participants).unwrap();
        assert!(advance.reconciled);
        assert_eq!(advance.completed, participants[0].id);
        assert_eq!(session.current_round, 2);
        assert_eq!(session.current_turn_index, 1);
    }

    #[test]
    fn test_no_alive_participants_leaves_session_untouched() {
        let mut session = CombatSession::begin("e1");
        let mut participants = vec![monster("A", 30, 10)];
        participants[0].is_dead = true;
        session.current_turn_index = 3;
        let before = session.clone();

        let result = session.advance_turn(&mut participants);
        assert!(matches!(result, Err(CombatError::NoActiveParticipants)));
        assert_eq!(session, before);
        assert!(!participants[0].turn_completed);
    }

    #[test]
    fn test_ended_session_refuses_to_advance() {
        let mut session = CombatSession::begin("e1");
        let mut participants = vec![monster("A", 30, 10)];
        assert!(session.end());

        let result = session.advance_turn(&mut participants);
        assert!(matches!(result, Err(CombatError::CombatEnded)));
        assert_eq!(session.current_round, 1);
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let mut session = CombatSession::begin("e1");
        session.current_turn_index = 4;

        assert!(session.reconcile(2));
        assert_eq!((session.current_round, session.current_turn_index), (2, 0));

        assert!(!session.reconcile(2));
        assert_eq!((session.current_round, session.current_turn_index), (2, 0));
    }

    #[test]
    fn test_reconcile_ignores_empty_alive_set() {
        let mut session = CombatSession::begin("e1");
        session.current_turn_index = 1;
        assert!(!session.reconcile(0));
        assert_eq!(session.current_turn_index, 1);
        assert_eq!(session.current_round, 1);
    }

    #[test]
    fn test_rollover_skips_dead_flags() {
        let mut session = CombatSession::begin("e1");
        let mut participants = vec![monster("A", 30, 10), monster("B", 20, 10)];

        session.advance_turn(&mut participants).unwrap();
        participants[0].is_dead = true;

        // Only B is alive now, so the pointer at 1 is stale: new round, B acts
        let advance = session.advance_turn(&mut participants).unwrap();
        assert!(advance.reconciled);
        assert!(advance.new_round);
        assert_eq!(session.current_round, 3);
        assert_eq!(names_completed(&participants), vec![("A", true), ("B", false)]);
    }

    #[test]
    fn test_full_rounds_with_player_and_monster() {
        let mut session = CombatSession::begin("e1");
        let mut participants = vec![monster("Wolf", 10, 11), player("Ana", 15)];
        sort_turn_order(&mut participants);

        assert_eq!(session.current_participant(&participants).unwrap().name(), "Ana");

        session.advance_turn(&mut participants).unwrap();
        assert_eq!((session.current_round, session.current_turn_index), (1, 1));
        assert_eq!(session.current_participant(&participants).unwrap().name(), "Wolf");

        session.advance_turn(&mut participants).unwrap();
        assert_eq!((session.current_round, session.current_turn_index), (2, 0));
        assert!(participants.iter().all(|p| !p.turn_completed));
    }

    #[test]
    fn test_end_is_one_way() {
        let mut session = CombatSession::begin("e1");
        assert!(session.end());
        let ended_at = session.ended_at.clone();
        assert!(ended_at.is_some());

        assert!(!session.end());
        assert_eq!(session.ended_at, ended_at);
        assert!(!session.is_active);
    }
}
