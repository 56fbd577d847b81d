//! Combat turn tracker
//!
//! Runs an encounter as a combat session:
//! - initiative rolls entered once at start, 1 to 30
//! - turns walk the living participants, highest initiative first
//! - damage and healing on any participant at any time
//! - rounds advance when the last living participant finishes
//!
//! [`CombatSession`] and [`CombatParticipant`] hold the turn state machine;
//! [`CombatManager`] loads and saves it.

mod error;
mod hp;
mod initiative;
mod manager;
mod participant;
mod session;

pub use error::CombatError;
pub use hp::{parse_monster_hp, HpChange, HpChangeKind, HpOutcome, MAX_NOTES_LEN};
pub use initiative::{Entrant, Initiative, InitiativeRolls, MAX_INITIATIVE, MIN_INITIATIVE};
pub use manager::{CombatManager, CombatView, HpReport, Started, TurnReport};
pub use participant::{alive_order, sort_turn_order, CombatParticipant, Combatant, ParticipantKind, StatRef};
pub use session::{CombatSession, TurnAdvance};
