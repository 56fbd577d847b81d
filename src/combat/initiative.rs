//! Initiative values and the rolls entered when combat starts

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::hp::parse_monster_hp;
use super::participant::Combatant;
use crate::roster::Encounter;
use crate::validation::{FieldError, FieldErrors};

/// Lowest accepted initiative roll
pub const MIN_INITIATIVE: i64 = 1;

/// Highest accepted initiative roll
pub const MAX_INITIATIVE: i64 = 30;

/// A validated initiative value in `MIN_INITIATIVE..=MAX_INITIATIVE`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Initiative(u8);

impl Initiative {
    /// Returns `None` when the value is out of range
    pub fn new(value: i64) -> Option<Self> {
        if (MIN_INITIATIVE..=MAX_INITIATIVE).contains(&value) {
            Some(Self(value as u8))
        } else {
            None
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl fmt::Display for Initiative {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Initiative rolls keyed by player and monster record ID.
///
/// Rolls are kept as submitted and checked in [`InitiativeRolls::resolve`],
/// so a malformed value is reported against its own field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InitiativeRolls {
    #[serde(default)]
    pub players: HashMap<String, Value>,
    #[serde(default)]
    pub monsters: HashMap<String, Value>,
}

/// A roster member ready to be enrolled in a combat session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entrant {
    pub combatant: Combatant,
    pub initiative: Initiative,
    /// Seeded as both current and max HP: 0 for players, who track their own
    pub hit_points: i32,
}

impl InitiativeRolls {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn player(mut self, id: impl Into<String>, roll: impl Into<Value>) -> Self {
        self.players.insert(id.into(), roll.into());
        self
    }

    pub fn monster(mut self, id: impl Into<String>, roll: impl Into<Value>) -> Self {
        self.monsters.insert(id.into(), roll.into());
        self
    }

    /// Match the rolls against an encounter's roster.
    ///
    /// Every roster member needs exactly one in-range roll. Rolls for IDs
    /// outside the roster are ignored. Entrants come back players first,
    /// then monsters, each in roster order.
    pub fn resolve(&self, encounter: &Encounter) -> Result<Vec<Entrant>, Vec<FieldError>> {
        let mut errors = FieldErrors::new();

        if encounter.roster_len() == 0 {
            errors.push("roster", "This encounter has no participants.");
        }

        let mut entrants = Vec::with_capacity(encounter.roster_len());

        for player in &encounter.players {
            let field = format!("player_{}_initiative", player.id);
            if let Some(initiative) = check_roll(&mut errors, &field, self.players.get(&player.id)) {
                entrants.push(Entrant {
                    combatant: Combatant::from(player),
                    initiative,
                    hit_points: 0,
                });
            }
        }

        for monster in &encounter.monsters {
            let field = format!("monster_{}_initiative", monster.id);
            if let Some(initiative) = check_roll(&mut errors, &field, self.monsters.get(&monster.id)) {
                entrants.push(Entrant {
                    combatant: Combatant::from(monster),
                    initiative,
                    hit_points: parse_monster_hp(monster.hit_points.as_deref()),
                });
            }
        }

        errors.finish()?;
        Ok(entrants)
    }
}

fn check_roll(errors: &mut FieldErrors, field: &str, roll: Option<&Value>) -> Option<Initiative> {
    let value = errors.whole_number(field, roll)?;
    let initiative = Initiative::new(value);
    if initiative.is_none() {
        errors.push(
            field,
            format!(
                "Ensure this value is between {} and {}.",
                MIN_INITIATIVE, MAX_INITIATIVE
            ),
        );
    }
    initiative
}
