//! Campaign roster records
//!
//! Campaigns, player characters, monster stat blocks and encounters. The
//! combat tracker only ever reads these; they are created through the small
//! record-management surface in [`store::RosterStore`].

mod store;

pub use store::{RosterError, RosterStore};

use serde::{Deserialize, Serialize};

use crate::validation::{FieldError, FieldErrors};

/// A campaign groups players and encounters
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Campaign {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub created_at: String,
}

/// A player character
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Player {
    pub id: String,
    pub campaign_id: String,
    pub character_name: String,
    pub player_name: String,
    pub character_class: String,
    pub race: String,
    pub level: i64,
    pub armor_class: i32,
}

/// A monster stat block
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Monster {
    pub id: String,
    pub name: String,
    pub armor_class: i32,
    /// Free text, e.g. "82 (10d11 + 26)"
    pub hit_points: Option<String>,
    pub challenge_rating: Option<String>,
}

/// A named roster of players and monsters that can be fought as a unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Encounter {
    pub id: String,
    pub campaign_id: String,
    pub name: String,
    pub description: Option<String>,
    /// Ordered by character name
    pub players: Vec<Player>,
    /// Ordered by monster name
    pub monsters: Vec<Monster>,
    pub created_at: String,
}

impl Encounter {
    /// Total number of roster members
    pub fn roster_len(&self) -> usize {
        self.players.len() + self.monsters.len()
    }
}

/// Input for creating a campaign
#[derive(Debug, Clone, Deserialize)]
pub struct NewCampaign {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl NewCampaign {
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = FieldErrors::new();
        errors.require_text("title", &self.title);
        errors.max_length("title", &self.title, 200);
        errors.finish()
    }
}

/// Input for creating a player character
#[derive(Debug, Clone, Deserialize)]
pub struct NewPlayer {
    pub campaign_id: String,
    pub character_name: String,
    pub player_name: String,
    pub character_class: String,
    pub race: String,
    #[serde(default = "default_level")]
    pub level: i64,
    pub armor_class: i32,
}

fn default_level() -> i64 {
    1
}

impl NewPlayer {
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = FieldErrors::new();
        for (field, value) in [
            ("character_name", &self.character_name),
            ("player_name", &self.player_name),
            ("character_class", &self.character_class),
            ("race", &self.race),
        ] {
            errors.require_text(field, value);
            errors.max_length(field, value, 100);
        }
        if self.level < 1 {
            errors.push("level", "Ensure this value is greater than or equal to 1.");
        }
        if self.armor_class < 0 {
            errors.push("armor_class", "Ensure this value is greater than or equal to 0.");
        }
        errors.finish()
    }
}

/// Input for creating a monster
#[derive(Debug, Clone, Deserialize)]
pub struct NewMonster {
    pub name: String,
    pub armor_class: i32,
    #[serde(default)]
    pub hit_points: Option<String>,
    #[serde(default)]
    pub challenge_rating: Option<String>,
}

impl NewMonster {
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = FieldErrors::new();
        errors.require_text("name", &self.name);
        errors.max_length("name", &self.name, 200);
        if self.armor_class < 0 {
            errors.push("armor_class", "Ensure this value is greater than or equal to 0.");
        }
        if let Some(hp) = &self.hit_points {
            errors.max_length("hit_points", hp, 100);
        }
        errors.finish()
    }
}

/// Input for creating an encounter
#[derive(Debug, Clone, Deserialize)]
pub struct NewEncounter {
    pub campaign_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub player_ids: Vec<String>,
    #[serde(default)]
    pub monster_ids: Vec<String>,
}

impl NewEncounter {
    /// Shape checks only; references are resolved by the store
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = FieldErrors::new();
        errors.require_text("name", &self.name);
        errors.max_length("name", &self.name, 200);
        errors.require_text("campaign_id", &self.campaign_id);
        if self.player_ids.is_empty() && self.monster_ids.is_empty() {
            errors.push("roster", "An encounter needs at least one player or monster.");
        }
        errors.finish()
    }
}
