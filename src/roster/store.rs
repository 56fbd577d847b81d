//! Roster persistence and CRUD operations

use std::collections::HashSet;

use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{debug, info};

use super::{Campaign, Encounter, Monster, NewCampaign, NewEncounter, NewMonster, NewPlayer, Player};
use crate::validation::{join_field_errors, FieldError, FieldErrors};

/// Roster store errors
#[derive(Debug, Error)]
pub enum RosterError {
    #[error("invalid input: {}", join_field_errors(.0))]
    Validation(Vec<FieldError>),

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Campaign, player, monster and encounter storage with database backing
#[derive(Clone)]
pub struct RosterStore {
    pool: SqlitePool,
}

impl RosterStore {
    /// Create a new roster store with the given connection pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a campaign
    pub async fn create_campaign(&self, input: &NewCampaign) -> Result<Campaign, RosterError> {
        input.validate().map_err(RosterError::Validation)?;

        let campaign = Campaign {
            id: uuid::Uuid::new_v4().to_string(),
            title: input.title.trim().to_string(),
            description: input.description.clone(),
            created_at: chrono::Utc::now().to_rfc3339(),
        };

        sqlx::query("INSERT INTO campaigns (id, title, description, created_at) VALUES (?, ?, ?, ?)")
            .bind(&campaign.id)
            .bind(&campaign.title)
            .bind(&campaign.description)
            .bind(&campaign.created_at)
            .execute(&self.pool)
            .await?;

        info!("Created campaign '{}' ({})", campaign.title, campaign.id);
        Ok(campaign)
    }

    /// Get a campaign by ID
    pub async fn get_campaign(&self, id: &str) -> Result<Option<Campaign>, RosterError> {
        let row: Option<(String, String, Option<String>, String)> = sqlx::query_as(
            "SELECT id, title, description, created_at FROM campaigns WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(id, title, description, created_at)| Campaign {
            id,
            title,
            description,
            created_at,
        }))
    }

    /// Create a player character in an existing campaign
    pub async fn create_player(&self, input: &NewPlayer) -> Result<Player, RosterError> {
        input.validate().map_err(RosterError::Validation)?;

        if self.get_campaign(&input.campaign_id).await?.is_none() {
            return Err(RosterError::Validation(vec![FieldError::new(
                "campaign_id",
                "Select a valid campaign.",
            )]));
        }

        let player = Player {
            id: uuid::Uuid::new_v4().to_string(),
            campaign_id: input.campaign_id.clone(),
            character_name: input.character_name.trim().to_string(),
            player_name: input.player_name.trim().to_string(),
            character_class: input.character_class.trim().to_string(),
            race: input.race.trim().to_string(),
            level: input.level,
            armor_class: input.armor_class,
        };

        sqlx::query(
            r#"
            INSERT INTO players (id, campaign_id, character_name, player_name, character_class, race, level, armor_class)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&player.id)
        .bind(&player.campaign_id)
        .bind(&player.character_name)
        .bind(&player.player_name)
        .bind(&player.character_class)
        .bind(&player.race)
        .bind(player.level)
        .bind(player.armor_class)
        .execute(&self.pool)
        .await?;

        debug!("Created player '{}' ({})", player.character_name, player.id);
        Ok(player)
    }

    /// Get a player character by ID
    pub async fn get_player(&self, id: &str) -> Result<Option<Player>, RosterError> {
        let row: Option<PlayerRow> = sqlx::query_as(
            r#"
            SELECT id, campaign_id, character_name, player_name, character_class, race, level, armor_class
            FROM players WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(PlayerRow::into_player))
    }

    /// Create a monster stat block
    pub async fn create_monster(&self, input: &NewMonster) -> Result<Monster, RosterError> {
        input.validate().map_err(RosterError::Validation)?;

        let monster = Monster {
            id: uuid::Uuid::new_v4().to_string(),
            name: input.name.trim().to_string(),
            armor_class: input.armor_class,
            hit_points: input.hit_points.clone(),
            challenge_rating: input.challenge_rating.clone(),
        };

        sqlx::query(
            "INSERT INTO monsters (id, name, armor_class, hit_points, challenge_rating) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&monster.id)
        .bind(&monster.name)
        .bind(monster.armor_class)
        .bind(&monster.hit_points)
        .bind(&monster.challenge_rating)
        .execute(&self.pool)
        .await?;

        debug!("Created monster '{}' ({})", monster.name, monster.id);
        Ok(monster)
    }

    /// Get a monster by ID
    pub async fn get_monster(&self, id: &str) -> Result<Option<Monster>, RosterError> {
        let row: Option<MonsterRow> = sqlx::query_as(
            "SELECT id, name, armor_class, hit_points, challenge_rating FROM monsters WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(MonsterRow::into_monster))
    }

    /// Create an encounter with its roster in one transaction
    ///
    /// Every referenced campaign, player and monster must exist; unknown
    /// references are reported as field errors and nothing is written.
    pub async fn create_encounter(&self, input: &NewEncounter) -> Result<Encounter, RosterError> {
        input.validate().map_err(RosterError::Validation)?;

        let player_ids = dedup(&input.player_ids);
        let monster_ids = dedup(&input.monster_ids);

        let mut errors = FieldErrors::new();
        if self.get_campaign(&input.campaign_id).await?.is_none() {
            errors.push("campaign_id", "Select a valid campaign.");
        }
        let mut players = Vec::with_capacity(player_ids.len());
        for id in &player_ids {
            match self.get_player(id).await? {
                Some(player) => players.push(player),
                None => errors.push("player_ids", format!("Unknown player: {}", id)),
            }
        }
        let mut monsters = Vec::with_capacity(monster_ids.len());
        for id in &monster_ids {
            match self.get_monster(id).await? {
                Some(monster) => monsters.push(monster),
                None => errors.push("monster_ids", format!("Unknown monster: {}", id)),
            }
        }
        errors.finish().map_err(RosterError::Validation)?;

        // Same order get_encounter reads them back in
        players.sort_by(|a, b| (&a.character_name, &a.id).cmp(&(&b.character_name, &b.id)));
        monsters.sort_by(|a, b| (&a.name, &a.id).cmp(&(&b.name, &b.id)));

        let id = uuid::Uuid::new_v4().to_string();
        let created_at = chrono::Utc::now().to_rfc3339();

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO encounters (id, campaign_id, name, description, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&input.campaign_id)
        .bind(input.name.trim())
        .bind(&input.description)
        .bind(&created_at)
        .execute(&mut *tx)
        .await?;

        for player_id in &player_ids {
            sqlx::query("INSERT INTO encounter_players (encounter_id, player_id) VALUES (?, ?)")
                .bind(&id)
                .bind(player_id)
                .execute(&mut *tx)
                .await?;
        }

        for monster_id in &monster_ids {
            sqlx::query("INSERT INTO encounter_monsters (encounter_id, monster_id) VALUES (?, ?)")
                .bind(&id)
                .bind(monster_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        info!(
            "Created encounter '{}' ({}) with {} players and {} monsters",
            input.name.trim(),
            id,
            player_ids.len(),
            monster_ids.len()
        );

        Ok(Encounter {
            id,
            campaign_id: input.campaign_id.clone(),
            name: input.name.trim().to_string(),
            description: input.description.clone(),
            players,
            monsters,
            created_at,
        })
    }

    /// Get an encounter, treating a missing one as an error
    pub async fn require_encounter(&self, id: &str) -> Result<Encounter, RosterError> {
        self.get_encounter(id)
            .await?
            .ok_or_else(|| RosterError::NotFound {
                kind: "encounter",
                id: id.to_string(),
            })
    }

    /// Get an encounter with its resolved roster
    pub async fn get_encounter(&self, id: &str) -> Result<Option<Encounter>, RosterError> {
        let row: Option<(String, String, String, Option<String>, String)> = sqlx::query_as(
            "SELECT id, campaign_id, name, description, created_at FROM encounters WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some((id, campaign_id, name, description, created_at)) = row else {
            return Ok(None);
        };

        let players: Vec<PlayerRow> = sqlx::query_as(
            r#"
            SELECT p.id, p.campaign_id, p.character_name, p.player_name, p.character_class, p.race, p.level, p.armor_class
            FROM players p
            JOIN encounter_players ep ON ep.player_id = p.id
            WHERE ep.encounter_id = ?
            ORDER BY p.character_name, p.id
            "#,
        )
        .bind(&id)
        .fetch_all(&self.pool)
        .await?;

        let monsters: Vec<MonsterRow> = sqlx::query_as(
            r#"
            SELECT m.id, m.name, m.armor_class, m.hit_points, m.challenge_rating
            FROM monsters m
            JOIN encounter_monsters em ON em.monster_id = m.id
            WHERE em.encounter_id = ?
            ORDER BY m.name, m.id
            "#,
        )
        .bind(&id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(Encounter {
            id,
            campaign_id,
            name,
            description,
            players: players.into_iter().map(PlayerRow::into_player).collect(),
            monsters: monsters.into_iter().map(MonsterRow::into_monster).collect(),
            created_at,
        }))
    }

    /// Delete an encounter; its combat session and participants go with it
    pub async fn delete_encounter(&self, id: &str) -> Result<bool, RosterError> {
        let result = sqlx::query("DELETE FROM encounters WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        let deleted = result.rows_affected() > 0;
        if deleted {
            info!("Deleted encounter {}", id);
        }
        Ok(deleted)
    }
}

fn dedup(ids: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.iter().filter(|id| seen.insert(id.as_str())).cloned().collect()
}

/// Row type for player queries
#[derive(sqlx::FromRow)]
struct PlayerRow {
    id: String,
    campaign_id: String,
    character_name: String,
    player_name: String,
    character_class: String,
    race: String,
    level: i64,
    armor_class: i32,
}

impl PlayerRow {
    fn into_player(self) -> Player {
        Player {
            id: self.id,
            campaign_id: self.campaign_id,
            character_name: self.character_name,
            player_name: self.player_name,
            character_class: self.character_class,
            race: self.race,
            level: self.level,
            armor_class: self.armor_class,
        }
    }
}

/// Row type for monster queries
#[derive(sqlx::FromRow)]
struct MonsterRow {
    id: String,
    name: String,
    armor_class: i32,
    hit_points: Option<String>,
    challenge_rating: Option<String>,
}

impl MonsterRow {
    fn into_monster(self) -> Monster {
        Monster {
            id: self.id,
            name: self.name,
            armor_class: self.armor_class,
            hit_points: self.hit_points,
            challenge_rating: self.challenge_rating,
        }
    }
}
