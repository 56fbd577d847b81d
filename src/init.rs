//! Database initialization module
//!
//! One-time setup for the trackerd_init tool: create the schema in a fresh
//! file and optionally load a small demo campaign.

use std::path::Path;

use anyhow::{anyhow, bail, Result};
use sqlx::SqliteConnection;
use tracing::info;

use crate::db::Database;

/// Initialize a new tracker database
///
/// # Arguments
/// * `path` - Path to the SQLite database file (must not exist)
/// * `seed` - Also insert the demo campaign
///
/// # Errors
/// * Database file already exists
/// * Database creation or seeding fails
pub async fn init_database(path: &Path, seed: bool) -> Result<()> {
    if path.exists() {
        bail!(
            "Database file already exists: {}. Remove it first or use a different path.",
            path.display()
        );
    }

    let path_str = path
        .to_str()
        .ok_or_else(|| anyhow!("Database path is not valid UTF-8: {}", path.display()))?;

    info!("Creating new database at {}", path.display());
    let db = Database::new(Some(path_str)).await?;

    if seed {
        let mut tx = db.pool().begin().await?;
        seed_demo(&mut tx).await?;
        tx.commit().await?;
    }

    info!("Database initialization complete");
    Ok(())
}

struct DemoPlayer {
    character_name: &'static str,
    player_name: &'static str,
    class: &'static str,
    race: &'static str,
    level: i64,
    armor_class: i32,
}

struct DemoMonster {
    name: &'static str,
    armor_class: i32,
    hit_points: &'static str,
    challenge_rating: &'static str,
}

const DEMO_PLAYERS: [DemoPlayer; 2] = [
    DemoPlayer {
        character_name: "Thorin Ironforge",
        player_name: "Mike",
        class: "Fighter",
        race: "Dwarf",
        level: 3,
        armor_class: 18,
    },
    DemoPlayer {
        character_name: "Elara Moonwhisper",
        player_name: "Sarah",
        class: "Wizard",
        race: "Elf",
        level: 3,
        armor_class: 12,
    },
];

const DEMO_MONSTERS: [DemoMonster; 2] = [
    DemoMonster {
        name: "Goblin Boss",
        armor_class: 17,
        hit_points: "21 (6d6)",
        challenge_rating: "1",
    },
    DemoMonster {
        name: "Wolf",
        armor_class: 13,
        hit_points: "11 (2d8 + 2)",
        challenge_rating: "1/4",
    },
];

/// Insert a campaign, its players, some monsters and one encounter
async fn seed_demo(conn: &mut SqliteConnection) -> Result<()> {
    let now = chrono::Utc::now().to_rfc3339();
    let campaign_id = uuid::Uuid::new_v4().to_string();

    sqlx::query("INSERT INTO campaigns (id, title, description, created_at) VALUES (?, ?, ?, ?)")
        .bind(&campaign_id)
        .bind("The Lost Mine")
        .bind("A short demo campaign")
        .bind(&now)
        .execute(&mut *conn)
        .await?;

    let mut player_ids = Vec::new();
    for p in &DEMO_PLAYERS {
        let id = uuid::Uuid::new_v4().to_string();
        sqlx::query(
            r#"
            INSERT INTO players (id, campaign_id, character_name, player_name, character_class, race, level, armor_class, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&campaign_id)
        .bind(p.character_name)
        .bind(p.player_name)
        .bind(p.class)
        .bind(p.race)
        .bind(p.level)
        .bind(p.armor_class)
        .bind(&now)
        .execute(&mut *conn)
        .await?;
        player_ids.push(id);
    }

    let mut monster_ids = Vec::new();
    for m in &DEMO_MONSTERS {
        let id = uuid::Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO monsters (id, name, armor_class, hit_points, challenge_rating, created_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(m.name)
        .bind(m.armor_class)
        .bind(m.hit_points)
        .bind(m.challenge_rating)
        .bind(&now)
        .execute(&mut *conn)
        .await?;
        monster_ids.push(id);
    }

    let encounter_id = uuid::Uuid::new_v4().to_string();
    sqlx::query(
        "INSERT INTO encounters (id, campaign_id, name, description, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&encounter_id)
    .bind(&campaign_id)
    .bind("Goblin Ambush")
    .bind("Goblins and their wolf spring from the brush")
    .bind(&now)
    .execute(&mut *conn)
    .await?;

    for id in &player_ids {
        sqlx::query("INSERT INTO encounter_players (encounter_id, player_id) VALUES (?, ?)")
            .bind(&encounter_id)
            .bind(id)
            .execute(&mut *conn)
            .await?;
    }
    for id in &monster_ids {
        sqlx::query("INSERT INTO encounter_monsters (encounter_id, monster_id) VALUES (?, ?)")
            .bind(&encounter_id)
            .bind(id)
            .execute(&mut *conn)
            .await?;
    }

    info!(
        "Seeded demo campaign with {} players, {} monsters and encounter {}",
        player_ids.len(),
        monster_ids.len(),
        encounter_id
    );
    Ok(())
}
