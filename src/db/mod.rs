//! Database module - SQLite schema for campaigns, rosters and combat

#[cfg(test)]
pub mod test_utils;

use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tracing::info;

/// Default pool size for file-backed databases
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// Database handle wrapping SQLite connection pool
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Create a new database connection
    /// If path is None, uses in-memory database (for testing)
    pub async fn new(path: Option<&str>) -> Result<Self> {
        Self::connect(path, DEFAULT_MAX_CONNECTIONS).await
    }

    /// Create a new database connection with an explicit pool size
    pub async fn connect(path: Option<&str>, max_connections: u32) -> Result<Self> {
        let conn_str = match path {
            Some(p) => format!("sqlite:{}?mode=rwc", p),
            None => "sqlite::memory:".to_string(),
        };

        let options = SqliteConnectOptions::from_str(&conn_str)?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .foreign_keys(true);

        // An in-memory database lives only as long as its connection, so pin
        // exactly one and never let the pool recycle it.
        let pool_options = match path {
            Some(_) => SqlitePoolOptions::new().max_connections(max_connections.max(1)),
            None => SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None),
        };

        let pool = pool_options.connect_with(options).await?;

        let db = Self { pool };
        db.run_migrations().await?;

        Ok(db)
    }

    /// Run database migrations
    async fn run_migrations(&self) -> Result<()> {
        info!("Running database migrations...");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS campaigns (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                description TEXT,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS players (
                id TEXT PRIMARY KEY,
                campaign_id TEXT NOT NULL REFERENCES campaigns(id) ON DELETE CASCADE,
                character_name TEXT NOT NULL,
                player_name TEXT NOT NULL,
                character_class TEXT NOT NULL,
                race TEXT NOT NULL,
                level INTEGER NOT NULL DEFAULT 1,
                armor_class INTEGER NOT NULL,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // Monster hit points are free text such as "82 (10d11 + 26)"
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS monsters (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                armor_class INTEGER NOT NULL,
                hit_points TEXT,
                challenge_rating TEXT,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS encounters (
                id TEXT PRIMARY KEY,
                campaign_id TEXT NOT NULL REFERENCES campaigns(id) ON DELETE CASCADE,
                name TEXT NOT NULL,
                description TEXT,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS encounter_players (
                encounter_id TEXT NOT NULL REFERENCES encounters(id) ON DELETE CASCADE,
                player_id TEXT NOT NULL REFERENCES players(id) ON DELETE CASCADE,
                PRIMARY KEY (encounter_id, player_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS encounter_monsters (
                encounter_id TEXT NOT NULL REFERENCES encounters(id) ON DELETE CASCADE,
                monster_id TEXT NOT NULL REFERENCES monsters(id) ON DELETE CASCADE,
                PRIMARY KEY (encounter_id, monster_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // One combat session per encounter, kept after it ends
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS combat_sessions (
                id TEXT PRIMARY KEY,
                encounter_id TEXT NOT NULL UNIQUE REFERENCES encounters(id) ON DELETE CASCADE,
                current_round INTEGER NOT NULL DEFAULT 1 CHECK (current_round >= 1),
                current_turn_index INTEGER NOT NULL DEFAULT 0 CHECK (current_turn_index >= 0),
                is_active INTEGER NOT NULL DEFAULT 1,
                started_at TEXT NOT NULL,
                ended_at TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS combat_participants (
                id TEXT PRIMARY KEY,
                session_id TEXT NOT NULL REFERENCES combat_sessions(id) ON DELETE CASCADE,
                seq INTEGER NOT NULL,
                participant_type TEXT NOT NULL CHECK (participant_type IN ('player', 'monster')),
                player_id TEXT REFERENCES players(id) ON DELETE CASCADE,
                monster_id TEXT REFERENCES monsters(id) ON DELETE CASCADE,
                initiative INTEGER NOT NULL CHECK (initiative BETWEEN 1 AND 30),
                current_hp INTEGER NOT NULL,
                max_hp INTEGER NOT NULL,
                is_dead INTEGER NOT NULL DEFAULT 0,
                turn_completed INTEGER NOT NULL DEFAULT 0,
                CHECK (
                    (participant_type = 'player' AND player_id IS NOT NULL AND monster_id IS NULL)
                    OR (participant_type = 'monster' AND monster_id IS NOT NULL AND player_id IS NULL)
                )
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // Create indexes
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_players_campaign ON players(campaign_id)")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_encounters_campaign ON encounters(campaign_id)")
            .execute(&self.pool)
            .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_participants_session ON combat_participants(session_id)",
        )
        .execute(&self.pool)
        .await?;

        info!("Database migrations complete");
        Ok(())
    }

    /// Get the connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Check if database is healthy
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_db_creation() {
        let db = Database::new(None).await.unwrap();
        db.health_check().await.unwrap();
    }

    #[tokio::test]
    async fn test_migrations_run() {
        let db = Database::new(None).await.unwrap();

        let result: (i32,) = sqlx::query_as("SELECT COUNT(*) FROM combat_sessions")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(result.0, 0);
    }

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let db = Database::new(None).await.unwrap();
        db.run_migrations().await.unwrap();
        db.health_check().await.unwrap();
    }

    #[tokio::test]
    async fn test_participant_reference_check() {
        let db = Database::new(None).await.unwrap();
        let pool = db.pool();

        sqlx::query("INSERT INTO campaigns (id, title) VALUES ('c1', 'Test')")
            .execute(pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO encounters (id, campaign_id, name) VALUES ('e1', 'c1', 'Ambush')")
            .execute(pool)
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO combat_sessions (id, encounter_id, started_at) VALUES ('s1', 'e1', 'now')",
        )
        .execute(pool)
        .await
        .unwrap();

        // A player-type row without a player reference is rejected
        let result = sqlx::query(
            "INSERT INTO combat_participants
             (id, session_id, seq, participant_type, initiative, current_hp, max_hp)
             VALUES ('p1', 's1', 0, 'player', 10, 0, 0)",
        )
        .execute(pool)
        .await;
        assert!(result.is_err());
    }
}
