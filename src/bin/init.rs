//! trackerd_init - One-time database initialization tool
//!
//! Creates a fresh tracker database, optionally with a demo campaign.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// trackerd database initialization tool
#[derive(Parser, Debug)]
#[command(
    name = "trackerd_init",
    version,
    about = "Initialize a new combat tracker database"
)]
struct Args {
    /// Path to SQLite database file to create (must not exist)
    #[arg(short, long)]
    database: PathBuf,

    /// Insert a demo campaign with players, monsters and an encounter
    #[arg(long)]
    seed: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "trackerd=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    trackerd::init::init_database(&args.database, args.seed).await?;

    Ok(())
}
