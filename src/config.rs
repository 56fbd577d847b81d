//! Server configuration
//!
//! Layered with figment, later layers winning:
//! 1. Compiled defaults
//! 2. `trackerd.toml` in the working directory, or the file given with `--config`
//! 3. `TRACKERD_*` environment variables (`TRACKERD_BIND_ADDR`, `TRACKERD_DB_PATH`, ...)
//!
//! Command-line flags are applied on top by the binary.

use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::db::DEFAULT_MAX_CONNECTIONS;

/// Config file read when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "trackerd.toml";

/// Prefix for environment overrides
pub const ENV_PREFIX: &str = "TRACKERD_";

/// Server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub bind_addr: SocketAddr,
    /// SQLite file; `None` runs on an in-memory database
    pub db_path: Option<String>,
    pub max_connections: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 8080)),
            db_path: None,
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }
}

impl Config {
    /// Build the layered figment without extracting it
    pub fn figment(path: Option<&Path>) -> Figment {
        let file = match path {
            Some(p) => Toml::file(p),
            None => Toml::file(DEFAULT_CONFIG_FILE),
        };

        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(file)
            .merge(Env::prefixed(ENV_PREFIX))
    }

    /// Load defaults, config file and environment overrides
    pub fn load(path: Option<&Path>) -> Result<Config, figment::Error> {
        Self::figment(path).extract()
    }

    /// Parse TOML over the defaults, ignoring file and environment
    pub fn from_toml_str(toml: &str) -> Result<Config, figment::Error> {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::string(toml))
            .extract()
    }
}
