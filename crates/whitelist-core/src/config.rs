//! ============================================================================
//! Configuration - Environment-driven settings
//! ============================================================================
//! Values come from the process environment (binaries load `.env` first):
//! - WHITELIST_ENV            development | test | production (default production)
//! - WHITELIST_BIND           listen address (default 127.0.0.1:3000)
//! - WHITELIST_DB_PATH        redb file (default ~/.whitelist/whitelist.redb)
//! - WHITELIST_SCHEDULE_PATH  schedule JSON (built-in schedule when unset)
//! ============================================================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::warn;

use crate::error::{Result, WhitelistError};
use crate::schedule::Schedule;

pub const DEFAULT_BIND: &str = "127.0.0.1:3000";

/// Deployment environment. Imports are only allowed in development.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Test,
    #[default]
    Production,
}

impl Environment {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "development" | "dev" => Some(Self::Development),
            "test" => Some(Self::Test),
            "production" | "prod" => Some(Self::Production),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Test => "test",
            Environment::Production => "production",
        }
    }

    /// Whether whitelist imports may be run
    pub fn allows_imports(&self) -> bool {
        *self == Environment::Development
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: Environment,
    pub bind_addr: SocketAddr,
    pub db_path: Option<String>,
    pub schedule_path: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            db_path: None,
            schedule_path: None,
        }
    }
}

impl AppConfig {
    /// Read configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup`, used by tests to avoid touching
    /// the real environment
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = match lookup("WHITELIST_ENV") {
            Some(value) => Environment::parse(&value).unwrap_or_else(|| {
                warn!("Unknown WHITELIST_ENV '{}', falling back to production", value);
                Environment::Production
            }),
            None => Environment::default(),
        };

        let bind = lookup("WHITELIST_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind_addr = bind.parse::<SocketAddr>().map_err(|e| {
            WhitelistError::Config(format!("Invalid WHITELIST_BIND '{}': {}", bind, e))
        })?;

        Ok(Self {
            environment,
            bind_addr,
            db_path: lookup("WHITELIST_DB_PATH").filter(|p| !p.is_empty()),
            schedule_path: lookup("WHITELIST_SCHEDULE_PATH")
                .filter(|p| !p.is_empty())
                .map(PathBuf::from),
        })
    }

    /// Load the configured schedule, or the built-in one when no file is set
    pub fn load_schedule(&self) -> Result<Schedule> {
        match &self.schedule_path {
            Some(path) => Schedule::load(path),
            None => {
                warn!("WHITELIST_SCHEDULE_PATH not set, using built-in schedule");
                Ok(Schedule::default())
            }
        }
    }
}
