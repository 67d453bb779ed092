//! ============================================================================
//! Mint Schedule - Opening times and caps per tier
//! ============================================================================
//! The schedule is loaded once at startup and shared read-only. Every
//! whitelist level has exactly one window, so a lookup by level cannot fail
//! at runtime; a schedule file missing a tier is rejected while loading.
//!
//! ## File format
//! ```json
//! {
//!   "Airdrop":       { "start": "2025-01-15T15:00:00Z", "maxMintAmount": 15 },
//!   "Super Premint": { "start": "2025-01-15T15:00:00Z", "maxMintAmount": 15 },
//!   "Premint":       { "start": "2025-01-15T16:00:00Z", "maxMintAmount": 10 },
//!   "Developer":     { "start": "2025-01-14T17:00:00Z", "maxMintAmount": 100 },
//!   "Public":        { "start": "2025-01-15T17:00:00Z" }
//! }
//! ```
//! ============================================================================

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

use crate::error::{Result, WhitelistError};
use crate::types::{Tier, WhitelistLevel};

/// Opening time and per-wallet cap of a whitelist level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TierWindow {
    pub start: DateTime<Utc>,
    pub max_mint_amount: u32,
}

/// Public opening. No cap applies once it has started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicWindow {
    pub start: DateTime<Utc>,
}

/// Static release schedule, one window per tier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    #[serde(rename = "Airdrop")]
    pub airdrop: TierWindow,
    #[serde(rename = "Super Premint")]
    pub super_premint: TierWindow,
    #[serde(rename = "Premint")]
    pub premint: TierWindow,
    #[serde(rename = "Developer")]
    pub developer: TierWindow,
    #[serde(rename = "Public")]
    pub public: PublicWindow,
}

impl Schedule {
    /// Window for an assigned level
    pub fn window(&self, level: WhitelistLevel) -> &TierWindow {
        match level {
            WhitelistLevel::Airdrop => &self.airdrop,
            WhitelistLevel::SuperPremint => &self.super_premint,
            WhitelistLevel::Premint => &self.premint,
            WhitelistLevel::Developer => &self.developer,
        }
    }

    /// Opening time of any tier, Public included
    pub fn start_of(&self, tier: Tier) -> DateTime<Utc> {
        match tier {
            Tier::Public => self.public.start,
            Tier::Airdrop => self.airdrop.start,
            Tier::SuperPremint => self.super_premint.start,
            Tier::Premint => self.premint.start,
            Tier::Developer => self.developer.start,
        }
    }

    /// Whether public minting has opened at `now` (inclusive)
    pub fn public_open(&self, now: DateTime<Utc>) -> bool {
        now >= self.public.start
    }

    /// Parse a schedule from its JSON representation
    pub fn from_json(json: &str) -> Result<Self> {
        let schedule: Schedule = serde_json::from_str(json)
            .map_err(|e| WhitelistError::Schedule(format!("Invalid schedule: {}", e)))?;
        schedule.check();
        Ok(schedule)
    }

    /// Load a schedule file from disk
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            WhitelistError::Schedule(format!(
                "Failed to read schedule {}: {}",
                path.display(),
                e
            ))
        })?;
        let schedule = Self::from_json(&json)?;
        info!("Loaded mint schedule from {}", path.display());
        Ok(schedule)
    }

    /// Warn about windows that can never be used
    fn check(&self) {
        for level in WhitelistLevel::ALL {
            let window = self.window(level);
            if window.start >= self.public.start {
                warn!(
                    "{} opens at {} which is not before Public ({}), its cap is never applied",
                    level, window.start, self.public.start
                );
            }
            if window.max_mint_amount == 0 {
                warn!("{} has a cap of 0, its wallets must wait for Public", level);
            }
        }
    }
}

/// Built-in Public start, 2025-01-15T17:00:00Z
const DEFAULT_PUBLIC_START_SECS: i64 = 1_736_960_400;

impl Default for Schedule {
    /// Development schedule: Premint one hour before Public, Super Premint and
    /// Airdrop two hours before, Developer a day early.
    fn default() -> Self {
        let public = DateTime::<Utc>::UNIX_EPOCH + Duration::seconds(DEFAULT_PUBLIC_START_SECS);

        Self {
            airdrop: TierWindow {
                start: public - Duration::hours(2),
                max_mint_amount: 15,
            },
            super_premint: TierWindow {
                start: public - Duration::hours(2),
                max_mint_amount: 15,
            },
            premint: TierWindow {
                start: public - Duration::hours(1),
                max_mint_amount: 10,
            },
            developer: TierWindow {
                start: public - Duration::days(1),
                max_mint_amount: 100,
            },
            public: PublicWindow { start: public },
        }
    }
}
