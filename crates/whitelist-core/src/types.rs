//! ============================================================================
//! Core Types - Whitelist levels, tier assignments and mint records
//! ============================================================================
//! Defines the closed set of whitelist levels plus the records that flow
//! between the stores, the eligibility evaluator and the HTTP layer.
//! Serialized names follow the labels used by the schedule file and the
//! public API ("Super Premint" keeps its space).
//! ============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::WhitelistError;

/// Levels a wallet can be assigned to by an import
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum WhitelistLevel {
    /// One free mint delivered by the team, may also mint in the Super Premint window
    Airdrop,
    /// Opens two hours before Public
    #[serde(rename = "Super Premint")]
    SuperPremint,
    /// Opens one hour before Public
    Premint,
    /// Team wallets used for testing the mint flow
    Developer,
}

impl WhitelistLevel {
    pub const ALL: [WhitelistLevel; 4] = [
        WhitelistLevel::Airdrop,
        WhitelistLevel::SuperPremint,
        WhitelistLevel::Premint,
        WhitelistLevel::Developer,
    ];

    /// Human-readable label, identical to the serialized name
    pub fn display_name(&self) -> &'static str {
        match self {
            WhitelistLevel::Airdrop => "Airdrop",
            WhitelistLevel::SuperPremint => "Super Premint",
            WhitelistLevel::Premint => "Premint",
            WhitelistLevel::Developer => "Developer",
        }
    }

    /// URL path segment used by the import endpoints
    pub fn slug(&self) -> &'static str {
        match self {
            WhitelistLevel::Airdrop => "airdrop",
            WhitelistLevel::SuperPremint => "super-premint",
            WhitelistLevel::Premint => "premint",
            WhitelistLevel::Developer => "developer",
        }
    }

    /// Parse a URL slug; label spellings are accepted too for the CLI
    pub fn from_slug(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "airdrop" => Some(Self::Airdrop),
            "super-premint" | "super_premint" | "super premint" | "superpremint" => {
                Some(Self::SuperPremint)
            }
            "premint" => Some(Self::Premint),
            "developer" => Some(Self::Developer),
            _ => None,
        }
    }
}

impl fmt::Display for WhitelistLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Level reported back to callers: an assigned whitelist level or Public
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tier {
    Airdrop,
    #[serde(rename = "Super Premint")]
    SuperPremint,
    Premint,
    Developer,
    Public,
}

impl Tier {
    pub fn display_name(&self) -> &'static str {
        match self {
            Tier::Public => "Public",
            Tier::Airdrop => WhitelistLevel::Airdrop.display_name(),
            Tier::SuperPremint => WhitelistLevel::SuperPremint.display_name(),
            Tier::Premint => WhitelistLevel::Premint.display_name(),
            Tier::Developer => WhitelistLevel::Developer.display_name(),
        }
    }
}

impl From<WhitelistLevel> for Tier {
    fn from(level: WhitelistLevel) -> Self {
        match level {
            WhitelistLevel::Airdrop => Tier::Airdrop,
            WhitelistLevel::SuperPremint => Tier::SuperPremint,
            WhitelistLevel::Premint => Tier::Premint,
            WhitelistLevel::Developer => Tier::Developer,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// A wallet's whitelist membership. One per address, replaced on re-import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletTierAssignment {
    pub wallet_address: String,
    pub level: WhitelistLevel,
    /// Free-text label, e.g. "Premint imported 2024-03-01T12:00:00.000Z"
    pub name: String,
}

/// Body of a mint announcement as submitted by the frontend.
/// Unknown fields are dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnounceMintRequest {
    pub tx_id: String,
    pub recipient_address: String,
    #[serde(default)]
    pub sender_address: Option<String>,
    #[serde(default = "default_mint_amount")]
    pub amount: u32,
    /// Signed transaction as submitted, kept for later verification
    #[serde(default)]
    pub raw_transaction: Option<String>,
}

fn default_mint_amount() -> u32 {
    1
}

impl AnnounceMintRequest {
    /// Structural checks only. The signature is not verified.
    pub fn validate(&self) -> Result<(), WhitelistError> {
        if self.tx_id.trim().is_empty() {
            return Err(WhitelistError::InvalidRequest("txId must not be empty".into()));
        }
        if self.recipient_address.trim().is_empty() {
            return Err(WhitelistError::InvalidRequest(
                "recipientAddress must not be empty".into(),
            ));
        }
        if self.amount == 0 {
            return Err(WhitelistError::InvalidRequest("amount must be at least 1".into()));
        }
        Ok(())
    }
}

/// A persisted mint announcement. Append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MintTransaction {
    pub id: Uuid,
    pub tx_id: String,
    pub recipient_address: String,
    pub sender_address: Option<String>,
    pub amount: u32,
    pub raw_transaction: Option<String>,
    pub announced_at: DateTime<Utc>,
}

impl MintTransaction {
    pub fn from_request(request: AnnounceMintRequest, announced_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            tx_id: request.tx_id.trim().to_string(),
            recipient_address: request.recipient_address.trim().to_string(),
            sender_address: request.sender_address,
            amount: request.amount,
            raw_transaction: request.raw_transaction,
            announced_at,
        }
    }
}

/// Result of a status query. Computed per request, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EligibilityResult {
    pub wallet_address: String,
    pub level: Tier,
    pub minting_allowed: bool,
    pub minting_allowed_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_mint_amount: Option<u32>,
}

/// Unique assigned wallets per level
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelCounts {
    #[serde(rename = "Airdrop")]
    pub airdrop: u64,
    #[serde(rename = "Super Premint")]
    pub super_premint: u64,
    #[serde(rename = "Premint")]
    pub premint: u64,
    #[serde(rename = "Developer")]
    pub developer: u64,
    pub total: u64,
}

impl LevelCounts {
    pub fn get(&self, level: WhitelistLevel) -> u64 {
        match level {
            WhitelistLevel::Airdrop => self.airdrop,
            WhitelistLevel::SuperPremint => self.super_premint,
            WhitelistLevel::Premint => self.premint,
            WhitelistLevel::Developer => self.developer,
        }
    }

    pub fn increment(&mut self, level: WhitelistLevel) {
        match level {
            WhitelistLevel::Airdrop => self.airdrop += 1,
            WhitelistLevel::SuperPremint => self.super_premint += 1,
            WhitelistLevel::Premint => self.premint += 1,
            WhitelistLevel::Developer => self.developer += 1,
        }
        self.total += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_serde_names() {
        assert_eq!(
            serde_json::to_string(&WhitelistLevel::SuperPremint).unwrap(),
            "\"Super Premint\""
        );
        let level: WhitelistLevel = serde_json::from_str("\"Premint\"").unwrap();
        assert_eq!(level, WhitelistLevel::Premint);
        assert!(serde_json::from_str::<WhitelistLevel>("\"Public\"").is_err());
        assert_eq!(serde_json::to_string(&Tier::Public).unwrap(), "\"Public\"");
    }

    #[test]
    fn test_slug_parsing() {
        for level in WhitelistLevel::ALL {
            assert_eq!(WhitelistLevel::from_slug(level.slug()), Some(level));
        }
        assert_eq!(
            WhitelistLevel::from_slug("Super Premint"),
            Some(WhitelistLevel::SuperPremint)
        );
        assert_eq!(WhitelistLevel::from_slug("public"), None);
        assert_eq!(WhitelistLevel::from_slug("vip"), None);
    }

    #[test]
    fn test_announce_request_defaults_and_validation() {
        let request: AnnounceMintRequest = serde_json::from_str(
            r#"{"txId": "abc", "recipientAddress": "0xA", "extra": true}"#,
        )
        .unwrap();
        assert_eq!(request.amount, 1);
        assert!(request.sender_address.is_none());
        assert!(request.validate().is_ok());

        let blank = AnnounceMintRequest {
            recipient_address: "  ".into(),
            ..request.clone()
        };
        assert!(matches!(blank.validate(), Err(WhitelistError::InvalidRequest(_))));

        let zero = AnnounceMintRequest { amount: 0, ..request };
        assert!(zero.validate().is_err());
    }

    #[test]
    fn test_level_counts_serialization() {
        let mut counts = LevelCounts::default();
        counts.increment(WhitelistLevel::Premint);
        counts.increment(WhitelistLevel::SuperPremint);
        counts.increment(WhitelistLevel::Premint);

        assert_eq!(counts.get(WhitelistLevel::Premint), 2);
        assert_eq!(counts.total, 3);

        let json = serde_json::to_value(&counts).unwrap();
        assert_eq!(json["Super Premint"], 1);
        assert_eq!(json["Airdrop"], 0);
        assert_eq!(json["total"], 3);
    }

    #[test]
    fn test_eligibility_result_omits_missing_cap() {
        let result = EligibilityResult {
            wallet_address: "0xA".into(),
            level: Tier::Public,
            minting_allowed: true,
            minting_allowed_at: DateTime::parse_from_rfc3339("2024-03-01T18:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
            max_mint_amount: None,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["walletAddress"], "0xA");
        assert_eq!(json["mintingAllowed"], true);
        assert!(json.get("maxMintAmount").is_none());
    }
}
