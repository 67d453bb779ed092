//! ============================================================================
//! Whitelist Import - Newline-delimited address lists into tier assignments
//! ============================================================================
//! Parses the plain-text bodies posted to the import endpoints. Blank lines
//! are skipped, repeated addresses are dropped (first occurrence wins) and
//! reported, never rejected. Whether imports are allowed at all is decided
//! by the caller.
//! ============================================================================

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::collections::HashSet;
use tracing::debug;

use crate::types::{WalletTierAssignment, WhitelistLevel};

/// Parsed import, ready to upsert
#[derive(Debug, Clone)]
pub struct ImportBatch {
    pub level: WhitelistLevel,
    pub assignments: Vec<WalletTierAssignment>,
    /// Every repeated occurrence, in input order
    pub duplicates: Vec<String>,
}

impl ImportBatch {
    pub fn summary(&self) -> ImportSummary {
        ImportSummary {
            level: self.level,
            imported: self.assignments.len(),
            duplicates: self.duplicates.len(),
        }
    }
}

/// What the import endpoint reports back
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub level: WhitelistLevel,
    pub imported: usize,
    pub duplicates: usize,
}

/// Label stored with every imported assignment
pub fn import_label(level: WhitelistLevel, imported_at: DateTime<Utc>) -> String {
    format!(
        "{} imported {}",
        level,
        imported_at.to_rfc3339_opts(SecondsFormat::Millis, true)
    )
}

/// Split `raw` into one assignment per unique address
pub fn parse_address_list(
    raw: &str,
    level: WhitelistLevel,
    imported_at: DateTime<Utc>,
) -> ImportBatch {
    let name = import_label(level, imported_at);
    let mut seen = HashSet::new();
    let mut assignments = Vec::new();
    let mut duplicates = Vec::new();

    for address in raw.split('\n').map(str::trim).filter(|line| !line.is_empty()) {
        if seen.insert(address) {
            assignments.push(WalletTierAssignment {
                wallet_address: address.to_string(),
                level,
                name: name.clone(),
            });
        } else {
            duplicates.push(address.to_string());
        }
    }

    if !duplicates.is_empty() {
        debug!("Duplicate entries in {} import: {:?}", level, duplicates);
    }

    ImportBatch {
        level,
        assignments,
        duplicates,
    }
}
