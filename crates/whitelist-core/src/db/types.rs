//! ============================================================================
//! Database Types - Summaries read back from redb storage
//! ============================================================================

use serde::{Deserialize, Serialize};

use crate::types::LevelCounts;

/// Counters shown by `whitelist-db stats`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbStats {
    /// Unique whitelisted wallets per level
    pub levels: LevelCounts,
    pub total_mints: usize,
    /// Distinct recipient addresses with at least one announced mint
    pub unique_recipients: usize,
}
