//! ============================================================================
//! Eligibility - Time-gated minting with per-tier caps
//! ============================================================================
//! Decides whether a wallet may mint right now and when its window opens.
//!
//! ## Rules
//! - **Public open**: everyone may mint, assignments and caps are ignored
//! - **No assignment**: wait for Public
//! - **Assigned level**: may mint once the level's window has opened and
//!   while fewer than `maxMintAmount` mints were announced for the wallet.
//!   A wallet that used its cap waits for Public.
//!
//! All boundaries are inclusive: a window is open at its exact start instant.
//! ============================================================================

use chrono::{DateTime, Utc};

use crate::schedule::Schedule;
use crate::types::{EligibilityResult, Tier, WalletTierAssignment};

/// Evaluate a wallet's minting eligibility. Pure, no I/O.
pub fn evaluate(
    wallet_address: &str,
    now: DateTime<Utc>,
    assignment: Option<&WalletTierAssignment>,
    prior_mint_count: u64,
    schedule: &Schedule,
) -> EligibilityResult {
    if schedule.public_open(now) {
        return public_result(wallet_address, schedule);
    }

    match assignment {
        None => EligibilityResult {
            wallet_address: wallet_address.to_string(),
            level: Tier::Public,
            minting_allowed: false,
            minting_allowed_at: schedule.public.start,
            max_mint_amount: Some(0),
        },
        Some(assignment) => {
            let window = schedule.window(assignment.level);
            let under_cap = prior_mint_count < u64::from(window.max_mint_amount);

            EligibilityResult {
                wallet_address: wallet_address.to_string(),
                level: assignment.level.into(),
                minting_allowed: under_cap && now >= window.start,
                minting_allowed_at: window.start,
                max_mint_amount: Some(window.max_mint_amount),
            }
        }
    }
}

/// Result once Public has opened, independent of any stored data
pub fn public_result(wallet_address: &str, schedule: &Schedule) -> EligibilityResult {
    EligibilityResult {
        wallet_address: wallet_address.to_string(),
        level: Tier::Public,
        minting_allowed: true,
        minting_allowed_at: schedule.public.start,
        max_mint_amount: None,
    }
}
