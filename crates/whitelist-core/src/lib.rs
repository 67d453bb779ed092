//! ============================================================================
//! WHITELIST-CORE: Premint eligibility engine
//! ============================================================================
//! This crate handles all backend logic for the premint whitelist:
//! - Tiered eligibility (Airdrop, Super Premint, Premint, Developer, Public)
//! - Retry with backoff for flaky store calls
//! - Whitelist imports from newline-delimited address lists
//! - Embedded redb storage for assignments and announced mints
//! ============================================================================

pub mod config;
pub mod db;
pub mod eligibility;
pub mod error;
pub mod import;
pub mod retry;
pub mod schedule;
pub mod service;
pub mod store;
pub mod types;

// Re-export main types for convenience
pub use types::*;
pub use config::{AppConfig, Environment};
pub use db::{DbStats, WhitelistDb};
pub use error::WhitelistError;
pub use retry::{retry, Backoff, RetryError, RetryPolicy};
pub use schedule::Schedule;
pub use service::WhitelistService;
pub use store::{MemoryStore, WhitelistStore};
