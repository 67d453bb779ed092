//! ============================================================================
//! Store Interfaces - What the whitelist service needs from persistence
//! ============================================================================
//! `WhitelistDb` (redb) is the production implementation; `MemoryStore`
//! keeps everything in process and backs tests and throwaway dev servers.
//! ============================================================================

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::types::{LevelCounts, MintTransaction, WalletTierAssignment};

/// Wallet → whitelist level records
#[async_trait]
pub trait WalletRecordStore: Send + Sync {
    /// Assignment for an address, if it was ever imported
    async fn find_one(&self, wallet_address: &str) -> Result<Option<WalletTierAssignment>>;

    /// Insert or replace assignments keyed by address. The whole list is
    /// applied atomically.
    async fn upsert(&self, assignments: &[WalletTierAssignment]) -> Result<()>;

    /// Unique assigned wallets per level
    async fn count_by_level(&self) -> Result<LevelCounts>;
}

/// Read side of announced mints
#[async_trait]
pub trait TransactionCountStore: Send + Sync {
    async fn count_by_recipient_address(&self, recipient_address: &str) -> Result<u64>;
}

/// Write side of announced mints
#[async_trait]
pub trait MintTransactionStore: Send + Sync {
    async fn save(&self, transaction: &MintTransaction) -> Result<()>;
}

/// Everything the service needs, implemented by both stores
pub trait WhitelistStore: WalletRecordStore + TransactionCountStore + MintTransactionStore {}

impl<T> WhitelistStore for T where T: WalletRecordStore + TransactionCountStore + MintTransactionStore {}

/// In-process store
#[derive(Default)]
pub struct MemoryStore {
    assignments: RwLock<HashMap<String, WalletTierAssignment>>,
    mints: RwLock<Vec<MintTransaction>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All announced mints, oldest first
    pub async fn mints(&self) -> Vec<MintTransaction> {
        self.mints.read().await.clone()
    }
}

#[async_trait]
impl WalletRecordStore for MemoryStore {
    async fn find_one(&self, wallet_address: &str) -> Result<Option<WalletTierAssignment>> {
        Ok(self.assignments.read().await.get(wallet_address).cloned())
    }

    async fn upsert(&self, assignments: &[WalletTierAssignment]) -> Result<()> {
        let mut map = self.assignments.write().await;
        for assignment in assignments {
            map.insert(assignment.wallet_address.clone(), assignment.clone());
        }
        Ok(())
    }

    async fn count_by_level(&self) -> Result<LevelCounts> {
        let mut counts = LevelCounts::default();
        for assignment in self.assignments.read().await.values() {
            counts.increment(assignment.level);
        }
        Ok(counts)
    }
}

#[async_trait]
impl TransactionCountStore for MemoryStore {
    async fn count_by_recipient_address(&self, recipient_address: &str) -> Result<u64> {
        let mints = self.mints.read().await;
        Ok(mints
            .iter()
            .filter(|m| m.recipient_address == recipient_address)
            .count() as u64)
    }
}

#[async_trait]
impl MintTransactionStore for MemoryStore {
    async fn save(&self, transaction: &MintTransaction) -> Result<()> {
        self.mints.write().await.push(transaction.clone());
        Ok(())
    }
}
