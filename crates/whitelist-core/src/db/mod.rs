// ============================================================================
// WhitelistDb: Embedded Database (redb)
// ============================================================================
// Persistent storage for whitelist assignments and announced mints.
// Default path: ~/.whitelist/whitelist.redb (override via WHITELIST_DB_PATH)
// ============================================================================

pub mod types;

pub use types::DbStats;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use redb::{Database, ReadableTable, TableDefinition};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::WhitelistError;
use crate::store::{MintTransactionStore, TransactionCountStore, WalletRecordStore};
use crate::types::{LevelCounts, MintTransaction, WalletTierAssignment};

// Table definitions
const WHITELIST: TableDefinition<&str, &[u8]> = TableDefinition::new("whitelist");
const MINTS: TableDefinition<&str, &[u8]> = TableDefinition::new("mints");
const MINT_COUNTS: TableDefinition<&str, u64> = TableDefinition::new("mint_counts");

/// Embedded database for the whitelist service. Clones share one handle.
#[derive(Clone)]
pub struct WhitelistDb {
    db: Arc<Database>,
    path: PathBuf,
}

impl WhitelistDb {
    /// Open (or create) the database at the given path.
    /// If `path` is None, uses WHITELIST_DB_PATH env var or ~/.whitelist/whitelist.redb
    pub fn open(path: Option<&str>) -> Result<Self> {
        let db_path = if let Some(p) = path {
            PathBuf::from(p)
        } else if let Ok(env_path) = std::env::var("WHITELIST_DB_PATH") {
            PathBuf::from(env_path)
        } else {
            let home = dirs::home_dir().ok_or_else(|| anyhow!("Cannot determine home directory"))?;
            let data_dir = home.join(".whitelist");
            std::fs::create_dir_all(&data_dir)
                .map_err(|e| anyhow!("Failed to create .whitelist directory: {}", e))?;
            data_dir.join("whitelist.redb")
        };

        info!("Opening database at: {}", db_path.display());

        let db = Database::create(&db_path)
            .map_err(|e| anyhow!("Failed to open database: {}", e))?;

        // Ensure tables exist by doing a write transaction
        let write_txn = db
            .begin_write()
            .map_err(|e| anyhow!("Failed to begin write: {}", e))?;
        {
            let _ = write_txn.open_table(WHITELIST).map_err(|e| anyhow!("Failed to create whitelist table: {}", e))?;
            let _ = write_txn.open_table(MINTS).map_err(|e| anyhow!("Failed to create mints table: {}", e))?;
            let _ = write_txn.open_table(MINT_COUNTS).map_err(|e| anyhow!("Failed to create mint_counts table: {}", e))?;
        }
        write_txn.commit().map_err(|e| anyhow!("Failed to commit init: {}", e))?;

        info!("Database ready");

        Ok(Self {
            db: Arc::new(db),
            path: db_path,
        })
    }

    /// Get the database file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    // ========================================================================
    // Whitelist Operations
    // ========================================================================

    /// Insert or replace assignments in a single write transaction
    pub fn upsert_assignments(&self, assignments: &[WalletTierAssignment]) -> Result<()> {
        let write_txn = self.db.begin_write()
            .map_err(|e| anyhow!("Failed to begin write: {}", e))?;
        {
            let mut table = write_txn.open_table(WHITELIST)
                .map_err(|e| anyhow!("Failed to open whitelist table: {}", e))?;
            for assignment in assignments {
                let key = format!("whitelist:{}", assignment.wallet_address);
                let value = bincode::serialize(assignment).map_err(|e| {
                    WhitelistError::Serialization(format!(
                        "Failed to serialize assignment for {}: {}",
                        assignment.wallet_address, e
                    ))
                })?;
                table.insert(key.as_str(), value.as_slice())
                    .map_err(|e| anyhow!("Failed to insert assignment: {}", e))?;
            }
        }
        write_txn.commit().map_err(|e| anyhow!("Failed to commit: {}", e))?;

        debug!("Upserted {} whitelist assignments", assignments.len());
        Ok(())
    }

    pub fn get_assignment(&self, wallet_address: &str) -> Result<Option<WalletTierAssignment>> {
        let key = format!("whitelist:{}", wallet_address);

        let read_txn = self.db.begin_read()
            .map_err(|e| anyhow!("Failed to begin read: {}", e))?;
        let table = read_txn.open_table(WHITELIST)
            .map_err(|e| anyhow!("Failed to open whitelist table: {}", e))?;

        match table.get(key.as_str()).map_err(|e| anyhow!("Failed to get assignment: {}", e))? {
            Some(value) => {
                let assignment: WalletTierAssignment = bincode::deserialize(value.value())
                    .map_err(|e| {
                        WhitelistError::Serialization(format!(
                            "Failed to deserialize assignment for {}: {}",
                            wallet_address, e
                        ))
                    })?;
                Ok(Some(assignment))
            }
            None => Ok(None),
        }
    }

    pub fn list_assignments(&self) -> Result<Vec<WalletTierAssignment>> {
        let read_txn = self.db.begin_read()
            .map_err(|e| anyhow!("Failed to begin read: {}", e))?;
        let table = read_txn.open_table(WHITELIST)
            .map_err(|e| anyhow!("Failed to open whitelist table: {}", e))?;

        let mut results = Vec::new();
        let iter = table.range::<&str>(..)
            .map_err(|e| anyhow!("Failed to iterate whitelist: {}", e))?;
        for entry in iter {
            let (key, value) = entry.map_err(|e| anyhow!("Failed to read entry: {}", e))?;
            let assignment: WalletTierAssignment = bincode::deserialize(value.value())
                .map_err(|e| {
                    WhitelistError::Serialization(format!(
                        "Failed to deserialize {}: {}",
                        key.value(),
                        e
                    ))
                })?;
            results.push(assignment);
        }
        Ok(results)
    }

    pub fn level_counts(&self) -> Result<LevelCounts> {
        let mut counts = LevelCounts::default();
        for assignment in self.list_assignments()? {
            counts.increment(assignment.level);
        }
        Ok(counts)
    }

    // ========================================================================
    // Mint Operations
    // ========================================================================

    /// Append a mint record and bump the recipient's counter atomically
    pub fn store_mint(&self, mint: &MintTransaction) -> Result<()> {
        let key = format!("mints:{}", mint.id);
        let value = bincode::serialize(mint).map_err(|e| {
            WhitelistError::Serialization(format!("Failed to serialize mint {}: {}", mint.id, e))
        })?;

        let write_txn = self.db.begin_write()
            .map_err(|e| anyhow!("Failed to begin write: {}", e))?;
        {
            let mut table = write_txn.open_table(MINTS)
                .map_err(|e| anyhow!("Failed to open mints table: {}", e))?;
            table.insert(key.as_str(), value.as_slice())
                .map_err(|e| anyhow!("Failed to insert mint: {}", e))?;

            let mut counts = write_txn.open_table(MINT_COUNTS)
                .map_err(|e| anyhow!("Failed to open mint_counts table: {}", e))?;
            let current = counts
                .get(mint.recipient_address.as_str())
                .map_err(|e| anyhow!("Failed to read mint count: {}", e))?
                .map(|v| v.value())
                .unwrap_or(0);
            counts.insert(mint.recipient_address.as_str(), current + 1)
                .map_err(|e| anyhow!("Failed to update mint count: {}", e))?;
        }
        write_txn.commit().map_err(|e| anyhow!("Failed to commit: {}", e))?;

        debug!("Stored mint {} for {}", mint.tx_id, mint.recipient_address);
        Ok(())
    }

    pub fn mint_count(&self, recipient_address: &str) -> Result<u64> {
        let read_txn = self.db.begin_read()
            .map_err(|e| anyhow!("Failed to begin read: {}", e))?;
        let table = read_txn.open_table(MINT_COUNTS)
            .map_err(|e| anyhow!("Failed to open mint_counts table: {}", e))?;

        let count = table
            .get(recipient_address)
            .map_err(|e| anyhow!("Failed to get mint count: {}", e))?
            .map(|v| v.value())
            .unwrap_or(0);
        Ok(count)
    }

    /// Announced mints ordered by announcement time, optionally for one recipient
    pub fn list_mints(&self, recipient_filter: Option<&str>) -> Result<Vec<MintTransaction>> {
        let read_txn = self.db.begin_read()
            .map_err(|e| anyhow!("Failed to begin read: {}", e))?;
        let table = read_txn.open_table(MINTS)
            .map_err(|e| anyhow!("Failed to open mints table: {}", e))?;

        let mut results = Vec::new();
        let iter = table.range::<&str>(..)
            .map_err(|e| anyhow!("Failed to iterate mints: {}", e))?;
        for entry in iter {
            let (key, value) = entry.map_err(|e| anyhow!("Failed to read entry: {}", e))?;
            let mint: MintTransaction = bincode::deserialize(value.value()).map_err(|e| {
                WhitelistError::Serialization(format!("Failed to deserialize {}: {}", key.value(), e))
            })?;

            if let Some(recipient) = recipient_filter {
                if mint.recipient_address == recipient {
                    results.push(mint);
                }
            } else {
                results.push(mint);
            }
        }
        results.sort_by_key(|m| m.announced_at);
        Ok(results)
    }

    // ========================================================================
    // Statistics
    // ========================================================================

    pub fn stats(&self) -> Result<DbStats> {
        let levels = self.level_counts()?;
        let total_mints = self.list_mints(None)?.len();

        let read_txn = self.db.begin_read()
            .map_err(|e| anyhow!("Failed to begin read: {}", e))?;
        let table = read_txn.open_table(MINT_COUNTS)
            .map_err(|e| anyhow!("Failed to open mint_counts table: {}", e))?;
        let unique_recipients = table.range::<&str>(..)
            .map_err(|e| anyhow!("Failed to iterate mint counts: {}", e))?
            .count();

        Ok(DbStats {
            levels,
            total_mints,
            unique_recipients,
        })
    }
}

// Store trait impls run each redb transaction on the blocking pool.
impl WhitelistDb {
    async fn blocking<T, F>(&self, op: F) -> crate::error::Result<T>
    where
        F: FnOnce(&WhitelistDb) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.clone();
        tokio::task::spawn_blocking(move || op(&db))
            .await
            .map_err(|e| WhitelistError::Storage(format!("Database task failed: {}", e)))?
            .map_err(WhitelistError::from)
    }
}

#[async_trait]
impl WalletRecordStore for WhitelistDb {
    async fn find_one(&self, wallet_address: &str) -> crate::error::Result<Option<WalletTierAssignment>> {
        let wallet_address = wallet_address.to_string();
        self.blocking(move |db| db.get_assignment(&wallet_address)).await
    }

    async fn upsert(&self, assignments: &[WalletTierAssignment]) -> crate::error::Result<()> {
        let assignments = assignments.to_vec();
        self.blocking(move |db| db.upsert_assignments(&assignments)).await
    }

    async fn count_by_level(&self) -> crate::error::Result<LevelCounts> {
        self.blocking(|db| db.level_counts()).await
    }
}

#[async_trait]
impl TransactionCountStore for WhitelistDb {
    async fn count_by_recipient_address(&self, recipient_address: &str) -> crate::error::Result<u64> {
        let recipient_address = recipient_address.to_string();
        self.blocking(move |db| db.mint_count(&recipient_address)).await
    }
}

#[async_trait]
impl MintTransactionStore for WhitelistDb {
    async fn save(&self, transaction: &MintTransaction) -> crate::error::Result<()> {
        let transaction = transaction.clone();
        self.blocking(move |db| db.store_mint(&transaction)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AnnounceMintRequest, WhitelistLevel};
    use chrono::{Duration, Utc};
    use tempfile::TempDir;

    fn open_temp() -> (TempDir, WhitelistDb) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("whitelist.redb");
        let db = WhitelistDb::open(path.to_str()).unwrap();
        (dir, db)
    }

    fn write_raw(db: &WhitelistDb, key: &str, bytes: &[u8]) {
        let write_txn = db.db.begin_write().unwrap();
        {
            let mut table = write_txn.open_table(WHITELIST).unwrap();
            table.insert(key, bytes).unwrap();
        }
        write_txn.commit().unwrap();
    }

    fn assignment(address: &str, level: WhitelistLevel) -> WalletTierAssignment {
        WalletTierAssignment {
            wallet_address: address.into(),
            level,
            name: format!("{} imported test", level),
        }
    }

    fn mint(recipient: &str, offset_secs: i64) -> MintTransaction {
        MintTransaction::from_request(
            AnnounceMintRequest {
                tx_id: format!("tx-{}-{}", recipient, offset_secs),
                recipient_address: recipient.into(),
                sender_address: Some("0xSender".into()),
                amount: 1,
                raw_transaction: None,
            },
            Utc::now() + Duration::seconds(offset_secs),
        )
    }

    #[test]
    fn test_upsert_and_get() {
        let (_dir, db) = open_temp();
        db.upsert_assignments(&[
            assignment("0xA", WhitelistLevel::Premint),
            assignment("0xB", WhitelistLevel::SuperPremint),
        ])
        .unwrap();

        let a = db.get_assignment("0xA").unwrap().unwrap();
        assert_eq!(a.level, WhitelistLevel::Premint);
        assert_eq!(a.name, "Premint imported test");
        assert!(db.get_assignment("0xZ").unwrap().is_none());
    }

    #[test]
    fn test_upsert_replaces_existing_level() {
        let (_dir, db) = open_temp();
        db.upsert_assignments(&[assignment("0xA", WhitelistLevel::Premint)]).unwrap();
        db.upsert_assignments(&[assignment("0xA", WhitelistLevel::Developer)]).unwrap();

        assert_eq!(
            db.get_assignment("0xA").unwrap().unwrap().level,
            WhitelistLevel::Developer
        );
        let counts = db.level_counts().unwrap();
        assert_eq!(counts.premint, 0);
        assert_eq!(counts.developer, 1);
        assert_eq!(counts.total, 1);
    }

    #[test]
    fn test_mint_counts_follow_announcements() {
        let (_dir, db) = open_temp();
        db.store_mint(&mint("0xA", 0)).unwrap();
        db.store_mint(&mint("0xA", 1)).unwrap();
        db.store_mint(&mint("0xB", 2)).unwrap();

        assert_eq!(db.mint_count("0xA").unwrap(), 2);
        assert_eq!(db.mint_count("0xB").unwrap(), 1);
        assert_eq!(db.mint_count("0xC").unwrap(), 0);

        let for_a = db.list_mints(Some("0xA")).unwrap();
        assert_eq!(for_a.len(), 2);
        assert!(for_a[0].announced_at <= for_a[1].announced_at);

        let stats = db.stats().unwrap();
        assert_eq!(stats.total_mints, 3);
        assert_eq!(stats.unique_recipients, 2);
    }

    #[test]
    fn test_data_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("whitelist.redb");
        {
            let db = WhitelistDb::open(path.to_str()).unwrap();
            db.upsert_assignments(&[assignment("0xA", WhitelistLevel::Airdrop)]).unwrap();
            db.store_mint(&mint("0xA", 0)).unwrap();
        }

        let db = WhitelistDb::open(path.to_str()).unwrap();
        assert_eq!(db.path(), path.as_path());
        assert_eq!(
            db.get_assignment("0xA").unwrap().unwrap().level,
            WhitelistLevel::Airdrop
        );
        assert_eq!(db.mint_count("0xA").unwrap(), 1);
    }

    #[tokio::test]
    async fn test_store_traits_delegate() {
        let (_dir, db) = open_temp();
        db.upsert(&[assignment("0xA", WhitelistLevel::Premint)]).await.unwrap();
        db.save(&mint("0xA", 0)).await.unwrap();

        assert!(db.find_one("0xA").await.unwrap().is_some());
        assert_eq!(db.count_by_recipient_address("0xA").await.unwrap(), 1);
        assert_eq!(db.count_by_level().await.unwrap().premint, 1);
    }

    #[tokio::test]
    async fn test_corrupt_record_is_a_serialization_error() {
        let (_dir, db) = open_temp();
        write_raw(&db, "whitelist:0xBAD", &[0xFF, 0xFF, 0xFF]);

        let err = db.find_one("0xBAD").await.unwrap_err();
        assert!(matches!(err, WhitelistError::Serialization(ref msg) if msg.contains("0xBAD")));

        let err = db.count_by_level().await.unwrap_err();
        assert!(matches!(err, WhitelistError::Serialization(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_service_does_not_retry_corrupt_record() {
        use crate::config::Environment;
        use crate::schedule::Schedule;
        use crate::service::WhitelistService;
        use std::sync::Arc;

        let (_dir, db) = open_temp();
        write_raw(&db, "whitelist:0xBAD", &[0xFF, 0xFF, 0xFF]);

        let schedule = Schedule::default();
        let now = schedule.public.start - Duration::minutes(30);
        let service = WhitelistService::new(Arc::new(db), Arc::new(schedule), Environment::Production);

        let start = tokio::time::Instant::now();
        let err = service.status("0xBAD", now).await.unwrap_err();
        assert!(matches!(err, WhitelistError::Serialization(_)));
        assert_eq!(start.elapsed(), std::time::Duration::ZERO);
    }
}
