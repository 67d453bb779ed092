//! ============================================================================
//! Whitelist Service - Status queries, imports and mint announcements
//! ============================================================================
//! Glue between the stores and the pure rules in `eligibility` and `import`.
//! Idempotent store calls go through the retry policy; mint announcements
//! append a record and are attempted once.
//! ============================================================================

use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::Environment;
use crate::eligibility::{evaluate, public_result};
use crate::error::{Result, WhitelistError};
use crate::import::{parse_address_list, ImportSummary};
use crate::retry::{RetryError, RetryPolicy};
use crate::schedule::Schedule;
use crate::store::WhitelistStore;
use crate::types::{
    AnnounceMintRequest, EligibilityResult, LevelCounts, MintTransaction, WhitelistLevel,
};

/// Message returned when imports are attempted outside development
pub const IMPORT_FORBIDDEN_MESSAGE: &str = "This method should not be called on production";

/// Whitelist operations over a store and a fixed schedule
pub struct WhitelistService {
    store: Arc<dyn WhitelistStore>,
    schedule: Arc<Schedule>,
    environment: Environment,
    retry: RetryPolicy<WhitelistError>,
}

impl WhitelistService {
    /// Service with the default retry policy. Only storage errors are retried.
    pub fn new(store: Arc<dyn WhitelistStore>, schedule: Arc<Schedule>, environment: Environment) -> Self {
        Self::with_retry_policy(store, schedule, environment, RetryPolicy::default())
    }

    pub fn with_retry_policy(
        store: Arc<dyn WhitelistStore>,
        schedule: Arc<Schedule>,
        environment: Environment,
        retry: RetryPolicy<WhitelistError>,
    ) -> Self {
        Self {
            store,
            schedule,
            environment,
            retry: retry.retry_if(|e| matches!(e, WhitelistError::Storage(_))),
        }
    }

    async fn with_retry<T, F, Fut>(&self, action: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.retry.run(action).await.map_err(|e| match e {
            RetryError::Exhausted { attempts } => WhitelistError::RetryExhausted { attempts },
            RetryError::Fatal(e) => e,
        })
    }

    /// Eligibility of `wallet_address` at `now`
    pub async fn status(&self, wallet_address: &str, now: DateTime<Utc>) -> Result<EligibilityResult> {
        if self.schedule.public_open(now) {
            return Ok(public_result(wallet_address, &self.schedule));
        }

        let store = &self.store;
        let assignment = self
            .with_retry(move || store.find_one(wallet_address))
            .await?;

        let mint_count = match &assignment {
            Some(_) => {
                self.with_retry(move || store.count_by_recipient_address(wallet_address))
                    .await?
            }
            None => 0,
        };

        let result = evaluate(wallet_address, now, assignment.as_ref(), mint_count, &self.schedule);
        debug!(
            "Status for {}: {} allowed={} at={} ({} prior mints)",
            wallet_address, result.level, result.minting_allowed, result.minting_allowed_at, mint_count
        );
        Ok(result)
    }

    /// Import a newline-delimited address list into `level`
    pub async fn import(&self, raw: &str, level: WhitelistLevel, now: DateTime<Utc>) -> Result<ImportSummary> {
        if !self.environment.allows_imports() {
            warn!("Rejected {} import in {} environment", level, self.environment);
            return Err(WhitelistError::Forbidden(IMPORT_FORBIDDEN_MESSAGE.to_string()));
        }

        let batch = parse_address_list(raw, level, now);
        let store = &self.store;
        let assignments = batch.assignments.as_slice();
        self.with_retry(move || store.upsert(assignments)).await?;

        let summary = batch.summary();
        info!(
            "Imported {} {} addresses ({} duplicates skipped)",
            summary.imported, level, summary.duplicates
        );
        Ok(summary)
    }

    /// Record a submitted mint transaction.
    // TODO: verify the signed transaction before storing so faked announcements cannot exhaust another wallet's cap
    pub async fn announce(&self, request: AnnounceMintRequest, now: DateTime<Utc>) -> Result<MintTransaction> {
        request.validate()?;
        let mint = MintTransaction::from_request(request, now);
        self.store.save(&mint).await?;

        info!("Mint {} announced for {}", mint.tx_id, mint.recipient_address);
        Ok(mint)
    }

    /// Unique whitelisted wallets per level
    pub async fn count_levels(&self) -> Result<LevelCounts> {
        let store = &self.store;
        self.with_retry(move || store.count_by_level()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::{PublicWindow, TierWindow};
    use crate::store::{MemoryStore, MintTransactionStore, TransactionCountStore, WalletRecordStore};
    use crate::types::{Tier, WalletTierAssignment};
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn t(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, hour, 0, 0).unwrap()
    }

    fn schedule() -> Arc<Schedule> {
        Arc::new(Schedule {
            airdrop: TierWindow { start: t(9), max_mint_amount: 15 },
            super_premint: TierWindow { start: t(9), max_mint_amount: 15 },
            premint: TierWindow { start: t(10), max_mint_amount: 2 },
            developer: TierWindow { start: t(1), max_mint_amount: 100 },
            public: PublicWindow { start: t(12) },
        })
    }

    fn service(store: Arc<dyn WhitelistStore>, environment: Environment) -> WhitelistService {
        WhitelistService::new(store, schedule(), environment)
    }

    fn announce_request(recipient: &str, tx: &str) -> AnnounceMintRequest {
        AnnounceMintRequest {
            tx_id: tx.into(),
            recipient_address: recipient.into(),
            sender_address: None,
            amount: 1,
            raw_transaction: None,
        }
    }

    /// Store whose reads fail a fixed number of times and that counts calls
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryStore,
        failures_left: AtomicU32,
        reads: AtomicU32,
        corrupt: bool,
    }

    impl FlakyStore {
        fn failing(times: u32) -> Self {
            Self {
                failures_left: AtomicU32::new(times),
                ..Default::default()
            }
        }

        fn corrupt(times: u32) -> Self {
            Self {
                corrupt: true,
                ..Self::failing(times)
            }
        }

        fn read(&self) -> Result<()> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            let left = self.failures_left.load(Ordering::SeqCst);
            if left > 0 {
                self.failures_left.store(left - 1, Ordering::SeqCst);
                if self.corrupt {
                    return Err(WhitelistError::Serialization("unexpected end of record".into()));
                }
                return Err(WhitelistError::Storage("database is locked".into()));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl WalletRecordStore for FlakyStore {
        async fn find_one(&self, wallet_address: &str) -> Result<Option<WalletTierAssignment>> {
            self.read()?;
            self.inner.find_one(wallet_address).await
        }

        async fn upsert(&self, assignments: &[WalletTierAssignment]) -> Result<()> {
            self.inner.upsert(assignments).await
        }

        async fn count_by_level(&self) -> Result<LevelCounts> {
            self.read()?;
            self.inner.count_by_level().await
        }
    }

    #[async_trait]
    impl TransactionCountStore for FlakyStore {
        async fn count_by_recipient_address(&self, recipient_address: &str) -> Result<u64> {
            self.read()?;
            self.inner.count_by_recipient_address(recipient_address).await
        }
    }

    #[async_trait]
    impl MintTransactionStore for FlakyStore {
        async fn save(&self, transaction: &MintTransaction) -> Result<()> {
            self.inner.save(transaction).await
        }
    }

    #[tokio::test]
    async fn test_import_then_status_until_cap() {
        let service = service(Arc::new(MemoryStore::new()), Environment::Development);

        let summary = service
            .import("0xA\n0xB\n0xA\n \n0xC", WhitelistLevel::Premint, t(8))
            .await
            .unwrap();
        assert_eq!(summary.imported, 3);
        assert_eq!(summary.duplicates, 1);

        let before = service.status("0xA", t(9)).await.unwrap();
        assert_eq!(before.level, Tier::Premint);
        assert!(!before.minting_allowed);
        assert_eq!(before.minting_allowed_at, t(10));

        assert!(service.status("0xA", t(11)).await.unwrap().minting_allowed);

        service.announce(announce_request("0xA", "tx1"), t(11)).await.unwrap();
        service.announce(announce_request("0xA", "tx2"), t(11)).await.unwrap();

        let capped = service.status("0xA", t(11)).await.unwrap();
        assert!(!capped.minting_allowed);
        assert_eq!(capped.minting_allowed_at, t(10));

        let public = service.status("0xA", t(12)).await.unwrap();
        assert_eq!(public.level, Tier::Public);
        assert!(public.minting_allowed);
    }

    #[tokio::test]
    async fn test_unknown_wallet_waits_for_public() {
        let service = service(Arc::new(MemoryStore::new()), Environment::Production);
        let result = service.status("0xNobody", t(11)).await.unwrap();
        assert_eq!(result.level, Tier::Public);
        assert!(!result.minting_allowed);
        assert_eq!(result.minting_allowed_at, t(12));
    }

    #[tokio::test]
    async fn test_public_status_skips_store() {
        let store = Arc::new(FlakyStore::failing(100));
        let service = service(store.clone(), Environment::Production);

        let result = service.status("0xA", t(13)).await.unwrap();
        assert!(result.minting_allowed);
        assert_eq!(store.reads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unassigned_wallet_skips_mint_count() {
        let store = Arc::new(FlakyStore::failing(0));
        let service = service(store.clone(), Environment::Production);

        service.status("0xA", t(11)).await.unwrap();
        assert_eq!(store.reads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_store_errors_are_retried() {
        let store = Arc::new(FlakyStore::failing(2));
        let service = service(store.clone(), Environment::Production);

        let result = service.status("0xA", t(11)).await.unwrap();
        assert!(!result.minting_allowed);
        assert_eq!(store.reads.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_persistent_store_errors_exhaust_retries() {
        let store = Arc::new(FlakyStore::failing(10));
        let service = service(store.clone(), Environment::Production);

        let err = service.count_levels().await.unwrap_err();
        assert!(matches!(err, WhitelistError::RetryExhausted { attempts: 3 }));
        assert_eq!(store.reads.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_decode_errors_fail_without_retry() {
        let store = Arc::new(FlakyStore::corrupt(10));
        let service = service(store.clone(), Environment::Production);

        let err = service.status("0xA", t(11)).await.unwrap_err();
        assert!(matches!(err, WhitelistError::Serialization(_)));
        assert_eq!(store.reads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_import_forbidden_outside_development() {
        for environment in [Environment::Production, Environment::Test] {
            let store = Arc::new(MemoryStore::new());
            let service = service(store.clone(), environment);

            let err = service
                .import("0xA", WhitelistLevel::Airdrop, t(8))
                .await
                .unwrap_err();
            match err {
                WhitelistError::Forbidden(message) => assert_eq!(message, IMPORT_FORBIDDEN_MESSAGE),
                other => panic!("expected Forbidden, got {:?}", other),
            }
            assert_eq!(store.count_by_level().await.unwrap().total, 0);
        }
    }

    #[tokio::test]
    async fn test_reimport_moves_wallet_between_levels() {
        let service = service(Arc::new(MemoryStore::new()), Environment::Development);
        service.import("0xA\n0xB", WhitelistLevel::Premint, t(8)).await.unwrap();
        service.import("0xA", WhitelistLevel::SuperPremint, t(8)).await.unwrap();

        let counts = service.count_levels().await.unwrap();
        assert_eq!(counts.premint, 1);
        assert_eq!(counts.super_premint, 1);
        assert_eq!(counts.total, 2);

        let status = service.status("0xA", t(9)).await.unwrap();
        assert_eq!(status.level, Tier::SuperPremint);
        assert!(status.minting_allowed);
    }

    #[tokio::test]
    async fn test_announce_rejects_invalid_request() {
        let store = Arc::new(MemoryStore::new());
        let service = service(store.clone(), Environment::Production);

        let err = service
            .announce(announce_request("", "tx1"), t(11))
            .await
            .unwrap_err();
        assert!(matches!(err, WhitelistError::InvalidRequest(_)));
        assert!(store.mints().await.is_empty());

        let saved = service
            .announce(announce_request(" 0xA ", "tx1"), t(11))
            .await
            .unwrap();
        assert_eq!(saved.recipient_address, "0xA");
        assert_eq!(saved.announced_at, t(11));
        assert_eq!(store.mints().await, vec![saved]);
    }
}
