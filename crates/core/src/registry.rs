use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, MutexGuard};

use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::{debug, warn};

use crate::domain::campaign::{CampaignId, CampaignRecord};
use crate::errors::DomainError;
use crate::store::{CampaignMap, CampaignStore};

/// Outcome of writing the registry back to its store after a mutation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlushStatus {
    Persisted,
    /// The in-memory state is ahead of disk until the next successful flush.
    Diverged,
}

/// Hands out millisecond-stamped ids that never repeat within the process.
#[derive(Debug, Default)]
pub struct IdGenerator {
    last: StdMutex<i64>,
}

impl IdGenerator {
    pub fn next_after(&self, now_millis: i64) -> i64 {
        let mut last = match self.last.lock() {
            Ok(last) => last,
            Err(poisoned) => poisoned.into_inner(),
        };
        let candidate = now_millis.max(*last + 1);
        *last = candidate;
        candidate
    }
}

/// In-memory campaign state, hydrated from and flushed to a [`CampaignStore`].
pub struct CampaignRegistry {
    campaigns: RwLock<CampaignMap>,
    campaign_locks: StdMutex<HashMap<CampaignId, Arc<Mutex<()>>>>,
    flush_lock: Mutex<()>,
    ids: IdGenerator,
    store: Arc<dyn CampaignStore>,
}

impl CampaignRegistry {
    pub async fn hydrate(store: Arc<dyn CampaignStore>) -> Self {
        let campaigns = store.load().await;
        debug!(
            event_name = "registry.hydrated",
            campaign_count = campaigns.len(),
            "campaign registry hydrated"
        );
        Self {
            campaigns: RwLock::new(campaigns),
            campaign_locks: StdMutex::new(HashMap::new()),
            flush_lock: Mutex::new(()),
            ids: IdGenerator::default(),
            store,
        }
    }

    pub async fn get(&self, id: &CampaignId) -> Option<CampaignRecord> {
        self.campaigns.read().await.get(id).cloned()
    }

    pub async fn contains(&self, id: &CampaignId) -> bool {
        self.campaigns.read().await.contains_key(id)
    }

    pub async fn len(&self) -> usize {
        self.campaigns.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.campaigns.read().await.is_empty()
    }

    /// Every campaign, oldest first.
    pub async fn all(&self) -> Vec<CampaignRecord> {
        let mut campaigns: Vec<CampaignRecord> =
            self.campaigns.read().await.values().cloned().collect();
        campaigns.sort_by(|left, right| {
            left.created_at.cmp(&right.created_at).then_with(|| left.id.cmp(&right.id))
        });
        campaigns
    }

    pub async fn active(&self) -> Vec<CampaignRecord> {
        self.all().await.into_iter().filter(|campaign| campaign.active).collect()
    }

    pub async fn snapshot(&self) -> CampaignMap {
        self.campaigns.read().await.clone()
    }

    /// Mints an id from the current clock that is not yet present in the registry.
    pub async fn mint_id(&self) -> CampaignId {
        let campaigns = self.campaigns.read().await;
        let mut now = Utc::now().timestamp_millis();
        loop {
            let candidate = CampaignId(self.ids.next_after(now).to_string());
            if !campaigns.contains_key(&candidate) {
                return candidate;
            }
            now += 1;
        }
    }

    /// Serializes work on one campaign. Hold the guard across the whole operation.
    pub async fn lock_campaign(&self, id: &CampaignId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks();
            locks.entry(id.clone()).or_default().clone()
        };
        lock.lock_owned().await
    }

    pub async fn insert(&self, record: CampaignRecord) -> Result<FlushStatus, DomainError> {
        let id = record.id.clone();
        {
            let mut campaigns = self.campaigns.write().await;
            if campaigns.contains_key(&id) {
                return Err(DomainError::InvariantViolation(format!(
                    "campaign id `{id}` is already registered"
                )));
            }
            campaigns.insert(id.clone(), record);
        }
        Ok(self.flush(&id, "insert").await)
    }

    /// Applies `mutate` to a copy of the record and commits it only on success.
    pub async fn update<T, F>(
        &self,
        id: &CampaignId,
        reason: &'static str,
        mutate: F,
    ) -> Result<(T, FlushStatus), DomainError>
    where
        F: FnOnce(&mut CampaignRecord) -> Result<T, DomainError>,
    {
        let value = {
            let mut campaigns = self.campaigns.write().await;
            let current =
                campaigns.get(id).ok_or_else(|| DomainError::CampaignNotFound(id.clone()))?;
            let mut next = current.clone();
            let value = mutate(&mut next)?;
            campaigns.insert(id.clone(), next);
            value
        };
        let status = self.flush(id, reason).await;
        Ok((value, status))
    }

    async fn flush(&self, id: &CampaignId, reason: &'static str) -> FlushStatus {
        let _guard = self.flush_lock.lock().await;
        let snapshot = self.snapshot().await;
        match self.store.save(&snapshot).await {
            Ok(()) => {
                debug!(
                    event_name = "registry.flush.persisted",
                    campaign_id = %id,
                    reason,
                    "campaign registry persisted"
                );
                FlushStatus::Persisted
            }
            Err(error) => {
                warn!(
                    event_name = "registry.flush.diverged",
                    campaign_id = %id,
                    reason,
                    error = %error,
                    "campaign registry could not be persisted; in-memory state is ahead of disk"
                );
                FlushStatus::Diverged
            }
        }
    }

    fn locks(&self) -> MutexGuard<'_, HashMap<CampaignId, Arc<Mutex<()>>>> {
        match self.campaign_locks.lock() {
            Ok(locks) => locks,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::Utc;

    use super::{CampaignRegistry, FlushStatus, IdGenerator};
    use crate::domain::campaign::{CampaignId, CampaignRecord};
    use crate::errors::DomainError;
    use crate::store::InMemoryStore;

    fn record(id: &str) -> CampaignRecord {
        CampaignRecord {
            id: CampaignId(id.to_owned()),
            title: format!("Campaign {id}"),
            description: "desc".to_owned(),
            message_id: "M1".to_owned(),
            channel_id: "C1".to_owned(),
            category_id: None,
            has_private_channels: false,
            channel_prefix: None,
            active: true,
            created_at: Utc::now(),
            closed_at: None,
            participants: Vec::new(),
            rules_section: None,
            payrate_section: None,
            customization: None,
        }
    }

    #[test]
    fn id_generator_is_strictly_monotonic_within_one_tick() {
        let ids = IdGenerator::default();
        let first = ids.next_after(1_000);
        let second = ids.next_after(1_000);
        let third = ids.next_after(999);
        assert_eq!((first, second, third), (1_000, 1_001, 1_002));
    }

    #[tokio::test]
    async fn minted_ids_skip_existing_campaigns() {
        let store = Arc::new(InMemoryStore::new());
        let registry = CampaignRegistry::hydrate(store).await;
        let first = registry.mint_id().await;
        registry.insert(record(first.as_str())).await.expect("insert");
        let second = registry.mint_id().await;
        assert_ne!(first, second);
        assert!(!registry.contains(&second).await);
    }

    #[tokio::test]
    async fn every_mutation_is_flushed() {
        let store = Arc::new(InMemoryStore::new());
        let registry = CampaignRegistry::hydrate(store.clone()).await;

        let status = registry.insert(record("1")).await.expect("insert");
        assert_eq!(status, FlushStatus::Persisted);
        registry
            .update(&CampaignId("1".to_owned()), "close", |campaign| campaign.close(Utc::now()))
            .await
            .expect("close");

        assert_eq!(store.save_count(), 2);
        let saved = store.saved().expect("saved snapshot");
        assert!(!saved[&CampaignId("1".to_owned())].active);
    }

    #[tokio::test]
    async fn duplicate_insert_is_rejected() {
        let registry = CampaignRegistry::hydrate(Arc::new(InMemoryStore::new())).await;
        registry.insert(record("1")).await.expect("insert");
        let error = registry.insert(record("1")).await.expect_err("duplicate");
        assert!(matches!(error, DomainError::InvariantViolation(_)));
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn failed_mutation_leaves_record_untouched() {
        let store = Arc::new(InMemoryStore::new());
        let registry = CampaignRegistry::hydrate(store.clone()).await;
        registry.insert(record("1")).await.expect("insert");
        let id = CampaignId("1".to_owned());

        let result = registry
            .update(&id, "rename", |campaign| {
                campaign.title = "changed".to_owned();
                Err::<(), _>(DomainError::InvalidInput("rejected".to_owned()))
            })
            .await;

        assert!(result.is_err());
        assert_eq!(registry.get(&id).await.map(|campaign| campaign.title), Some("Campaign 1".to_owned()));
        assert_eq!(store.save_count(), 1);
    }

    #[tokio::test]
    async fn update_of_unknown_campaign_is_not_found() {
        let registry = CampaignRegistry::hydrate(Arc::new(InMemoryStore::new())).await;
        let error = registry
            .update(&CampaignId("xyz".to_owned()), "close", |campaign| campaign.close(Utc::now()))
            .await
            .expect_err("missing campaign");
        assert!(matches!(error, DomainError::CampaignNotFound(_)));
    }

    #[tokio::test]
    async fn store_failure_does_not_abort_mutation() {
        let store = Arc::new(InMemoryStore::new());
        store.set_fail_saves(true);
        let registry = CampaignRegistry::hydrate(store.clone()).await;

        let status = registry.insert(record("1")).await.expect("insert still succeeds");
        assert_eq!(status, FlushStatus::Diverged);
        assert!(registry.contains(&CampaignId("1".to_owned())).await);
        assert!(store.saved().is_none());
    }

    #[tokio::test]
    async fn campaign_lock_serializes_holders() {
        let registry = Arc::new(CampaignRegistry::hydrate(Arc::new(InMemoryStore::new())).await);
        let id = CampaignId("1".to_owned());
        let guard = registry.lock_campaign(&id).await;

        let contender = {
            let registry = registry.clone();
            let id = id.clone();
            tokio::spawn(async move {
                let _guard = registry.lock_campaign(&id).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished(), "second holder must wait for the first");
        drop(guard);
        contender.await.expect("contender completes once the lock is released");
    }
}
