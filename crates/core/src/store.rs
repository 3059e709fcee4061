use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex as StdMutex;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::domain::campaign::{CampaignId, CampaignRecord};

pub type CampaignMap = BTreeMap<CampaignId, CampaignRecord>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("could not write campaign store `{path}`: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("could not replace campaign store `{path}`: {source}")]
    Rename { path: PathBuf, source: io::Error },
    #[error("could not serialize campaigns: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("campaign store rejected the write: {0}")]
    Rejected(String),
}

#[async_trait]
pub trait CampaignStore: Send + Sync {
    /// Never fails: a missing or unreadable document yields an empty map.
    async fn load(&self) -> CampaignMap;
    async fn save(&self, campaigns: &CampaignMap) -> Result<(), StoreError>;
}

pub fn serialize_campaigns(campaigns: &CampaignMap) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(campaigns)
}

/// JSON document on disk, replaced atomically through a sibling `.tmp` file.
pub struct JsonFileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), write_lock: Mutex::new(()) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn temp_path(&self) -> PathBuf {
        let mut raw = self.path.clone().into_os_string();
        raw.push(".tmp");
        PathBuf::from(raw)
    }
}

#[async_trait]
impl CampaignStore for JsonFileStore {
    async fn load(&self) -> CampaignMap {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                info!(
                    event_name = "store.campaigns.missing",
                    path = %self.path.display(),
                    "campaign store not found; starting empty"
                );
                return CampaignMap::new();
            }
            Err(error) => {
                warn!(
                    event_name = "store.campaigns.read_failed",
                    path = %self.path.display(),
                    error = %error,
                    "could not read campaign store; starting empty"
                );
                return CampaignMap::new();
            }
        };

        match serde_json::from_str::<CampaignMap>(&raw) {
            Ok(campaigns) => {
                info!(
                    event_name = "store.campaigns.loaded",
                    path = %self.path.display(),
                    campaign_count = campaigns.len(),
                    "campaign store loaded"
                );
                campaigns
            }
            Err(error) => {
                warn!(
                    event_name = "store.campaigns.parse_failed",
                    path = %self.path.display(),
                    error = %error,
                    "campaign store is not valid JSON; starting empty"
                );
                CampaignMap::new()
            }
        }
    }

    async fn save(&self, campaigns: &CampaignMap) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let payload = serialize_campaigns(campaigns)?;
        let temp_path = self.temp_path();

        tokio::fs::write(&temp_path, payload)
            .await
            .map_err(|source| StoreError::Write { path: temp_path.clone(), source })?;
        tokio::fs::rename(&temp_path, &self.path)
            .await
            .map_err(|source| StoreError::Rename { path: self.path.clone(), source })?;
        Ok(())
    }
}

/// Keeps the last saved snapshot in memory. Saves can be forced to fail.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    initial: CampaignMap,
    saved: StdMutex<Option<CampaignMap>>,
    fail_saves: AtomicBool,
    save_count: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_campaigns(campaigns: CampaignMap) -> Self {
        Self { initial: campaigns, ..Self::default() }
    }

    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    pub fn save_count(&self) -> usize {
        self.save_count.load(Ordering::SeqCst)
    }

    pub fn saved(&self) -> Option<CampaignMap> {
        match self.saved.lock() {
            Ok(saved) => saved.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl CampaignStore for InMemoryStore {
    async fn load(&self) -> CampaignMap {
        self.saved().unwrap_or_else(|| self.initial.clone())
    }

    async fn save(&self, campaigns: &CampaignMap) -> Result<(), StoreError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StoreError::Rejected("in-memory store is failing saves".to_owned()));
        }
        self.save_count.fetch_add(1, Ordering::SeqCst);
        match self.saved.lock() {
            Ok(mut saved) => *saved = Some(campaigns.clone()),
            Err(poisoned) => *poisoned.into_inner() = Some(campaigns.clone()),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    use super::{serialize_campaigns, CampaignMap, CampaignStore, JsonFileStore};
    use crate::domain::campaign::{
        ButtonStyle, CampaignId, CampaignRecord, Customization, ParticipantRecord,
    };

    fn sample_campaigns() -> CampaignMap {
        let created_at = Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).single().expect("timestamp");
        let mut campaigns = CampaignMap::new();
        for (id, title) in [("1780000000001", "Summer Promo"), ("1780000000002", "Fall Promo")] {
            campaigns.insert(
                CampaignId(id.to_owned()),
                CampaignRecord {
                    id: CampaignId(id.to_owned()),
                    title: title.to_owned(),
                    description: "Rules:\nNo spam\nPayrate:\n$5 per 1000 views".to_owned(),
                    message_id: "M1".to_owned(),
                    channel_id: "C1".to_owned(),
                    category_id: Some("CAT1".to_owned()),
                    has_private_channels: true,
                    channel_prefix: Some("workspace".to_owned()),
                    active: true,
                    created_at,
                    closed_at: None,
                    participants: vec![ParticipantRecord {
                        user_id: "U1".to_owned(),
                        username: "alice".to_owned(),
                        joined_at: created_at,
                        channel_id: None,
                        role_id: "R1".to_owned(),
                    }],
                    rules_section: Some("• No spam".to_owned()),
                    payrate_section: Some("• $5 per 1000 views".to_owned()),
                    customization: Some(Customization {
                        button_text: "Start Clipping".to_owned(),
                        button_emoji: "🎬".to_owned(),
                        button_style: ButtonStyle::Success,
                        embed_color: "4CAF50".to_owned(),
                        embed_title: "🎯 Vireo Opportunities".to_owned(),
                        footer_text: "Powered by Vireo".to_owned(),
                        category_name: format!("📊 {title}"),
                        logo_url: None,
                    }),
                },
            );
        }
        campaigns
    }

    #[tokio::test]
    async fn missing_file_loads_empty() {
        let dir = TempDir::new().expect("tempdir");
        let store = JsonFileStore::new(dir.path().join("campaigns.json"));
        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn corrupt_file_loads_empty() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("campaigns.json");
        std::fs::write(&path, "{not json").expect("write corrupt file");

        let store = JsonFileStore::new(path);
        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn save_then_load_is_byte_identical() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("campaigns.json");
        let store = JsonFileStore::new(&path);
        let campaigns = sample_campaigns();

        store.save(&campaigns).await.expect("save");
        let first = std::fs::read_to_string(&path).expect("read saved file");

        let reloaded = store.load().await;
        assert_eq!(reloaded, campaigns);
        store.save(&reloaded).await.expect("save reloaded");
        let second = std::fs::read_to_string(&path).expect("read resaved file");

        assert_eq!(first, second);
        assert_eq!(serialize_campaigns(&reloaded).expect("serialize"), first);
        assert!(!store.temp_path().exists(), "temp file should be renamed away");
    }

    #[tokio::test]
    async fn failed_save_leaves_previous_document_intact() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("campaigns.json");
        let store = JsonFileStore::new(&path);
        store.save(&sample_campaigns()).await.expect("initial save");
        let before = std::fs::read_to_string(&path).expect("read");

        // A directory squatting on the temp path makes the write fail.
        std::fs::create_dir(store.temp_path()).expect("block temp path");
        let result = store.save(&CampaignMap::new()).await;

        assert!(result.is_err());
        assert_eq!(std::fs::read_to_string(&path).expect("read after failure"), before);
    }

    #[test]
    fn document_uses_camel_case_keys() {
        let json = serialize_campaigns(&sample_campaigns()).expect("serialize");
        assert!(json.contains("\"messageId\""));
        assert!(json.contains("\"hasPrivateChannels\": true"));
        assert!(json.contains("\"rulesSection\""));
        assert!(!json.contains("closedAt"), "unset optional fields are omitted");
    }
}
