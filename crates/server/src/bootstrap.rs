use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tracing::info;
use vireo_core::audit::TracingAuditSink;
use vireo_core::config::{AppConfig, ConfigError};
use vireo_core::platform::CampaignPlatform;
use vireo_core::registry::CampaignRegistry;
use vireo_core::store::JsonFileStore;
use vireo_discord::events::{campaign_dispatcher, EventDispatcher};
use vireo_discord::platform::SerenityPlatform;
use vireo_discord::registration::CommandScope;
use vireo_discord::service::CampaignService;

pub struct Application {
    pub config: AppConfig,
    pub registry: Arc<CampaignRegistry>,
    pub dispatcher: EventDispatcher,
    pub scope: CommandScope,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("could not prepare data directory `{path}`: {source}")]
    DataDirectory { path: PathBuf, source: std::io::Error },
    #[error("invalid command registration scope: {0}")]
    CommandScope(String),
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    let platform = Arc::new(SerenityPlatform::from_token(config.bot_token()));
    assemble(config, platform).await
}

/// Hydrates the registry and wires services around the given platform.
pub async fn assemble(
    config: AppConfig,
    platform: Arc<dyn CampaignPlatform>,
) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        data_file = %config.storage.data_file.display(),
        "starting application bootstrap"
    );

    let scope = CommandScope::from_guild_id(config.discord.guild_id.as_deref())
        .map_err(|error| BootstrapError::CommandScope(error.to_string()))?;

    if let Some(parent) =
        config.storage.data_file.parent().filter(|parent| !parent.as_os_str().is_empty())
    {
        tokio::fs::create_dir_all(parent).await.map_err(|source| {
            BootstrapError::DataDirectory { path: parent.to_path_buf(), source }
        })?;
    }

    let store = Arc::new(JsonFileStore::new(config.storage.data_file.clone()));
    let registry = Arc::new(CampaignRegistry::hydrate(store).await);
    info!(
        event_name = "system.bootstrap.registry_hydrated",
        correlation_id = "bootstrap",
        campaigns = registry.len().await,
        "campaign registry hydrated"
    );

    let service = Arc::new(CampaignService::new(
        registry.clone(),
        platform,
        Arc::new(TracingAuditSink),
        config.branding.clone(),
    ));
    let dispatcher = campaign_dispatcher(service);

    Ok(Application { config, registry, dispatcher, scope })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tempfile::TempDir;
    use vireo_core::config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions};
    use vireo_core::platform::InMemoryPlatform;
    use vireo_discord::registration::CommandScope;

    use crate::bootstrap::{assemble, bootstrap_with_config, Application, BootstrapError};

    async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
        let config = AppConfig::load(options)?;
        bootstrap_with_config(config).await
    }

    fn options(dir: &TempDir, token: &str) -> LoadOptions {
        LoadOptions {
            config_path: Some(dir.path().join("absent.toml")),
            require_file: false,
            overrides: ConfigOverrides {
                bot_token: Some(token.to_owned()),
                guild_id: Some("123456789".to_owned()),
                data_file: Some(dir.path().join("data").join("campaigns.json")),
                ..ConfigOverrides::default()
            },
        }
    }

    #[tokio::test]
    async fn bootstrap_fails_fast_on_malformed_token() {
        let dir = TempDir::new().expect("tempdir");
        let result = bootstrap(options(&dir, "not a token")).await;
        assert!(matches!(result, Err(BootstrapError::Config(ConfigError::Validation(_)))));
    }

    #[tokio::test]
    async fn bootstrap_prepares_data_directory_and_guild_scope() {
        let dir = TempDir::new().expect("tempdir");
        let app = bootstrap(options(&dir, "abc.def.ghi")).await.expect("bootstrap");

        assert!(dir.path().join("data").is_dir());
        assert!(app.registry.is_empty().await);
        assert_eq!(app.scope, CommandScope::Guild(123456789));
        assert_eq!(app.dispatcher.handler_count(), 3);
    }

    #[tokio::test]
    async fn existing_campaigns_are_hydrated_on_startup() {
        let dir = TempDir::new().expect("tempdir");
        let data_dir = dir.path().join("data");
        std::fs::create_dir_all(&data_dir).expect("data dir");
        std::fs::write(
            data_dir.join("campaigns.json"),
            serde_json::json!({
                "1700000000000": {
                    "id": "1700000000000",
                    "title": "Legacy",
                    "description": "desc",
                    "messageId": "M9",
                    "channelId": "C9",
                    "participants": [],
                    "createdAt": "2024-01-01T00:00:00.000Z",
                    "active": true,
                    "hasPrivateChannels": false
                }
            })
            .to_string(),
        )
        .expect("seed campaigns");

        let config = AppConfig::load(options(&dir, "abc.def.ghi")).expect("config");
        let app = assemble(config, Arc::new(InMemoryPlatform::new())).await.expect("assemble");
        assert_eq!(app.registry.len().await, 1);
    }
}
