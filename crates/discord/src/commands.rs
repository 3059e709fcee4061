use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use vireo_core::domain::campaign::{ButtonStyle, CampaignId};
use vireo_core::errors::InterfaceError;

use crate::messages::{self, ModalTemplate, Reply};

pub const CREATE_CAMPAIGN: &str = "create-campaign";
pub const CLOSE_CAMPAIGN: &str = "close-campaign";
pub const CAMPAIGN_STATS: &str = "campaign-stats";
pub const LIST_CAMPAIGNS: &str = "list-campaigns";
pub const BOT_AUDIT: &str = "bot-audit";

/// A slash command invocation, already lifted out of the gateway payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlashCommandPayload {
    pub command: String,
    pub options: BTreeMap<String, String>,
    pub guild_id: Option<String>,
    pub channel_id: String,
    pub user_id: String,
    pub username: String,
    pub invoker_is_admin: bool,
    pub interaction_id: String,
}

impl SlashCommandPayload {
    fn option(&self, name: &str) -> Option<String> {
        self.options
            .get(name)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
            .map(ToOwned::to_owned)
    }
}

/// Presentation overrides supplied to `/create-campaign`. Unset fields fall back to branding.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CreateCampaignOptions {
    pub logo_url: Option<String>,
    pub button_text: Option<String>,
    pub button_emoji: Option<String>,
    pub button_style: Option<ButtonStyle>,
    pub embed_color: Option<String>,
    pub embed_title: Option<String>,
    pub footer_text: Option<String>,
    pub category_name: Option<String>,
    pub channel_prefix: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CampaignCommand {
    CreateCampaign(CreateCampaignOptions),
    CloseCampaign { campaign_id: CampaignId },
    CampaignStats,
    ListCampaigns,
    BotAudit,
    Unknown { name: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommandResponse {
    Reply(Reply),
    Modal(ModalTemplate),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandParseError {
    #[error("missing required option `{0}`")]
    MissingOption(&'static str),
    #[error("invalid value for option `{option}`: {reason}")]
    InvalidOption { option: &'static str, reason: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandRouteError {
    #[error("command requires a guild")]
    GuildRequired,
    #[error("command service failed: {0}")]
    Service(InterfaceError),
}

impl CommandRouteError {
    pub fn reply(&self) -> Reply {
        match self {
            Self::GuildRequired => messages::guild_only(),
            Self::Service(error) => messages::error_reply(error),
        }
    }
}

pub fn parse_campaign_command(
    payload: &SlashCommandPayload,
) -> Result<CampaignCommand, CommandParseError> {
    Ok(match payload.command.trim_start_matches('/') {
        CREATE_CAMPAIGN => CampaignCommand::CreateCampaign(parse_create_options(payload)?),
        CLOSE_CAMPAIGN => {
            let raw = payload
                .option("campaign-id")
                .ok_or(CommandParseError::MissingOption("campaign-id"))?;
            CampaignCommand::CloseCampaign { campaign_id: CampaignId::from(raw.as_str()) }
        }
        CAMPAIGN_STATS => CampaignCommand::CampaignStats,
        LIST_CAMPAIGNS => CampaignCommand::ListCampaigns,
        BOT_AUDIT => CampaignCommand::BotAudit,
        other => CampaignCommand::Unknown { name: other.to_owned() },
    })
}

fn parse_create_options(
    payload: &SlashCommandPayload,
) -> Result<CreateCampaignOptions, CommandParseError> {
    let button_style = payload
        .option("button-style")
        .map(|raw| raw.parse::<ButtonStyle>())
        .transpose()
        .map_err(|error| CommandParseError::InvalidOption {
            option: "button-style",
            reason: error.to_string(),
        })?;

    let embed_color = payload.option("embed-color").map(|raw| {
        raw.trim_start_matches('#').to_owned()
    });
    if let Some(color) = &embed_color {
        if color.len() != 6 || !color.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(CommandParseError::InvalidOption {
                option: "embed-color",
                reason: format!("`{color}` is not a 6 digit hex color"),
            });
        }
    }

    let logo_url = payload.option("logo");
    if let Some(url) = &logo_url {
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(CommandParseError::InvalidOption {
                option: "logo",
                reason: "logo must be an http(s) URL".to_owned(),
            });
        }
    }

    Ok(CreateCampaignOptions {
        logo_url,
        button_text: payload.option("button-text"),
        button_emoji: payload.option("button-emoji"),
        button_style,
        embed_color,
        embed_title: payload.option("embed-title"),
        footer_text: payload.option("footer-text"),
        category_name: payload.option("category-name"),
        channel_prefix: payload.option("channel-prefix"),
    })
}

pub struct CommandRouter<S> {
    service: S,
}

impl<S> CommandRouter<S>
where
    S: CampaignCommandService,
{
    pub fn new(service: S) -> Self {
        Self { service }
    }

    /// Every campaign command is administrator-only; the gate runs before parsing.
    pub async fn route(
        &self,
        payload: &SlashCommandPayload,
    ) -> Result<CommandResponse, CommandRouteError> {
        if !payload.invoker_is_admin {
            return Ok(CommandResponse::Reply(match payload.command.as_str() {
                BOT_AUDIT => messages::guild_only(),
                _ => messages::admin_required(),
            }));
        }

        let command = match parse_campaign_command(payload) {
            Ok(command) => command,
            Err(error) => {
                return Ok(CommandResponse::Reply(Reply::ephemeral(format!("❌ {error}"))));
            }
        };

        match command {
            CampaignCommand::CreateCampaign(options) => {
                require_guild(payload)?;
                self.service.open_create_modal(options, payload).await.map(CommandResponse::Modal)
            }
            CampaignCommand::CloseCampaign { campaign_id } => {
                require_guild(payload)?;
                self.service.close_campaign(campaign_id, payload).await.map(CommandResponse::Reply)
            }
            CampaignCommand::CampaignStats => {
                self.service.campaign_stats(payload).await.map(CommandResponse::Reply)
            }
            CampaignCommand::ListCampaigns => {
                self.service.list_campaigns(payload).await.map(CommandResponse::Reply)
            }
            CampaignCommand::BotAudit => {
                let guild_id = require_guild(payload)?;
                self.service.bot_audit(guild_id, payload).await.map(CommandResponse::Reply)
            }
            CampaignCommand::Unknown { name } => Ok(CommandResponse::Reply(Reply::ephemeral(
                format!("Unsupported command `/{name}`."),
            ))),
        }
    }
}

fn require_guild(payload: &SlashCommandPayload) -> Result<&str, CommandRouteError> {
    payload.guild_id.as_deref().ok_or(CommandRouteError::GuildRequired)
}

#[async_trait]
pub trait CampaignCommandService: Send + Sync {
    /// Remembers the options for the invoking admin and returns the modal to show.
    async fn open_create_modal(
        &self,
        options: CreateCampaignOptions,
        payload: &SlashCommandPayload,
    ) -> Result<ModalTemplate, CommandRouteError>;

    async fn close_campaign(
        &self,
        campaign_id: CampaignId,
        payload: &SlashCommandPayload,
    ) -> Result<Reply, CommandRouteError>;

    async fn campaign_stats(&self, payload: &SlashCommandPayload)
        -> Result<Reply, CommandRouteError>;

    async fn list_campaigns(&self, payload: &SlashCommandPayload)
        -> Result<Reply, CommandRouteError>;

    async fn bot_audit(
        &self,
        guild_id: &str,
        payload: &SlashCommandPayload,
    ) -> Result<Reply, CommandRouteError>;
}

#[async_trait]
impl<S> CampaignCommandService for Arc<S>
where
    S: CampaignCommandService + ?Sized,
{
    async fn open_create_modal(
        &self,
        options: CreateCampaignOptions,
        payload: &SlashCommandPayload,
    ) -> Result<ModalTemplate, CommandRouteError> {
        (**self).open_create_modal(options, payload).await
    }

    async fn close_campaign(
        &self,
        campaign_id: CampaignId,
        payload: &SlashCommandPayload,
    ) -> Result<Reply, CommandRouteError> {
        (**self).close_campaign(campaign_id, payload).await
    }

    async fn campaign_stats(
        &self,
        payload: &SlashCommandPayload,
    ) -> Result<Reply, CommandRouteError> {
        (**self).campaign_stats(payload).await
    }

    async fn list_campaigns(
        &self,
        payload: &SlashCommandPayload,
    ) -> Result<Reply, CommandRouteError> {
        (**self).list_campaigns(payload).await
    }

    async fn bot_audit(
        &self,
        guild_id: &str,
        payload: &SlashCommandPayload,
    ) -> Result<Reply, CommandRouteError> {
        (**self).bot_audit(guild_id, payload).await
    }
}
