//! [`CampaignPlatform`] over the Discord REST API.

use std::sync::Arc;

use async_trait::async_trait;
use serenity::all::{
    ChannelId, ChannelType, CreateChannel, CreateEmbed, CreateMessage, EditMessage, EditRole,
    GuildChannel, GuildId, MessageId, PermissionOverwrite, PermissionOverwriteType, Permissions,
    RoleId, UserId,
};
use serenity::http::{Http, HttpError};
use tokio::sync::OnceCell;
use tracing::{debug, warn};
use vireo_core::permissions::{BotMemberSnapshot, BotPermission};
use vireo_core::platform::{
    is_log_channel_name, CampaignAnnouncement, CampaignPlatform, JoinLogEntry, PlatformError,
    PublishedMessage,
};

use crate::messages::{self, CLOSED_COLOR, CLOSED_TITLE};
use crate::render;

const ROLE_GRANT_REASON: &str = "Joined campaign";
const CAMPAIGN_ROLE_COLOUR: u32 = 0x4C_AF_50;

const PERMISSION_MAP: [(Permissions, BotPermission); 7] = [
    (Permissions::ADMINISTRATOR, BotPermission::Administrator),
    (Permissions::MANAGE_ROLES, BotPermission::ManageRoles),
    (Permissions::MANAGE_CHANNELS, BotPermission::ManageChannels),
    (Permissions::SEND_MESSAGES, BotPermission::SendMessages),
    (Permissions::EMBED_LINKS, BotPermission::EmbedLinks),
    (Permissions::READ_MESSAGE_HISTORY, BotPermission::ReadMessageHistory),
    (Permissions::VIEW_CHANNEL, BotPermission::ViewChannel),
];

pub struct SerenityPlatform {
    http: Arc<Http>,
    bot_user: OnceCell<UserId>,
}

impl SerenityPlatform {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http, bot_user: OnceCell::new() }
    }

    pub fn from_token(token: &str) -> Self {
        Self::new(Arc::new(Http::new(token)))
    }

    fn http(&self) -> &Http {
        &self.http
    }

    async fn bot_user_id(&self) -> Result<UserId, PlatformError> {
        self.bot_user
            .get_or_try_init(|| async {
                self.http
                    .get_current_user()
                    .await
                    .map(|user| user.id)
                    .map_err(|error| classify(error, "fetch bot user"))
            })
            .await
            .copied()
    }

    /// Best-effort: a reused category keeps working even if this fails.
    async fn reassert_bot_access(&self, category: ChannelId) {
        let result = match self.bot_user_id().await {
            Ok(bot) => category
                .create_permission(self.http(), bot_category_overwrite(bot))
                .await
                .map_err(|error| classify(error, "reassert bot category access")),
            Err(error) => Err(error),
        };
        if let Err(error) = result {
            warn!(
                event_name = "platform.category.reassert_failed",
                category_id = %category,
                error = %error,
                "could not re-assert bot access on existing category"
            );
        }
    }

    async fn guild_channels(&self, guild: GuildId) -> Result<Vec<GuildChannel>, PlatformError> {
        guild
            .channels(self.http())
            .await
            .map(|channels| channels.into_values().collect())
            .map_err(|error| classify(error, "list guild channels"))
    }
}

pub fn parse_snowflake(kind: &str, raw: &str) -> Result<u64, PlatformError> {
    raw.trim()
        .parse::<u64>()
        .ok()
        .filter(|id| *id != 0)
        .ok_or_else(|| PlatformError::NotFound(format!("invalid {kind} id `{raw}`")))
}

fn guild_id(raw: &str) -> Result<GuildId, PlatformError> {
    parse_snowflake("guild", raw).map(GuildId::new)
}

fn channel_id(raw: &str) -> Result<ChannelId, PlatformError> {
    parse_snowflake("channel", raw).map(ChannelId::new)
}

/// 401/403 become permission errors so callers can point admins at `/bot-audit`.
fn classify(error: serenity::Error, action: &str) -> PlatformError {
    let message = format!("{action}: {error}");
    match &error {
        serenity::Error::Http(HttpError::UnsuccessfulRequest(response)) => {
            match response.status_code.as_u16() {
                401 | 403 => PlatformError::PermissionDenied(message),
                404 => PlatformError::NotFound(message),
                _ => PlatformError::Transient(message),
            }
        }
        _ => PlatformError::Transient(message),
    }
}

pub fn bot_permissions(permissions: Permissions) -> Vec<BotPermission> {
    PERMISSION_MAP
        .iter()
        .filter(|(flag, _)| permissions.contains(*flag))
        .map(|(_, permission)| *permission)
        .collect()
}

pub fn campaign_role(name: &str) -> EditRole<'static> {
    EditRole::new().name(name).colour(CAMPAIGN_ROLE_COLOUR).mentionable(false)
}

/// Hides a campaign category from `@everyone`, whose role id is the guild id.
pub fn everyone_category_overwrite(guild: GuildId) -> PermissionOverwrite {
    PermissionOverwrite {
        allow: Permissions::empty(),
        deny: Permissions::VIEW_CHANNEL,
        kind: PermissionOverwriteType::Role(RoleId::new(guild.get())),
    }
}

pub fn bot_category_overwrite(bot: UserId) -> PermissionOverwrite {
    PermissionOverwrite {
        allow: Permissions::VIEW_CHANNEL | Permissions::MANAGE_CHANNELS | Permissions::MANAGE_ROLES,
        deny: Permissions::empty(),
        kind: PermissionOverwriteType::Member(bot),
    }
}

pub fn member_category_overwrite(role: RoleId) -> PermissionOverwrite {
    PermissionOverwrite {
        allow: Permissions::VIEW_CHANNEL
            | Permissions::SEND_MESSAGES
            | Permissions::READ_MESSAGE_HISTORY
            | Permissions::ATTACH_FILES
            | Permissions::EMBED_LINKS,
        deny: Permissions::empty(),
        kind: PermissionOverwriteType::Role(role),
    }
}

fn category_named<'a>(channels: &'a [GuildChannel], name: &str) -> Option<&'a GuildChannel> {
    channels.iter().find(|channel| channel.kind == ChannelType::Category && channel.name == name)
}

#[async_trait]
impl CampaignPlatform for SerenityPlatform {
    async fn publish_announcement(
        &self,
        channel_id_raw: &str,
        announcement: &CampaignAnnouncement,
    ) -> Result<PublishedMessage, PlatformError> {
        let channel = channel_id(channel_id_raw)?;
        let (embed, button) = messages::announcement(announcement);
        let message = channel
            .send_message(
                self.http(),
                CreateMessage::new()
                    .embed(render::embed(&embed))
                    .components(render::button_row(&[button])),
            )
            .await
            .map_err(|error| classify(error, "publish announcement"))?;
        Ok(PublishedMessage { message_id: message.id.to_string() })
    }

    async fn mark_announcement_closed(
        &self,
        channel_id_raw: &str,
        message_id_raw: &str,
    ) -> Result<(), PlatformError> {
        let channel = channel_id(channel_id_raw)?;
        let message_id = MessageId::new(parse_snowflake("message", message_id_raw)?);
        let message = channel
            .message(self.http(), message_id)
            .await
            .map_err(|error| classify(error, "fetch announcement"))?;

        let embed = message
            .embeds
            .into_iter()
            .next()
            .map(CreateEmbed::from)
            .unwrap_or_default()
            .color(CLOSED_COLOR)
            .title(CLOSED_TITLE);
        channel
            .edit_message(
                self.http(),
                message_id,
                EditMessage::new().embed(embed).components(Vec::new()),
            )
            .await
            .map_err(|error| classify(error, "edit announcement"))?;
        Ok(())
    }

    async fn ensure_private_category(
        &self,
        guild_id_raw: &str,
        name: &str,
    ) -> Result<String, PlatformError> {
        let guild = guild_id(guild_id_raw)?;
        let channels = self.guild_channels(guild).await?;
        let existing = category_named(&channels, name).map(|channel| channel.id);
        if let Some(category) = existing {
            self.reassert_bot_access(category).await;
            return Ok(category.to_string());
        }

        let bot = self.bot_user_id().await?;
        let overwrites = vec![everyone_category_overwrite(guild), bot_category_overwrite(bot)];
        let category = guild
            .create_channel(
                self.http(),
                CreateChannel::new(name).kind(ChannelType::Category).permissions(overwrites),
            )
            .await
            .map_err(|error| classify(error, "create category"))?;
        debug!(guild_id = guild_id_raw, category_id = %category.id, "created private category");
        Ok(category.id.to_string())
    }

    async fn find_category(
        &self,
        guild_id_raw: &str,
        category_id: &str,
    ) -> Result<Option<String>, PlatformError> {
        let guild = guild_id(guild_id_raw)?;
        let wanted = channel_id(category_id)?;
        Ok(self
            .guild_channels(guild)
            .await?
            .into_iter()
            .find(|channel| channel.id == wanted && channel.kind == ChannelType::Category)
            .map(|channel| channel.id.to_string()))
    }

    async fn find_category_by_name(
        &self,
        guild_id_raw: &str,
        name: &str,
    ) -> Result<Option<String>, PlatformError> {
        let guild = guild_id(guild_id_raw)?;
        let channels = self.guild_channels(guild).await?;
        Ok(category_named(&channels, name).map(|channel| channel.id.to_string()))
    }

    async fn ensure_role(&self, guild_id_raw: &str, name: &str) -> Result<String, PlatformError> {
        let guild = guild_id(guild_id_raw)?;
        let roles = guild.roles(self.http()).await.map_err(|error| classify(error, "list roles"))?;
        if let Some(role) = roles.values().find(|role| role.name == name) {
            return Ok(role.id.to_string());
        }

        let role = guild
            .create_role(self.http(), campaign_role(name))
            .await
            .map_err(|error| classify(error, "create role"))?;
        debug!(guild_id = guild_id_raw, role_id = %role.id, "created campaign role");
        Ok(role.id.to_string())
    }

    async fn grant_role(
        &self,
        guild_id_raw: &str,
        user_id: &str,
        role_id: &str,
    ) -> Result<(), PlatformError> {
        self.http
            .add_member_role(
                guild_id(guild_id_raw)?,
                UserId::new(parse_snowflake("user", user_id)?),
                RoleId::new(parse_snowflake("role", role_id)?),
                Some(ROLE_GRANT_REASON),
            )
            .await
            .map_err(|error| classify(error, "grant role"))
    }

    async fn grant_category_access(
        &self,
        category_id: &str,
        role_id: &str,
    ) -> Result<(), PlatformError> {
        channel_id(category_id)?
            .create_permission(
                self.http(),
                member_category_overwrite(RoleId::new(parse_snowflake("role", role_id)?)),
            )
            .await
            .map_err(|error| classify(error, "grant category access"))
    }

    async fn find_log_channel(&self, guild_id_raw: &str) -> Result<Option<String>, PlatformError> {
        let guild = guild_id(guild_id_raw)?;
        Ok(self
            .guild_channels(guild)
            .await?
            .into_iter()
            .filter(|channel| channel.kind == ChannelType::Text && is_log_channel_name(&channel.name))
            .min_by_key(|channel| channel.position)
            .map(|channel| channel.id.to_string()))
    }

    async fn post_join_log(
        &self,
        channel_id_raw: &str,
        entry: &JoinLogEntry,
    ) -> Result<(), PlatformError> {
        channel_id(channel_id_raw)?
            .send_message(
                self.http(),
                CreateMessage::new().embed(render::embed(&messages::join_log(entry))),
            )
            .await
            .map(|_| ())
            .map_err(|error| classify(error, "post join log"))
    }

    async fn bot_member(&self, guild_id_raw: &str) -> Result<BotMemberSnapshot, PlatformError> {
        let guild = guild_id(guild_id_raw)?;
        let bot = self.bot_user_id().await?;
        let partial = guild
            .to_partial_guild(self.http())
            .await
            .map_err(|error| classify(error, "fetch guild"))?;
        let member =
            guild.member(self.http(), bot).await.map_err(|error| classify(error, "fetch bot member"))?;

        let mut permissions = partial
            .roles
            .get(&RoleId::new(guild.get()))
            .map(|everyone| everyone.permissions)
            .unwrap_or_else(Permissions::empty);
        let mut highest_role_position = 0;
        for role in member.roles.iter().filter_map(|role_id| partial.roles.get(role_id)) {
            permissions |= role.permissions;
            highest_role_position = highest_role_position.max(role.position);
        }

        Ok(BotMemberSnapshot {
            guild_name: partial.name.clone(),
            highest_role_position,
            permissions: bot_permissions(permissions),
        })
    }
}
