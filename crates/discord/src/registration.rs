use anyhow::{Context, Result};
use serenity::all::{
    Command, CommandOptionType, CreateCommand, CreateCommandOption, GuildId, Permissions,
};
use serenity::http::Http;
use tracing::info;

use crate::commands::{BOT_AUDIT, CAMPAIGN_STATS, CLOSE_CAMPAIGN, CREATE_CAMPAIGN, LIST_CAMPAIGNS};

/// Where slash commands are registered. Guild commands update instantly, global ones lag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandScope {
    Guild(u64),
    Global,
}

impl CommandScope {
    pub fn from_guild_id(guild_id: Option<&str>) -> Result<Self> {
        match guild_id.map(str::trim).filter(|raw| !raw.is_empty()) {
            Some(raw) => {
                let id = raw
                    .parse::<u64>()
                    .ok()
                    .filter(|id| *id != 0)
                    .with_context(|| format!("guild id `{raw}` is not a Discord snowflake"))?;
                Ok(Self::Guild(id))
            }
            None => Ok(Self::Global),
        }
    }
}

fn text_option(name: &str, description: &str) -> CreateCommandOption {
    CreateCommandOption::new(CommandOptionType::String, name, description).required(false)
}

fn admin_command(name: &str, description: &str) -> CreateCommand {
    CreateCommand::new(name)
        .description(description)
        .default_member_permissions(Permissions::ADMINISTRATOR)
}

pub fn campaign_commands() -> Vec<CreateCommand> {
    let create = admin_command(CREATE_CAMPAIGN, "Create a new campaign embed (opens a modal)")
        .add_option(text_option("logo", "Logo URL (optional)"))
        .add_option(text_option("button-text", "Button text (default: \"Start Clipping\")"))
        .add_option(text_option("button-emoji", "Button emoji (default: \"🎬\")"))
        .add_option(
            text_option("button-style", "Button color style")
                .add_string_choice("Green (Success)", "Success")
                .add_string_choice("Blue (Primary)", "Primary")
                .add_string_choice("Gray (Secondary)", "Secondary")
                .add_string_choice("Red (Danger)", "Danger"),
        )
        .add_option(text_option("embed-color", "Embed color in hex (default: 4CAF50)"))
        .add_option(text_option(
            "embed-title",
            "Embed title (default: \"🎯 Vireo Opportunities\")",
        ))
        .add_option(text_option("footer-text", "Footer text (default: \"Powered by Vireo\")"))
        .add_option(text_option("category-name", "Category name for private channels"))
        .add_option(text_option("channel-prefix", "Channel name suffix (default: \"workspace\")"));

    let close = admin_command(CLOSE_CAMPAIGN, "Close a campaign").add_option(
        CreateCommandOption::new(CommandOptionType::String, "campaign-id", "Campaign ID to close")
            .required(true),
    );

    vec![
        create,
        close,
        admin_command(CAMPAIGN_STATS, "Show statistics for active campaigns"),
        admin_command(LIST_CAMPAIGNS, "List all campaigns with their IDs"),
        admin_command(BOT_AUDIT, "Show bot permission audit for this guild (admin only)"),
    ]
}

pub async fn register_commands(http: &Http, scope: CommandScope) -> Result<usize> {
    let registered = match scope {
        CommandScope::Guild(guild_id) => GuildId::new(guild_id)
            .set_commands(http, campaign_commands())
            .await
            .with_context(|| format!("failed to register commands on guild {guild_id}"))?,
        CommandScope::Global => Command::set_global_commands(http, campaign_commands())
            .await
            .context("failed to register global commands")?,
    };

    info!(
        event_name = "gateway.commands.registered",
        scope = ?scope,
        count = registered.len(),
        "slash commands registered"
    );
    Ok(registered.len())
}
