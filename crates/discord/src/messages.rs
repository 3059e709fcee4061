//! Typed reply, embed and modal templates.
//!
//! Everything here is plain data; `gateway` and `platform` translate it into
//! serenity builders at the edge so rendering stays testable without a client.

use chrono::{DateTime, Utc};
use serde::Serialize;
use vireo_core::domain::campaign::{ButtonStyle, CampaignRecord, MAX_DESCRIPTION_CHARS, MAX_TITLE_CHARS};
use vireo_core::enrollment::EnrollmentOutcome;
use vireo_core::errors::InterfaceError;
use vireo_core::lifecycle::CampaignSummary;
use vireo_core::permissions::PermissionAudit;
use vireo_core::platform::{CampaignAnnouncement, JoinLogEntry};

pub const CREATE_CAMPAIGN_MODAL_ID: &str = "createCampaignModal";
pub const TITLE_INPUT_ID: &str = "campaignTitle";
pub const DESCRIPTION_INPUT_ID: &str = "campaignDescription";

pub const CLOSED_COLOR: u32 = 0xFF_57_22;
pub const JOIN_LOG_COLOR: u32 = 0x21_96_F3;
pub const STATS_COLOR: u32 = 0x4C_AF_50;
pub const CLOSED_TITLE: &str = "🔒 Campaign Closed - Vireo Opportunities";
pub const ADMIN_REQUIRED: &str = "❌ You need administrator permissions to use this command.";

pub const MAX_EMBED_TITLE_CHARS: usize = 256;
pub const MAX_FIELD_NAME_CHARS: usize = 256;
pub const MAX_FIELD_VALUE_CHARS: usize = 1024;
pub const MAX_EMBED_FIELDS: usize = 25;
pub const MAX_MESSAGE_CHARS: usize = 2000;

/// Cuts `text` to at most `max` chars, ending in `…` when something was dropped.
pub fn clamp_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_owned();
    }
    let mut clamped: String = text.chars().take(max.saturating_sub(1)).collect();
    clamped.push('…');
    clamped
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct EmbedTemplate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub color: u32,
    pub fields: Vec<EmbedField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer_icon_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ButtonTemplate {
    pub custom_id: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,
    pub style: ButtonStyle,
}

/// A response to the member or admin who triggered the interaction.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Reply {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub embeds: Vec<EmbedTemplate>,
    pub buttons: Vec<ButtonTemplate>,
    pub ephemeral: bool,
}

impl Reply {
    pub fn ephemeral(content: impl Into<String>) -> Self {
        Self { content: Some(content.into()), ephemeral: true, ..Self::default() }
    }

    pub fn text(&self) -> &str {
        self.content.as_deref().unwrap_or_default()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TextInputStyle {
    Short,
    Paragraph,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TextInputTemplate {
    pub custom_id: String,
    pub label: String,
    pub style: TextInputStyle,
    pub max_length: u16,
    pub required: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ModalTemplate {
    pub custom_id: String,
    pub title: String,
    pub inputs: Vec<TextInputTemplate>,
}

pub struct EmbedBuilder {
    embed: EmbedTemplate,
}

impl EmbedBuilder {
    pub fn new(color: u32) -> Self {
        Self { embed: EmbedTemplate { color, ..EmbedTemplate::default() } }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.embed.title = Some(clamp_chars(&title.into(), MAX_EMBED_TITLE_CHARS));
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.embed.description = Some(description.into());
        self
    }

    /// Fields past Discord's limit of 25 are dropped.
    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        if self.embed.fields.len() < MAX_EMBED_FIELDS {
            self.embed.fields.push(EmbedField {
                name: clamp_chars(&name.into(), MAX_FIELD_NAME_CHARS),
                value: clamp_chars(&value.into(), MAX_FIELD_VALUE_CHARS),
                inline,
            });
        }
        self
    }

    pub fn footer(mut self, text: impl Into<String>, icon_url: Option<String>) -> Self {
        self.embed.footer = Some(text.into());
        self.embed.footer_icon_url = icon_url;
        self
    }

    pub fn thumbnail(mut self, url: Option<String>) -> Self {
        self.embed.thumbnail_url = url;
        self
    }

    pub fn timestamp(mut self, at: DateTime<Utc>) -> Self {
        self.embed.timestamp = Some(at);
        self
    }

    pub fn build(self) -> EmbedTemplate {
        self.embed
    }
}

/// Public announcement embed plus its join button.
pub fn announcement(announcement: &CampaignAnnouncement) -> (EmbedTemplate, ButtonTemplate) {
    let customization = &announcement.customization;
    let embed = EmbedBuilder::new(customization.color_value())
        .title(customization.embed_title.clone())
        .description(format!("**{}**", announcement.title))
        .field("📋 Rules:", announcement.rules_section.clone(), false)
        .field("💰 Payrate:", announcement.payrate_section.clone(), false)
        .footer(customization.footer_text.clone(), customization.logo_url.clone())
        .thumbnail(customization.logo_url.clone())
        .timestamp(Utc::now())
        .build();
    let emoji = Some(customization.button_emoji.trim().to_owned()).filter(|emoji| !emoji.is_empty());
    let button = ButtonTemplate {
        custom_id: announcement.campaign_id.join_button_id(),
        label: customization.button_text.clone(),
        emoji,
        style: customization.button_style,
    };
    (embed, button)
}

pub fn join_log(entry: &JoinLogEntry) -> EmbedTemplate {
    EmbedBuilder::new(JOIN_LOG_COLOR)
        .title("📊 Campaign Join Log")
        .field("User", format!("<@{}> ({})", entry.user_id, entry.username), true)
        .field("Campaign", entry.campaign_title.clone(), true)
        .field("Total Participants", entry.total_participants.to_string(), true)
        .timestamp(Utc::now())
        .build()
}

pub fn create_campaign_modal() -> ModalTemplate {
    ModalTemplate {
        custom_id: CREATE_CAMPAIGN_MODAL_ID.to_owned(),
        title: "Create Campaign".to_owned(),
        inputs: vec![
            TextInputTemplate {
                custom_id: TITLE_INPUT_ID.to_owned(),
                label: "Campaign Title".to_owned(),
                style: TextInputStyle::Short,
                max_length: MAX_TITLE_CHARS as u16,
                required: true,
            },
            TextInputTemplate {
                custom_id: DESCRIPTION_INPUT_ID.to_owned(),
                label: "Campaign Description".to_owned(),
                style: TextInputStyle::Paragraph,
                max_length: MAX_DESCRIPTION_CHARS as u16,
                required: true,
            },
        ],
    }
}

pub fn admin_required() -> Reply {
    Reply::ephemeral(ADMIN_REQUIRED)
}

pub fn campaign_created(record: &CampaignRecord) -> Reply {
    Reply::ephemeral(format!("✅ Campaign **{}** created. (ID: {})", record.title, record.id))
}

pub fn campaign_closed(record: &CampaignRecord) -> Reply {
    Reply::ephemeral(format!(
        "✅ Campaign \"{}\" has been closed. {} total participants.",
        record.title,
        record.participant_count()
    ))
}

pub fn joined(outcome: &EnrollmentOutcome) -> Reply {
    Reply::ephemeral(format!(
        "✅ Successfully joined **{}**! Check your new private channel and role.",
        outcome.campaign.title
    ))
}

pub fn already_joined() -> Reply {
    Reply::ephemeral("✅ You have already joined this campaign!")
}

pub fn campaign_inactive() -> Reply {
    Reply::ephemeral("❌ This campaign is no longer active.")
}

pub fn join_failed() -> Reply {
    Reply::ephemeral("❌ Error joining campaign. Please contact an administrator.")
}

pub fn campaign_stats(active: &[CampaignSummary]) -> Reply {
    if active.is_empty() {
        return Reply::ephemeral("📊 No active campaigns found.");
    }

    let mut builder = EmbedBuilder::new(STATS_COLOR).title("📊 Vireo Campaign Statistics");
    if active.len() > MAX_EMBED_FIELDS {
        builder = builder.description(format!(
            "Showing {MAX_EMBED_FIELDS} of {} active campaigns. Use /list-campaigns for ids.",
            active.len()
        ));
    }
    let embed = active
        .iter()
        .take(MAX_EMBED_FIELDS)
        .fold(builder, |builder, campaign| {
            builder.field(
                format!("🎯 {}", campaign.title),
                format!(
                    "Participants: {}\nCreated: {}",
                    campaign.participant_count,
                    campaign.created_at.format("%Y-%m-%d")
                ),
                true,
            )
        })
        .timestamp(Utc::now())
        .build();
    Reply { embeds: vec![embed], ephemeral: true, ..Reply::default() }
}

pub fn campaign_list(campaigns: &[CampaignSummary]) -> Reply {
    if campaigns.is_empty() {
        return Reply::ephemeral("📋 No campaigns found.");
    }

    // Room for the "…and N more" trailer.
    const TRAILER_RESERVE: usize = 48;

    let mut body = String::from("📋 **All Campaigns:**\n\n");
    let mut shown = 0;
    for campaign in campaigns {
        let status = if campaign.active { "🟢 Active" } else { "🔴 Closed" };
        let entry = format!(
            "**{}** (ID: {})\nStatus: {status} | Participants: {}\n\n",
            campaign.title, campaign.id, campaign.participant_count
        );
        if body.chars().count() + entry.chars().count() > MAX_MESSAGE_CHARS - TRAILER_RESERVE {
            break;
        }
        body.push_str(&entry);
        shown += 1;
    }
    if shown < campaigns.len() {
        body.push_str(&format!("…and {} more campaigns.", campaigns.len() - shown));
    }
    Reply::ephemeral(body.trim_end().to_owned())
}

pub fn bot_audit(audit: &PermissionAudit) -> Reply {
    let join = |permissions: &[vireo_core::permissions::BotPermission]| {
        if permissions.is_empty() {
            "None".to_owned()
        } else {
            permissions.iter().map(|permission| permission.label()).collect::<Vec<_>>().join(", ")
        }
    };
    Reply::ephemeral(format!(
        "**Bot audit for {}**\n\nBot role position: {}\nHas permissions: {}\nMissing permissions: {}",
        audit.guild_name,
        audit.highest_role_position,
        join(&audit.granted),
        join(&audit.missing)
    ))
}

pub fn guild_only() -> Reply {
    Reply::ephemeral("This command must be used in a guild by an administrator.")
}

/// Maps a failed operation to its user-facing reply, keeping the correlation id for support.
pub fn error_reply(error: &InterfaceError) -> Reply {
    Reply::ephemeral(format!("{}\n`ref: {}`", error.user_message(), error.correlation_id()))
}
