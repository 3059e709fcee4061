use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

pub const JOIN_BUTTON_PREFIX: &str = "join_campaign_";
pub const DEFAULT_CATEGORY_PREFIX: &str = "📊 ";
pub const DEFAULT_CHANNEL_PREFIX: &str = "workspace";
pub const MAX_TITLE_CHARS: usize = 100;
pub const MAX_DESCRIPTION_CHARS: usize = 4000;

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CampaignId(pub String);

impl CampaignId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn join_button_id(&self) -> String {
        format!("{JOIN_BUTTON_PREFIX}{}", self.0)
    }

    /// Extracts the campaign id from a join button custom id.
    pub fn from_join_button(custom_id: &str) -> Option<Self> {
        let raw = custom_id.strip_prefix(JOIN_BUTTON_PREFIX)?;
        let candidate = raw.split('_').next().unwrap_or(raw).trim();
        if candidate.is_empty() {
            return None;
        }
        Some(Self(candidate.to_owned()))
    }
}

impl fmt::Display for CampaignId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CampaignId {
    fn from(value: &str) -> Self {
        Self(value.trim().to_owned())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ButtonStyle {
    Primary,
    Secondary,
    #[default]
    Success,
    Danger,
}

impl ButtonStyle {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Primary => "Primary",
            Self::Secondary => "Secondary",
            Self::Success => "Success",
            Self::Danger => "Danger",
        }
    }
}

impl std::str::FromStr for ButtonStyle {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "primary" => Ok(Self::Primary),
            "secondary" => Ok(Self::Secondary),
            "success" => Ok(Self::Success),
            "danger" => Ok(Self::Danger),
            other => Err(DomainError::InvalidInput(format!(
                "unsupported button style `{other}` (expected Primary|Secondary|Success|Danger)"
            ))),
        }
    }
}

/// Presentation options captured when the campaign is created.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customization {
    pub button_text: String,
    pub button_emoji: String,
    pub button_style: ButtonStyle,
    pub embed_color: String,
    pub embed_title: String,
    pub footer_text: String,
    pub category_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
}

impl Customization {
    /// Parses `embed_color` as hex, falling back to the brand green.
    pub fn color_value(&self) -> u32 {
        let trimmed = self.embed_color.trim().trim_start_matches('#').trim_start_matches("0x");
        u32::from_str_radix(trimmed, 16).unwrap_or(0x4C_AF_50)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantRecord {
    pub user_id: String,
    pub username: String,
    pub joined_at: DateTime<Utc>,
    #[serde(default)]
    pub channel_id: Option<String>,
    pub role_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignRecord {
    pub id: CampaignId,
    pub title: String,
    pub description: String,
    pub message_id: String,
    pub channel_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    #[serde(default)]
    pub has_private_channels: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_prefix: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub participants: Vec<ParticipantRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules_section: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payrate_section: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customization: Option<Customization>,
}

impl CampaignRecord {
    pub fn has_participant(&self, user_id: &str) -> bool {
        self.participants.iter().any(|participant| participant.user_id == user_id)
    }

    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    /// Name of the private category, either customized or derived from the title.
    pub fn category_name(&self) -> String {
        self.customization
            .as_ref()
            .map(|customization| customization.category_name.clone())
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| default_category_name(&self.title))
    }

    pub fn close(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        if !self.active {
            return Err(DomainError::AlreadyClosed(self.id.clone()));
        }
        self.active = false;
        self.closed_at = Some(now);
        Ok(())
    }

    pub fn add_participant(&mut self, participant: ParticipantRecord) -> Result<(), DomainError> {
        if !self.active {
            return Err(DomainError::CampaignInactive(self.id.clone()));
        }
        if self.has_participant(&participant.user_id) {
            return Err(DomainError::AlreadyJoined {
                campaign_id: self.id.clone(),
                user_id: participant.user_id,
            });
        }
        self.participants.push(participant);
        Ok(())
    }

    pub fn link_category(&mut self, category_id: impl Into<String>) {
        self.category_id = Some(category_id.into());
        self.has_private_channels = true;
    }
}

pub fn default_category_name(title: &str) -> String {
    format!("{DEFAULT_CATEGORY_PREFIX}{title}")
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::{CampaignId, CampaignRecord, Customization, ParticipantRecord};
    use crate::errors::DomainError;

    fn record() -> CampaignRecord {
        CampaignRecord {
            id: CampaignId("1730000000000".to_owned()),
            title: "Summer Promo".to_owned(),
            description: "Rules:\nNo spam".to_owned(),
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

    fn participant(user_id: &str) -> ParticipantRecord {
        ParticipantRecord {
            user_id: user_id.to_owned(),
            username: format!("user-{user_id}"),
            joined_at: Utc::now(),
            channel_id: None,
            role_id: "R1".to_owned(),
        }
    }

    #[test]
    fn join_button_id_round_trips_campaign_id() {
        let id = CampaignId("1730000000000".to_owned());
        let button = id.join_button_id();
        assert_eq!(button, "join_campaign_1730000000000");
        assert_eq!(CampaignId::from_join_button(&button), Some(id));
        assert_eq!(CampaignId::from_join_button("join_campaign_"), None);
        assert_eq!(CampaignId::from_join_button("other_button"), None);
    }

    #[test]
    fn close_is_one_way() {
        let mut campaign = record();
        campaign.close(Utc::now()).expect("first close");
        assert!(!campaign.active);
        assert!(campaign.closed_at.is_some());

        let error = campaign.close(Utc::now()).expect_err("second close must fail");
        assert!(matches!(error, DomainError::AlreadyClosed(_)));
        assert!(!campaign.active);
    }

    #[test]
    fn duplicate_participant_is_rejected() {
        let mut campaign = record();
        campaign.add_participant(participant("U1")).expect("first join");
        let error = campaign.add_participant(participant("U1")).expect_err("duplicate join");
        assert!(matches!(error, DomainError::AlreadyJoined { .. }));
        assert_eq!(campaign.participant_count(), 1);
    }

    #[test]
    fn closed_campaign_rejects_participants() {
        let mut campaign = record();
        campaign.close(Utc::now()).expect("close");
        let error = campaign.add_participant(participant("U2")).expect_err("inactive");
        assert!(matches!(error, DomainError::CampaignInactive(_)));
    }

    #[test]
    fn category_name_prefers_customization() {
        let mut campaign = record();
        assert_eq!(campaign.category_name(), "📊 Summer Promo");

        campaign.customization = Some(Customization {
            button_text: "Join".to_owned(),
            button_emoji: "🎬".to_owned(),
            button_style: super::ButtonStyle::Primary,
            embed_color: "#ff0000".to_owned(),
            embed_title: "Title".to_owned(),
            footer_text: "Footer".to_owned(),
            category_name: "Clippers".to_owned(),
            logo_url: None,
        });
        assert_eq!(campaign.category_name(), "Clippers");
        assert_eq!(campaign.customization.as_ref().map(Customization::color_value), Some(0xFF0000));
    }

    #[test]
    fn legacy_documents_deserialize() {
        let raw = r#"{
            "id": "1700000000000",
            "title": "Legacy",
            "description": "desc",
            "messageId": "M9",
            "channelId": "C9",
            "participants": [
                {"userId": "U1", "username": "alice", "joinedAt": "2024-01-01T00:00:00.000Z", "channelId": null, "roleId": "R1"}
            ],
            "createdAt": "2024-01-01T00:00:00.000Z",
            "active": true,
            "hasPrivateChannels": false
        }"#;

        let campaign: CampaignRecord = serde_json::from_str(raw).expect("legacy record");
        assert_eq!(campaign.participant_count(), 1);
        assert!(campaign.has_participant("U1"));
        assert!(campaign.category_id.is_none());
    }
}
