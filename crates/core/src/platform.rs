//! Outbound seam to the chat platform.
//!
//! The lifecycle and enrollment services only talk to Discord through
//! [`CampaignPlatform`]. The serenity-backed implementation lives in
//! `vireo-discord`; [`InMemoryPlatform`] backs tests and local dry runs.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::campaign::{CampaignId, Customization};
use crate::permissions::BotMemberSnapshot;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PlatformError {
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("platform call failed: {0}")]
    Transient(String),
}

/// Everything the adapter needs to render the public campaign message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CampaignAnnouncement {
    pub campaign_id: CampaignId,
    pub title: String,
    pub description: String,
    pub rules_section: String,
    pub payrate_section: String,
    pub customization: Customization,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublishedMessage {
    pub message_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JoinLogEntry {
    pub campaign_title: String,
    pub user_id: String,
    pub username: String,
    pub total_participants: usize,
}

#[async_trait]
pub trait CampaignPlatform: Send + Sync {
    async fn publish_announcement(
        &self,
        channel_id: &str,
        announcement: &CampaignAnnouncement,
    ) -> Result<PublishedMessage, PlatformError>;

    /// Switches the published message to its closed look and drops the join button.
    async fn mark_announcement_closed(
        &self,
        channel_id: &str,
        message_id: &str,
    ) -> Result<(), PlatformError>;

    /// Finds a category by exact name or creates one hidden from `@everyone`.
    async fn ensure_private_category(
        &self,
        guild_id: &str,
        name: &str,
    ) -> Result<String, PlatformError>;

    async fn find_category(
        &self,
        guild_id: &str,
        category_id: &str,
    ) -> Result<Option<String>, PlatformError>;

    async fn find_category_by_name(
        &self,
        guild_id: &str,
        name: &str,
    ) -> Result<Option<String>, PlatformError>;

    /// Looks a role up by exact name, creating it when absent.
    async fn ensure_role(&self, guild_id: &str, name: &str) -> Result<String, PlatformError>;

    async fn grant_role(
        &self,
        guild_id: &str,
        user_id: &str,
        role_id: &str,
    ) -> Result<(), PlatformError>;

    async fn grant_category_access(
        &self,
        category_id: &str,
        role_id: &str,
    ) -> Result<(), PlatformError>;

    async fn find_log_channel(&self, guild_id: &str) -> Result<Option<String>, PlatformError>;

    async fn post_join_log(
        &self,
        channel_id: &str,
        entry: &JoinLogEntry,
    ) -> Result<(), PlatformError>;

    async fn bot_member(&self, guild_id: &str) -> Result<BotMemberSnapshot, PlatformError>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PostedMessage {
    pub message_id: String,
    pub channel_id: String,
    pub announcement: CampaignAnnouncement,
    pub closed: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FakeCategory {
    pub id: String,
    pub guild_id: String,
    pub name: String,
    pub role_access: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FakeRole {
    pub id: String,
    pub guild_id: String,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FakeChannel {
    pub id: String,
    pub guild_id: String,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum FailurePoint {
    Publish,
    CloseEdit,
    Category,
    EnsureRole,
    GrantRole,
    CategoryAccess,
    JoinLog,
}

#[derive(Debug, Default)]
struct FakeState {
    next_id: u64,
    messages: Vec<PostedMessage>,
    categories: Vec<FakeCategory>,
    roles: Vec<FakeRole>,
    grants: Vec<(String, String, String)>,
    channels: Vec<FakeChannel>,
    join_logs: Vec<(String, JoinLogEntry)>,
    bot_member: Option<BotMemberSnapshot>,
    failures: Vec<(FailurePoint, PlatformError)>,
}

impl FakeState {
    fn mint(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}{}", self.next_id)
    }

    fn check(&self, point: FailurePoint) -> Result<(), PlatformError> {
        match self.failures.iter().find(|(candidate, _)| *candidate == point) {
            Some((_, error)) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

/// Records platform calls in memory. Individual calls can be made to fail.
#[derive(Clone, Debug, Default)]
pub struct InMemoryPlatform {
    state: Arc<Mutex<FakeState>>,
}

impl InMemoryPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        match self.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn fail_at(&self, point: FailurePoint, error: PlatformError) {
        self.state().failures.push((point, error));
    }

    pub fn clear_failures(&self) {
        self.state().failures.clear();
    }

    pub fn add_text_channel(&self, guild_id: &str, name: &str) -> String {
        let mut state = self.state();
        let id = state.mint("CH");
        state.channels.push(FakeChannel {
            id: id.clone(),
            guild_id: guild_id.to_owned(),
            name: name.to_owned(),
        });
        id
    }

    pub fn add_category(&self, guild_id: &str, name: &str) -> String {
        let mut state = self.state();
        let id = state.mint("CAT");
        state.categories.push(FakeCategory {
            id: id.clone(),
            guild_id: guild_id.to_owned(),
            name: name.to_owned(),
            role_access: Vec::new(),
        });
        id
    }

    pub fn set_bot_member(&self, snapshot: BotMemberSnapshot) {
        self.state().bot_member = Some(snapshot);
    }

    pub fn messages(&self) -> Vec<PostedMessage> {
        self.state().messages.clone()
    }

    pub fn categories(&self) -> Vec<FakeCategory> {
        self.state().categories.clone()
    }

    pub fn roles(&self) -> Vec<FakeRole> {
        self.state().roles.clone()
    }

    /// `(guild_id, user_id, role_id)` for every successful role grant.
    pub fn grants(&self) -> Vec<(String, String, String)> {
        self.state().grants.clone()
    }

    pub fn join_logs(&self) -> Vec<(String, JoinLogEntry)> {
        self.state().join_logs.clone()
    }
}

#[async_trait]
impl CampaignPlatform for InMemoryPlatform {
    async fn publish_announcement(
        &self,
        channel_id: &str,
        announcement: &CampaignAnnouncement,
    ) -> Result<PublishedMessage, PlatformError> {
        let mut state = self.state();
        state.check(FailurePoint::Publish)?;
        let message_id = state.mint("M");
        state.messages.push(PostedMessage {
            message_id: message_id.clone(),
            channel_id: channel_id.to_owned(),
            announcement: announcement.clone(),
            closed: false,
        });
        Ok(PublishedMessage { message_id })
    }

    async fn mark_announcement_closed(
        &self,
        channel_id: &str,
        message_id: &str,
    ) -> Result<(), PlatformError> {
        let mut state = self.state();
        state.check(FailurePoint::CloseEdit)?;
        let message = state
            .messages
            .iter_mut()
            .find(|message| message.message_id == message_id && message.channel_id == channel_id)
            .ok_or_else(|| PlatformError::NotFound(format!("message {message_id}")))?;
        message.closed = true;
        Ok(())
    }

    async fn ensure_private_category(
        &self,
        guild_id: &str,
        name: &str,
    ) -> Result<String, PlatformError> {
        let mut state = self.state();
        state.check(FailurePoint::Category)?;
        if let Some(existing) = state
            .categories
            .iter()
            .find(|category| category.guild_id == guild_id && category.name == name)
        {
            return Ok(existing.id.clone());
        }
        let id = state.mint("CAT");
        state.categories.push(FakeCategory {
            id: id.clone(),
            guild_id: guild_id.to_owned(),
            name: name.to_owned(),
            role_access: Vec::new(),
        });
        Ok(id)
    }

    async fn find_category(
        &self,
        guild_id: &str,
        category_id: &str,
    ) -> Result<Option<String>, PlatformError> {
        Ok(self
            .state()
            .categories
            .iter()
            .find(|category| category.guild_id == guild_id && category.id == category_id)
            .map(|category| category.id.clone()))
    }

    async fn find_category_by_name(
        &self,
        guild_id: &str,
        name: &str,
    ) -> Result<Option<String>, PlatformError> {
        Ok(self
            .state()
            .categories
            .iter()
            .find(|category| category.guild_id == guild_id && category.name == name)
            .map(|category| category.id.clone()))
    }

    async fn ensure_role(&self, guild_id: &str, name: &str) -> Result<String, PlatformError> {
        let mut state = self.state();
        state.check(FailurePoint::EnsureRole)?;
        if let Some(existing) =
            state.roles.iter().find(|role| role.guild_id == guild_id && role.name == name)
        {
            return Ok(existing.id.clone());
        }
        let id = state.mint("R");
        state.roles.push(FakeRole {
            id: id.clone(),
            guild_id: guild_id.to_owned(),
            name: name.to_owned(),
        });
        Ok(id)
    }

    async fn grant_role(
        &self,
        guild_id: &str,
        user_id: &str,
        role_id: &str,
    ) -> Result<(), PlatformError> {
        let mut state = self.state();
        state.check(FailurePoint::GrantRole)?;
        state.grants.push((guild_id.to_owned(), user_id.to_owned(), role_id.to_owned()));
        Ok(())
    }

    async fn grant_category_access(
        &self,
        category_id: &str,
        role_id: &str,
    ) -> Result<(), PlatformError> {
        let mut state = self.state();
        state.check(FailurePoint::CategoryAccess)?;
        let category = state
            .categories
            .iter_mut()
            .find(|category| category.id == category_id)
            .ok_or_else(|| PlatformError::NotFound(format!("category {category_id}")))?;
        if !category.role_access.iter().any(|existing| existing == role_id) {
            category.role_access.push(role_id.to_owned());
        }
        Ok(())
    }

    async fn find_log_channel(&self, guild_id: &str) -> Result<Option<String>, PlatformError> {
        Ok(self
            .state()
            .channels
            .iter()
            .find(|channel| channel.guild_id == guild_id && is_log_channel_name(&channel.name))
            .map(|channel| channel.id.clone()))
    }

    async fn post_join_log(
        &self,
        channel_id: &str,
        entry: &JoinLogEntry,
    ) -> Result<(), PlatformError> {
        let mut state = self.state();
        state.check(FailurePoint::JoinLog)?;
        state.join_logs.push((channel_id.to_owned(), entry.clone()));
        Ok(())
    }

    async fn bot_member(&self, guild_id: &str) -> Result<BotMemberSnapshot, PlatformError> {
        self.state()
            .bot_member
            .clone()
            .ok_or_else(|| PlatformError::NotFound(format!("bot member in guild {guild_id}")))
    }
}

/// Audit channels are picked by name: anything mentioning `log` or `admin`.
pub fn is_log_channel_name(name: &str) -> bool {
    name.contains("log") || name.contains("admin")
}

#[cfg(test)]
mod tests {
    use super::{is_log_channel_name, CampaignPlatform, FailurePoint, InMemoryPlatform, PlatformError};

    #[test]
    fn log_channel_heuristic_matches_log_and_admin() {
        assert!(is_log_channel_name("campaign-logs"));
        assert!(is_log_channel_name("admin-chat"));
        assert!(!is_log_channel_name("general"));
    }

    #[tokio::test]
    async fn roles_are_reused_by_name() {
        let platform = InMemoryPlatform::new();
        let first = platform.ensure_role("G1", "Summer Promo").await.expect("create role");
        let second = platform.ensure_role("G1", "Summer Promo").await.expect("reuse role");
        assert_eq!(first, second);
        assert_eq!(platform.roles().len(), 1);
    }

    #[tokio::test]
    async fn injected_failures_surface_as_errors() {
        let platform = InMemoryPlatform::new();
        platform.fail_at(FailurePoint::GrantRole, PlatformError::PermissionDenied("x".to_owned()));
        let error = platform.grant_role("G1", "U1", "R1").await.expect_err("grant should fail");
        assert!(matches!(error, PlatformError::PermissionDenied(_)));

        platform.clear_failures();
        platform.grant_role("G1", "U1", "R1").await.expect("grant after clearing");
        assert_eq!(platform.grants().len(), 1);
    }
}
