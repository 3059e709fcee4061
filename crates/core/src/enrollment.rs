//! Member self-enrollment through the join button.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use crate::domain::campaign::{CampaignId, CampaignRecord, ParticipantRecord};
use crate::errors::{ApplicationError, DomainError};
use crate::platform::{CampaignPlatform, JoinLogEntry};
use crate::registry::CampaignRegistry;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JoinRequest {
    pub campaign_id: CampaignId,
    pub guild_id: String,
    pub user_id: String,
    pub username: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnrollmentOutcome {
    pub campaign: CampaignRecord,
    pub role_id: String,
    pub category_id: Option<String>,
}

impl EnrollmentOutcome {
    pub fn total_participants(&self) -> usize {
        self.campaign.participant_count()
    }
}

pub struct EnrollmentService {
    registry: Arc<CampaignRegistry>,
    platform: Arc<dyn CampaignPlatform>,
    audit: Arc<dyn AuditSink>,
}

impl EnrollmentService {
    pub fn new(
        registry: Arc<CampaignRegistry>,
        platform: Arc<dyn CampaignPlatform>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self { registry, platform, audit }
    }

    pub async fn enroll(
        &self,
        context: &AuditContext,
        request: JoinRequest,
    ) -> Result<EnrollmentOutcome, ApplicationError> {
        let _section = self.registry.lock_campaign(&request.campaign_id).await;

        let campaign = match self.check_eligibility(&request).await {
            Ok(campaign) => campaign,
            Err(error) => {
                info!(
                    event_name = "campaign.join.rejected",
                    correlation_id = %context.correlation_id,
                    campaign_id = %request.campaign_id,
                    user_id = %request.user_id,
                    reason = %error,
                    "join request rejected"
                );
                self.emit(context, &request, AuditOutcome::Rejected, &error.to_string());
                return Err(error.into());
            }
        };

        match self.apply(context, &request, &campaign).await {
            Ok(outcome) => {
                info!(
                    event_name = "campaign.joined",
                    correlation_id = %context.correlation_id,
                    campaign_id = %request.campaign_id,
                    user_id = %request.user_id,
                    total_participants = outcome.total_participants(),
                    "member joined campaign"
                );
                self.emit(context, &request, AuditOutcome::Success, &outcome.role_id);
                Ok(outcome)
            }
            Err(error) => {
                warn!(
                    event_name = "campaign.join.failed",
                    correlation_id = %context.correlation_id,
                    campaign_id = %request.campaign_id,
                    user_id = %request.user_id,
                    error = %error,
                    "join request failed"
                );
                self.emit(context, &request, AuditOutcome::Failed, &error.to_string());
                Err(error)
            }
        }
    }

    async fn check_eligibility(&self, request: &JoinRequest) -> Result<CampaignRecord, DomainError> {
        let campaign = self
            .registry
            .get(&request.campaign_id)
            .await
            .filter(|campaign| campaign.active)
            .ok_or_else(|| DomainError::CampaignInactive(request.campaign_id.clone()))?;
        if campaign.has_participant(&request.user_id) {
            return Err(DomainError::AlreadyJoined {
                campaign_id: request.campaign_id.clone(),
                user_id: request.user_id.clone(),
            });
        }
        Ok(campaign)
    }

    async fn apply(
        &self,
        context: &AuditContext,
        request: &JoinRequest,
        campaign: &CampaignRecord,
    ) -> Result<EnrollmentOutcome, ApplicationError> {
        let role_id = self.platform.ensure_role(&request.guild_id, &campaign.title).await?;
        self.platform.grant_role(&request.guild_id, &request.user_id, &role_id).await?;

        let (category_id, found_by_name) = self.resolve_category(context, request, campaign).await;
        if let Some(category_id) = category_id.as_deref() {
            if let Err(error) = self.platform.grant_category_access(category_id, &role_id).await {
                warn!(
                    event_name = "campaign.join.category_access_failed",
                    correlation_id = %context.correlation_id,
                    campaign_id = %request.campaign_id,
                    category_id,
                    error = %error,
                    "could not open the campaign category to the member role"
                );
            }
        }

        let participant = ParticipantRecord {
            user_id: request.user_id.clone(),
            username: request.username.clone(),
            joined_at: Utc::now(),
            channel_id: None,
            role_id: role_id.clone(),
        };
        let link = if found_by_name { category_id.clone() } else { None };
        let (updated, _) = self
            .registry
            .update(&request.campaign_id, "join", move |record| {
                if let Some(category_id) = link {
                    record.link_category(category_id);
                }
                record.add_participant(participant)?;
                Ok(record.clone())
            })
            .await?;

        self.post_join_log(context, request, &updated).await;

        Ok(EnrollmentOutcome { campaign: updated, role_id, category_id })
    }

    /// Looks the category up by stored id, then by its expected name.
    async fn resolve_category(
        &self,
        context: &AuditContext,
        request: &JoinRequest,
        campaign: &CampaignRecord,
    ) -> (Option<String>, bool) {
        if let Some(stored) = campaign.category_id.as_deref() {
            match self.platform.find_category(&request.guild_id, stored).await {
                Ok(Some(found)) => return (Some(found), false),
                Ok(None) => {}
                Err(error) => warn!(
                    event_name = "campaign.join.category_lookup_failed",
                    correlation_id = %context.correlation_id,
                    campaign_id = %request.campaign_id,
                    category_id = stored,
                    error = %error,
                    "stored category lookup failed"
                ),
            }
        }

        let name = campaign.category_name();
        match self.platform.find_category_by_name(&request.guild_id, &name).await {
            Ok(Some(found)) => (Some(found), true),
            Ok(None) => {
                warn!(
                    event_name = "campaign.join.category_missing",
                    correlation_id = %context.correlation_id,
                    campaign_id = %request.campaign_id,
                    category_name = %name,
                    "campaign has no private category; member only receives the role"
                );
                (None, false)
            }
            Err(error) => {
                warn!(
                    event_name = "campaign.join.category_lookup_failed",
                    correlation_id = %context.correlation_id,
                    campaign_id = %request.campaign_id,
                    category_name = %name,
                    error = %error,
                    "category lookup by name failed"
                );
                (None, false)
            }
        }
    }

    async fn post_join_log(
        &self,
        context: &AuditContext,
        request: &JoinRequest,
        campaign: &CampaignRecord,
    ) {
        let channel_id = match self.platform.find_log_channel(&request.guild_id).await {
            Ok(Some(channel_id)) => channel_id,
            Ok(None) => return,
            Err(error) => {
                warn!(
                    event_name = "campaign.join.log_lookup_failed",
                    correlation_id = %context.correlation_id,
                    error = %error,
                    "could not look up a log channel"
                );
                return;
            }
        };

        let entry = JoinLogEntry {
            campaign_title: campaign.title.clone(),
            user_id: request.user_id.clone(),
            username: request.username.clone(),
            total_participants: campaign.participant_count(),
        };
        if let Err(error) = self.platform.post_join_log(&channel_id, &entry).await {
            warn!(
                event_name = "campaign.join.log_failed",
                correlation_id = %context.correlation_id,
                channel_id = %channel_id,
                error = %error,
                "join log entry could not be posted"
            );
        }
    }

    fn emit(
        &self,
        context: &AuditContext,
        request: &JoinRequest,
        outcome: AuditOutcome,
        detail: &str,
    ) {
        let key = if outcome == AuditOutcome::Success { "role_id" } else { "reason" };
        self.audit.emit(
            AuditEvent::new(
                context,
                Some(request.campaign_id.clone()),
                "campaign.joined",
                AuditCategory::Enrollment,
                outcome,
            )
            .with_metadata("user_id", request.user_id.clone())
            .with_metadata(key, detail),
        );
    }
}
