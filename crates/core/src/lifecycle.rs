//! Create, close, list and report on campaigns.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use crate::domain::campaign::{
    CampaignId, CampaignRecord, Customization, DEFAULT_CHANNEL_PREFIX, MAX_DESCRIPTION_CHARS,
    MAX_TITLE_CHARS,
};
use crate::errors::{ApplicationError, DomainError};
use crate::parser::parse_description;
use crate::platform::{CampaignAnnouncement, CampaignPlatform};
use crate::registry::CampaignRegistry;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreateCampaignRequest {
    pub guild_id: String,
    /// Channel the announcement is published into.
    pub channel_id: String,
    pub title: String,
    pub description: String,
    pub customization: Customization,
    pub channel_prefix: Option<String>,
}

/// Row used by `/list-campaigns` and `/campaign-stats`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CampaignSummary {
    pub id: CampaignId,
    pub title: String,
    pub active: bool,
    pub participant_count: usize,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl From<&CampaignRecord> for CampaignSummary {
    fn from(record: &CampaignRecord) -> Self {
        Self {
            id: record.id.clone(),
            title: record.title.clone(),
            active: record.active,
            participant_count: record.participant_count(),
            created_at: record.created_at,
            closed_at: record.closed_at,
        }
    }
}

pub struct CampaignLifecycle {
    registry: Arc<CampaignRegistry>,
    platform: Arc<dyn CampaignPlatform>,
    audit: Arc<dyn AuditSink>,
}

impl CampaignLifecycle {
    pub fn new(
        registry: Arc<CampaignRegistry>,
        platform: Arc<dyn CampaignPlatform>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self { registry, platform, audit }
    }

    pub async fn create(
        &self,
        context: &AuditContext,
        request: CreateCampaignRequest,
    ) -> Result<CampaignRecord, ApplicationError> {
        let (title, description) = validate_inputs(&request.title, &request.description)?;
        let id = self.registry.mint_id().await;
        let parsed = parse_description(&description);

        let announcement = CampaignAnnouncement {
            campaign_id: id.clone(),
            title: title.clone(),
            description: description.clone(),
            rules_section: parsed.rules_or_placeholder().to_owned(),
            payrate_section: parsed.payrate_or_placeholder().to_owned(),
            customization: request.customization.clone(),
        };
        let published = match self
            .platform
            .publish_announcement(&request.channel_id, &announcement)
            .await
        {
            Ok(published) => published,
            Err(error) => {
                warn!(
                    event_name = "campaign.create.publish_failed",
                    correlation_id = %context.correlation_id,
                    campaign_id = %id,
                    channel_id = %request.channel_id,
                    error = %error,
                    "campaign announcement could not be published; campaign not registered"
                );
                self.audit.emit(
                    AuditEvent::new(
                        context,
                        Some(id),
                        "campaign.created",
                        AuditCategory::Lifecycle,
                        AuditOutcome::Failed,
                    )
                    .with_metadata("reason", error.to_string()),
                );
                return Err(error.into());
            }
        };

        let channel_prefix = request
            .channel_prefix
            .map(|prefix| prefix.trim().to_owned())
            .filter(|prefix| !prefix.is_empty())
            .unwrap_or_else(|| DEFAULT_CHANNEL_PREFIX.to_owned());
        let record = CampaignRecord {
            id: id.clone(),
            title,
            description,
            message_id: published.message_id,
            channel_id: request.channel_id,
            category_id: None,
            has_private_channels: false,
            channel_prefix: Some(channel_prefix),
            active: true,
            created_at: Utc::now(),
            closed_at: None,
            participants: Vec::new(),
            rules_section: Some(parsed.rules_section),
            payrate_section: Some(parsed.payrate_section),
            customization: Some(request.customization),
        };
        let category_name = record.category_name();
        self.registry.insert(record).await?;

        match self.platform.ensure_private_category(&request.guild_id, &category_name).await {
            Ok(category_id) => {
                self.registry
                    .update(&id, "link_category", |campaign| {
                        campaign.link_category(category_id);
                        Ok(())
                    })
                    .await?;
            }
            Err(error) => warn!(
                event_name = "campaign.create.category_failed",
                correlation_id = %context.correlation_id,
                campaign_id = %id,
                category_name = %category_name,
                error = %error,
                "private category could not be provisioned; continuing without one"
            ),
        }

        let created = self
            .registry
            .get(&id)
            .await
            .ok_or_else(|| DomainError::CampaignNotFound(id.clone()))?;
        info!(
            event_name = "campaign.created",
            correlation_id = %context.correlation_id,
            campaign_id = %created.id,
            title = %created.title,
            category_id = created.category_id.as_deref().unwrap_or("-"),
            "campaign created"
        );
        self.audit.emit(
            AuditEvent::new(
                context,
                Some(created.id.clone()),
                "campaign.created",
                AuditCategory::Lifecycle,
                AuditOutcome::Success,
            )
            .with_metadata("title", created.title.clone())
            .with_metadata("message_id", created.message_id.clone()),
        );
        Ok(created)
    }

    /// Marks the campaign closed, then restyles its announcement best-effort.
    pub async fn close(
        &self,
        context: &AuditContext,
        id: &CampaignId,
    ) -> Result<CampaignRecord, ApplicationError> {
        let _section = self.registry.lock_campaign(id).await;

        if let Err(error) =
            self.registry.update(id, "close", |campaign| campaign.close(Utc::now())).await
        {
            info!(
                event_name = "campaign.close.rejected",
                correlation_id = %context.correlation_id,
                campaign_id = %id,
                reason = %error,
                "campaign close rejected"
            );
            self.audit.emit(
                AuditEvent::new(
                    context,
                    Some(id.clone()),
                    "campaign.closed",
                    AuditCategory::Lifecycle,
                    AuditOutcome::Rejected,
                )
                .with_metadata("reason", error.to_string()),
            );
            return Err(error.into());
        }

        let closed =
            self.registry.get(id).await.ok_or_else(|| DomainError::CampaignNotFound(id.clone()))?;

        if let Err(error) =
            self.platform.mark_announcement_closed(&closed.channel_id, &closed.message_id).await
        {
            warn!(
                event_name = "campaign.close.edit_failed",
                correlation_id = %context.correlation_id,
                campaign_id = %id,
                message_id = %closed.message_id,
                error = %error,
                "campaign closed but its announcement could not be updated"
            );
        }

        info!(
            event_name = "campaign.closed",
            correlation_id = %context.correlation_id,
            campaign_id = %id,
            participant_count = closed.participant_count(),
            "campaign closed"
        );
        self.audit.emit(
            AuditEvent::new(
                context,
                Some(id.clone()),
                "campaign.closed",
                AuditCategory::Lifecycle,
                AuditOutcome::Success,
            )
            .with_metadata("participant_count", closed.participant_count().to_string()),
        );
        Ok(closed)
    }

    pub async fn list(&self) -> Vec<CampaignSummary> {
        self.registry.all().await.iter().map(CampaignSummary::from).collect()
    }

    /// Active campaigns only.
    pub async fn stats(&self) -> Vec<CampaignSummary> {
        self.registry.active().await.iter().map(CampaignSummary::from).collect()
    }
}

fn validate_inputs(title: &str, description: &str) -> Result<(String, String), DomainError> {
    let title = title.trim();
    let description = description.trim();
    if title.is_empty() {
        return Err(DomainError::InvalidInput("campaign title must not be empty".to_owned()));
    }
    if title.chars().count() > MAX_TITLE_CHARS {
        return Err(DomainError::InvalidInput(format!(
            "campaign title must be at most {MAX_TITLE_CHARS} characters"
        )));
    }
    if description.is_empty() {
        return Err(DomainError::InvalidInput(
            "campaign description must not be empty".to_owned(),
        ));
    }
    if description.chars().count() > MAX_DESCRIPTION_CHARS {
        return Err(DomainError::InvalidInput(format!(
            "campaign description must be at most {MAX_DESCRIPTION_CHARS} characters"
        )));
    }
    Ok((title.to_owned(), description.to_owned()))
}
