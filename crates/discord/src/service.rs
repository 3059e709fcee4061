//! Binds the interaction traits to the core lifecycle and enrollment services.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tracing::{info, warn};
use vireo_core::audit::{AuditContext, AuditSink};
use vireo_core::config::BrandingConfig;
use vireo_core::domain::campaign::{default_category_name, CampaignId, Customization};
use vireo_core::enrollment::{EnrollmentService, JoinRequest};
use vireo_core::errors::{ApplicationError, DomainError};
use vireo_core::lifecycle::{CampaignLifecycle, CreateCampaignRequest};
use vireo_core::permissions::PermissionAudit;
use vireo_core::platform::{CampaignPlatform, PlatformError};
use vireo_core::registry::CampaignRegistry;

use crate::commands::{
    CampaignCommandService, CommandRouteError, CreateCampaignOptions, SlashCommandPayload,
};
use crate::events::{
    CampaignSubmission, EventContext, EventHandlerError, JoinButtonService, JoinClick,
    ModalSubmitService,
};
use crate::messages::{self, ModalTemplate, Reply};

const CREATE_FAILED: &str = "⚠️ Something went wrong while creating the campaign. Check bot permissions or run /bot-audit for details.";

type DraftKey = (String, String);

pub struct CampaignService {
    lifecycle: CampaignLifecycle,
    enrollment: EnrollmentService,
    platform: Arc<dyn CampaignPlatform>,
    branding: BrandingConfig,
    drafts: Mutex<HashMap<DraftKey, CreateCampaignOptions>>,
}

impl CampaignService {
    pub fn new(
        registry: Arc<CampaignRegistry>,
        platform: Arc<dyn CampaignPlatform>,
        audit: Arc<dyn AuditSink>,
        branding: BrandingConfig,
    ) -> Self {
        Self {
            lifecycle: CampaignLifecycle::new(registry.clone(), platform.clone(), audit.clone()),
            enrollment: EnrollmentService::new(registry, platform.clone(), audit),
            platform,
            branding,
            drafts: Mutex::new(HashMap::new()),
        }
    }

    fn drafts(&self) -> MutexGuard<'_, HashMap<DraftKey, CreateCampaignOptions>> {
        match self.drafts.lock() {
            Ok(drafts) => drafts,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Pending options for an admin whose modal is still open.
    pub fn pending_draft(&self, guild_id: &str, user_id: &str) -> Option<CreateCampaignOptions> {
        self.drafts().get(&(guild_id.to_owned(), user_id.to_owned())).cloned()
    }

    /// Branding overlaid with the admin's options; the category name is always resolved.
    fn customization(&self, options: &CreateCampaignOptions, title: &str) -> Customization {
        let category_name = options
            .category_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map_or_else(|| default_category_name(title.trim()), str::to_owned);
        let mut customization = self.branding.customization_for(category_name);
        if let Some(text) = &options.button_text {
            customization.button_text = text.clone();
        }
        if let Some(emoji) = &options.button_emoji {
            customization.button_emoji = emoji.clone();
        }
        if let Some(style) = options.button_style {
            customization.button_style = style;
        }
        if let Some(color) = &options.embed_color {
            customization.embed_color = color.clone();
        }
        if let Some(embed_title) = &options.embed_title {
            customization.embed_title = embed_title.clone();
        }
        if let Some(footer) = &options.footer_text {
            customization.footer_text = footer.clone();
        }
        if options.logo_url.is_some() {
            customization.logo_url = options.logo_url.clone();
        }
        customization
    }
}

fn failure_reply(text: &str, correlation_id: &str) -> Reply {
    Reply::ephemeral(format!("{text}\n`ref: {correlation_id}`"))
}

#[async_trait]
impl CampaignCommandService for CampaignService {
    async fn open_create_modal(
        &self,
        options: CreateCampaignOptions,
        payload: &SlashCommandPayload,
    ) -> Result<ModalTemplate, CommandRouteError> {
        let guild_id = payload.guild_id.clone().ok_or(CommandRouteError::GuildRequired)?;
        self.drafts().insert((guild_id, payload.user_id.clone()), options);
        Ok(messages::create_campaign_modal())
    }

    async fn close_campaign(
        &self,
        campaign_id: CampaignId,
        payload: &SlashCommandPayload,
    ) -> Result<Reply, CommandRouteError> {
        let guild_id = payload.guild_id.clone().unwrap_or_default();
        let context = AuditContext::new(guild_id, &payload.interaction_id, &payload.user_id);

        Ok(match self.lifecycle.close(&context, &campaign_id).await {
            Ok(campaign) => messages::campaign_closed(&campaign),
            Err(ApplicationError::Domain(DomainError::CampaignNotFound(_))) => {
                Reply::ephemeral("❌ Campaign not found.")
            }
            Err(error @ ApplicationError::Domain(DomainError::AlreadyClosed(_))) => {
                messages::error_reply(&error.into_interface(&payload.interaction_id))
            }
            Err(error) => {
                warn!(
                    event_name = "command.close.failed",
                    correlation_id = %payload.interaction_id,
                    campaign_id = %campaign_id,
                    error = %error,
                    "closing campaign failed"
                );
                failure_reply("❌ Error closing campaign.", &payload.interaction_id)
            }
        })
    }

    async fn campaign_stats(
        &self,
        _payload: &SlashCommandPayload,
    ) -> Result<Reply, CommandRouteError> {
        Ok(messages::campaign_stats(&self.lifecycle.stats().await))
    }

    async fn list_campaigns(
        &self,
        _payload: &SlashCommandPayload,
    ) -> Result<Reply, CommandRouteError> {
        Ok(messages::campaign_list(&self.lifecycle.list().await))
    }

    async fn bot_audit(
        &self,
        guild_id: &str,
        payload: &SlashCommandPayload,
    ) -> Result<Reply, CommandRouteError> {
        Ok(match self.platform.bot_member(guild_id).await {
            Ok(snapshot) => {
                let audit = PermissionAudit::evaluate(&snapshot);
                info!(
                    event_name = "command.bot_audit",
                    correlation_id = %payload.interaction_id,
                    guild_id,
                    missing = audit.missing.len(),
                    "bot permission audit"
                );
                messages::bot_audit(&audit)
            }
            Err(PlatformError::NotFound(_)) => Reply::ephemeral("Could not determine bot member."),
            Err(error) => {
                warn!(
                    event_name = "command.bot_audit.failed",
                    correlation_id = %payload.interaction_id,
                    guild_id,
                    error = %error,
                    "bot audit failed"
                );
                Reply::ephemeral("Error running bot audit.")
            }
        })
    }
}

#[async_trait]
impl ModalSubmitService for CampaignService {
    async fn create_campaign(
        &self,
        submission: CampaignSubmission,
        ctx: &EventContext,
    ) -> Result<Reply, EventHandlerError> {
        let options = self
            .drafts()
            .remove(&(submission.guild_id.clone(), submission.user_id.clone()))
            .unwrap_or_default();
        let customization = self.customization(&options, &submission.title);
        let request = CreateCampaignRequest {
            guild_id: submission.guild_id.clone(),
            channel_id: submission.channel_id,
            title: submission.title,
            description: submission.description,
            customization,
            channel_prefix: options.channel_prefix,
        };
        let context = AuditContext::new(submission.guild_id, &ctx.correlation_id, submission.user_id);

        match self.lifecycle.create(&context, request).await {
            Ok(campaign) => Ok(messages::campaign_created(&campaign)),
            Err(error @ ApplicationError::Domain(DomainError::InvalidInput(_))) => {
                Err(EventHandlerError::Service(error.into_interface(&ctx.correlation_id)))
            }
            Err(error) => {
                warn!(
                    event_name = "command.create.failed",
                    correlation_id = %ctx.correlation_id,
                    error = %error,
                    "creating campaign failed"
                );
                Ok(failure_reply(CREATE_FAILED, &ctx.correlation_id))
            }
        }
    }
}

#[async_trait]
impl JoinButtonService for CampaignService {
    async fn join_campaign(
        &self,
        click: JoinClick,
        ctx: &EventContext,
    ) -> Result<Reply, EventHandlerError> {
        let context = AuditContext::new(&click.guild_id, &ctx.correlation_id, &click.user_id);
        let request = JoinRequest {
            campaign_id: click.campaign_id,
            guild_id: click.guild_id,
            user_id: click.user_id,
            username: click.username,
        };

        Ok(match self.enrollment.enroll(&context, request).await {
            Ok(outcome) => messages::joined(&outcome),
            Err(ApplicationError::Domain(DomainError::AlreadyJoined { .. })) => {
                messages::already_joined()
            }
            Err(ApplicationError::Domain(
                DomainError::CampaignInactive(_) | DomainError::CampaignNotFound(_),
            )) => messages::campaign_inactive(),
            Err(error) => {
                warn!(
                    event_name = "command.join.failed",
                    correlation_id = %ctx.correlation_id,
                    error = %error,
                    "joining campaign failed"
                );
                messages::join_failed()
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use vireo_core::audit::InMemoryAuditSink;
    use vireo_core::config::AppConfig;
    use vireo_core::domain::campaign::{ButtonStyle, CampaignId};
    use vireo_core::permissions::{BotMemberSnapshot, BotPermission};
    use vireo_core::platform::{FailurePoint, InMemoryPlatform, PlatformError};
    use vireo_core::registry::CampaignRegistry;
    use vireo_core::store::InMemoryStore;

    use super::CampaignService;
    use crate::commands::{CampaignCommandService, CreateCampaignOptions, SlashCommandPayload};
    use crate::events::{
        CampaignSubmission, EventContext, EventHandlerError, JoinButtonService, JoinClick,
        ModalSubmitService,
    };
    use crate::messages;

    async fn service(platform: &InMemoryPlatform) -> (CampaignService, Arc<CampaignRegistry>) {
        let registry = Arc::new(CampaignRegistry::hydrate(Arc::new(InMemoryStore::new())).await);
        let service = CampaignService::new(
            registry.clone(),
            Arc::new(platform.clone()),
            Arc::new(InMemoryAuditSink::default()),
            AppConfig::default().branding,
        );
        (service, registry)
    }

    fn slash(command: &str) -> SlashCommandPayload {
        SlashCommandPayload {
            command: command.to_owned(),
            options: BTreeMap::new(),
            guild_id: Some("G1".to_owned()),
            channel_id: "C1".to_owned(),
            user_id: "U-admin".to_owned(),
            username: "admin".to_owned(),
            invoker_is_admin: true,
            interaction_id: "I-slash".to_owned(),
        }
    }

    fn submission(title: &str) -> CampaignSubmission {
        CampaignSubmission {
            guild_id: "G1".to_owned(),
            channel_id: "C1".to_owned(),
            user_id: "U-admin".to_owned(),
            title: title.to_owned(),
            description: "Rules:\nNo spam\nPayrate:\n$5 per 1000 views".to_owned(),
        }
    }

    fn click(campaign_id: &CampaignId, user_id: &str) -> JoinClick {
        JoinClick {
            campaign_id: campaign_id.clone(),
            guild_id: "G1".to_owned(),
            user_id: user_id.to_owned(),
            username: format!("{user_id}-name"),
        }
    }

    #[tokio::test]
    async fn modal_submit_applies_the_stashed_options() {
        let platform = InMemoryPlatform::new();
        let (service, registry) = service(&platform).await;

        service
            .open_create_modal(
                CreateCampaignOptions {
                    button_style: Some(ButtonStyle::Danger),
                    embed_color: Some("ff0000".to_owned()),
                    category_name: Some("Clippers".to_owned()),
                    ..CreateCampaignOptions::default()
                },
                &slash("create-campaign"),
            )
            .await
            .expect("open modal");
        assert!(service.pending_draft("G1", "U-admin").is_some());

        let reply = service
            .create_campaign(submission("Summer Promo"), &EventContext::for_interaction("I-modal"))
            .await
            .expect("create");
        assert!(reply.text().starts_with("✅ Campaign **Summer Promo** created."));
        assert!(service.pending_draft("G1", "U-admin").is_none(), "draft is consumed");

        let campaign = registry.all().await.remove(0);
        let customization = campaign.customization.expect("customization stored");
        assert_eq!(customization.button_style, ButtonStyle::Danger);
        assert_eq!(customization.embed_color, "ff0000");
        assert_eq!(customization.button_text, "Start Clipping");
        assert_eq!(platform.categories()[0].name, "Clippers");
    }

    #[tokio::test]
    async fn default_category_name_is_stored_resolved() {
        let platform = InMemoryPlatform::new();
        let (service, registry) = service(&platform).await;

        service
            .create_campaign(submission("Summer Promo"), &EventContext::for_interaction("I-modal"))
            .await
            .expect("create");

        let campaign = registry.all().await.remove(0);
        let customization = campaign.customization.expect("customization stored");
        assert_eq!(customization.category_name, "📊 Summer Promo");
        assert_eq!(platform.categories()[0].name, "📊 Summer Promo");
    }

    #[tokio::test]
    async fn empty_title_surfaces_as_bad_request() {
        let (service, _) = service(&InMemoryPlatform::new()).await;
        let error = service
            .create_campaign(submission("   "), &EventContext::for_interaction("I-bad"))
            .await
            .expect_err("empty title");
        assert!(matches!(error, EventHandlerError::Service(_)));
        assert!(error.reply().text().contains("I-bad"));
    }

    #[tokio::test]
    async fn publish_failure_points_admins_at_bot_audit() {
        let platform = InMemoryPlatform::new();
        platform.fail_at(FailurePoint::Publish, PlatformError::PermissionDenied("403".to_owned()));
        let (service, registry) = service(&platform).await;

        let reply = service
            .create_campaign(submission("Summer Promo"), &EventContext::default())
            .await
            .expect("reply");
        assert!(reply.text().contains("/bot-audit"));
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn join_replies_cover_success_duplicate_and_closed() {
        let (service, registry) = service(&InMemoryPlatform::new()).await;
        service
            .create_campaign(submission("Summer Promo"), &EventContext::default())
            .await
            .expect("create");
        let id = registry.all().await.remove(0).id;

        let first = service.join_campaign(click(&id, "U1"), &EventContext::default()).await;
        assert!(first.expect("join").text().starts_with("✅ Successfully joined **Summer Promo**!"));

        let again = service.join_campaign(click(&id, "U1"), &EventContext::default()).await;
        assert_eq!(again.expect("reply"), messages::already_joined());

        let closed = service.close_campaign(id.clone(), &slash("close-campaign")).await;
        assert_eq!(
            closed.expect("close").text(),
            "✅ Campaign \"Summer Promo\" has been closed. 1 total participants."
        );

        let late = service.join_campaign(click(&id, "U2"), &EventContext::default()).await;
        assert_eq!(late.expect("reply"), messages::campaign_inactive());

        let unknown = service
            .join_campaign(click(&CampaignId("nope".to_owned()), "U2"), &EventContext::default())
            .await;
        assert_eq!(unknown.expect("reply"), messages::campaign_inactive());
    }

    #[tokio::test]
    async fn join_failure_asks_member_to_contact_an_admin() {
        let platform = InMemoryPlatform::new();
        let (service, registry) = service(&platform).await;
        service
            .create_campaign(submission("Summer Promo"), &EventContext::default())
            .await
            .expect("create");
        let id = registry.all().await.remove(0).id;
        platform.fail_at(FailurePoint::GrantRole, PlatformError::PermissionDenied("403".to_owned()));

        let reply = service.join_campaign(click(&id, "U1"), &EventContext::default()).await;
        assert_eq!(reply.expect("reply"), messages::join_failed());
    }

    #[tokio::test]
    async fn close_of_unknown_or_closed_campaign() {
        let (service, registry) = service(&InMemoryPlatform::new()).await;
        let unknown = service
            .close_campaign(CampaignId("xyz".to_owned()), &slash("close-campaign"))
            .await
            .expect("reply");
        assert_eq!(unknown.text(), "❌ Campaign not found.");

        service
            .create_campaign(submission("Summer Promo"), &EventContext::default())
            .await
            .expect("create");
        let id = registry.all().await.remove(0).id;
        service.close_campaign(id.clone(), &slash("close-campaign")).await.expect("first close");
        let second =
            service.close_campaign(id, &slash("close-campaign")).await.expect("second close");
        assert!(second.text().contains("already in that state"));
    }

    #[tokio::test]
    async fn bot_audit_reports_missing_member_and_permissions() {
        let platform = InMemoryPlatform::new();
        let (service, _) = service(&platform).await;

        let unknown = service.bot_audit("G1", &slash("bot-audit")).await.expect("reply");
        assert_eq!(unknown.text(), "Could not determine bot member.");

        platform.set_bot_member(BotMemberSnapshot {
            guild_name: "Vireo HQ".to_owned(),
            highest_role_position: 4,
            permissions: vec![BotPermission::Administrator],
        });
        let audit = service.bot_audit("G1", &slash("bot-audit")).await.expect("reply");
        assert!(audit.text().contains("Missing permissions: None"));
    }

    #[tokio::test]
    async fn stats_and_list_render_from_the_registry() {
        let (service, _) = service(&InMemoryPlatform::new()).await;
        let empty = service.campaign_stats(&slash("campaign-stats")).await.expect("stats");
        assert_eq!(empty.text(), "📊 No active campaigns found.");

        service
            .create_campaign(submission("Summer Promo"), &EventContext::default())
            .await
            .expect("create");
        let list = service.list_campaigns(&slash("list-campaigns")).await.expect("list");
        assert!(list.text().contains("**Summer Promo**"));
        let stats = service.campaign_stats(&slash("campaign-stats")).await.expect("stats");
        assert_eq!(stats.embeds[0].fields[0].name, "🎯 Summer Promo");
    }
}
