use std::collections::HashSet;
use std::sync::Arc;

use tempfile::TempDir;
use vireo_core::audit::{AuditContext, InMemoryAuditSink};
use vireo_core::domain::campaign::{ButtonStyle, CampaignId, Customization};
use vireo_core::enrollment::{EnrollmentService, JoinRequest};
use vireo_core::errors::{ApplicationError, DomainError};
use vireo_core::lifecycle::{CampaignLifecycle, CreateCampaignRequest};
use vireo_core::platform::InMemoryPlatform;
use vireo_core::registry::CampaignRegistry;
use vireo_core::store::{CampaignStore, JsonFileStore};

const GUILD: &str = "G1";

struct Bot {
    lifecycle: CampaignLifecycle,
    enrollment: EnrollmentService,
    registry: Arc<CampaignRegistry>,
    platform: InMemoryPlatform,
    store: Arc<JsonFileStore>,
    audit: InMemoryAuditSink,
}

async fn boot(dir: &TempDir, platform: InMemoryPlatform) -> Bot {
    let store = Arc::new(JsonFileStore::new(dir.path().join("campaigns.json")));
    let registry = Arc::new(CampaignRegistry::hydrate(store.clone()).await);
    let audit = InMemoryAuditSink::default();
    let lifecycle =
        CampaignLifecycle::new(registry.clone(), Arc::new(platform.clone()), Arc::new(audit.clone()));
    let enrollment =
        EnrollmentService::new(registry.clone(), Arc::new(platform.clone()), Arc::new(audit.clone()));
    Bot { lifecycle, enrollment, registry, platform, store, audit }
}

fn admin() -> AuditContext {
    AuditContext::new(GUILD, "interaction-admin", "admin")
}

fn member(user_id: &str) -> AuditContext {
    AuditContext::new(GUILD, format!("interaction-{user_id}"), user_id)
}

fn summer_promo() -> CreateCampaignRequest {
    CreateCampaignRequest {
        guild_id: GUILD.to_owned(),
        channel_id: "C-announcements".to_owned(),
        title: "Summer Promo".to_owned(),
        description: "Rules:\nNo spam\nPayrate:\n$5 per 1000 views".to_owned(),
        customization: Customization {
            button_text: "Start Clipping".to_owned(),
            button_emoji: "🎬".to_owned(),
            button_style: ButtonStyle::Success,
            embed_color: "4CAF50".to_owned(),
            embed_title: "🎯 Vireo Opportunities".to_owned(),
            footer_text: "Powered by Vireo".to_owned(),
            category_name: String::new(),
            logo_url: None,
        },
        channel_prefix: None,
    }
}

fn join(campaign_id: &CampaignId, user_id: &str) -> JoinRequest {
    JoinRequest {
        campaign_id: campaign_id.clone(),
        guild_id: GUILD.to_owned(),
        user_id: user_id.to_owned(),
        username: format!("{user_id}-name"),
    }
}

#[tokio::test]
async fn summer_promo_end_to_end() {
    let dir = TempDir::new().expect("tempdir");
    let platform = InMemoryPlatform::new();
    platform.add_text_channel(GUILD, "mod-logs");
    let bot = boot(&dir, platform).await;

    let created = bot.lifecycle.create(&admin(), summer_promo()).await.expect("create");
    assert_eq!(created.rules_section.as_deref(), Some("• No spam"));
    assert_eq!(created.payrate_section.as_deref(), Some("• $5 per 1000 views"));
    assert_eq!(bot.platform.categories()[0].name, "📊 Summer Promo");

    let first = bot.enrollment.enroll(&member("U1"), join(&created.id, "U1")).await.expect("U1");
    assert_eq!(first.total_participants(), 1);
    let second = bot.enrollment.enroll(&member("U2"), join(&created.id, "U2")).await.expect("U2");
    assert_eq!(second.total_participants(), 2);
    assert_eq!(first.role_id, second.role_id, "both members share the campaign role");

    let duplicate = bot
        .enrollment
        .enroll(&member("U1"), join(&created.id, "U1"))
        .await
        .expect_err("U1 again");
    assert!(matches!(duplicate, ApplicationError::Domain(DomainError::AlreadyJoined { .. })));

    let closed = bot.lifecycle.close(&admin(), &created.id).await.expect("close");
    assert_eq!(closed.participant_count(), 2);
    assert!(bot.platform.messages()[0].closed);

    let late = bot
        .enrollment
        .enroll(&member("U3"), join(&created.id, "U3"))
        .await
        .expect_err("closed campaign");
    assert!(matches!(late, ApplicationError::Domain(DomainError::CampaignInactive(_))));

    assert_eq!(bot.platform.join_logs().len(), 2);
    assert_eq!(
        bot.audit.event_types(),
        vec![
            "campaign.created",
            "campaign.joined",
            "campaign.joined",
            "campaign.joined",
            "campaign.closed",
            "campaign.joined",
        ]
    );

    // Everything above survived to disk.
    let reloaded = bot.store.load().await;
    let record = &reloaded[&created.id];
    assert!(!record.active);
    assert_eq!(record.participants.len(), 2);
    assert_eq!(record.participants[0].user_id, "U1");
    assert_eq!(record.participants[1].user_id, "U2");
}

#[tokio::test]
async fn state_survives_restart() {
    let dir = TempDir::new().expect("tempdir");
    let id = {
        let bot = boot(&dir, InMemoryPlatform::new()).await;
        let created = bot.lifecycle.create(&admin(), summer_promo()).await.expect("create");
        bot.enrollment.enroll(&member("U1"), join(&created.id, "U1")).await.expect("join");
        created.id
    };

    let restarted = boot(&dir, InMemoryPlatform::new()).await;
    let record = restarted.registry.get(&id).await.expect("hydrated campaign");
    assert!(record.active);
    assert!(record.has_participant("U1"));

    let error = restarted
        .enrollment
        .enroll(&member("U1"), join(&id, "U1"))
        .await
        .expect_err("still joined after restart");
    assert!(matches!(error, ApplicationError::Domain(DomainError::AlreadyJoined { .. })));
}

#[tokio::test]
async fn closing_unknown_campaign_leaves_registry_unchanged() {
    let dir = TempDir::new().expect("tempdir");
    let bot = boot(&dir, InMemoryPlatform::new()).await;
    bot.lifecycle.create(&admin(), summer_promo()).await.expect("create");
    let before = bot.registry.snapshot().await;
    let on_disk = std::fs::read_to_string(bot.store.path()).expect("read store");

    let error = bot
        .lifecycle
        .close(&admin(), &CampaignId("xyz".to_owned()))
        .await
        .expect_err("unknown id");

    assert!(matches!(error, ApplicationError::Domain(DomainError::CampaignNotFound(_))));
    assert_eq!(bot.registry.snapshot().await, before);
    assert_eq!(std::fs::read_to_string(bot.store.path()).expect("reread store"), on_disk);
}

#[tokio::test]
async fn rapid_creations_get_distinct_ids() {
    let dir = TempDir::new().expect("tempdir");
    let bot = boot(&dir, InMemoryPlatform::new()).await;

    let mut ids = HashSet::new();
    for index in 0..10 {
        let mut request = summer_promo();
        request.title = format!("Promo {index}");
        let created = bot.lifecycle.create(&admin(), request).await.expect("create");
        assert!(created.active);
        assert!(created.participants.is_empty());
        assert!(ids.insert(created.id));
    }
    assert_eq!(bot.registry.len().await, 10);
}

#[tokio::test]
async fn concurrent_joins_from_many_members_are_all_recorded() {
    let dir = TempDir::new().expect("tempdir");
    let bot = Arc::new(boot(&dir, InMemoryPlatform::new()).await);
    let created = bot.lifecycle.create(&admin(), summer_promo()).await.expect("create");

    let mut handles = Vec::new();
    for index in 0..16 {
        let bot = bot.clone();
        let id = created.id.clone();
        handles.push(tokio::spawn(async move {
            let user_id = format!("U{index}");
            bot.enrollment.enroll(&member(&user_id), join(&id, &user_id)).await
        }));
    }
    for handle in handles {
        handle.await.expect("task").expect("join");
    }

    let record = bot.registry.get(&created.id).await.expect("campaign");
    assert_eq!(record.participant_count(), 16);
    let reloaded = bot.store.load().await;
    assert_eq!(reloaded[&created.id].participants.len(), 16);
}
