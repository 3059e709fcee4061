use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;
use vireo_core::domain::campaign::CampaignId;
use vireo_core::errors::InterfaceError;

use crate::{
    commands::{
        CampaignCommandService, CommandResponse, CommandRouteError, CommandRouter,
        SlashCommandPayload,
    },
    messages::{
        self, ModalTemplate, Reply, CREATE_CAMPAIGN_MODAL_ID, DESCRIPTION_INPUT_ID,
        TITLE_INPUT_ID,
    },
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiscordEnvelope {
    pub interaction_id: String,
    pub event: DiscordEvent,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DiscordEvent {
    SlashCommand(SlashCommandPayload),
    ModalSubmit(ModalSubmitEvent),
    ButtonClick(ButtonClickEvent),
    Unsupported { kind: String },
}

impl DiscordEvent {
    pub fn event_type(&self) -> DiscordEventType {
        match self {
            Self::SlashCommand(_) => DiscordEventType::SlashCommand,
            Self::ModalSubmit(_) => DiscordEventType::ModalSubmit,
            Self::ButtonClick(_) => DiscordEventType::ButtonClick,
            Self::Unsupported { .. } => DiscordEventType::Unsupported,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum DiscordEventType {
    SlashCommand,
    ModalSubmit,
    ButtonClick,
    Unsupported,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModalSubmitEvent {
    pub custom_id: String,
    pub fields: BTreeMap<String, String>,
    pub guild_id: Option<String>,
    pub channel_id: String,
    pub user_id: String,
    pub username: String,
    pub invoker_is_admin: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ButtonClickEvent {
    pub custom_id: String,
    pub guild_id: Option<String>,
    pub channel_id: String,
    pub user_id: String,
    pub username: String,
}

/// Title and description typed into the create-campaign modal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CampaignSubmission {
    pub guild_id: String,
    pub channel_id: String,
    pub user_id: String,
    pub title: String,
    pub description: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JoinClick {
    pub campaign_id: CampaignId,
    pub guild_id: String,
    pub user_id: String,
    pub username: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventContext {
    pub correlation_id: String,
}

impl Default for EventContext {
    fn default() -> Self {
        Self { correlation_id: "unknown-correlation-id".to_owned() }
    }
}

impl EventContext {
    pub fn for_interaction(interaction_id: impl Into<String>) -> Self {
        Self { correlation_id: interaction_id.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandlerResult {
    Responded(Reply),
    ShowModal(ModalTemplate),
    Ignored,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventHandlerError {
    #[error(transparent)]
    Route(#[from] CommandRouteError),
    #[error("campaign service failed: {0}")]
    Service(InterfaceError),
}

impl EventHandlerError {
    pub fn reply(&self) -> Reply {
        match self {
            Self::Route(error) => error.reply(),
            Self::Service(error) => messages::error_reply(error),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error(transparent)]
    Handler(#[from] EventHandlerError),
}

impl DispatchError {
    pub fn reply(&self) -> Reply {
        match self {
            Self::Handler(error) => error.reply(),
        }
    }
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    fn event_type(&self) -> DiscordEventType;
    async fn handle(
        &self,
        envelope: &DiscordEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError>;
}

#[derive(Default)]
pub struct EventDispatcher {
    handlers: HashMap<DiscordEventType, Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<H>(&mut self, handler: H)
    where
        H: EventHandler + 'static,
    {
        self.handlers.insert(handler.event_type(), Arc::new(handler));
    }

    pub async fn dispatch(
        &self,
        envelope: &DiscordEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, DispatchError> {
        let Some(handler) = self.handlers.get(&envelope.event.event_type()) else {
            debug!(
                event_name = "interaction.ignored",
                correlation_id = %ctx.correlation_id,
                event_type = ?envelope.event.event_type(),
                "no handler registered for interaction"
            );
            return Ok(HandlerResult::Ignored);
        };

        handler.handle(envelope, ctx).await.map_err(DispatchError::from)
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

/// Wires one service into every interaction the bot answers.
pub fn campaign_dispatcher<S>(service: Arc<S>) -> EventDispatcher
where
    S: CampaignCommandService + ModalSubmitService + JoinButtonService + 'static,
{
    let mut dispatcher = EventDispatcher::new();
    dispatcher.register(SlashCommandHandler::new(service.clone()));
    dispatcher.register(ModalSubmitHandler::new(service.clone()));
    dispatcher.register(ButtonClickHandler::new(service));
    dispatcher
}

pub struct SlashCommandHandler<S> {
    router: CommandRouter<S>,
}

impl<S> SlashCommandHandler<S>
where
    S: CampaignCommandService,
{
    pub fn new(service: S) -> Self {
        Self { router: CommandRouter::new(service) }
    }
}

#[async_trait]
impl<S> EventHandler for SlashCommandHandler<S>
where
    S: CampaignCommandService + 'static,
{
    fn event_type(&self) -> DiscordEventType {
        DiscordEventType::SlashCommand
    }

    async fn handle(
        &self,
        envelope: &DiscordEnvelope,
        _ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let DiscordEvent::SlashCommand(payload) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };

        Ok(match self.router.route(payload).await? {
            CommandResponse::Reply(reply) => HandlerResult::Responded(reply),
            CommandResponse::Modal(modal) => HandlerResult::ShowModal(modal),
        })
    }
}

#[async_trait]
pub trait ModalSubmitService: Send + Sync {
    async fn create_campaign(
        &self,
        submission: CampaignSubmission,
        ctx: &EventContext,
    ) -> Result<Reply, EventHandlerError>;
}

#[async_trait]
impl<S> ModalSubmitService for Arc<S>
where
    S: ModalSubmitService + ?Sized,
{
    async fn create_campaign(
        &self,
        submission: CampaignSubmission,
        ctx: &EventContext,
    ) -> Result<Reply, EventHandlerError> {
        (**self).create_campaign(submission, ctx).await
    }
}

pub struct ModalSubmitHandler<S> {
    service: S,
}

impl<S> ModalSubmitHandler<S>
where
    S: ModalSubmitService,
{
    pub fn new(service: S) -> Self {
        Self { service }
    }
}

#[async_trait]
impl<S> EventHandler for ModalSubmitHandler<S>
where
    S: ModalSubmitService + 'static,
{
    fn event_type(&self) -> DiscordEventType {
        DiscordEventType::ModalSubmit
    }

    async fn handle(
        &self,
        envelope: &DiscordEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let DiscordEvent::ModalSubmit(event) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };
        if event.custom_id != CREATE_CAMPAIGN_MODAL_ID {
            return Ok(HandlerResult::Ignored);
        }
        if !event.invoker_is_admin {
            return Ok(HandlerResult::Responded(messages::admin_required()));
        }
        let guild_id = event.guild_id.clone().ok_or(CommandRouteError::GuildRequired)?;

        let field = |id: &str| event.fields.get(id).cloned().unwrap_or_default();
        let submission = CampaignSubmission {
            guild_id,
            channel_id: event.channel_id.clone(),
            user_id: event.user_id.clone(),
            title: field(TITLE_INPUT_ID),
            description: field(DESCRIPTION_INPUT_ID),
        };

        let reply = self.service.create_campaign(submission, ctx).await?;
        Ok(HandlerResult::Responded(reply))
    }
}

#[async_trait]
pub trait JoinButtonService: Send + Sync {
    async fn join_campaign(
        &self,
        click: JoinClick,
        ctx: &EventContext,
    ) -> Result<Reply, EventHandlerError>;
}

#[async_trait]
impl<S> JoinButtonService for Arc<S>
where
    S: JoinButtonService + ?Sized,
{
    async fn join_campaign(
        &self,
        click: JoinClick,
        ctx: &EventContext,
    ) -> Result<Reply, EventHandlerError> {
        (**self).join_campaign(click, ctx).await
    }
}

pub struct ButtonClickHandler<S> {
    service: S,
}

impl<S> ButtonClickHandler<S>
where
    S: JoinButtonService,
{
    pub fn new(service: S) -> Self {
        Self { service }
    }
}

#[async_trait]
impl<S> EventHandler for ButtonClickHandler<S>
where
    S: JoinButtonService + 'static,
{
    fn event_type(&self) -> DiscordEventType {
        DiscordEventType::ButtonClick
    }

    async fn handle(
        &self,
        envelope: &DiscordEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let DiscordEvent::ButtonClick(event) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };
        let Some(campaign_id) = CampaignId::from_join_button(&event.custom_id) else {
            return Ok(HandlerResult::Ignored);
        };
        let guild_id = event.guild_id.clone().ok_or(CommandRouteError::GuildRequired)?;

        let reply = self
            .service
            .join_campaign(
                JoinClick {
                    campaign_id,
                    guild_id,
                    user_id: event.user_id.clone(),
                    username: event.username.clone(),
                },
                ctx,
            )
            .await?;
        Ok(HandlerResult::Responded(reply))
    }
}
