//! Gateway connection: turns serenity interactions into [`DiscordEnvelope`]s,
//! dispatches them and writes the answer back.
//!
//! Everything except `/create-campaign` is deferred as ephemeral before the
//! dispatcher runs, because role and channel provisioning can outlast the
//! three second interaction deadline. `/create-campaign` must answer with a
//! modal, which cannot follow a deferral.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use serenity::all::{
    ActionRowComponent, Client, CommandInteraction, ComponentInteraction, Context,
    CreateInteractionResponse, EditInteractionResponse, EventHandler, GatewayIntents, Interaction,
    Member, ModalInteraction, Permissions, Ready,
};
use tracing::{error, info, warn};

use crate::commands::{SlashCommandPayload, CREATE_CAMPAIGN};
use crate::events::{
    ButtonClickEvent, DiscordEnvelope, DiscordEvent, EventContext, EventDispatcher,
    HandlerResult, ModalSubmitEvent,
};
use crate::messages::Reply;
use crate::registration::{self, CommandScope};
use crate::render;

pub struct CampaignGateway {
    dispatcher: Arc<EventDispatcher>,
    scope: CommandScope,
}

impl CampaignGateway {
    pub fn new(dispatcher: EventDispatcher, scope: CommandScope) -> Self {
        Self { dispatcher: Arc::new(dispatcher), scope }
    }

    async fn process(&self, ctx: &Context, pending: PendingInteraction, envelope: DiscordEnvelope) {
        let event_ctx = EventContext::for_interaction(&envelope.interaction_id);
        let deferred = needs_deferral(&envelope.event);
        if deferred {
            if let Err(error) = pending.defer(ctx).await {
                warn!(
                    event_name = "interaction.defer.failed",
                    correlation_id = %event_ctx.correlation_id,
                    error = %error,
                    "could not acknowledge interaction"
                );
                return;
            }
        }

        let outcome = match self.dispatcher.dispatch(&envelope, &event_ctx).await {
            Ok(HandlerResult::Responded(reply)) => pending.reply(ctx, deferred, &reply).await,
            Ok(HandlerResult::ShowModal(modal)) => {
                pending.create(ctx, CreateInteractionResponse::Modal(render::modal(&modal))).await
            }
            Ok(HandlerResult::Ignored) if deferred => {
                pending.reply(ctx, deferred, &Reply::ephemeral("Nothing to do here.")).await
            }
            Ok(HandlerResult::Ignored) => Ok(()),
            Err(dispatch_error) => {
                warn!(
                    event_name = "interaction.failed",
                    correlation_id = %event_ctx.correlation_id,
                    error = %dispatch_error,
                    "interaction handler failed"
                );
                pending.reply(ctx, deferred, &dispatch_error.reply()).await
            }
        };

        if let Err(error) = outcome {
            warn!(
                event_name = "interaction.respond.failed",
                correlation_id = %event_ctx.correlation_id,
                error = %error,
                "could not respond to interaction"
            );
        }
    }
}

fn needs_deferral(event: &DiscordEvent) -> bool {
    !matches!(event, DiscordEvent::SlashCommand(payload) if payload.command == CREATE_CAMPAIGN)
}

fn is_admin(member: Option<&Member>) -> bool {
    member
        .and_then(|member| member.permissions)
        .is_some_and(|permissions| permissions.contains(Permissions::ADMINISTRATOR))
}

enum PendingInteraction {
    Command(CommandInteraction),
    Component(ComponentInteraction),
    Modal(ModalInteraction),
}

impl PendingInteraction {
    async fn defer(&self, ctx: &Context) -> serenity::Result<()> {
        match self {
            Self::Command(interaction) => interaction.defer_ephemeral(ctx).await,
            Self::Component(interaction) => interaction.defer_ephemeral(ctx).await,
            Self::Modal(interaction) => interaction.defer_ephemeral(ctx).await,
        }
    }

    async fn create(
        &self,
        ctx: &Context,
        response: CreateInteractionResponse,
    ) -> serenity::Result<()> {
        match self {
            Self::Command(interaction) => interaction.create_response(ctx, response).await,
            Self::Component(interaction) => interaction.create_response(ctx, response).await,
            Self::Modal(interaction) => interaction.create_response(ctx, response).await,
        }
    }

    async fn edit(&self, ctx: &Context, edit: EditInteractionResponse) -> serenity::Result<()> {
        match self {
            Self::Command(interaction) => interaction.edit_response(ctx, edit).await.map(|_| ()),
            Self::Component(interaction) => interaction.edit_response(ctx, edit).await.map(|_| ()),
            Self::Modal(interaction) => interaction.edit_response(ctx, edit).await.map(|_| ()),
        }
    }

    async fn reply(&self, ctx: &Context, deferred: bool, reply: &Reply) -> serenity::Result<()> {
        if deferred {
            self.edit(ctx, render::edit_response(reply)).await
        } else {
            self.create(ctx, CreateInteractionResponse::Message(render::response_message(reply)))
                .await
        }
    }
}

fn slash_command(interaction: &CommandInteraction) -> DiscordEnvelope {
    let options = interaction
        .data
        .options
        .iter()
        .filter_map(|option| {
            option.value.as_str().map(|value| (option.name.clone(), value.to_owned()))
        })
        .collect();

    DiscordEnvelope {
        interaction_id: interaction.id.to_string(),
        event: DiscordEvent::SlashCommand(SlashCommandPayload {
            command: interaction.data.name.clone(),
            options,
            guild_id: interaction.guild_id.map(|id| id.to_string()),
            channel_id: interaction.channel_id.to_string(),
            user_id: interaction.user.id.to_string(),
            username: interaction.user.name.clone(),
            invoker_is_admin: is_admin(interaction.member.as_deref()),
            interaction_id: interaction.id.to_string(),
        }),
    }
}

fn button_click(interaction: &ComponentInteraction) -> DiscordEnvelope {
    DiscordEnvelope {
        interaction_id: interaction.id.to_string(),
        event: DiscordEvent::ButtonClick(ButtonClickEvent {
            custom_id: interaction.data.custom_id.clone(),
            guild_id: interaction.guild_id.map(|id| id.to_string()),
            channel_id: interaction.channel_id.to_string(),
            user_id: interaction.user.id.to_string(),
            username: interaction.user.name.clone(),
        }),
    }
}

fn modal_submit(interaction: &ModalInteraction) -> DiscordEnvelope {
    let mut fields = BTreeMap::new();
    for component in interaction.data.components.iter().flat_map(|row| row.components.iter()) {
        if let ActionRowComponent::InputText(input) = component {
            if let Some(value) = &input.value {
                fields.insert(input.custom_id.clone(), value.clone());
            }
        }
    }

    DiscordEnvelope {
        interaction_id: interaction.id.to_string(),
        event: DiscordEvent::ModalSubmit(ModalSubmitEvent {
            custom_id: interaction.data.custom_id.clone(),
            fields,
            guild_id: interaction.guild_id.map(|id| id.to_string()),
            channel_id: interaction.channel_id.to_string(),
            user_id: interaction.user.id.to_string(),
            username: interaction.user.name.clone(),
            invoker_is_admin: is_admin(interaction.member.as_ref()),
        }),
    }
}

#[async_trait]
impl EventHandler for CampaignGateway {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!(
            event_name = "gateway.ready",
            bot = %ready.user.name,
            guilds = ready.guilds.len(),
            "connected to Discord"
        );
        if let Err(error) = registration::register_commands(&ctx.http, self.scope).await {
            error!(
                event_name = "gateway.commands.failed",
                error = ?error,
                "command registration failed"
            );
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        let (pending, envelope) = match interaction {
            Interaction::Command(command) => {
                let envelope = slash_command(&command);
                (PendingInteraction::Command(command), envelope)
            }
            Interaction::Component(component) => {
                let envelope = button_click(&component);
                (PendingInteraction::Component(component), envelope)
            }
            Interaction::Modal(modal) => {
                let envelope = modal_submit(&modal);
                (PendingInteraction::Modal(modal), envelope)
            }
            _ => return,
        };
        self.process(&ctx, pending, envelope).await;
    }
}

/// Connects to the gateway and runs until Ctrl-C or a fatal gateway error.
pub async fn run(token: &str, dispatcher: EventDispatcher, scope: CommandScope) -> Result<()> {
    let mut client = Client::builder(token, GatewayIntents::GUILDS)
        .event_handler(CampaignGateway::new(dispatcher, scope))
        .await
        .context("failed to build Discord client")?;

    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!(event_name = "gateway.shutdown", "shutdown signal received");
            shard_manager.shutdown_all().await;
        }
    });

    client.start().await.context("Discord gateway connection failed")
}
