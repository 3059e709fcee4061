//! Discord Integration - gateway bot interface
//!
//! This crate provides the Discord interface for vireo:
//! - **Gateway** (`gateway`) - serenity client, interaction intake and responses
//! - **Slash Commands** (`commands`) - `/create-campaign`, `/close-campaign`, `/list-campaigns`, ...
//! - **Events** (`events`) - join button clicks and the create-campaign modal
//! - **Messages** (`messages`) - announcement, stats and audit templates
//! - **Platform** (`platform`) - REST-backed roles, categories and announcements
//!
//! # Getting Started
//!
//! 1. Create an application at https://discord.com/developers/applications
//! 2. Invite the bot with Manage Roles, Manage Channels, Send Messages and Embed Links
//! 3. Set `VIREO_DISCORD_BOT_TOKEN` (and `VIREO_DISCORD_GUILD_ID` for instant command updates)
//!
//! # Architecture
//!
//! ```text
//! Discord Gateway → EventDispatcher → Handlers → CampaignService → Lifecycle / Enrollment
//!                        ↓
//!              Embeds & Modals ← Reply
//! ```
//!
//! # Key Types
//!
//! - `CampaignGateway` - serenity event handler that defers, dispatches and answers
//! - `EventDispatcher` - Routes interactions to handlers
//! - `CampaignService` - Implements every interaction over the core services
//! - `SerenityPlatform` - `CampaignPlatform` backed by the Discord REST API

pub mod commands;
pub mod events;
pub mod gateway;
pub mod messages;
pub mod platform;
pub mod registration;
pub mod render;
pub mod service;
