use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BotPermission {
    Administrator,
    ManageRoles,
    ManageChannels,
    SendMessages,
    EmbedLinks,
    ReadMessageHistory,
    ViewChannel,
}

impl BotPermission {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Administrator => "Administrator",
            Self::ManageRoles => "ManageRoles",
            Self::ManageChannels => "ManageChannels",
            Self::SendMessages => "SendMessages",
            Self::EmbedLinks => "EmbedLinks",
            Self::ReadMessageHistory => "ReadMessageHistory",
            Self::ViewChannel => "ViewChannel",
        }
    }
}

/// Permissions the bot needs to publish campaigns and enroll members.
pub const REQUIRED_PERMISSIONS: [BotPermission; 6] = [
    BotPermission::ManageRoles,
    BotPermission::ManageChannels,
    BotPermission::SendMessages,
    BotPermission::EmbedLinks,
    BotPermission::ReadMessageHistory,
    BotPermission::ViewChannel,
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BotMemberSnapshot {
    pub guild_name: String,
    pub highest_role_position: u16,
    pub permissions: Vec<BotPermission>,
}

impl BotMemberSnapshot {
    pub fn has(&self, permission: BotPermission) -> bool {
        self.permissions.contains(&BotPermission::Administrator)
            || self.permissions.contains(&permission)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PermissionAudit {
    pub guild_name: String,
    pub highest_role_position: u16,
    pub granted: Vec<BotPermission>,
    pub missing: Vec<BotPermission>,
}

impl PermissionAudit {
    pub fn evaluate(snapshot: &BotMemberSnapshot) -> Self {
        let (granted, missing) =
            REQUIRED_PERMISSIONS.iter().partition::<Vec<BotPermission>, _>(|permission| {
                snapshot.has(**permission)
            });

        Self {
            guild_name: snapshot.guild_name.clone(),
            highest_role_position: snapshot.highest_role_position,
            granted,
            missing,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}
