use thiserror::Error;

use crate::{domain::campaign::CampaignId, platform::PlatformError};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("campaign `{0}` was not found")]
    CampaignNotFound(CampaignId),
    #[error("campaign `{0}` is no longer active")]
    CampaignInactive(CampaignId),
    #[error("campaign `{0}` is already closed")]
    AlreadyClosed(CampaignId),
    #[error("user `{user_id}` already joined campaign `{campaign_id}`")]
    AlreadyJoined { campaign_id: CampaignId, user_id: String },
    #[error("invalid campaign input: {0}")]
    InvalidInput(String),
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

impl DomainError {
    /// True for the duplicate/terminal-state signals that leave state untouched.
    pub fn is_already_in_state(&self) -> bool {
        matches!(
            self,
            Self::CampaignInactive(_) | Self::AlreadyClosed(_) | Self::AlreadyJoined { .. }
        )
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("platform permission denied: {0}")]
    PermissionDenied(String),
    #[error("integration failure: {0}")]
    Integration(String),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

impl From<PlatformError> for ApplicationError {
    fn from(value: PlatformError) -> Self {
        match value {
            PlatformError::PermissionDenied(message) => Self::PermissionDenied(message),
            PlatformError::NotFound(message) | PlatformError::Transient(message) => {
                Self::Integration(message)
            }
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("not found: {message}")]
    NotFound { message: String, correlation_id: String },
    #[error("conflict: {message}")]
    Conflict { message: String, correlation_id: String },
    #[error("forbidden: {message}")]
    Forbidden { message: String, correlation_id: String },
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "❌ Campaign not found.",
            Self::Conflict { .. } => "ℹ️ Nothing to do, the campaign is already in that state.",
            Self::Forbidden { .. } => {
                "⚠️ I'm missing a permission for that. Run /bot-audit for details."
            }
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::ServiceUnavailable { .. } => {
                "❌ Something went wrong talking to Discord. Please contact an administrator."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::NotFound { correlation_id, .. }
            | Self::Conflict { correlation_id, .. }
            | Self::Forbidden { correlation_id, .. }
            | Self::BadRequest { correlation_id, .. }
            | Self::ServiceUnavailable { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::NotFound { correlation_id: id, .. }
            | InterfaceError::Conflict { correlation_id: id, .. }
            | InterfaceError::Forbidden { correlation_id: id, .. }
            | InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        let correlation_id = "unassigned".to_owned();
        match value {
            ApplicationError::Domain(DomainError::CampaignNotFound(id)) => {
                Self::NotFound { message: format!("campaign `{id}` was not found"), correlation_id }
            }
            ApplicationError::Domain(
                error @ (DomainError::CampaignInactive(_)
                | DomainError::AlreadyClosed(_)
                | DomainError::AlreadyJoined { .. }),
            ) => Self::Conflict { message: error.to_string(), correlation_id },
            ApplicationError::Domain(
                error @ (DomainError::InvalidInput(_) | DomainError::InvariantViolation(_)),
            ) => Self::BadRequest { message: error.to_string(), correlation_id },
            ApplicationError::PermissionDenied(message) => {
                Self::Forbidden { message, correlation_id }
            }
            ApplicationError::Persistence(message) | ApplicationError::Integration(message) => {
                Self::ServiceUnavailable { message, correlation_id }
            }
            ApplicationError::Configuration(message) => Self::Internal { message, correlation_id },
        }
    }
}
