pub mod audit;
pub mod config;
pub mod domain;
pub mod enrollment;
pub mod errors;
pub mod lifecycle;
pub mod parser;
pub mod permissions;
pub mod platform;
pub mod registry;
pub mod store;

pub use audit::{AuditContext, AuditEvent, AuditSink, InMemoryAuditSink, TracingAuditSink};
pub use domain::campaign::{
    ButtonStyle, CampaignId, CampaignRecord, Customization, ParticipantRecord,
};
pub use enrollment::{EnrollmentOutcome, EnrollmentService, JoinRequest};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use lifecycle::{CampaignLifecycle, CampaignSummary, CreateCampaignRequest};
pub use parser::{parse_description, ParsedDescription};
pub use permissions::{BotMemberSnapshot, BotPermission, PermissionAudit};
pub use platform::{CampaignPlatform, InMemoryPlatform, PlatformError};
pub use registry::CampaignRegistry;
pub use store::{CampaignStore, InMemoryStore, JsonFileStore};
