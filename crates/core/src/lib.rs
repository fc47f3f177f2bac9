pub mod approvals;
pub mod audit;
pub mod config;
pub mod directory;
pub mod domain;
pub mod errors;
pub mod workflow;

pub use approvals::{
    apply, apply_at, can_act, chain_state, is_complete, is_rejected, next_actionable, summary,
    BuildOutcome, ChainBuilder, ChainPlan, ChainState, ChainSummary, InvalidTransitionReason,
    Subject, TransitionError,
};
pub use audit::{
    AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink, InMemoryAuditSink,
};
pub use config::{AppConfig, LoadOptions, WorkflowConfig};
pub use directory::{
    AccountLookup, DataQualityFinding, Directory, DirectoryError, DirectoryHandle,
    InMemoryAccountLookup, OrgChart, Role,
};
pub use domain::approval::{
    ApprovalChain, ApprovalStep, Approver, Decision, DocumentId, StepPayload, StepStatus,
};
pub use domain::person::Person;
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use workflow::{
    CompletionHook, DecisionOutcome, DecisionRequest, DocumentStatus, Initiation,
    NotificationReason, NotificationTarget, WorkflowKind, WorkflowOrchestrator,
};
