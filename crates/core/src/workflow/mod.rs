//! Document-level orchestration on top of the chain builder and state machine.

pub mod engine;
pub mod hooks;
pub mod kinds;

pub use engine::{
    DecisionOutcome, DecisionRequest, Initiation, RejectionRecord, Resubmission,
    WorkflowOrchestrator,
};
pub use hooks::{
    average_grade, CompletionHook, CompletionReport, InMemoryCompletionHook, NoopCompletionHook,
};
pub use kinds::{DocumentStatus, NotificationReason, NotificationTarget, WorkflowKind};
