//! Approval chain construction and the per-step state machine.

pub mod builder;
pub mod state;

pub use builder::{BuildOutcome, ChainBuilder, ChainPlan, Subject};
pub use state::{
    apply, apply_at, can_act, chain_state, is_complete, is_rejected, next_actionable, summary,
    ChainState, ChainSummary, InvalidTransitionReason, TransitionError,
};
