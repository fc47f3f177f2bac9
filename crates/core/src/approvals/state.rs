//! Per-step transitions and read models over an [`ApprovalChain`].
//!
//! Everything here is a pure function of the chain value passed in. Callers
//! serialize concurrent decisions on the same document themselves; [`apply`]
//! has no compare-and-swap semantics.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::approval::{ApprovalChain, ApprovalStep, Decision, StepPayload, StepStatus};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainState {
    InProgress,
    Complete,
    Rejected,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum InvalidTransitionReason {
    NotPending { status: StepStatus },
    NotCurrentLevel { current_level: Option<u32> },
    ChainRejected { rejected_level: u32 },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("approval level {level} does not exist in this chain")]
    LevelNotFound { level: u32 },
    #[error("approval level {level} cannot be decided now: {reason:?}")]
    InvalidTransition { level: u32, reason: InvalidTransitionReason },
    #[error("only a rejected chain can be resubmitted (chain is {state:?})")]
    NotResubmittable { state: ChainState },
}

/// Read-only projection for presentation and notification copy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainSummary {
    pub total: usize,
    pub approved: usize,
    pub rejected: usize,
    pub pending: usize,
    pub skipped: usize,
    pub effective_total: usize,
    pub progress_percent: u32,
    pub is_complete: bool,
    pub current_level: Option<u32>,
    pub state: ChainState,
}

/// Lowest-level pending step. `None` once every step is approved or skipped.
pub fn next_actionable(chain: &ApprovalChain) -> Option<&ApprovalStep> {
    chain.steps().iter().find(|step| step.status == StepStatus::Pending)
}

pub fn is_complete(chain: &ApprovalChain) -> bool {
    chain
        .steps()
        .iter()
        .all(|step| matches!(step.status, StepStatus::Approved | StepStatus::Skipped))
}

pub fn is_rejected(chain: &ApprovalChain) -> bool {
    chain.rejected_step().is_some()
}

/// Any rejection is terminal, regardless of steps still pending after it.
pub fn chain_state(chain: &ApprovalChain) -> ChainState {
    if is_rejected(chain) {
        ChainState::Rejected
    } else if is_complete(chain) {
        ChainState::Complete
    } else {
        ChainState::InProgress
    }
}

/// True when `level` exists, is pending and is bound to `person_email`.
///
/// This is an identity check only; whether it is that level's turn is decided
/// by [`apply`], so callers can tell "wrong person" from "wrong time".
pub fn can_act(person_email: &str, chain: &ApprovalChain, level: u32) -> bool {
    chain
        .step(level)
        .map(|step| {
            step.status == StepStatus::Pending
                && step.approver.is_resolved()
                && step.approver.has_email(person_email)
        })
        .unwrap_or(false)
}

pub fn apply(
    chain: &ApprovalChain,
    level: u32,
    decision: Decision,
    comments: Option<&str>,
) -> Result<ApprovalChain, TransitionError> {
    apply_at(chain, level, decision, comments, Utc::now())
}

/// Records `decision` on `level` and returns the updated chain.
///
/// Rejection leaves later pending steps untouched; the chain is nevertheless
/// closed and refuses any further decision.
pub fn apply_at(
    chain: &ApprovalChain,
    level: u32,
    decision: Decision,
    comments: Option<&str>,
    decided_at: DateTime<Utc>,
) -> Result<ApprovalChain, TransitionError> {
    let step = chain.step(level).ok_or(TransitionError::LevelNotFound { level })?;

    if step.status != StepStatus::Pending {
        return Err(TransitionError::InvalidTransition {
            level,
            reason: InvalidTransitionReason::NotPending { status: step.status },
        });
    }
    if let Some(rejected) = chain.rejected_step() {
        return Err(TransitionError::InvalidTransition {
            level,
            reason: InvalidTransitionReason::ChainRejected { rejected_level: rejected.level },
        });
    }
    let current_level = next_actionable(chain).map(|step| step.level);
    if current_level != Some(level) {
        return Err(TransitionError::InvalidTransition {
            level,
            reason: InvalidTransitionReason::NotCurrentLevel { current_level },
        });
    }

    let mut next = chain.clone();
    if let Some(step) = next.step_mut(level) {
        step.status = decision.resulting_status();
        step.comments = comments.map(str::trim).filter(|text| !text.is_empty()).map(str::to_string);
        step.decided_at = Some(decided_at);
    }
    Ok(next)
}

/// Stores a grade on a decided step that carries a grading payload.
pub(crate) fn record_grade(chain: &mut ApprovalChain, level: u32, grade: Decimal) -> bool {
    match chain.step_mut(level) {
        Some(step) if matches!(step.payload, Some(StepPayload::Grading { .. })) => {
            step.payload = Some(StepPayload::Grading { grade: Some(grade) });
            true
        }
        _ => false,
    }
}

pub fn summary(chain: &ApprovalChain) -> ChainSummary {
    let count =
        |status: StepStatus| chain.steps().iter().filter(|step| step.status == status).count();

    let total = chain.len();
    let approved = count(StepStatus::Approved);
    let rejected = count(StepStatus::Rejected);
    let pending = count(StepStatus::Pending);
    let skipped = count(StepStatus::Skipped);
    let effective_total = total - skipped;
    let progress_percent = if effective_total > 0 {
        (approved as f64 / effective_total as f64 * 100.0).round() as u32
    } else {
        0
    };
    let state = chain_state(chain);
    let current_level = match state {
        ChainState::InProgress => next_actionable(chain).map(|step| step.level),
        ChainState::Complete | ChainState::Rejected => None,
    };

    ChainSummary {
        total,
        approved,
        rejected,
        pending,
        skipped,
        effective_total,
        progress_percent,
        is_complete: is_complete(chain),
        current_level,
        state,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{
        apply, apply_at, can_act, chain_state, is_complete, next_actionable, summary,
        ChainState, InvalidTransitionReason, TransitionError,
    };
    use crate::domain::approval::{ApprovalChain, ApprovalStep, Approver, Decision, StepStatus};

    fn approver(email: &str) -> Approver {
        Approver {
            name: email.to_string(),
            email: Some(email.to_string()),
            role: "Supervisor".to_string(),
            department: None,
            user_id: None,
            unresolved_reference: None,
        }
    }

    fn chain(steps: Vec<ApprovalStep>) -> ApprovalChain {
        ApprovalChain::new(steps).expect("valid chain")
    }

    fn three_pending() -> ApprovalChain {
        chain(vec![
            ApprovalStep::pending(1, approver("a@x.test")),
            ApprovalStep::pending(2, approver("b@x.test")),
            ApprovalStep::pending(3, approver("c@x.test")),
        ])
    }

    #[test]
    fn next_actionable_is_the_lowest_pending_step() {
        let chain = chain(vec![
            ApprovalStep::skipped(1, approver("a@x.test"), "top-level employee"),
            ApprovalStep::pending(2, approver("b@x.test")),
            ApprovalStep::pending(3, approver("c@x.test")),
        ]);

        assert_eq!(next_actionable(&chain).map(|step| step.level), Some(2));
        assert!(!is_complete(&chain));
    }

    #[test]
    fn approving_every_level_completes_the_chain() {
        let mut current = three_pending();
        for level in 1..=3 {
            current = apply(&current, level, Decision::Approve, Some("ok")).expect("approve");
        }

        assert!(next_actionable(&current).is_none());
        assert!(is_complete(&current));
        assert_eq!(chain_state(&current), ChainState::Complete);
        assert!(current.steps().iter().all(|step| step.decided_at.is_some()));
    }

    #[test]
    fn can_act_requires_matching_pending_resolved_approver() {
        let chain = three_pending();

        assert!(can_act("A@X.test ", &chain, 1));
        assert!(!can_act("b@x.test", &chain, 1));
        assert!(can_act("b@x.test", &chain, 2));
        assert!(!can_act("a@x.test", &chain, 9));

        let unresolved = ApprovalChain::new(vec![ApprovalStep::pending(
            1,
            Approver::unresolved("Finance", Some("a@x.test".to_string())),
        )])
        .expect("valid chain");
        assert!(!can_act("a@x.test", &unresolved, 1));
    }

    #[test]
    fn acting_ahead_of_turn_is_an_invalid_transition() {
        let error = apply(&three_pending(), 2, Decision::Approve, None).expect_err("not yet");

        assert_eq!(
            error,
            TransitionError::InvalidTransition {
                level: 2,
                reason: InvalidTransitionReason::NotCurrentLevel { current_level: Some(1) },
            }
        );
    }

    #[test]
    fn decided_steps_cannot_be_decided_again() {
        let approved = apply(&three_pending(), 1, Decision::Approve, None).expect("approve");
        let error = apply(&approved, 1, Decision::Reject, None).expect_err("already decided");

        assert_eq!(
            error,
            TransitionError::InvalidTransition {
                level: 1,
                reason: InvalidTransitionReason::NotPending { status: StepStatus::Approved },
            }
        );
    }

    #[test]
    fn unknown_level_is_not_found() {
        let error = apply(&three_pending(), 4, Decision::Approve, None).expect_err("no level 4");
        assert_eq!(error, TransitionError::LevelNotFound { level: 4 });
    }

    #[test]
    fn rejection_leaves_later_levels_pending_but_closes_the_chain() {
        let decided_at = Utc.with_ymd_and_hms(2026, 3, 2, 9, 30, 0).single().expect("timestamp");
        let comments = Some(" insufficient detail ");
        let rejected = apply_at(&three_pending(), 1, Decision::Reject, comments, decided_at)
            .expect("reject");

        let first = rejected.step(1).expect("level 1");
        assert_eq!(first.status, StepStatus::Rejected);
        assert_eq!(first.comments.as_deref(), Some("insufficient detail"));
        assert_eq!(first.decided_at, Some(decided_at));
        assert_eq!(rejected.step(2).map(|step| step.status), Some(StepStatus::Pending));
        assert!(!is_complete(&rejected));
        assert_eq!(chain_state(&rejected), ChainState::Rejected);

        let error = apply(&rejected, 2, Decision::Approve, None).expect_err("chain is closed");
        assert!(matches!(
            error,
            TransitionError::InvalidTransition {
                reason: InvalidTransitionReason::ChainRejected { rejected_level: 1 },
                ..
            }
        ));
    }

    #[test]
    fn summary_excludes_skipped_steps_from_progress() {
        let chain = chain(vec![
            ApprovalStep::skipped(1, approver("a@x.test"), "top-level employee"),
            ApprovalStep::skipped(2, approver("b@x.test"), "top-level employee"),
            ApprovalStep::pending(3, approver("c@x.test")),
        ]);
        let approved = apply(&chain, 3, Decision::Approve, None).expect("approve");

        let report = summary(&approved);
        assert_eq!(report.total, 3);
        assert_eq!(report.skipped, 2);
        assert_eq!(report.effective_total, 1);
        assert_eq!(report.approved, 1);
        assert_eq!(report.progress_percent, 100);
        assert!(report.is_complete);
        assert_eq!(report.current_level, None);
    }

    #[test]
    fn summary_rounds_half_up_and_handles_empty_denominator() {
        let one_of_three = apply(&three_pending(), 1, Decision::Approve, None).expect("approve");
        assert_eq!(summary(&one_of_three).progress_percent, 33);
        assert_eq!(summary(&one_of_three).current_level, Some(2));

        let two_of_three = apply(&one_of_three, 2, Decision::Approve, None).expect("approve");
        assert_eq!(summary(&two_of_three).progress_percent, 67);

        let pair = chain(vec![
            ApprovalStep::pending(1, approver("a@x.test")),
            ApprovalStep::pending(2, approver("b@x.test")),
        ]);
        let half = apply(&pair, 1, Decision::Approve, None).expect("approve");
        assert_eq!(summary(&half).progress_percent, 50);

        let all_skipped =
            chain(vec![ApprovalStep::skipped(1, approver("a@x.test"), "no document creator")]);
        let report = summary(&all_skipped);
        assert_eq!(report.effective_total, 0);
        assert_eq!(report.progress_percent, 0);
        assert!(report.is_complete);
    }

    #[test]
    fn reads_do_not_mutate() {
        let chain = three_pending();
        let before = chain.clone();

        assert_eq!(summary(&chain), summary(&chain));
        assert_eq!(next_actionable(&chain), next_actionable(&chain));
        assert_eq!(chain, before);
    }
}
