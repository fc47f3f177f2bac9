use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::approvals::builder::{BuildOutcome, ChainBuilder, Subject};
use crate::approvals::state::{apply, chain_state, next_actionable, record_grade, TransitionError};
use crate::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use crate::config::WorkflowConfig;
use crate::directory::{AccountLookup, Directory, DirectoryHandle, NoAccountLookup};
use crate::domain::approval::{ApprovalChain, Approver, Decision, StepPayload};
use crate::domain::person::normalize_email;
use crate::errors::DomainError;
use crate::workflow::hooks::{CompletionHook, CompletionReport, NoopCompletionHook};
use crate::workflow::kinds::{
    DocumentStatus, NotificationReason, NotificationTarget, WorkflowKind,
};

/// Result of starting a document's approval.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Initiation {
    pub chain: ApprovalChain,
    pub status: DocumentStatus,
    pub status_label: String,
    pub fallback_reason: Option<String>,
    pub notify: Option<NotificationTarget>,
}

#[derive(Clone, Debug)]
pub struct DecisionRequest<'a> {
    pub level: u32,
    pub actor_email: &'a str,
    pub decision: Decision,
    pub comments: Option<&'a str>,
    /// Only accepted on approvals of graded workflow kinds.
    pub grade: Option<Decimal>,
    /// Recipient of rejection and completion notices.
    pub creator: Option<&'a str>,
}

impl<'a> DecisionRequest<'a> {
    pub fn new(level: u32, actor_email: &'a str, decision: Decision) -> Self {
        Self { level, actor_email, decision, comments: None, grade: None, creator: None }
    }

    pub fn with_comments(mut self, comments: &'a str) -> Self {
        self.comments = Some(comments);
        self
    }

    pub fn with_grade(mut self, grade: Decimal) -> Self {
        self.grade = Some(grade);
        self
    }

    pub fn with_creator(mut self, creator: &'a str) -> Self {
        self.creator = Some(creator);
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionOutcome {
    pub chain: ApprovalChain,
    pub status: DocumentStatus,
    pub status_label: String,
    pub notify: Option<NotificationTarget>,
}

/// Entry for the parent document's append-only rejection history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectionRecord {
    pub rejected_level: u32,
    pub approver: Approver,
    pub comments: Option<String>,
    pub decided_at: Option<DateTime<Utc>>,
    pub archived_chain: ApprovalChain,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resubmission {
    pub rejection: RejectionRecord,
    pub initiation: Initiation,
}

/// Couples chain transitions to the parent document's status.
///
/// Every call takes one [`Directory`] snapshot from the handle and uses it
/// throughout, so a concurrent reload never splits a computation.
pub struct WorkflowOrchestrator<H = NoopCompletionHook, A = NoAccountLookup> {
    directory: DirectoryHandle,
    config: WorkflowConfig,
    hook: H,
    accounts: A,
}

impl WorkflowOrchestrator<NoopCompletionHook, NoAccountLookup> {
    pub fn new(directory: DirectoryHandle, config: WorkflowConfig) -> Self {
        Self { directory, config, hook: NoopCompletionHook, accounts: NoAccountLookup }
    }
}

impl<H, A> WorkflowOrchestrator<H, A>
where
    H: CompletionHook,
    A: AccountLookup,
{
    pub fn with_completion_hook<G>(self, hook: G) -> WorkflowOrchestrator<G, A>
    where
        G: CompletionHook,
    {
        WorkflowOrchestrator {
            directory: self.directory,
            config: self.config,
            hook,
            accounts: self.accounts,
        }
    }

    pub fn with_accounts<B>(self, accounts: B) -> WorkflowOrchestrator<H, B>
    where
        B: AccountLookup,
    {
        WorkflowOrchestrator {
            directory: self.directory,
            config: self.config,
            hook: self.hook,
            accounts,
        }
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    pub fn directory(&self) -> &DirectoryHandle {
        &self.directory
    }

    /// Builds the initial chain and document status. Never fails: an
    /// unresolvable subject yields the kind's fallback chain.
    pub fn initiate(
        &self,
        subject: &Subject,
        creator: Option<&str>,
        kind: WorkflowKind,
    ) -> Initiation {
        let directory = self.directory.snapshot();
        let BuildOutcome { chain, fallback_reason } =
            ChainBuilder::new(&directory).with_accounts(&self.accounts).build(
                &kind.plan(&self.config),
                subject,
                creator,
            );

        let status = match DocumentStatus::from_chain(&chain) {
            DocumentStatus::Completed => DocumentStatus::AutoCompleted,
            other => other,
        };
        let status_label = kind.status_label(status);
        let notify = match status {
            DocumentStatus::Pending { .. } => awaiting_target(&chain),
            _ => self.creator_target(&directory, creator, NotificationReason::DocumentCompleted),
        };

        info!(
            event_name = "approval.chain.initiated",
            kind = %kind,
            steps = chain.len(),
            status = %status_label,
            fallback = fallback_reason.is_some(),
            "approval chain initiated"
        );

        if status == DocumentStatus::AutoCompleted {
            self.hook.on_completed(&CompletionReport::from_chain(
                kind,
                status_label.clone(),
                true,
                &chain,
            ));
        }

        Initiation { chain, status, status_label, fallback_reason, notify }
    }

    /// Authorizes `request.actor_email`, applies the decision and derives the
    /// document status and next notification target.
    ///
    /// A step bound to someone else is `Unauthorized`; a step bound to the
    /// actor that is not awaiting a decision is an invalid transition.
    pub fn record_decision(
        &self,
        chain: &ApprovalChain,
        kind: WorkflowKind,
        request: &DecisionRequest<'_>,
    ) -> Result<DecisionOutcome, DomainError> {
        let result = self.decide(chain, kind, request);
        match &result {
            Ok(outcome) => info!(
                event_name = "approval.decision.applied",
                kind = %kind,
                level = request.level,
                decision = ?request.decision,
                status = %outcome.status_label,
                "approval decision applied"
            ),
            Err(error) => warn!(
                event_name = "approval.decision.rejected",
                kind = %kind,
                level = request.level,
                actor = %normalize_email(request.actor_email),
                error = %error,
                "approval decision refused"
            ),
        }
        result
    }

    /// Archives a rejected chain and builds a fresh one from the current
    /// directory snapshot.
    pub fn resubmit(
        &self,
        chain: &ApprovalChain,
        subject: &Subject,
        creator: Option<&str>,
        kind: WorkflowKind,
    ) -> Result<Resubmission, DomainError> {
        let Some(rejected) = chain.rejected_step() else {
            return Err(TransitionError::NotResubmittable { state: chain_state(chain) }.into());
        };
        let rejection = RejectionRecord {
            rejected_level: rejected.level,
            approver: rejected.approver.clone(),
            comments: rejected.comments.clone(),
            decided_at: rejected.decided_at,
            archived_chain: chain.clone(),
        };

        info!(
            event_name = "approval.chain.resubmitted",
            kind = %kind,
            rejected_level = rejection.rejected_level,
            "rejected approval chain archived for resubmission"
        );
        let initiation = self.initiate(subject, creator, kind);
        Ok(Resubmission { rejection, initiation })
    }

    pub fn initiate_with_audit<S>(
        &self,
        subject: &Subject,
        creator: Option<&str>,
        kind: WorkflowKind,
        sink: &S,
        audit: &AuditContext,
    ) -> Initiation
    where
        S: AuditSink,
    {
        let initiation = self.initiate(subject, creator, kind);
        let mut event = AuditEvent::new(
            audit,
            "approval.chain.initiated",
            AuditCategory::Chain,
            AuditOutcome::Success,
        )
        .with_metadata("kind", kind.key())
        .with_metadata("steps", initiation.chain.len().to_string())
        .with_metadata("status", initiation.status_label.clone());
        if let Some(reason) = &initiation.fallback_reason {
            event = event.with_metadata("fallback_reason", reason.clone());
        }
        sink.emit(event);
        initiation
    }

    pub fn record_decision_with_audit<S>(
        &self,
        chain: &ApprovalChain,
        kind: WorkflowKind,
        request: &DecisionRequest<'_>,
        sink: &S,
        audit: &AuditContext,
    ) -> Result<DecisionOutcome, DomainError>
    where
        S: AuditSink,
    {
        let result = self.record_decision(chain, kind, request);
        match &result {
            Ok(outcome) => {
                sink.emit(
                    AuditEvent::new(
                        audit,
                        "approval.decision.applied",
                        AuditCategory::Decision,
                        AuditOutcome::Success,
                    )
                    .with_metadata("kind", kind.key())
                    .with_metadata("level", request.level.to_string())
                    .with_metadata("decision", format!("{:?}", request.decision))
                    .with_metadata("status", outcome.status_label.clone()),
                );
            }
            Err(error) => {
                sink.emit(
                    AuditEvent::new(
                        audit,
                        "approval.decision.denied",
                        AuditCategory::Decision,
                        AuditOutcome::Rejected,
                    )
                    .with_metadata("kind", kind.key())
                    .with_metadata("level", request.level.to_string())
                    .with_metadata("error", error.to_string()),
                );
            }
        }
        result
    }

    pub fn resubmit_with_audit<S>(
        &self,
        chain: &ApprovalChain,
        subject: &Subject,
        creator: Option<&str>,
        kind: WorkflowKind,
        sink: &S,
        audit: &AuditContext,
    ) -> Result<Resubmission, DomainError>
    where
        S: AuditSink,
    {
        let result = self.resubmit(chain, subject, creator, kind);
        match &result {
            Ok(resubmission) => sink.emit(
                AuditEvent::new(
                    audit,
                    "approval.chain.resubmitted",
                    AuditCategory::Chain,
                    AuditOutcome::Success,
                )
                .with_metadata("kind", kind.key())
                .with_metadata("rejected_level", resubmission.rejection.rejected_level.to_string())
                .with_metadata("status", resubmission.initiation.status_label.clone()),
            ),
            Err(error) => sink.emit(
                AuditEvent::new(
                    audit,
                    "approval.chain.resubmitted",
                    AuditCategory::Chain,
                    AuditOutcome::Rejected,
                )
                .with_metadata("kind", kind.key())
                .with_metadata("error", error.to_string()),
            ),
        }
        result
    }

    fn decide(
        &self,
        chain: &ApprovalChain,
        kind: WorkflowKind,
        request: &DecisionRequest<'_>,
    ) -> Result<DecisionOutcome, DomainError> {
        let level = request.level;
        let step = chain.step(level).ok_or(TransitionError::LevelNotFound { level })?;

        // Ownership decides Unauthorized; an owned step that is not awaiting
        // a decision falls through to `apply` and reports the invalid transition.
        if !(step.approver.is_resolved() && step.approver.has_email(request.actor_email)) {
            return Err(DomainError::Unauthorized {
                level,
                actor: normalize_email(request.actor_email),
            });
        }

        let mut next = apply(chain, level, request.decision, request.comments)?;
        if let Some(grade) = request.grade {
            self.validate_grade(kind, step.payload.as_ref(), request.decision, level, grade)?;
            record_grade(&mut next, level, grade);
        }

        let status = DocumentStatus::from_chain(&next);
        let status_label = kind.status_label(status);
        let directory = self.directory.snapshot();
        let notify = match status {
            DocumentStatus::Pending { .. } => awaiting_target(&next),
            DocumentStatus::Rejected { .. } => self.creator_target(
                &directory,
                request.creator,
                NotificationReason::DocumentRejected,
            ),
            DocumentStatus::Completed | DocumentStatus::AutoCompleted => self.creator_target(
                &directory,
                request.creator,
                NotificationReason::DocumentCompleted,
            ),
        };

        if status == DocumentStatus::Completed {
            self.hook.on_completed(&CompletionReport::from_chain(
                kind,
                status_label.clone(),
                false,
                &next,
            ));
        }

        Ok(DecisionOutcome { chain: next, status, status_label, notify })
    }

    fn validate_grade(
        &self,
        kind: WorkflowKind,
        payload: Option<&StepPayload>,
        decision: Decision,
        level: u32,
        grade: Decimal,
    ) -> Result<(), DomainError> {
        if !kind.is_graded() || !matches!(payload, Some(StepPayload::Grading { .. })) {
            return Err(DomainError::InvalidPayload(format!(
                "level {level} of a {kind} chain does not take a grade"
            )));
        }
        if decision != Decision::Approve {
            return Err(DomainError::InvalidPayload(
                "a grade can only accompany an approval".to_string(),
            ));
        }
        if !self.config.grade_in_range(grade) {
            return Err(DomainError::InvalidPayload(format!(
                "grade {grade} is outside {}..={}",
                self.config.grade_min, self.config.grade_max
            )));
        }
        Ok(())
    }

    fn creator_target(
        &self,
        directory: &Directory,
        creator: Option<&str>,
        reason: NotificationReason,
    ) -> Option<NotificationTarget> {
        let creator = creator.map(str::trim).filter(|creator| !creator.is_empty())?;
        let email = normalize_email(creator);
        let name = directory
            .find_by_email(&email)
            .map(|person| person.name.clone())
            .unwrap_or_else(|_| creator.to_string());
        let user_id = self.accounts.user_id_for(&email);
        Some(NotificationTarget { email, name, user_id, level: None, reason })
    }
}

fn awaiting_target(chain: &ApprovalChain) -> Option<NotificationTarget> {
    let step = next_actionable(chain)?;
    let Some(email) = step.approver.email.clone().filter(|_| step.approver.is_resolved()) else {
        warn!(
            event_name = "directory.data_quality",
            level = step.level,
            role = %step.approver.role,
            "next approver is unresolved, nobody to notify"
        );
        return None;
    };

    Some(NotificationTarget {
        email,
        name: step.approver.name.clone(),
        user_id: step.approver.user_id.clone(),
        level: Some(step.level),
        reason: NotificationReason::AwaitingDecision,
    })
}
