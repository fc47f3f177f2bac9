use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::person::{same_email, Person};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Approved,
    Rejected,
    Skipped,
}

impl StepStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Skipped => "skipped",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Approve,
    Reject,
}

impl Decision {
    pub fn resulting_status(self) -> StepStatus {
        match self {
            Self::Approve => StepStatus::Approved,
            Self::Reject => StepStatus::Rejected,
        }
    }
}

/// Identity bound to a step.
///
/// `email` is `None` when the org-chart reference behind this step could not be
/// resolved; such a step can never be acted on until the data is fixed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Approver {
    pub name: String,
    pub email: Option<String>,
    pub role: String,
    pub department: Option<String>,
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unresolved_reference: Option<String>,
}

impl Approver {
    pub fn from_person(person: &Person, role: impl Into<String>) -> Self {
        let department =
            Some(person.department.trim()).filter(|value| !value.is_empty()).map(str::to_string);
        Self {
            name: person.name.clone(),
            email: Some(person.email.trim().to_string()),
            role: role.into(),
            department,
            user_id: None,
            unresolved_reference: None,
        }
    }

    pub fn unresolved(role: impl Into<String>, reference: Option<String>) -> Self {
        let role = role.into();
        Self {
            name: role.clone(),
            email: None,
            role,
            department: None,
            user_id: None,
            unresolved_reference: reference,
        }
    }

    pub fn with_user_id(mut self, user_id: Option<String>) -> Self {
        self.user_id = user_id;
        self
    }

    pub fn is_resolved(&self) -> bool {
        self.email.as_deref().map(|email| !email.trim().is_empty()).unwrap_or(false)
    }

    pub fn has_email(&self, email: &str) -> bool {
        match self.email.as_deref() {
            Some(own) if !own.trim().is_empty() => same_email(own, email),
            _ => false,
        }
    }
}

/// Workflow-kind specific data carried by a step.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepPayload {
    Grading { grade: Option<Decimal> },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalStep {
    pub level: u32,
    pub approver: Approver,
    pub status: StepStatus,
    pub comments: Option<String>,
    pub decided_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<StepPayload>,
}

impl ApprovalStep {
    pub fn pending(level: u32, approver: Approver) -> Self {
        Self {
            level,
            approver,
            status: StepStatus::Pending,
            comments: None,
            decided_at: None,
            skip_reason: None,
            payload: None,
        }
    }

    pub fn skipped(level: u32, approver: Approver, reason: impl Into<String>) -> Self {
        Self {
            status: StepStatus::Skipped,
            skip_reason: Some(reason.into()),
            ..Self::pending(level, approver)
        }
    }

    pub fn with_payload(mut self, payload: StepPayload) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn grade(&self) -> Option<Decimal> {
        match &self.payload {
            Some(StepPayload::Grading { grade }) => *grade,
            None => None,
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ChainShapeError {
    #[error("chain levels must run 1..=N: expected level {expected}, found {found}")]
    NonContiguousLevels { expected: u32, found: u32 },
    #[error("skipped step at level {level} has no skip reason")]
    MissingSkipReason { level: u32 },
    #[error("step at level {level} is decided while a lower level is still pending")]
    DecidedAfterPending { level: u32 },
}

/// Ordered approval steps embedded in exactly one parent document.
///
/// Levels are always `1..=N` and no step is decided above a pending one. A
/// deserialized chain is checked against that shape, so a corrupted stored
/// chain is refused instead of half-processed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<ApprovalStep>", into = "Vec<ApprovalStep>")]
pub struct ApprovalChain {
    steps: Vec<ApprovalStep>,
}

impl ApprovalChain {
    pub fn new(steps: Vec<ApprovalStep>) -> Result<Self, ChainShapeError> {
        let mut seen_pending = false;
        for (index, step) in steps.iter().enumerate() {
            let expected = index as u32 + 1;
            if step.level != expected {
                return Err(ChainShapeError::NonContiguousLevels { expected, found: step.level });
            }
            let blank_reason =
                step.skip_reason.as_deref().map(|reason| reason.trim().is_empty()).unwrap_or(true);
            if step.status == StepStatus::Skipped && blank_reason {
                return Err(ChainShapeError::MissingSkipReason { level: step.level });
            }
            match step.status {
                StepStatus::Pending => seen_pending = true,
                StepStatus::Approved | StepStatus::Rejected if seen_pending => {
                    return Err(ChainShapeError::DecidedAfterPending { level: step.level });
                }
                _ => {}
            }
        }

        Ok(Self { steps })
    }

    /// Assigns levels `1..=N` in the given order.
    pub(crate) fn renumbered(mut steps: Vec<ApprovalStep>) -> Self {
        for (index, step) in steps.iter_mut().enumerate() {
            step.level = index as u32 + 1;
        }
        Self { steps }
    }

    pub fn steps(&self) -> &[ApprovalStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn step(&self, level: u32) -> Option<&ApprovalStep> {
        let index = usize::try_from(level).ok()?.checked_sub(1)?;
        self.steps.get(index)
    }

    pub(crate) fn step_mut(&mut self, level: u32) -> Option<&mut ApprovalStep> {
        let index = usize::try_from(level).ok()?.checked_sub(1)?;
        self.steps.get_mut(index)
    }

    pub fn rejected_step(&self) -> Option<&ApprovalStep> {
        self.steps.iter().find(|step| step.status == StepStatus::Rejected)
    }

    pub fn has_approver(&self, email: &str) -> bool {
        self.steps.iter().any(|step| step.approver.has_email(email))
    }
}

impl TryFrom<Vec<ApprovalStep>> for ApprovalChain {
    type Error = ChainShapeError;

    fn try_from(steps: Vec<ApprovalStep>) -> Result<Self, Self::Error> {
        Self::new(steps)
    }
}

impl From<ApprovalChain> for Vec<ApprovalStep> {
    fn from(chain: ApprovalChain) -> Self {
        chain.steps
    }
}
