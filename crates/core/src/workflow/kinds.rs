use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::approvals::builder::ChainPlan;
use crate::approvals::state::{chain_state, next_actionable, ChainState};
use crate::config::WorkflowConfig;
use crate::directory::Role;
use crate::domain::approval::ApprovalChain;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowKind {
    PurchaseRequisition,
    TaskCompletion,
    BudgetCode,
    DebitNote,
    PurchaseOrder,
}

impl WorkflowKind {
    pub const ALL: [Self; 5] = [
        Self::PurchaseRequisition,
        Self::TaskCompletion,
        Self::BudgetCode,
        Self::DebitNote,
        Self::PurchaseOrder,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Self::PurchaseRequisition => "purchase_requisition",
            Self::TaskCompletion => "task_completion",
            Self::BudgetCode => "budget_code",
            Self::DebitNote => "debit_note",
            Self::PurchaseOrder => "purchase_order",
        }
    }

    pub fn plan(self, config: &WorkflowConfig) -> ChainPlan {
        match self {
            Self::PurchaseRequisition => {
                ChainPlan::SupervisoryEscalation { tail: config.escalation_tail.clone() }
            }
            Self::TaskCompletion => ChainPlan::ExplicitThreeLevel,
            Self::BudgetCode => ChainPlan::FixedDepth {
                roles: vec![Role::DepartmentHead, Role::BusinessHead, Role::Finance],
            },
            Self::DebitNote => {
                ChainPlan::FixedDepth { roles: vec![Role::DepartmentHead, Role::Finance] }
            }
            Self::PurchaseOrder => {
                ChainPlan::FixedDepth { roles: vec![Role::Finance, Role::TopApprover] }
            }
        }
    }

    /// Whether approvals on this kind may carry a grade.
    pub fn is_graded(self) -> bool {
        matches!(self, Self::TaskCompletion)
    }

    /// Parent-document status string for `status`.
    pub fn status_label(self, status: DocumentStatus) -> String {
        match status {
            DocumentStatus::Pending { level } if self.is_graded() => {
                format!("pending_level_{level}_grading")
            }
            DocumentStatus::Pending { level } => format!("pending_level_{level}_review"),
            DocumentStatus::Completed => match self {
                Self::BudgetCode => "active".to_string(),
                Self::TaskCompletion => "graded".to_string(),
                Self::PurchaseRequisition | Self::DebitNote | Self::PurchaseOrder => {
                    "approved".to_string()
                }
            },
            DocumentStatus::AutoCompleted => "auto_completed".to_string(),
            DocumentStatus::Rejected { .. } => "rejected".to_string(),
        }
    }
}

impl fmt::Display for WorkflowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for WorkflowKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace(&['-', ' '][..], "_");
        Self::ALL.into_iter().find(|kind| kind.key() == normalized).ok_or_else(|| {
            format!(
                "unsupported workflow kind `{value}` (expected purchase_requisition|\
                 task_completion|budget_code|debit_note|purchase_order)"
            )
        })
    }
}

/// Parent-document state derived from its chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DocumentStatus {
    Pending { level: u32 },
    Completed,
    /// Complete at construction: every level was skipped or omitted.
    AutoCompleted,
    Rejected { level: u32 },
}

impl DocumentStatus {
    pub fn from_chain(chain: &ApprovalChain) -> Self {
        match chain_state(chain) {
            ChainState::Rejected => {
                let level = chain.rejected_step().map(|step| step.level).unwrap_or_default();
                Self::Rejected { level }
            }
            ChainState::Complete => Self::Completed,
            ChainState::InProgress => match next_actionable(chain) {
                Some(step) => Self::Pending { level: step.level },
                None => Self::Completed,
            },
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending { .. })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationReason {
    AwaitingDecision,
    DocumentRejected,
    DocumentCompleted,
}

/// Who the calling layer should notify next. Delivery is not handled here.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationTarget {
    pub email: String,
    pub name: String,
    pub user_id: Option<String>,
    /// Level awaiting the recipient, for [`NotificationReason::AwaitingDecision`].
    pub level: Option<u32>,
    pub reason: NotificationReason,
}

#[cfg(test)]
mod tests {
    use super::{DocumentStatus, WorkflowKind};
    use crate::approvals::builder::ChainPlan;
    use crate::config::WorkflowConfig;
    use crate::directory::Role;
    use crate::domain::approval::{ApprovalChain, ApprovalStep, Approver, StepStatus};

    #[test]
    fn kinds_map_to_their_chain_plans() {
        let config = WorkflowConfig::default();

        assert_eq!(
            WorkflowKind::PurchaseRequisition.plan(&config),
            ChainPlan::SupervisoryEscalation {
                tail: vec![Role::Finance, Role::Coordinator, Role::TopApprover]
            }
        );
        assert_eq!(WorkflowKind::TaskCompletion.plan(&config), ChainPlan::ExplicitThreeLevel);
        assert_eq!(
            WorkflowKind::BudgetCode.plan(&config),
            ChainPlan::FixedDepth {
                roles: vec![Role::DepartmentHead, Role::BusinessHead, Role::Finance]
            }
        );
    }

    #[test]
    fn kind_parsing_is_lenient_and_round_trips_keys() {
        for kind in WorkflowKind::ALL {
            assert_eq!(kind.key().parse::<WorkflowKind>(), Ok(kind));
        }
        assert_eq!("Budget-Code".parse::<WorkflowKind>(), Ok(WorkflowKind::BudgetCode));
        assert!("invoice".parse::<WorkflowKind>().is_err());
    }

    #[test]
    fn status_labels_are_kind_specific() {
        assert_eq!(
            WorkflowKind::PurchaseRequisition.status_label(DocumentStatus::Pending { level: 1 }),
            "pending_level_1_review"
        );
        assert_eq!(
            WorkflowKind::TaskCompletion.status_label(DocumentStatus::Pending { level: 3 }),
            "pending_level_3_grading"
        );
        assert_eq!(WorkflowKind::BudgetCode.status_label(DocumentStatus::Completed), "active");
        assert_eq!(
            WorkflowKind::DebitNote.status_label(DocumentStatus::Rejected { level: 2 }),
            "rejected"
        );
    }

    #[test]
    fn rejected_chain_is_terminal_even_with_pending_levels() {
        let approver = Approver::unresolved("Finance", None);
        let mut rejected = ApprovalStep::pending(1, approver.clone());
        rejected.status = StepStatus::Rejected;
        let chain = ApprovalChain::new(vec![rejected, ApprovalStep::pending(2, approver)])
            .expect("valid chain");

        let status = DocumentStatus::from_chain(&chain);
        assert_eq!(status, DocumentStatus::Rejected { level: 1 });
        assert!(status.is_terminal());
    }
}
