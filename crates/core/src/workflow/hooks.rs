use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::approval::{ApprovalChain, StepStatus};
use crate::workflow::kinds::WorkflowKind;

/// Facts handed to completion side effects (score aggregation, budget
/// activation and the like), which live outside this crate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionReport {
    pub kind: WorkflowKind,
    pub status_label: String,
    pub auto_completed: bool,
    pub approvals: usize,
    pub skipped: usize,
    /// Mean of the recorded grades, two decimal places. `None` without grades.
    pub average_grade: Option<Decimal>,
    pub completed_at: DateTime<Utc>,
}

impl CompletionReport {
    pub fn from_chain(
        kind: WorkflowKind,
        status_label: impl Into<String>,
        auto_completed: bool,
        chain: &ApprovalChain,
    ) -> Self {
        let count = |status: StepStatus| {
            chain.steps().iter().filter(|step| step.status == status).count()
        };

        Self {
            kind,
            status_label: status_label.into(),
            auto_completed,
            approvals: count(StepStatus::Approved),
            skipped: count(StepStatus::Skipped),
            average_grade: average_grade(chain),
            completed_at: Utc::now(),
        }
    }
}

pub fn average_grade(chain: &ApprovalChain) -> Option<Decimal> {
    let grades: Vec<Decimal> = chain
        .steps()
        .iter()
        .filter(|step| step.status == StepStatus::Approved)
        .filter_map(|step| step.grade())
        .collect();
    if grades.is_empty() {
        return None;
    }

    let total: Decimal = grades.iter().copied().sum();
    Some((total / Decimal::from(grades.len())).round_dp(2))
}

pub trait CompletionHook: Send + Sync {
    fn on_completed(&self, report: &CompletionReport);
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoopCompletionHook;

impl CompletionHook for NoopCompletionHook {
    fn on_completed(&self, _report: &CompletionReport) {}
}

#[derive(Clone, Default)]
pub struct InMemoryCompletionHook {
    reports: Arc<Mutex<Vec<CompletionReport>>>,
}

impl InMemoryCompletionHook {
    pub fn reports(&self) -> Vec<CompletionReport> {
        match self.reports.lock() {
            Ok(reports) => reports.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl CompletionHook for InMemoryCompletionHook {
    fn on_completed(&self, report: &CompletionReport) {
        match self.reports.lock() {
            Ok(mut reports) => reports.push(report.clone()),
            Err(poisoned) => poisoned.into_inner().push(report.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{average_grade, CompletionHook, CompletionReport, InMemoryCompletionHook};
    use crate::domain::approval::{
        ApprovalChain, ApprovalStep, Approver, StepPayload, StepStatus,
    };
    use crate::workflow::kinds::WorkflowKind;

    fn graded(level: u32, status: StepStatus, grade: Option<Decimal>) -> ApprovalStep {
        let mut step = ApprovalStep::pending(level, Approver::unresolved("Supervisor", None))
            .with_payload(StepPayload::Grading { grade });
        step.status = status;
        if status == StepStatus::Skipped {
            step.skip_reason = Some("top-level employee".to_string());
        }
        step
    }

    #[test]
    fn average_ignores_skipped_and_ungraded_levels() {
        let chain = ApprovalChain::new(vec![
            graded(1, StepStatus::Skipped, None),
            graded(2, StepStatus::Approved, Some(Decimal::new(80, 0))),
            graded(3, StepStatus::Approved, Some(Decimal::new(915, 1))),
        ])
        .expect("valid chain");

        assert_eq!(average_grade(&chain), Some(Decimal::new(8575, 2)));
    }

    #[test]
    fn average_is_none_without_grades() {
        let chain = ApprovalChain::new(vec![graded(1, StepStatus::Approved, None)])
            .expect("valid chain");
        assert_eq!(average_grade(&chain), None);
    }

    #[test]
    fn in_memory_hook_records_reports() {
        let hook = InMemoryCompletionHook::default();
        let chain = ApprovalChain::default();
        hook.on_completed(&CompletionReport::from_chain(
            WorkflowKind::BudgetCode,
            "active",
            true,
            &chain,
        ));

        let reports = hook.reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].status_label, "active");
        assert!(reports[0].auto_completed);
    }
}
