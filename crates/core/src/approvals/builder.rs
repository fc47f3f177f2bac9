//! Chain construction.
//!
//! Builders are pure: they read a [`Directory`] snapshot and return a fresh
//! [`ApprovalChain`]. Missing subjects never fail a build; [`ChainBuilder::build`]
//! substitutes the plan's fallback chain and reports why.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::directory::{
    AccountLookup, Directory, DirectoryError, NoAccountLookup, Role, RoleHolder,
};
use crate::domain::approval::{ApprovalChain, ApprovalStep, Approver, StepPayload};
use crate::domain::person::{normalize_email, same_email, Person};

pub const SKIP_TOP_LEVEL_EMPLOYEE: &str = "top-level employee";
pub const SKIP_NO_SECOND_LEVEL: &str = "no second-level supervisor";
pub const SKIP_DUPLICATE_APPROVER: &str = "approver already appears at an earlier level";
pub const SKIP_CREATOR_IS_APPROVER: &str = "approver is the document creator";
pub const SKIP_SUBJECT_IS_APPROVER: &str = "approver is the subject of the document";
pub const SKIP_NO_CREATOR: &str = "no document creator recorded";
pub const SKIP_SUBJECT_NOT_FOUND: &str = "employee not found in organization chart";

const IMMEDIATE_SUPERVISOR: &str = "Immediate Supervisor";
const SECOND_LEVEL_SUPERVISOR: &str = "Second-Level Supervisor";
const DOCUMENT_CREATOR: &str = "Document Creator";

/// Who a document is about.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Subject {
    Employee(String),
    Department(String),
    Unassigned,
}

/// Composition rule for a chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChainPlan {
    /// Walk `reports_to` from the subject, then append `tail` unconditionally.
    SupervisoryEscalation { tail: Vec<Role> },
    /// Resolve each role in order, omitting the creator and repeated approvers.
    FixedDepth { roles: Vec<Role> },
    /// Supervisor, supervisor's supervisor, creator; ineligible levels are skipped.
    ExplicitThreeLevel,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildOutcome {
    pub chain: ApprovalChain,
    /// Set when the subject could not be resolved and the fallback chain was used.
    pub fallback_reason: Option<String>,
}

pub struct ChainBuilder<'a, A = NoAccountLookup> {
    directory: &'a Directory,
    accounts: A,
}

impl<'a> ChainBuilder<'a, NoAccountLookup> {
    pub fn new(directory: &'a Directory) -> Self {
        Self { directory, accounts: NoAccountLookup }
    }
}

impl<'a, A> ChainBuilder<'a, A>
where
    A: AccountLookup,
{
    pub fn with_accounts<B>(self, accounts: B) -> ChainBuilder<'a, B>
    where
        B: AccountLookup,
    {
        ChainBuilder { directory: self.directory, accounts }
    }

    pub fn directory(&self) -> &'a Directory {
        self.directory
    }

    pub fn build(
        &self,
        plan: &ChainPlan,
        subject: &Subject,
        creator: Option<&str>,
    ) -> BuildOutcome {
        let built = match (plan, subject) {
            (ChainPlan::SupervisoryEscalation { tail }, Subject::Employee(email)) => {
                self.supervisory_escalation(email, tail).map_err(|error| error.to_string())
            }
            (ChainPlan::ExplicitThreeLevel, Subject::Employee(email)) => {
                self.explicit_three_level(email, creator).map_err(|error| error.to_string())
            }
            (ChainPlan::FixedDepth { roles }, subject) => {
                match self.subject_department(roles, subject) {
                    Ok(department) => Ok(self.fixed_depth(roles, department.as_deref(), creator)),
                    Err(reason) => Err(reason),
                }
            }
            (_, Subject::Department(name)) => {
                Err(format!("department `{name}` cannot start a supervisory chain"))
            }
            (_, Subject::Unassigned) => Err("document has no subject employee".to_string()),
        };

        match built {
            Ok(chain) => {
                debug!(
                    event_name = "approval.chain.built",
                    steps = chain.len(),
                    directory_version = %self.directory.version(),
                    "approval chain built"
                );
                BuildOutcome { chain, fallback_reason: None }
            }
            Err(reason) => {
                warn!(
                    event_name = "approval.chain.fallback",
                    reason = %reason,
                    directory_version = %self.directory.version(),
                    "subject unresolved, using fallback approval chain"
                );
                BuildOutcome { chain: self.fallback(plan, creator), fallback_reason: Some(reason) }
            }
        }
    }

    /// Escalates through `reports_to` until a hierarchy root, a repeated
    /// supervisor, or an unresolvable reference, then appends `tail`.
    pub fn supervisory_escalation(
        &self,
        subject_email: &str,
        tail: &[Role],
    ) -> Result<ApprovalChain, DirectoryError> {
        let subject = self.directory.find_by_email(subject_email)?;
        let mut seen = HashSet::from([subject.key()]);
        let mut steps = Vec::new();
        let mut current = subject;

        loop {
            if self.directory.is_hierarchy_root(&current.email) {
                break;
            }
            let Some(supervisor_key) = current.supervisor_key() else {
                break;
            };
            if !seen.insert(supervisor_key.clone()) {
                warn!(
                    event_name = "directory.data_quality",
                    subject = %subject.email,
                    repeated = %supervisor_key,
                    "reporting cycle detected, stopping escalation"
                );
                break;
            }
            let Ok(supervisor) = self.directory.find_by_email(&supervisor_key) else {
                warn!(
                    event_name = "directory.data_quality",
                    email = %current.email,
                    reports_to = %supervisor_key,
                    "reports_to does not resolve, stopping escalation"
                );
                break;
            };

            let approver = self.approver(supervisor, supervisor_role(supervisor));
            steps.push(ApprovalStep::pending(0, approver));
            current = supervisor;
        }

        for role in tail {
            steps.push(ApprovalStep::pending(0, self.role_approver(*role, None)));
        }

        Ok(ApprovalChain::renumbered(steps))
    }

    /// Resolves `roles` in order. A level is omitted, not skipped, when its
    /// holder is the creator or already approves an earlier level.
    pub fn fixed_depth(
        &self,
        roles: &[Role],
        department: Option<&str>,
        creator: Option<&str>,
    ) -> ApprovalChain {
        let mut steps: Vec<ApprovalStep> = Vec::with_capacity(roles.len());

        for role in roles {
            let holder_email = match self.directory.role_holder(*role, department) {
                RoleHolder::Resolved(person) => Some(person.email.clone()),
                RoleHolder::Dangling(email) => Some(email),
                RoleHolder::Unassigned => None,
            };

            if let Some(holder_email) = holder_email.as_deref() {
                let is_creator =
                    creator.map(|creator| same_email(creator, holder_email)).unwrap_or(false);
                let repeated = steps.iter().any(|step| {
                    step.approver.has_email(holder_email)
                        || step
                            .approver
                            .unresolved_reference
                            .as_deref()
                            .map(|reference| same_email(reference, holder_email))
                            .unwrap_or(false)
                });
                if is_creator || repeated {
                    debug!(
                        event_name = "approval.chain.level_omitted",
                        role = %role,
                        is_creator,
                        repeated,
                        "omitting fixed-depth level"
                    );
                    continue;
                }
            }

            steps.push(ApprovalStep::pending(0, self.role_approver(*role, department)));
        }

        ApprovalChain::renumbered(steps)
    }

    /// Always three levels: immediate supervisor, second-level supervisor and
    /// the document creator, each carrying a grading payload.
    pub fn explicit_three_level(
        &self,
        subject_email: &str,
        creator: Option<&str>,
    ) -> Result<ApprovalChain, DirectoryError> {
        let subject = self.directory.find_by_email(subject_email)?;
        let first = self.directory.supervisor_of(&subject.email);
        let second = first.and_then(|supervisor| self.directory.supervisor_of(&supervisor.email));

        let level_one = match first {
            None => ApprovalStep::skipped(
                1,
                Approver::unresolved(IMMEDIATE_SUPERVISOR, subject.reports_to.clone()),
                SKIP_TOP_LEVEL_EMPLOYEE,
            ),
            Some(person) => {
                self.graded_level(1, person, IMMEDIATE_SUPERVISOR, subject, &[], creator)
            }
        };

        let level_two = match (first, second) {
            (None, _) => ApprovalStep::skipped(
                2,
                Approver::unresolved(SECOND_LEVEL_SUPERVISOR, None),
                SKIP_TOP_LEVEL_EMPLOYEE,
            ),
            (Some(supervisor), None) => ApprovalStep::skipped(
                2,
                Approver::unresolved(SECOND_LEVEL_SUPERVISOR, supervisor.reports_to.clone()),
                SKIP_NO_SECOND_LEVEL,
            ),
            (Some(supervisor), Some(person)) => self.graded_level(
                2,
                person,
                SECOND_LEVEL_SUPERVISOR,
                subject,
                &[supervisor.email.as_str()],
                creator,
            ),
        };

        let level_three = self.creator_level(creator);

        Ok(ApprovalChain::renumbered(
            [level_one, level_two, level_three]
                .into_iter()
                .map(|step| step.with_payload(StepPayload::Grading { grade: None }))
                .collect(),
        ))
    }

    /// Role-only chain used when the subject is unknown.
    pub fn fallback(&self, plan: &ChainPlan, creator: Option<&str>) -> ApprovalChain {
        match plan {
            ChainPlan::SupervisoryEscalation { tail } => self.fixed_depth(tail, None, creator),
            ChainPlan::FixedDepth { roles } => {
                let roles: Vec<Role> =
                    roles.iter().copied().filter(|role| !role.is_subject_specific()).collect();
                self.fixed_depth(&roles, None, creator)
            }
            ChainPlan::ExplicitThreeLevel => {
                let creator_step = self.creator_level(creator);
                ApprovalChain::renumbered(
                    [
                        ApprovalStep::skipped(
                            1,
                            Approver::unresolved(IMMEDIATE_SUPERVISOR, None),
                            SKIP_SUBJECT_NOT_FOUND,
                        ),
                        ApprovalStep::skipped(
                            2,
                            Approver::unresolved(SECOND_LEVEL_SUPERVISOR, None),
                            SKIP_SUBJECT_NOT_FOUND,
                        ),
                        creator_step,
                    ]
                    .into_iter()
                    .map(|step| step.with_payload(StepPayload::Grading { grade: None }))
                    .collect(),
                )
            }
        }
    }

    fn subject_department(
        &self,
        roles: &[Role],
        subject: &Subject,
    ) -> Result<Option<String>, String> {
        let needs_department = roles.iter().any(|role| role.is_subject_specific());
        match subject {
            Subject::Department(name) => Ok(Some(name.clone())),
            Subject::Employee(email) => match self.directory.find_by_email(email) {
                Ok(person) => Ok(Some(person.department.clone())),
                Err(error) if needs_department => Err(error.to_string()),
                Err(_) => Ok(None),
            },
            Subject::Unassigned if needs_department => {
                Err("document has no subject to resolve a department head from".to_string())
            }
            Subject::Unassigned => Ok(None),
        }
    }

    fn graded_level(
        &self,
        level: u32,
        person: &Person,
        role: &str,
        subject: &Person,
        earlier: &[&str],
        creator: Option<&str>,
    ) -> ApprovalStep {
        let approver = self.approver(person, role);
        if earlier.iter().any(|email| same_email(email, &person.email)) {
            return ApprovalStep::skipped(level, approver, SKIP_DUPLICATE_APPROVER);
        }
        if creator.map(|creator| same_email(creator, &person.email)).unwrap_or(false) {
            return ApprovalStep::skipped(level, approver, SKIP_CREATOR_IS_APPROVER);
        }
        if same_email(&subject.email, &person.email) {
            return ApprovalStep::skipped(level, approver, SKIP_SUBJECT_IS_APPROVER);
        }
        ApprovalStep::pending(level, approver)
    }

    fn creator_level(&self, creator: Option<&str>) -> ApprovalStep {
        match creator.map(str::trim).filter(|creator| !creator.is_empty()) {
            Some(creator) => ApprovalStep::pending(3, self.creator_approver(creator)),
            None => ApprovalStep::skipped(
                3,
                Approver::unresolved(DOCUMENT_CREATOR, None),
                SKIP_NO_CREATOR,
            ),
        }
    }

    fn approver(&self, person: &Person, role: &str) -> Approver {
        Approver::from_person(person, role).with_user_id(self.accounts.user_id_for(&person.email))
    }

    fn role_approver(&self, role: Role, department: Option<&str>) -> Approver {
        match self.directory.role_holder(role, department) {
            RoleHolder::Resolved(person) => self.approver(person, role.label()),
            RoleHolder::Dangling(email) => {
                warn!(
                    event_name = "directory.data_quality",
                    role = %role,
                    email = %email,
                    "role holder is not in the directory, emitting unresolved step"
                );
                Approver::unresolved(role.label(), Some(email))
            }
            RoleHolder::Unassigned => {
                warn!(
                    event_name = "directory.data_quality",
                    role = %role,
                    department = department.unwrap_or("-"),
                    "role has no holder, emitting unresolved step"
                );
                Approver::unresolved(role.label(), None)
            }
        }
    }

    fn creator_approver(&self, creator: &str) -> Approver {
        match self.directory.find_by_email(creator) {
            Ok(person) => self.approver(person, DOCUMENT_CREATOR),
            Err(_) => Approver {
                name: creator.to_string(),
                email: Some(normalize_email(creator)),
                role: DOCUMENT_CREATOR.to_string(),
                department: None,
                user_id: self.accounts.user_id_for(creator),
                unresolved_reference: None,
            },
        }
    }
}

fn supervisor_role(person: &Person) -> &str {
    let position = person.position.trim();
    if position.is_empty() {
        "Supervisor"
    } else {
        position
    }
}

#[cfg(test)]
mod tests {
    use super::{
        BuildOutcome, ChainBuilder, ChainPlan, Subject, SKIP_CREATOR_IS_APPROVER,
        SKIP_NO_CREATOR, SKIP_NO_SECOND_LEVEL, SKIP_SUBJECT_NOT_FOUND, SKIP_TOP_LEVEL_EMPLOYEE,
    };
    use crate::directory::fixtures::{acme, person};
    use crate::directory::{Directory, InMemoryAccountLookup, OrgChart, Role, RoleAssignments};
    use crate::domain::approval::{ApprovalChain, StepPayload, StepStatus};

    fn tail() -> Vec<Role> {
        vec![Role::Finance, Role::Coordinator, Role::TopApprover]
    }

    fn emails(chain: &ApprovalChain) -> Vec<Option<&str>> {
        chain.steps().iter().map(|step| step.approver.email.as_deref()).collect()
    }

    fn levels(chain: &ApprovalChain) -> Vec<u32> {
        chain.steps().iter().map(|step| step.level).collect()
    }

    #[test]
    fn escalation_walks_to_the_root_then_appends_the_tail() {
        let directory = acme();
        let chain = ChainBuilder::new(&directory)
            .supervisory_escalation("dev@acme.test", &tail())
            .expect("dev is in the directory");

        assert_eq!(
            emails(&chain),
            vec![
                Some("lead@acme.test"),
                Some("head@acme.test"),
                Some("ceo@acme.test"),
                Some("fin@acme.test"),
                Some("coord@acme.test"),
                Some("ceo@acme.test"),
            ]
        );
        assert_eq!(levels(&chain), vec![1, 2, 3, 4, 5, 6]);
        assert!(chain.steps().iter().all(|step| step.status == StepStatus::Pending));
    }

    #[test]
    fn escalation_stops_at_a_configured_root_even_if_it_reports_upward() {
        let directory = Directory::from_org_chart(OrgChart {
            hierarchy_roots: vec!["md@x.test".to_string()],
            people: vec![
                person("a@x.test", "Ops", Some("md@x.test")),
                person("md@x.test", "Board", Some("holding@x.test")),
                person("holding@x.test", "Board", None),
            ],
            ..OrgChart::default()
        })
        .expect("load");

        let chain = ChainBuilder::new(&directory)
            .supervisory_escalation("a@x.test", &[])
            .expect("subject exists");
        assert_eq!(emails(&chain), vec![Some("md@x.test")]);
    }

    #[test]
    fn escalation_breaks_reporting_cycles() {
        let directory = Directory::from_org_chart(OrgChart {
            people: vec![
                person("a@x.test", "Ops", Some("b@x.test")),
                person("b@x.test", "Ops", Some("a@x.test")),
            ],
            ..OrgChart::default()
        })
        .expect("load");

        let chain = ChainBuilder::new(&directory)
            .supervisory_escalation("a@x.test", &[Role::Finance])
            .expect("subject exists");

        assert_eq!(chain.len(), 2);
        assert_eq!(chain.step(1).and_then(|step| step.approver.email.as_deref()), Some("b@x.test"));
        assert!(!chain.step(2).map(|step| step.approver.is_resolved()).unwrap_or(true));
    }

    #[test]
    fn escalation_stops_at_dangling_reports_to() {
        let directory = Directory::from_org_chart(OrgChart {
            people: vec![
                person("a@x.test", "Ops", Some("b@x.test")),
                person("b@x.test", "Ops", Some("gone@x.test")),
            ],
            ..OrgChart::default()
        })
        .expect("load");

        let chain = ChainBuilder::new(&directory)
            .supervisory_escalation("a@x.test", &[])
            .expect("subject exists");
        assert_eq!(emails(&chain), vec![Some("b@x.test")]);
    }

    #[test]
    fn tail_is_not_deduplicated_against_walk() {
        let directory = acme();
        let chain = ChainBuilder::new(&directory)
            .supervisory_escalation("fin@acme.test", &tail())
            .expect("finance is in the directory");

        assert_eq!(
            emails(&chain),
            vec![
                Some("ceo@acme.test"),
                Some("fin@acme.test"),
                Some("coord@acme.test"),
                Some("ceo@acme.test"),
            ]
        );
    }

    #[test]
    fn fixed_depth_omits_creator_and_renumbers() {
        let directory = acme();
        let chain = ChainBuilder::new(&directory).fixed_depth(
            &[Role::DepartmentHead, Role::BusinessHead, Role::Finance],
            Some("Engineering"),
            Some("HEAD@acme.test"),
        );

        assert_eq!(emails(&chain), vec![Some("bh@acme.test"), Some("fin@acme.test")]);
        assert_eq!(levels(&chain), vec![1, 2]);
    }

    #[test]
    fn fixed_depth_omits_repeated_approvers() {
        let mut chart = OrgChart {
            roles: RoleAssignments {
                finance: Some("cfo@x.test".to_string()),
                business_head: Some("cfo@x.test".to_string()),
                ..RoleAssignments::default()
            },
            people: vec![person("cfo@x.test", "Finance", None)],
            ..OrgChart::default()
        };
        chart.department_heads.insert("Finance".to_string(), "cfo@x.test".to_string());
        let directory = Directory::from_org_chart(chart).expect("load");

        let chain = ChainBuilder::new(&directory).fixed_depth(
            &[Role::DepartmentHead, Role::BusinessHead, Role::Finance],
            Some("finance"),
            None,
        );

        assert_eq!(emails(&chain), vec![Some("cfo@x.test")]);
        assert_eq!(chain.step(1).map(|step| step.approver.role.as_str()), Some("Department Head"));
    }

    #[test]
    fn unresolvable_roles_emit_unresolved_steps() {
        let directory = Directory::from_org_chart(OrgChart {
            roles: RoleAssignments {
                finance: Some("ghost@x.test".to_string()),
                ..RoleAssignments::default()
            },
            people: vec![person("a@x.test", "Ops", None)],
            ..OrgChart::default()
        })
        .expect("load");

        let chain = ChainBuilder::new(&directory).fixed_depth(
            &[Role::DepartmentHead, Role::Finance],
            Some("Ops"),
            Some("a@x.test"),
        );

        assert_eq!(chain.len(), 2);
        assert!(chain.steps().iter().all(|step| !step.approver.is_resolved()));
        assert_eq!(
            chain.step(2).and_then(|step| step.approver.unresolved_reference.as_deref()),
            Some("ghost@x.test")
        );
    }

    #[test]
    fn three_level_chain_for_a_regular_employee() {
        let directory = acme();
        let chain = ChainBuilder::new(&directory)
            .explicit_three_level("dev@acme.test", Some("coord@acme.test"))
            .expect("dev is in the directory");

        assert_eq!(
            emails(&chain),
            vec![Some("lead@acme.test"), Some("head@acme.test"), Some("coord@acme.test")]
        );
        assert!(chain.steps().iter().all(|step| step.status == StepStatus::Pending));
        assert!(chain
            .steps()
            .iter()
            .all(|step| step.payload == Some(StepPayload::Grading { grade: None })));
    }

    #[test]
    fn three_level_chain_skips_when_supervisors_are_missing() {
        let directory = acme();
        let chain = ChainBuilder::new(&directory)
            .explicit_three_level("ceo@acme.test", Some("coord@acme.test"))
            .expect("ceo is in the directory");

        let statuses: Vec<StepStatus> = chain.steps().iter().map(|step| step.status).collect();
        assert_eq!(statuses, vec![StepStatus::Skipped, StepStatus::Skipped, StepStatus::Pending]);
        assert_eq!(
            chain.step(1).and_then(|step| step.skip_reason.as_deref()),
            Some(SKIP_TOP_LEVEL_EMPLOYEE)
        );

        let chain = ChainBuilder::new(&directory)
            .explicit_three_level("head@acme.test", None)
            .expect("head is in the directory");
        assert_eq!(chain.step(1).map(|step| step.status), Some(StepStatus::Pending));
        assert_eq!(
            chain.step(2).and_then(|step| step.skip_reason.as_deref()),
            Some(SKIP_NO_SECOND_LEVEL)
        );
        assert_eq!(
            chain.step(3).and_then(|step| step.skip_reason.as_deref()),
            Some(SKIP_NO_CREATOR)
        );
    }

    #[test]
    fn three_level_chain_skips_the_creator_as_supervisor() {
        let directory = acme();
        let chain = ChainBuilder::new(&directory)
            .explicit_three_level("dev@acme.test", Some("Lead@Acme.test"))
            .expect("dev is in the directory");

        assert_eq!(chain.step(1).map(|step| step.status), Some(StepStatus::Skipped));
        assert_eq!(
            chain.step(1).and_then(|step| step.skip_reason.as_deref()),
            Some(SKIP_CREATOR_IS_APPROVER)
        );
        assert_eq!(chain.step(3).map(|step| step.status), Some(StepStatus::Pending));
    }

    #[test]
    fn build_falls_back_when_subject_is_unknown() {
        let directory = acme();
        let builder = ChainBuilder::new(&directory);

        let BuildOutcome { chain, fallback_reason } = builder.build(
            &ChainPlan::SupervisoryEscalation { tail: tail() },
            &Subject::Employee("ghost@acme.test".to_string()),
            Some("dev@acme.test"),
        );
        assert!(fallback_reason.is_some());
        assert_eq!(
            emails(&chain),
            vec![Some("fin@acme.test"), Some("coord@acme.test"), Some("ceo@acme.test")]
        );

        let outcome = builder.build(
            &ChainPlan::ExplicitThreeLevel,
            &Subject::Employee("ghost@acme.test".to_string()),
            Some("coord@acme.test"),
        );
        assert_eq!(outcome.chain.len(), 3);
        assert_eq!(
            outcome.chain.step(2).and_then(|step| step.skip_reason.as_deref()),
            Some(SKIP_SUBJECT_NOT_FOUND)
        );
        assert_eq!(outcome.chain.step(3).map(|step| step.status), Some(StepStatus::Pending));
    }

    #[test]
    fn fixed_depth_falls_back_to_global_roles_without_a_department() {
        let directory = acme();
        let outcome = ChainBuilder::new(&directory).build(
            &ChainPlan::FixedDepth { roles: vec![Role::DepartmentHead, Role::Finance] },
            &Subject::Unassigned,
            None,
        );

        assert!(outcome.fallback_reason.is_some());
        assert_eq!(emails(&outcome.chain), vec![Some("fin@acme.test")]);

        let outcome = ChainBuilder::new(&directory).build(
            &ChainPlan::FixedDepth { roles: vec![Role::Finance, Role::TopApprover] },
            &Subject::Unassigned,
            None,
        );
        assert!(outcome.fallback_reason.is_none());
        assert_eq!(outcome.chain.len(), 2);
    }

    #[test]
    fn employee_subject_resolves_department_head() {
        let directory = acme();
        let outcome = ChainBuilder::new(&directory).build(
            &ChainPlan::FixedDepth { roles: vec![Role::DepartmentHead, Role::Finance] },
            &Subject::Employee("dev@acme.test".to_string()),
            Some("dev@acme.test"),
        );

        assert!(outcome.fallback_reason.is_none());
        assert_eq!(emails(&outcome.chain), vec![Some("head@acme.test"), Some("fin@acme.test")]);
    }

    #[test]
    fn account_lookup_fills_user_ids() {
        let directory = acme();
        let builder = ChainBuilder::new(&directory)
            .with_accounts(InMemoryAccountLookup::with_accounts([("lead@acme.test", "u-lead")]));

        let chain = builder
            .supervisory_escalation("dev@acme.test", &[])
            .expect("dev is in the directory");
        assert_eq!(chain.step(1).and_then(|step| step.approver.user_id.as_deref()), Some("u-lead"));
        assert_eq!(chain.step(2).and_then(|step| step.approver.user_id.as_deref()), None);
    }
}
