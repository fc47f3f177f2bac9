//! Read-only organization directory.
//!
//! A [`Directory`] is an immutable snapshot of the org chart: people keyed by
//! normalized email, `reports_to` edges indexed in both directions, and the role
//! holders fixed-depth chains resolve. Chain construction only ever reads a
//! snapshot; refreshing the org chart swaps a whole new snapshot into a
//! [`DirectoryHandle`].

pub mod accounts;
pub mod org_chart;

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::person::{normalize_email, Person};

pub use accounts::{AccountLookup, InMemoryAccountLookup, NoAccountLookup};
pub use org_chart::{OrgChart, Role, RoleAssignments};

use org_chart::normalize_department;

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("person `{email}` was not found in the directory")]
    NotFound { email: String },
    #[error("could not read org chart `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse org chart{}: {message}", describe_source(.path))]
    Parse { path: Option<PathBuf>, message: String },
    #[error("org chart entry #{index} has a blank email")]
    BlankEmail { index: usize },
    #[error("org chart lists `{email}` more than once")]
    DuplicateEmail { email: String },
    #[error("hierarchy root `{email}` is not a person in the org chart")]
    UnknownHierarchyRoot { email: String },
}

fn describe_source(path: &Option<PathBuf>) -> String {
    path.as_ref().map(|path| format!(" `{}`", path.display())).unwrap_or_default()
}

/// Result of resolving a role against the directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RoleHolder<'a> {
    Resolved(&'a Person),
    /// The role points at an email with no directory entry.
    Dangling(String),
    Unassigned,
}

/// Soft org-chart defects. None of these block loading; they degrade the
/// affected steps to unresolved approvers instead.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataQualityFinding {
    DanglingReportsTo { email: String, reports_to: String },
    ReportingCycle { members: Vec<String> },
    UnassignedRole { role: Role },
    DanglingRole { role: Role, email: String },
    DanglingDepartmentHead { department: String, email: String },
}

impl DataQualityFinding {
    pub fn describe(&self) -> String {
        match self {
            Self::DanglingReportsTo { email, reports_to } => {
                format!("`{email}` reports to `{reports_to}`, who is not in the directory")
            }
            Self::ReportingCycle { members } => {
                format!("reporting cycle between {}", members.join(" -> "))
            }
            Self::UnassignedRole { role } => format!("role `{role}` has no assigned holder"),
            Self::DanglingRole { role, email } => {
                format!("role `{role}` is assigned to `{email}`, who is not in the directory")
            }
            Self::DanglingDepartmentHead { department, email } => {
                format!("department `{department}` head `{email}` is not in the directory")
            }
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct Directory {
    version: String,
    people: HashMap<String, Person>,
    subordinates: HashMap<String, Vec<String>>,
    hierarchy_roots: HashSet<String>,
    roles: BTreeMap<Role, String>,
    department_heads: BTreeMap<String, String>,
}

impl Directory {
    pub fn from_org_chart(chart: OrgChart) -> Result<Self, DirectoryError> {
        let mut people = HashMap::with_capacity(chart.people.len());
        for (index, person) in chart.people.iter().enumerate() {
            let key = person.key();
            if key.is_empty() {
                return Err(DirectoryError::BlankEmail { index });
            }
            if people.insert(key.clone(), person.clone()).is_some() {
                return Err(DirectoryError::DuplicateEmail { email: key });
            }
        }

        let mut hierarchy_roots = HashSet::new();
        for root in &chart.hierarchy_roots {
            let key = normalize_email(root);
            if !people.contains_key(&key) {
                return Err(DirectoryError::UnknownHierarchyRoot { email: root.clone() });
            }
            hierarchy_roots.insert(key);
        }

        let mut subordinates: HashMap<String, Vec<String>> = HashMap::new();
        for (key, person) in &people {
            if let Some(supervisor) = person.supervisor_key() {
                subordinates.entry(supervisor).or_default().push(key.clone());
            }
        }
        for reports in subordinates.values_mut() {
            reports.sort();
        }

        let roles = chart
            .roles
            .entries()
            .into_iter()
            .filter_map(|(role, email)| {
                let email = normalize_email(email?);
                (!email.is_empty()).then_some((role, email))
            })
            .collect();

        Ok(Self {
            version: chart.version.clone().unwrap_or_else(|| "unversioned".to_string()),
            department_heads: chart.normalized_department_heads(),
            people,
            subordinates,
            hierarchy_roots,
            roles,
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn len(&self) -> usize {
        self.people.len()
    }

    pub fn is_empty(&self) -> bool {
        self.people.is_empty()
    }

    pub fn find_by_email(&self, email: &str) -> Result<&Person, DirectoryError> {
        self.people
            .get(&normalize_email(email))
            .ok_or_else(|| DirectoryError::NotFound { email: email.trim().to_string() })
    }

    /// `None` for a root or for a `reports_to` that names nobody in the directory.
    pub fn supervisor_of(&self, email: &str) -> Option<&Person> {
        let person = self.people.get(&normalize_email(email))?;
        self.people.get(&person.supervisor_key()?)
    }

    pub fn subordinates_of(&self, email: &str) -> Vec<&Person> {
        self.subordinates
            .get(&normalize_email(email))
            .map(|keys| keys.iter().filter_map(|key| self.people.get(key)).collect())
            .unwrap_or_default()
    }

    pub fn is_hierarchy_root(&self, email: &str) -> bool {
        self.hierarchy_roots.contains(&normalize_email(email))
    }

    /// Resolves a role holder. `department` is only consulted for
    /// [`Role::DepartmentHead`].
    pub fn role_holder(&self, role: Role, department: Option<&str>) -> RoleHolder<'_> {
        let assigned = match role {
            Role::DepartmentHead => department
                .map(normalize_department)
                .and_then(|department| self.department_heads.get(&department)),
            _ => self.roles.get(&role),
        };

        match assigned {
            Some(email) => match self.people.get(email) {
                Some(person) => RoleHolder::Resolved(person),
                None => RoleHolder::Dangling(email.clone()),
            },
            None => RoleHolder::Unassigned,
        }
    }

    pub fn data_quality_findings(&self) -> Vec<DataQualityFinding> {
        let mut findings = Vec::new();

        let mut keys: Vec<&String> = self.people.keys().collect();
        keys.sort();
        for key in &keys {
            let Some(person) = self.people.get(*key) else {
                continue;
            };
            if let Some(supervisor) = person.supervisor_key() {
                if !self.people.contains_key(&supervisor) {
                    findings.push(DataQualityFinding::DanglingReportsTo {
                        email: (*key).clone(),
                        reports_to: supervisor,
                    });
                }
            }
        }

        findings.extend(
            self.reporting_cycles()
                .into_iter()
                .map(|members| DataQualityFinding::ReportingCycle { members }),
        );

        for role in [Role::BusinessHead, Role::Finance, Role::Coordinator, Role::TopApprover] {
            match self.role_holder(role, None) {
                RoleHolder::Resolved(_) => {}
                RoleHolder::Dangling(email) => {
                    findings.push(DataQualityFinding::DanglingRole { role, email })
                }
                RoleHolder::Unassigned => {
                    findings.push(DataQualityFinding::UnassignedRole { role })
                }
            }
        }

        for (department, email) in &self.department_heads {
            if !self.people.contains_key(email) {
                findings.push(DataQualityFinding::DanglingDepartmentHead {
                    department: department.clone(),
                    email: email.clone(),
                });
            }
        }

        findings
    }

    /// Each cycle is reported once, rotated to start at its smallest email.
    fn reporting_cycles(&self) -> Vec<Vec<String>> {
        let mut cycles = BTreeSet::new();
        let mut cleared: HashSet<&str> = HashSet::new();

        let mut keys: Vec<&String> = self.people.keys().collect();
        keys.sort();
        for start in keys {
            let mut path: Vec<&str> = Vec::new();
            let mut on_path: HashMap<&str, usize> = HashMap::new();
            let mut current = Some(start.as_str());

            while let Some(key) = current {
                if cleared.contains(key) {
                    break;
                }
                if let Some(&position) = on_path.get(key) {
                    let mut members: Vec<String> =
                        path[position..].iter().map(|member| (*member).to_string()).collect();
                    if let Some(min_index) = members
                        .iter()
                        .enumerate()
                        .min_by(|left, right| left.1.cmp(right.1))
                        .map(|(index, _)| index)
                    {
                        members.rotate_left(min_index);
                    }
                    cycles.insert(members);
                    break;
                }
                on_path.insert(key, path.len());
                path.push(key);
                current = self
                    .people
                    .get(key)
                    .and_then(|person| person.reports_to.as_deref())
                    .and_then(|supervisor| {
                        self.people
                            .get_key_value(&normalize_email(supervisor))
                            .map(|(supervisor_key, _)| supervisor_key.as_str())
                    });
            }

            cleared.extend(path);
        }

        cycles.into_iter().collect()
    }
}

/// Shared handle the hosting process refreshes between requests.
///
/// Readers take a [`snapshot`](Self::snapshot) once per call and keep using it,
/// so a concurrent [`replace`](Self::replace) never changes the directory in
/// the middle of a chain computation.
#[derive(Clone, Debug, Default)]
pub struct DirectoryHandle {
    current: Arc<RwLock<Arc<Directory>>>,
}

impl DirectoryHandle {
    pub fn new(directory: Directory) -> Self {
        Self { current: Arc::new(RwLock::new(Arc::new(directory))) }
    }

    pub fn snapshot(&self) -> Arc<Directory> {
        match self.current.read() {
            Ok(current) => Arc::clone(&current),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    pub fn replace(&self, directory: Directory) {
        let version = directory.version().to_string();
        let people = directory.len();
        match self.current.write() {
            Ok(mut current) => *current = Arc::new(directory),
            Err(poisoned) => *poisoned.into_inner() = Arc::new(directory),
        }
        tracing::info!(
            event_name = "directory.snapshot.replaced",
            version = %version,
            people,
            "directory snapshot replaced"
        );
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::{acme, person};
    use super::{
        DataQualityFinding, Directory, DirectoryError, DirectoryHandle, OrgChart, Role, RoleHolder,
    };

    #[test]
    fn find_by_email_is_trimmed_and_case_insensitive() {
        let directory = acme();

        let found = directory.find_by_email("  DEV@Acme.Test ").expect("dev should resolve");
        assert_eq!(found.email, "dev@acme.test");
        assert!(matches!(
            directory.find_by_email("ghost@acme.test"),
            Err(DirectoryError::NotFound { ref email }) if email == "ghost@acme.test"
        ));
    }

    #[test]
    fn supervisor_and_subordinate_edges_resolve_both_ways() {
        let directory = acme();

        assert_eq!(
            directory.supervisor_of("dev@acme.test").map(|person| person.email.as_str()),
            Some("lead@acme.test")
        );
        assert!(directory.supervisor_of("ceo@acme.test").is_none());

        let reports: Vec<&str> = directory
            .subordinates_of("ceo@acme.test")
            .into_iter()
            .map(|person| person.email.as_str())
            .collect();
        assert_eq!(
            reports,
            vec!["bh@acme.test", "coord@acme.test", "fin@acme.test", "head@acme.test"]
        );
    }

    #[test]
    fn dangling_supervisor_resolves_to_none() {
        let directory = Directory::from_org_chart(OrgChart {
            people: vec![person("a@x.test", "Ops", Some("gone@x.test"))],
            ..OrgChart::default()
        })
        .expect("dangling reference is not a load error");

        assert!(directory.supervisor_of("a@x.test").is_none());
        assert_eq!(
            directory.data_quality_findings().first(),
            Some(&DataQualityFinding::DanglingReportsTo {
                email: "a@x.test".to_string(),
                reports_to: "gone@x.test".to_string(),
            })
        );
    }

    #[test]
    fn duplicate_and_blank_emails_are_refused() {
        let duplicate = Directory::from_org_chart(OrgChart {
            people: vec![person("a@x.test", "Ops", None), person("A@X.test ", "Ops", None)],
            ..OrgChart::default()
        });
        assert!(matches!(duplicate, Err(DirectoryError::DuplicateEmail { .. })));

        let blank = Directory::from_org_chart(OrgChart {
            people: vec![person("a@x.test", "Ops", None), person("  ", "Ops", None)],
            ..OrgChart::default()
        });
        assert!(matches!(blank, Err(DirectoryError::BlankEmail { index: 1 })));
    }

    #[test]
    fn hierarchy_roots_must_exist() {
        let result = Directory::from_org_chart(OrgChart {
            hierarchy_roots: vec!["nobody@x.test".to_string()],
            people: vec![person("a@x.test", "Ops", None)],
            ..OrgChart::default()
        });

        assert!(matches!(result, Err(DirectoryError::UnknownHierarchyRoot { .. })));
    }

    #[test]
    fn role_holders_resolve_dangle_or_are_unassigned() {
        let directory = acme();

        assert!(matches!(
            directory.role_holder(Role::Finance, None),
            RoleHolder::Resolved(person) if person.email == "fin@acme.test"
        ));
        assert!(matches!(
            directory.role_holder(Role::DepartmentHead, Some(" engineering ")),
            RoleHolder::Resolved(person) if person.email == "head@acme.test"
        ));
        assert_eq!(
            directory.role_holder(Role::DepartmentHead, Some("Legal")),
            RoleHolder::Unassigned
        );
        assert_eq!(directory.role_holder(Role::DepartmentHead, None), RoleHolder::Unassigned);

        let mut chart =
            OrgChart { people: vec![person("a@x.test", "Ops", None)], ..OrgChart::default() };
        chart.roles.finance = Some("ghost@x.test".to_string());
        let directory = Directory::from_org_chart(chart).expect("load");
        assert_eq!(
            directory.role_holder(Role::Finance, None),
            RoleHolder::Dangling("ghost@x.test".to_string())
        );
    }

    #[test]
    fn reporting_cycles_are_reported_once() {
        let directory = Directory::from_org_chart(OrgChart {
            people: vec![
                person("b@x.test", "Ops", Some("a@x.test")),
                person("a@x.test", "Ops", Some("b@x.test")),
                person("c@x.test", "Ops", Some("a@x.test")),
            ],
            ..OrgChart::default()
        })
        .expect("cycles are not a load error");

        let cycles: Vec<DataQualityFinding> = directory
            .data_quality_findings()
            .into_iter()
            .filter(|finding| matches!(finding, DataQualityFinding::ReportingCycle { .. }))
            .collect();
        assert_eq!(
            cycles,
            vec![DataQualityFinding::ReportingCycle {
                members: vec!["a@x.test".to_string(), "b@x.test".to_string()],
            }]
        );
    }

    #[test]
    fn clean_fixture_has_no_findings() {
        assert!(acme().data_quality_findings().is_empty());
    }

    #[test]
    fn handle_snapshots_survive_replacement() {
        let handle = DirectoryHandle::new(acme());
        let before = handle.snapshot();

        handle.replace(Directory::default());

        assert_eq!(before.len(), 7);
        assert!(handle.snapshot().is_empty());
        assert_eq!(handle.snapshot().version(), "");
    }
}
