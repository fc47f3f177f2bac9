use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::directory::DirectoryError;
use crate::domain::person::{normalize_email, Person};

/// Organizational roles that fixed-depth chains and escalation tails resolve.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    DepartmentHead,
    BusinessHead,
    Finance,
    Coordinator,
    TopApprover,
}

impl Role {
    pub fn label(self) -> &'static str {
        match self {
            Self::DepartmentHead => "Department Head",
            Self::BusinessHead => "Business Head",
            Self::Finance => "Finance",
            Self::Coordinator => "Coordinator",
            Self::TopApprover => "Top Approver",
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            Self::DepartmentHead => "department_head",
            Self::BusinessHead => "business_head",
            Self::Finance => "finance",
            Self::Coordinator => "coordinator",
            Self::TopApprover => "top_approver",
        }
    }

    /// Department heads depend on the subject; every other role is global.
    pub fn is_subject_specific(self) -> bool {
        matches!(self, Self::DepartmentHead)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace(&['-', ' '][..], "_").as_str() {
            "department_head" => Ok(Self::DepartmentHead),
            "business_head" => Ok(Self::BusinessHead),
            "finance" => Ok(Self::Finance),
            "coordinator" => Ok(Self::Coordinator),
            "top_approver" => Ok(Self::TopApprover),
            other => Err(format!(
                "unsupported role `{other}` (expected department_head|business_head|\
                 finance|coordinator|top_approver)"
            )),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssignments {
    pub finance: Option<String>,
    pub coordinator: Option<String>,
    pub top_approver: Option<String>,
    pub business_head: Option<String>,
}

impl RoleAssignments {
    pub(crate) fn entries(&self) -> [(Role, Option<&String>); 4] {
        [
            (Role::Finance, self.finance.as_ref()),
            (Role::Coordinator, self.coordinator.as_ref()),
            (Role::TopApprover, self.top_approver.as_ref()),
            (Role::BusinessHead, self.business_head.as_ref()),
        ]
    }
}

/// Static organization chart as stored in configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgChart {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub hierarchy_roots: Vec<String>,
    #[serde(default)]
    pub roles: RoleAssignments,
    #[serde(default)]
    pub department_heads: BTreeMap<String, String>,
    #[serde(default)]
    pub people: Vec<Person>,
}

impl OrgChart {
    pub fn load(path: &Path) -> Result<Self, DirectoryError> {
        let raw = fs::read_to_string(path).map_err(|source| DirectoryError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        raw.parse::<Self>().map_err(|error| match error {
            DirectoryError::Parse { message, .. } => {
                DirectoryError::Parse { path: Some(path.to_path_buf()), message }
            }
            other => other,
        })
    }

    pub(crate) fn normalized_department_heads(&self) -> BTreeMap<String, String> {
        self.department_heads
            .iter()
            .map(|(department, email)| (normalize_department(department), normalize_email(email)))
            .collect()
    }
}

impl FromStr for OrgChart {
    type Err = DirectoryError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        toml::from_str::<Self>(raw)
            .map_err(|error| DirectoryError::Parse { path: None, message: error.to_string() })
    }
}

pub(crate) fn normalize_department(raw: &str) -> String {
    raw.trim().to_ascii_lowercase()
}
