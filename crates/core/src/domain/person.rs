use serde::{Deserialize, Serialize};

/// A node of the organization chart, keyed by email.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub position: String,
    /// `None` marks a hierarchy root.
    #[serde(default)]
    pub reports_to: Option<String>,
    #[serde(default)]
    pub can_supervise: Vec<String>,
    /// Informational only; traversal always follows `reports_to`.
    #[serde(default)]
    pub hierarchy_level: Option<u32>,
}

impl Person {
    pub fn key(&self) -> String {
        normalize_email(&self.email)
    }

    pub fn supervisor_key(&self) -> Option<String> {
        self.reports_to
            .as_deref()
            .map(normalize_email)
            .filter(|supervisor| !supervisor.is_empty())
    }
}

pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_ascii_lowercase()
}

pub fn same_email(left: &str, right: &str) -> bool {
    normalize_email(left) == normalize_email(right)
}
