use thiserror::Error;

use crate::approvals::state::TransitionError;
use crate::directory::DirectoryError;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("`{actor}` is not the approver for level {level}")]
    Unauthorized { level: u32, actor: String },
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error("invalid decision payload: {0}")]
    InvalidPayload(String),
}

impl DomainError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }

    pub fn is_invalid_transition(&self) -> bool {
        matches!(
            self,
            Self::Transition(
                TransitionError::InvalidTransition { .. } | TransitionError::NotResubmittable { .. }
            )
        )
    }
}

#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Directory(#[from] DirectoryError),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("forbidden: {message}")]
    Forbidden { message: String, correlation_id: String },
    #[error("not found: {message}")]
    NotFound { message: String, correlation_id: String },
    #[error("conflict: {message}")]
    Conflict { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::Forbidden { .. } => "You are not the approver for this step.",
            Self::NotFound { .. } => "The requested approval step does not exist.",
            Self::Conflict { .. } => "This step is not awaiting your decision yet.",
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::Forbidden { correlation_id, .. }
            | Self::NotFound { correlation_id, .. }
            | Self::Conflict { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::Forbidden { correlation_id: id, .. }
            | InterfaceError::NotFound { correlation_id: id, .. }
            | InterfaceError::Conflict { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        let correlation_id = "unassigned".to_owned();
        match value {
            ApplicationError::Domain(DomainError::Unauthorized { .. }) => {
                Self::Forbidden { message: value.to_string(), correlation_id }
            }
            ApplicationError::Domain(DomainError::Transition(
                TransitionError::InvalidTransition { .. }
                | TransitionError::NotResubmittable { .. },
            )) => Self::Conflict { message: value.to_string(), correlation_id },
            ApplicationError::Domain(DomainError::Transition(
                TransitionError::LevelNotFound { .. },
            ))
            | ApplicationError::Directory(DirectoryError::NotFound { .. }) => {
                Self::NotFound { message: value.to_string(), correlation_id }
            }
            ApplicationError::Domain(DomainError::InvalidPayload(_)) => {
                Self::BadRequest { message: value.to_string(), correlation_id }
            }
            ApplicationError::Directory(_) | ApplicationError::Configuration(_) => {
                Self::Internal { message: value.to_string(), correlation_id }
            }
        }
    }
}
