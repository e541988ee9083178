//! crates/tutoring_core/src/error.rs
//!
//! Error taxonomy of the back-office operations.

use crate::domain::Role;
use crate::ports::PortError;

#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    /// Session, student or teacher lookup miss.
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Session {0} is already completed")]
    AlreadyCompleted(String),

    #[error("No session matches attendance code {0}")]
    InvalidCode(String),

    #[error("Name '{supplied}' does not match the expected {role} for this session")]
    NameMismatch { role: Role, supplied: String },

    #[error("Missing contact details: {0}")]
    MissingContact(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A concurrent writer changed the session between read and write.
    #[error("Session {0} was modified concurrently; reload and try again")]
    Conflict(String),

    /// Store failures abort the operation and surface as-is.
    #[error(transparent)]
    Store(#[from] PortError),
}

pub type DomainResult<T> = Result<T, DomainError>;

impl DomainError {
    /// Lifts a store lookup miss into a domain-level `NotFound`; everything else
    /// stays a store error.
    pub(crate) fn from_lookup(err: PortError) -> Self {
        match err {
            PortError::NotFound(what) => DomainError::NotFound(what),
            other => DomainError::Store(other),
        }
    }
}
