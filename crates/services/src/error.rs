//! Shared error types for the services crate.

use thiserror::Error;

use exam_core::model::{ChoiceId, QuestionId, TestCodeError};
use gateway::GatewayError;

/// Errors emitted by the attempt services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AttemptError {
    #[error("no attempt has been started")]
    NotStarted,
    #[error("an attempt is already active")]
    AlreadyStarted,
    #[error("no section is active")]
    NoActiveSection,
    #[error("no section is awaiting start")]
    NoPendingSection,
    #[error("section time has expired")]
    Expired,
    #[error("the attempt has not been completed")]
    NotCompleted,
    #[error("question {0} is not part of the active section")]
    UnknownQuestion(QuestionId),
    #[error("choice {0} does not belong to the question")]
    ForeignChoice(ChoiceId),
    #[error(transparent)]
    Code(#[from] TestCodeError),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

impl AttemptError {
    /// True when retrying the same call can reasonably succeed.
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        matches!(self, AttemptError::Gateway(e) if e.is_retriable())
    }
}
