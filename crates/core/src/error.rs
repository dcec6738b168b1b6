use thiserror::Error;

use crate::model::{AttemptStateError, ExamError, QuestionError, TestCodeError};

/// Umbrella error for domain validation failures.
///
/// Gateways funnel their payload-to-domain conversions through this so a
/// malformed backend response surfaces as one error type.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Exam(#[from] ExamError),
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Attempt(#[from] AttemptStateError),
    #[error(transparent)]
    TestCode(#[from] TestCodeError),
}
