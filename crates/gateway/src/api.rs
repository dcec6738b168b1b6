use async_trait::async_trait;
use chrono::{DateTime, Utc};

use exam_core::model::{
    Attempt, AttemptAnswer, AttemptId, AttemptResult, Exam, ExamId, Question, SectionId, TestCode,
};

use crate::error::GatewayError;

//
// ─── PAYLOADS ──────────────────────────────────────────────────────────────────
//

/// Outcome of starting (or resuming) an attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct StartedAttempt {
    pub attempt: Attempt,
    pub exam: Exam,
}

/// Everything the client needs to run one section.
///
/// `started_at` is the server-side timestamp the countdown derives from; for
/// a resumed section it is the original start, not the time of this call.
/// `saved_answers` re-seeds the local answer sheet after a reload.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionStart {
    pub section_id: SectionId,
    pub started_at: DateTime<Utc>,
    pub time_limit_secs: u32,
    pub questions: Vec<Question>,
    pub saved_answers: Vec<AttemptAnswer>,
}

/// Outcome of completing a section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionOutcome {
    /// The section to move on to, or `None` when this was the last one.
    pub next_section: Option<SectionId>,
}

/// Acknowledgement of a finalized test.
///
/// The completion call returns only the headline numbers; the per-section
/// breakdown lives behind [`fetch_result`](ExamGateway::fetch_result).
/// `time_taken_secs` is `None` when the backend does not echo it back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TestCompletion {
    pub score: u32,
    pub total_marks: u32,
    pub time_taken_secs: Option<u32>,
}

//
// ─── GATEWAY ───────────────────────────────────────────────────────────────────
//

/// Backend contract for taking a test.
///
/// Implemented over HTTP for production and in memory for tests. All methods
/// speak domain types; wire formats stay inside the implementations.
#[async_trait]
pub trait ExamGateway: Send + Sync {
    /// Start a new attempt, or resume the student's in-progress one.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::NotFound` for an unknown test,
    /// `GatewayError::Conflict` if the attempt was already completed, and
    /// `GatewayError::Forbidden` if the test is not assigned to the student.
    async fn start_attempt(&self, exam_id: ExamId) -> Result<StartedAttempt, GatewayError>;

    /// Start an attempt through a six-digit access code.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::NotFound` for a code that matches no test,
    /// otherwise fails like [`start_attempt`](Self::start_attempt).
    async fn start_attempt_by_code(&self, code: &TestCode)
    -> Result<StartedAttempt, GatewayError>;

    /// Start (or resume) one section and fetch its questions.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Conflict` if the section was already completed,
    /// `GatewayError::NotFound` if the test, section, or attempt is missing.
    async fn start_section(
        &self,
        exam_id: ExamId,
        section_id: SectionId,
    ) -> Result<SectionStart, GatewayError>;

    /// Persist one answer. Last write per question wins.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::NotFound` for an unknown question,
    /// `GatewayError::Validation` for a choice that does not belong to it,
    /// and `GatewayError::Conflict` once the attempt is finished.
    async fn save_answer(
        &self,
        exam_id: ExamId,
        answer: &AttemptAnswer,
    ) -> Result<(), GatewayError>;

    /// Complete one section, flushing any unsent answers with the call.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Conflict` if the section was already completed.
    async fn complete_section(
        &self,
        exam_id: ExamId,
        section_id: SectionId,
        answers: &[AttemptAnswer],
    ) -> Result<SectionOutcome, GatewayError>;

    /// Finalize the attempt and collect the scored acknowledgement.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Conflict` if the attempt was already finalized.
    async fn complete_test(
        &self,
        exam_id: ExamId,
        attempt_id: AttemptId,
        answers: &[AttemptAnswer],
        time_taken_secs: u32,
    ) -> Result<TestCompletion, GatewayError>;

    /// Fetch the result of a finished attempt, including per-section lines.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::NotFound` while the attempt is still open.
    async fn fetch_result(&self, exam_id: ExamId) -> Result<AttemptResult, GatewayError>;
}
