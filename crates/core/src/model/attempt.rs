use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::model::ids::{AttemptId, ChoiceId, ExamId, QuestionId, SectionId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AttemptStateError {
    #[error("attempt is already finished")]
    AlreadyFinished,

    #[error("score ({score}) exceeds total marks ({total})")]
    ScoreExceedsTotal { score: u32, total: u32 },
}

//
// ─── STATUS ────────────────────────────────────────────────────────────────────
//

/// Lifecycle status of a test attempt, as tracked by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    NotStarted,
    InProgress,
    Completed,
    #[serde(rename = "timeout")]
    TimedOut,
}

impl AttemptStatus {
    /// True once the attempt can no longer change.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, AttemptStatus::Completed | AttemptStatus::TimedOut)
    }
}

impl fmt::Display for AttemptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptStatus::NotStarted => write!(f, "not started"),
            AttemptStatus::InProgress => write!(f, "in progress"),
            AttemptStatus::Completed => write!(f, "completed"),
            AttemptStatus::TimedOut => write!(f, "timed out"),
        }
    }
}

//
// ─── ANSWERS ───────────────────────────────────────────────────────────────────
//

/// A student's answer to one question.
///
/// Selectable questions carry a choice id, short-answer questions free text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerValue {
    Choice(ChoiceId),
    Text(String),
}

impl AnswerValue {
    #[must_use]
    pub fn as_choice(&self) -> Option<ChoiceId> {
        match self {
            AnswerValue::Choice(id) => Some(*id),
            AnswerValue::Text(_) => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AnswerValue::Choice(_) => None,
            AnswerValue::Text(t) => Some(t),
        }
    }

    /// True for text answers that contain no visible characters.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        match self {
            AnswerValue::Choice(_) => false,
            AnswerValue::Text(t) => t.trim().is_empty(),
        }
    }
}

/// One (question, answer) pair as sent to the backend.
///
/// Unanswered questions never appear in a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptAnswer {
    pub question_id: QuestionId,
    pub value: AnswerValue,
}

//
// ─── ATTEMPT ───────────────────────────────────────────────────────────────────
//

/// A student's run through one exam.
///
/// The backend owns the authoritative copy; this mirrors just enough of it to
/// drive the client. Once finished, the record no longer changes.
#[derive(Debug, Clone, PartialEq)]
pub struct Attempt {
    id: AttemptId,
    exam_id: ExamId,
    status: AttemptStatus,
    started_at: DateTime<Utc>,
    current_section: Option<SectionId>,
}

impl Attempt {
    /// Creates an attempt that has just been started on the backend.
    #[must_use]
    pub fn started(
        id: AttemptId,
        exam_id: ExamId,
        started_at: DateTime<Utc>,
        current_section: SectionId,
    ) -> Self {
        Self {
            id,
            exam_id,
            status: AttemptStatus::InProgress,
            started_at,
            current_section: Some(current_section),
        }
    }

    // Accessors
    #[must_use]
    pub fn id(&self) -> AttemptId {
        self.id
    }

    #[must_use]
    pub fn exam_id(&self) -> ExamId {
        self.exam_id
    }

    #[must_use]
    pub fn status(&self) -> AttemptStatus {
        self.status
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn current_section(&self) -> Option<SectionId> {
        self.current_section
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.status.is_terminal()
    }

    /// Move the attempt onto the given section.
    ///
    /// # Errors
    ///
    /// Returns `AttemptStateError::AlreadyFinished` if the attempt is terminal.
    pub fn advance_to(&mut self, section: SectionId) -> Result<(), AttemptStateError> {
        if self.is_finished() {
            return Err(AttemptStateError::AlreadyFinished);
        }
        self.current_section = Some(section);
        Ok(())
    }

    /// Mark the attempt completed.
    ///
    /// # Errors
    ///
    /// Returns `AttemptStateError::AlreadyFinished` if the attempt is terminal.
    pub fn complete(&mut self) -> Result<(), AttemptStateError> {
        self.finish(AttemptStatus::Completed)
    }

    /// Mark the attempt as ended by a timer expiry.
    ///
    /// # Errors
    ///
    /// Returns `AttemptStateError::AlreadyFinished` if the attempt is terminal.
    pub fn time_out(&mut self) -> Result<(), AttemptStateError> {
        self.finish(AttemptStatus::TimedOut)
    }

    fn finish(&mut self, status: AttemptStatus) -> Result<(), AttemptStateError> {
        if self.is_finished() {
            return Err(AttemptStateError::AlreadyFinished);
        }
        self.status = status;
        self.current_section = None;
        Ok(())
    }
}

//
// ─── RESULTS ───────────────────────────────────────────────────────────────────
//

/// Per-section score line of a finished attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionResult {
    section_name: String,
    score: u32,
    total_marks: u32,
    time_taken_secs: u32,
}

impl SectionResult {
    /// Creates a section result line.
    ///
    /// # Errors
    ///
    /// Returns `AttemptStateError::ScoreExceedsTotal` if `score > total_marks`.
    pub fn new(
        section_name: impl Into<String>,
        score: u32,
        total_marks: u32,
        time_taken_secs: u32,
    ) -> Result<Self, AttemptStateError> {
        if score > total_marks {
            return Err(AttemptStateError::ScoreExceedsTotal {
                score,
                total: total_marks,
            });
        }
        Ok(Self {
            section_name: section_name.into(),
            score,
            total_marks,
            time_taken_secs,
        })
    }

    #[must_use]
    pub fn section_name(&self) -> &str {
        &self.section_name
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn total_marks(&self) -> u32 {
        self.total_marks
    }

    #[must_use]
    pub fn time_taken_secs(&self) -> u32 {
        self.time_taken_secs
    }

    #[must_use]
    pub fn percentage(&self) -> f64 {
        percentage_of(self.score, self.total_marks)
    }
}

/// Final outcome of a finished attempt, as reported by the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptResult {
    score: u32,
    total_marks: u32,
    time_taken_secs: u32,
    passed: bool,
    completed_at: Option<DateTime<Utc>>,
    section_results: Vec<SectionResult>,
}

impl AttemptResult {
    /// Creates a final result.
    ///
    /// # Errors
    ///
    /// Returns `AttemptStateError::ScoreExceedsTotal` if `score > total_marks`.
    pub fn new(
        score: u32,
        total_marks: u32,
        time_taken_secs: u32,
        passed: bool,
        completed_at: Option<DateTime<Utc>>,
        section_results: Vec<SectionResult>,
    ) -> Result<Self, AttemptStateError> {
        if score > total_marks {
            return Err(AttemptStateError::ScoreExceedsTotal {
                score,
                total: total_marks,
            });
        }
        Ok(Self {
            score,
            total_marks,
            time_taken_secs,
            passed,
            completed_at,
            section_results,
        })
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn total_marks(&self) -> u32 {
        self.total_marks
    }

    #[must_use]
    pub fn time_taken_secs(&self) -> u32 {
        self.time_taken_secs
    }

    #[must_use]
    pub fn passed(&self) -> bool {
        self.passed
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    #[must_use]
    pub fn section_results(&self) -> &[SectionResult] {
        &self.section_results
    }

    #[must_use]
    pub fn percentage(&self) -> f64 {
        percentage_of(self.score, self.total_marks)
    }
}

fn percentage_of(score: u32, total: u32) -> f64 {
    if total == 0 {
        return 0.0;
    }
    f64::from(score) / f64::from(total) * 100.0
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn attempt_starts_in_progress() {
        let attempt = Attempt::started(
            AttemptId::new(1),
            ExamId::new(7),
            fixed_now(),
            SectionId::new(3),
        );

        assert_eq!(attempt.status(), AttemptStatus::InProgress);
        assert_eq!(attempt.current_section(), Some(SectionId::new(3)));
        assert!(!attempt.is_finished());
    }

    #[test]
    fn attempt_completion_is_final() {
        let mut attempt = Attempt::started(
            AttemptId::new(1),
            ExamId::new(7),
            fixed_now(),
            SectionId::new(3),
        );

        attempt.complete().unwrap();
        assert_eq!(attempt.status(), AttemptStatus::Completed);
        assert_eq!(attempt.current_section(), None);

        assert_eq!(
            attempt.advance_to(SectionId::new(4)).unwrap_err(),
            AttemptStateError::AlreadyFinished
        );
        assert_eq!(
            attempt.time_out().unwrap_err(),
            AttemptStateError::AlreadyFinished
        );
    }

    #[test]
    fn attempt_timeout_is_terminal() {
        let mut attempt = Attempt::started(
            AttemptId::new(1),
            ExamId::new(7),
            fixed_now(),
            SectionId::new(3),
        );

        attempt.time_out().unwrap();
        assert_eq!(attempt.status(), AttemptStatus::TimedOut);
        assert!(attempt.is_finished());
        assert!(attempt.status().is_terminal());
    }

    #[test]
    fn answer_value_accessors() {
        let choice = AnswerValue::Choice(ChoiceId::new(9));
        assert_eq!(choice.as_choice(), Some(ChoiceId::new(9)));
        assert_eq!(choice.as_text(), None);
        assert!(!choice.is_blank());

        let text = AnswerValue::Text("entropy always increases".into());
        assert_eq!(text.as_text(), Some("entropy always increases"));
        assert!(!text.is_blank());
        assert!(AnswerValue::Text("   ".into()).is_blank());
    }

    #[test]
    fn result_rejects_score_above_total() {
        let err = AttemptResult::new(11, 10, 60, true, None, Vec::new()).unwrap_err();
        assert_eq!(
            err,
            AttemptStateError::ScoreExceedsTotal {
                score: 11,
                total: 10
            }
        );
    }

    #[test]
    fn result_computes_percentage() {
        let sections = vec![
            SectionResult::new("Reading", 3, 5, 120).unwrap(),
            SectionResult::new("Writing", 5, 5, 90).unwrap(),
        ];
        let result = AttemptResult::new(8, 10, 210, true, Some(fixed_now()), sections).unwrap();

        assert!((result.percentage() - 80.0).abs() < f64::EPSILON);
        assert!((result.section_results()[0].percentage() - 60.0).abs() < f64::EPSILON);
        assert!(result.passed());
    }

    #[test]
    fn zero_total_marks_scores_zero_percent() {
        let result = AttemptResult::new(0, 0, 10, false, None, Vec::new()).unwrap();
        assert!((result.percentage() - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn status_serde_names_match_backend() {
        assert_eq!(
            serde_json::to_string(&AttemptStatus::InProgress).unwrap(),
            "\"in_progress\""
        );
        assert_eq!(
            serde_json::to_string(&AttemptStatus::TimedOut).unwrap(),
            "\"timeout\""
        );
        let parsed: AttemptStatus = serde_json::from_str("\"not_started\"").unwrap();
        assert_eq!(parsed, AttemptStatus::NotStarted);
    }
}
