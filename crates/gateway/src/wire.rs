use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use exam_core::model::{
    AnswerValue, Attempt, AttemptAnswer, AttemptId, AttemptResult, Choice, ChoiceId, ChoiceLabel,
    Difficulty, Exam, ExamId, Question, QuestionId, QuestionKind, Section, SectionId,
    SectionResult,
};

use crate::api::{SectionOutcome, SectionStart, StartedAttempt, TestCompletion};

//
// ─── REQUEST BODIES ────────────────────────────────────────────────────────────
//

#[derive(Debug, Serialize)]
pub struct StartByCodeRequest {
    pub test_code: String,
}

/// One answer as the backend expects it. Exactly one of `choice_id` and
/// `text_answer` is present.
#[derive(Debug, Clone, Serialize)]
pub struct AnswerBody {
    pub question_id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub choice_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_answer: Option<String>,
}

impl AnswerBody {
    #[must_use]
    pub fn from_answer(answer: &AttemptAnswer) -> Self {
        match &answer.value {
            AnswerValue::Choice(choice_id) => Self {
                question_id: answer.question_id.value(),
                choice_id: Some(choice_id.value()),
                text_answer: None,
            },
            AnswerValue::Text(text) => Self {
                question_id: answer.question_id.value(),
                choice_id: None,
                text_answer: Some(text.clone()),
            },
        }
    }

    #[must_use]
    pub fn from_answers(answers: &[AttemptAnswer]) -> Vec<Self> {
        answers.iter().map(Self::from_answer).collect()
    }
}

#[derive(Debug, Serialize)]
pub struct CompleteSectionRequest {
    pub answers: Vec<AnswerBody>,
}

#[derive(Debug, Serialize)]
pub struct CompleteTestRequest {
    pub attempt_id: u64,
    pub answers: Vec<AnswerBody>,
    pub time_taken: u32,
}

//
// ─── RESPONSE BODIES ───────────────────────────────────────────────────────────
//

/// Error detail shape the backend uses for non-2xx responses.
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
}

impl ErrorBody {
    /// Best-effort human-readable message out of an error payload.
    #[must_use]
    pub fn message(self, fallback: &str) -> String {
        self.error
            .or(self.detail)
            .unwrap_or_else(|| fallback.to_owned())
    }
}

#[derive(Debug, Deserialize)]
pub struct TestPayload {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub difficulty: Difficulty,
    pub total_marks: u32,
    pub passing_marks: u32,
}

#[derive(Debug, Deserialize)]
pub struct SectionRef {
    pub id: u64,
}

#[derive(Debug, Deserialize)]
pub struct SectionPayload {
    pub id: u64,
    pub name: String,
    pub order: u32,
    pub time_limit_seconds: u32,
    pub question_count: u32,
}

impl SectionPayload {
    fn into_section(self) -> Result<Section, exam_core::Error> {
        Ok(Section::new(
            SectionId::new(self.id),
            self.name,
            self.order,
            self.time_limit_seconds,
            self.question_count,
        )?)
    }
}

#[derive(Debug, Deserialize)]
pub struct StartAttemptResponse {
    pub attempt_id: u64,
    pub started_at: DateTime<Utc>,
    pub test: TestPayload,
    pub current_section: SectionRef,
    pub sections: Vec<SectionPayload>,
}

impl StartAttemptResponse {
    /// Convert the payload into a validated attempt plus exam.
    ///
    /// # Errors
    ///
    /// Returns a domain validation error if any field fails the exam or
    /// section invariants.
    pub fn into_domain(self) -> Result<StartedAttempt, exam_core::Error> {
        let sections = self
            .sections
            .into_iter()
            .map(SectionPayload::into_section)
            .collect::<Result<Vec<_>, _>>()?;
        let exam = Exam::new(
            ExamId::new(self.test.id),
            self.test.title,
            self.test.description,
            self.test.difficulty,
            self.test.total_marks,
            self.test.passing_marks,
            sections,
        )?;
        let attempt = Attempt::started(
            AttemptId::new(self.attempt_id),
            exam.id(),
            self.started_at,
            SectionId::new(self.current_section.id),
        );
        Ok(StartedAttempt { attempt, exam })
    }
}

#[derive(Debug, Deserialize)]
pub struct ChoicePayload {
    pub id: u64,
    pub choice_label: String,
    pub choice_text: String,
}

impl ChoicePayload {
    fn into_choice(self) -> Result<Choice, exam_core::Error> {
        let label: ChoiceLabel = self.choice_label.parse()?;
        Ok(Choice::new(ChoiceId::new(self.id), label, self.choice_text)?)
    }
}

fn default_kind() -> QuestionKind {
    QuestionKind::MultipleChoice
}

#[derive(Debug, Deserialize)]
pub struct QuestionPayload {
    pub id: u64,
    pub question_text: String,
    #[serde(default)]
    pub passage_text: Option<String>,
    pub marks: u32,
    pub order: u32,
    /// Backends that only serve multiple-choice tests omit this field.
    #[serde(default = "default_kind")]
    pub kind: QuestionKind,
    #[serde(default)]
    pub choices: Vec<ChoicePayload>,
    #[serde(default)]
    pub selected_choice_id: Option<u64>,
    #[serde(default)]
    pub text_answer: Option<String>,
}

impl QuestionPayload {
    /// A previously saved answer carried with the question, if any.
    fn saved_answer(&self) -> Option<AttemptAnswer> {
        let question_id = QuestionId::new(self.id);
        if let Some(choice_id) = self.selected_choice_id {
            return Some(AttemptAnswer {
                question_id,
                value: AnswerValue::Choice(ChoiceId::new(choice_id)),
            });
        }
        let text = self.text_answer.as_deref()?.trim();
        if text.is_empty() {
            return None;
        }
        Some(AttemptAnswer {
            question_id,
            value: AnswerValue::Text(text.to_owned()),
        })
    }

    fn into_question(self) -> Result<Question, exam_core::Error> {
        let choices = self
            .choices
            .into_iter()
            .map(ChoicePayload::into_choice)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Question::new(
            QuestionId::new(self.id),
            self.question_text,
            self.passage_text,
            self.marks,
            self.order,
            self.kind,
            choices,
        )?)
    }
}

#[derive(Debug, Deserialize)]
pub struct SectionTiming {
    pub id: u64,
    pub started_at: DateTime<Utc>,
    pub time_limit_seconds: u32,
}

#[derive(Debug, Deserialize)]
pub struct SectionStartResponse {
    pub section: SectionTiming,
    pub questions: Vec<QuestionPayload>,
}

impl SectionStartResponse {
    /// Convert the payload into validated questions plus timing data.
    ///
    /// # Errors
    ///
    /// Returns a domain validation error for malformed questions or choices.
    pub fn into_domain(self) -> Result<SectionStart, exam_core::Error> {
        let mut questions = Vec::with_capacity(self.questions.len());
        let mut saved_answers = Vec::new();
        for payload in self.questions {
            if let Some(answer) = payload.saved_answer() {
                saved_answers.push(answer);
            }
            questions.push(payload.into_question()?);
        }

        Ok(SectionStart {
            section_id: SectionId::new(self.section.id),
            started_at: self.section.started_at,
            time_limit_secs: self.section.time_limit_seconds,
            questions,
            saved_answers,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct CompleteSectionResponse {
    #[serde(default)]
    pub next_section: Option<SectionRef>,
}

impl CompleteSectionResponse {
    #[must_use]
    pub fn into_domain(self) -> SectionOutcome {
        SectionOutcome {
            next_section: self.next_section.map(|s| SectionId::new(s.id)),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CompleteTestResponse {
    pub score: u32,
    pub total_marks: u32,
    // Not every deployment echoes the submitted time back.
    #[serde(default)]
    pub time_taken: Option<u32>,
}

impl CompleteTestResponse {
    #[must_use]
    pub fn into_domain(self) -> TestCompletion {
        TestCompletion {
            score: self.score,
            total_marks: self.total_marks,
            time_taken_secs: self.time_taken,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SectionResultPayload {
    pub section_name: String,
    pub score: u32,
    pub total_marks: u32,
    pub time_taken: u32,
}

#[derive(Debug, Deserialize)]
pub struct ResultResponse {
    pub total_score: u32,
    pub total_marks: u32,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    pub passed: bool,
    #[serde(default)]
    pub section_results: Vec<SectionResultPayload>,
}

impl ResultResponse {
    /// Convert the payload into a final result with per-section lines.
    ///
    /// # Errors
    ///
    /// Returns a domain validation error if any score exceeds its total.
    pub fn into_domain(self) -> Result<AttemptResult, exam_core::Error> {
        let mut time_taken = 0_u32;
        let mut sections = Vec::with_capacity(self.section_results.len());
        for line in self.section_results {
            time_taken = time_taken.saturating_add(line.time_taken);
            sections.push(SectionResult::new(
                line.section_name,
                line.score,
                line.total_marks,
                line.time_taken,
            )?);
        }

        Ok(AttemptResult::new(
            self.total_score,
            self.total_marks,
            time_taken,
            self.passed,
            self.completed_at,
            sections,
        )?)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_response_builds_attempt_and_exam() {
        let json = r#"{
            "attempt_id": 123,
            "started_at": "2024-01-15T10:30:00Z",
            "test": {
                "id": 7,
                "title": "SAT Practice",
                "description": "algebra and geometry",
                "difficulty": "medium",
                "total_marks": 100,
                "passing_marks": 40
            },
            "current_section": { "id": 1, "name": "Reading", "time_limit_seconds": 3840 },
            "sections": [
                { "id": 2, "name": "Math", "order": 1, "time_limit_seconds": 4200, "question_count": 44 },
                { "id": 1, "name": "Reading", "order": 0, "time_limit_seconds": 3840, "question_count": 54 }
            ]
        }"#;

        let parsed: StartAttemptResponse = serde_json::from_str(json).unwrap();
        let started = parsed.into_domain().unwrap();

        assert_eq!(started.attempt.id(), AttemptId::new(123));
        assert_eq!(started.attempt.current_section(), Some(SectionId::new(1)));
        assert_eq!(started.exam.title(), "SAT Practice");
        assert_eq!(started.exam.difficulty(), Difficulty::Medium);
        // served out of order, sorted by taking order
        assert_eq!(started.exam.first_section().id(), SectionId::new(1));
    }

    #[test]
    fn section_response_restores_saved_answers() {
        let json = r#"{
            "section": { "id": 1, "started_at": "2024-01-15T10:30:00Z", "time_limit_seconds": 600 },
            "questions": [
                {
                    "id": 11,
                    "question_text": "2 + 2 = ?",
                    "passage_text": null,
                    "marks": 1,
                    "order": 0,
                    "choices": [
                        { "id": 41, "choice_label": "A", "choice_text": "3" },
                        { "id": 42, "choice_label": "B", "choice_text": "4" }
                    ],
                    "selected_choice_id": 42
                },
                {
                    "id": 12,
                    "question_text": "Define entropy.",
                    "marks": 2,
                    "order": 1,
                    "kind": "short_answer",
                    "text_answer": "disorder"
                }
            ]
        }"#;

        let parsed: SectionStartResponse = serde_json::from_str(json).unwrap();
        let start = parsed.into_domain().unwrap();

        assert_eq!(start.time_limit_secs, 600);
        assert_eq!(start.questions.len(), 2);
        assert_eq!(start.questions[0].kind(), QuestionKind::MultipleChoice);
        assert_eq!(start.questions[1].kind(), QuestionKind::ShortAnswer);
        assert_eq!(start.saved_answers.len(), 2);
        assert_eq!(
            start.saved_answers[0].value,
            AnswerValue::Choice(ChoiceId::new(42))
        );
        assert_eq!(
            start.saved_answers[1].value,
            AnswerValue::Text("disorder".into())
        );
    }

    #[test]
    fn unknown_choice_label_fails_decode() {
        let json = r#"{
            "section": { "id": 1, "started_at": "2024-01-15T10:30:00Z", "time_limit_seconds": 600 },
            "questions": [
                {
                    "id": 11,
                    "question_text": "2 + 2 = ?",
                    "marks": 1,
                    "order": 0,
                    "choices": [ { "id": 41, "choice_label": "Z", "choice_text": "4" } ]
                }
            ]
        }"#;

        let parsed: SectionStartResponse = serde_json::from_str(json).unwrap();
        assert!(parsed.into_domain().is_err());
    }

    #[test]
    fn answer_body_serializes_one_of_choice_or_text() {
        let choice = AnswerBody::from_answer(&AttemptAnswer {
            question_id: QuestionId::new(5),
            value: AnswerValue::Choice(ChoiceId::new(9)),
        });
        let json = serde_json::to_string(&choice).unwrap();
        assert_eq!(json, r#"{"question_id":5,"choice_id":9}"#);

        let text = AnswerBody::from_answer(&AttemptAnswer {
            question_id: QuestionId::new(6),
            value: AnswerValue::Text("entropy".into()),
        });
        let json = serde_json::to_string(&text).unwrap();
        assert_eq!(json, r#"{"question_id":6,"text_answer":"entropy"}"#);
    }

    #[test]
    fn completion_response_tolerates_lean_payloads() {
        // The completion endpoint sends only the headline numbers.
        let json = r#"{
            "message": "Test completed successfully",
            "score": 7,
            "total_marks": 10,
            "percentage": 70.0
        }"#;

        let parsed: CompleteTestResponse = serde_json::from_str(json).unwrap();
        let ack = parsed.into_domain();
        assert_eq!(ack.score, 7);
        assert_eq!(ack.total_marks, 10);
        assert_eq!(ack.time_taken_secs, None);

        let json = r#"{ "score": 7, "total_marks": 10, "time_taken": 340 }"#;
        let parsed: CompleteTestResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.into_domain().time_taken_secs, Some(340));
    }

    #[test]
    fn result_response_sums_section_times() {
        let json = r#"{
            "test_title": "SAT Practice",
            "total_score": 8,
            "total_marks": 10,
            "percentage": 80.0,
            "completed_at": "2024-01-15T12:00:00Z",
            "passed": true,
            "section_results": [
                { "section_name": "Reading", "score": 3, "total_marks": 5, "percentage": 60.0, "time_taken": 120 },
                { "section_name": "Math", "score": 5, "total_marks": 5, "percentage": 100.0, "time_taken": 90 }
            ]
        }"#;

        let parsed: ResultResponse = serde_json::from_str(json).unwrap();
        let result = parsed.into_domain().unwrap();

        assert_eq!(result.score(), 8);
        assert_eq!(result.time_taken_secs(), 210);
        assert_eq!(result.section_results().len(), 2);
        assert!(result.passed());
    }
}
