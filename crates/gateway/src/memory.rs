use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use exam_core::Clock;
use exam_core::model::{
    AnswerValue, Attempt, AttemptAnswer, AttemptId, AttemptResult, AttemptStatus, ChoiceId, Exam,
    ExamId, Question, QuestionId, SectionId, SectionResult, TestCode,
};

use crate::api::{ExamGateway, SectionOutcome, SectionStart, StartedAttempt, TestCompletion};
use crate::error::GatewayError;

//
// ─── CALL COUNTS ───────────────────────────────────────────────────────────────
//

/// Number of calls the fake backend has received, per operation.
///
/// Tests assert on these to pin down how many network round-trips a flow
/// really makes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub start_attempt: usize,
    pub start_section: usize,
    pub save_answer: usize,
    pub complete_section: usize,
    pub complete_test: usize,
    pub fetch_result: usize,
}

//
// ─── STATE ─────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone)]
struct SectionState {
    started_at: DateTime<Utc>,
    completed: bool,
    score: u32,
    total_marks: u32,
    time_taken_secs: u32,
}

#[derive(Debug, Clone)]
struct AttemptState {
    attempt: Attempt,
    answers: HashMap<QuestionId, AnswerValue>,
    sections: HashMap<SectionId, SectionState>,
    final_answers: Option<Vec<AttemptAnswer>>,
    result: Option<AttemptResult>,
}

struct ExamEntry {
    exam: Exam,
    code: Option<TestCode>,
    questions: HashMap<SectionId, Vec<Question>>,
    // the grading key stays on this side of the wire, never in a payload
    answer_key: HashMap<QuestionId, ChoiceId>,
}

#[derive(Default)]
struct State {
    exams: HashMap<ExamId, ExamEntry>,
    attempts: HashMap<ExamId, AttemptState>,
    counts: CallCounts,
    next_attempt_id: u64,
    fail_section_starts: u32,
    fail_saves: u32,
    fail_completions: u32,
    fail_test_completions: u32,
}

//
// ─── GATEWAY ───────────────────────────────────────────────────────────────────
//

/// Scripted backend for tests and offline development.
///
/// Implements the full attempt protocol in memory: one attempt per exam,
/// resumable sections with their original start timestamp, last-write-wins
/// answers, and scoring against a hidden answer key. Failures can be injected
/// to exercise retry paths.
#[derive(Clone)]
pub struct InMemoryGateway {
    clock: Clock,
    state: Arc<Mutex<State>>,
}

impl InMemoryGateway {
    #[must_use]
    pub fn new() -> Self {
        Self {
            clock: Clock::default_clock(),
            state: Arc::new(Mutex::new(State::default())),
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, State>, GatewayError> {
        self.state
            .lock()
            .map_err(|e| GatewayError::Network(e.to_string()))
    }

    /// Register an exam so attempts against it can start.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Network` only if the internal lock is poisoned.
    pub fn insert_exam(&self, exam: Exam) -> Result<(), GatewayError> {
        let mut state = self.lock()?;
        state.exams.insert(
            exam.id(),
            ExamEntry {
                exam,
                code: None,
                questions: HashMap::new(),
                answer_key: HashMap::new(),
            },
        );
        Ok(())
    }

    /// Attach a six-digit access code to a registered exam.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::NotFound` for an unregistered exam.
    pub fn set_test_code(&self, exam_id: ExamId, code: TestCode) -> Result<(), GatewayError> {
        let mut state = self.lock()?;
        let entry = state.exams.get_mut(&exam_id).ok_or(GatewayError::NotFound)?;
        entry.code = Some(code);
        Ok(())
    }

    /// Stock a section with its questions.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::NotFound` for an unregistered exam.
    pub fn insert_section_questions(
        &self,
        exam_id: ExamId,
        section_id: SectionId,
        questions: Vec<Question>,
    ) -> Result<(), GatewayError> {
        let mut state = self.lock()?;
        let entry = state.exams.get_mut(&exam_id).ok_or(GatewayError::NotFound)?;
        entry.questions.insert(section_id, questions);
        Ok(())
    }

    /// Record the correct choice for a question in the hidden grading key.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::NotFound` for an unregistered exam.
    pub fn set_correct_choice(
        &self,
        exam_id: ExamId,
        question_id: QuestionId,
        choice_id: ChoiceId,
    ) -> Result<(), GatewayError> {
        let mut state = self.lock()?;
        let entry = state.exams.get_mut(&exam_id).ok_or(GatewayError::NotFound)?;
        entry.answer_key.insert(question_id, choice_id);
        Ok(())
    }

    /// Make the next `n` section starts fail with a network error.
    pub fn fail_next_section_starts(&self, n: u32) {
        if let Ok(mut state) = self.state.lock() {
            state.fail_section_starts = n;
        }
    }

    /// Make the next `n` answer saves fail with a network error.
    pub fn fail_next_saves(&self, n: u32) {
        if let Ok(mut state) = self.state.lock() {
            state.fail_saves = n;
        }
    }

    /// Make the next `n` section completions fail with a network error.
    pub fn fail_next_completions(&self, n: u32) {
        if let Ok(mut state) = self.state.lock() {
            state.fail_completions = n;
        }
    }

    /// Make the next `n` test finalizations fail with a network error.
    pub fn fail_next_test_completions(&self, n: u32) {
        if let Ok(mut state) = self.state.lock() {
            state.fail_test_completions = n;
        }
    }

    /// Calls received so far.
    #[must_use]
    pub fn counts(&self) -> CallCounts {
        self.state.lock().map(|s| s.counts).unwrap_or_default()
    }

    /// The answer currently stored for a question, if any.
    #[must_use]
    pub fn saved_answer(&self, exam_id: ExamId, question_id: QuestionId) -> Option<AnswerValue> {
        let state = self.state.lock().ok()?;
        state
            .attempts
            .get(&exam_id)?
            .answers
            .get(&question_id)
            .cloned()
    }

    /// The answer set sent with the final submission, if it happened.
    #[must_use]
    pub fn final_submission(&self, exam_id: ExamId) -> Option<Vec<AttemptAnswer>> {
        let state = self.state.lock().ok()?;
        state.attempts.get(&exam_id)?.final_answers.clone()
    }

    /// Status of the attempt on the given exam, if one was started.
    #[must_use]
    pub fn attempt_status(&self, exam_id: ExamId) -> Option<AttemptStatus> {
        let state = self.state.lock().ok()?;
        Some(state.attempts.get(&exam_id)?.attempt.status())
    }

    fn start_locked(
        state: &mut State,
        exam_id: ExamId,
        now: DateTime<Utc>,
    ) -> Result<StartedAttempt, GatewayError> {
        let exam = state
            .exams
            .get(&exam_id)
            .map(|entry| entry.exam.clone())
            .ok_or(GatewayError::NotFound)?;

        if let Some(existing) = state.attempts.get(&exam_id) {
            if existing.attempt.is_finished() {
                return Err(GatewayError::Conflict("test already completed".into()));
            }
            return Ok(StartedAttempt {
                attempt: existing.attempt.clone(),
                exam,
            });
        }

        state.next_attempt_id += 1;
        let attempt = Attempt::started(
            AttemptId::new(state.next_attempt_id),
            exam_id,
            now,
            exam.first_section().id(),
        );
        state.attempts.insert(
            exam_id,
            AttemptState {
                attempt: attempt.clone(),
                answers: HashMap::new(),
                sections: HashMap::new(),
                final_answers: None,
                result: None,
            },
        );

        Ok(StartedAttempt { attempt, exam })
    }

    fn question_marks(entry: &ExamEntry, section_id: SectionId) -> u32 {
        entry
            .questions
            .get(&section_id)
            .map(|qs| qs.iter().map(Question::marks).sum::<u32>())
            .unwrap_or(0)
    }

    fn score_section(
        entry: &ExamEntry,
        answers: &HashMap<QuestionId, AnswerValue>,
        section_id: SectionId,
    ) -> u32 {
        let Some(questions) = entry.questions.get(&section_id) else {
            return 0;
        };
        questions
            .iter()
            .filter(|q| {
                let selected = answers.get(&q.id()).and_then(AnswerValue::as_choice);
                selected.is_some() && selected == entry.answer_key.get(&q.id()).copied()
            })
            .map(Question::marks)
            .sum()
    }

    fn score_total(entry: &ExamEntry, answers: &HashMap<QuestionId, AnswerValue>) -> u32 {
        entry
            .exam
            .sections()
            .iter()
            .map(|s| Self::score_section(entry, answers, s.id()))
            .sum()
    }
}

impl Default for InMemoryGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExamGateway for InMemoryGateway {
    async fn start_attempt(&self, exam_id: ExamId) -> Result<StartedAttempt, GatewayError> {
        let now = self.clock.now();
        let mut state = self.lock()?;
        state.counts.start_attempt += 1;
        Self::start_locked(&mut state, exam_id, now)
    }

    async fn start_attempt_by_code(
        &self,
        code: &TestCode,
    ) -> Result<StartedAttempt, GatewayError> {
        let now = self.clock.now();
        let mut state = self.lock()?;
        state.counts.start_attempt += 1;
        let exam_id = state
            .exams
            .values()
            .find(|entry| entry.code.as_ref() == Some(code))
            .map(|entry| entry.exam.id())
            .ok_or(GatewayError::NotFound)?;
        Self::start_locked(&mut state, exam_id, now)
    }

    async fn start_section(
        &self,
        exam_id: ExamId,
        section_id: SectionId,
    ) -> Result<SectionStart, GatewayError> {
        let now = self.clock.now();
        let mut state = self.lock()?;
        let state = &mut *state;
        state.counts.start_section += 1;

        if state.fail_section_starts > 0 {
            state.fail_section_starts -= 1;
            return Err(GatewayError::Network("injected section start failure".into()));
        }

        let entry = state.exams.get(&exam_id).ok_or(GatewayError::NotFound)?;
        let section = entry
            .exam
            .section(section_id)
            .ok_or(GatewayError::NotFound)?;
        let time_limit_secs = section.time_limit_secs();
        let total_marks = Self::question_marks(entry, section_id);
        let questions = entry
            .questions
            .get(&section_id)
            .cloned()
            .unwrap_or_default();
        let question_ids: Vec<QuestionId> = questions.iter().map(Question::id).collect();

        let attempt_state = state
            .attempts
            .get_mut(&exam_id)
            .ok_or(GatewayError::NotFound)?;
        if attempt_state.attempt.is_finished() {
            return Err(GatewayError::Conflict("test already completed".into()));
        }

        // get-or-create keeps the original start timestamp on resume
        let section_state = attempt_state
            .sections
            .entry(section_id)
            .or_insert_with(|| SectionState {
                started_at: now,
                completed: false,
                score: 0,
                total_marks,
                time_taken_secs: 0,
            });
        if section_state.completed {
            return Err(GatewayError::Conflict("section already completed".into()));
        }
        let started_at = section_state.started_at;

        attempt_state
            .attempt
            .advance_to(section_id)
            .map_err(|e| GatewayError::Conflict(e.to_string()))?;

        let saved_answers = question_ids
            .iter()
            .filter_map(|qid| {
                attempt_state.answers.get(qid).map(|value| AttemptAnswer {
                    question_id: *qid,
                    value: value.clone(),
                })
            })
            .collect();

        Ok(SectionStart {
            section_id,
            started_at,
            time_limit_secs,
            questions,
            saved_answers,
        })
    }

    async fn save_answer(
        &self,
        exam_id: ExamId,
        answer: &AttemptAnswer,
    ) -> Result<(), GatewayError> {
        let mut state = self.lock()?;
        let state = &mut *state;
        state.counts.save_answer += 1;

        if state.fail_saves > 0 {
            state.fail_saves -= 1;
            return Err(GatewayError::Network("injected save failure".into()));
        }

        let entry = state.exams.get(&exam_id).ok_or(GatewayError::NotFound)?;
        let question = entry
            .questions
            .values()
            .flatten()
            .find(|q| q.id() == answer.question_id)
            .ok_or(GatewayError::NotFound)?;
        if let AnswerValue::Choice(choice_id) = answer.value {
            if !question.has_choice(choice_id) {
                return Err(GatewayError::Validation(
                    "choice does not belong to question".into(),
                ));
            }
        }

        let attempt_state = state
            .attempts
            .get_mut(&exam_id)
            .ok_or(GatewayError::NotFound)?;
        if attempt_state.attempt.is_finished() {
            return Err(GatewayError::Conflict("test already completed".into()));
        }

        attempt_state
            .answers
            .insert(answer.question_id, answer.value.clone());
        Ok(())
    }

    async fn complete_section(
        &self,
        exam_id: ExamId,
        section_id: SectionId,
        answers: &[AttemptAnswer],
    ) -> Result<SectionOutcome, GatewayError> {
        let now = self.clock.now();
        let mut state = self.lock()?;
        let state = &mut *state;
        state.counts.complete_section += 1;

        if state.fail_completions > 0 {
            state.fail_completions -= 1;
            return Err(GatewayError::Network("injected completion failure".into()));
        }

        let entry = state.exams.get(&exam_id).ok_or(GatewayError::NotFound)?;
        if entry.exam.section(section_id).is_none() {
            return Err(GatewayError::NotFound);
        }
        let next_section = entry.exam.next_section_after(section_id).map(|s| s.id());

        let attempt_state = state
            .attempts
            .get_mut(&exam_id)
            .ok_or(GatewayError::NotFound)?;
        if attempt_state.attempt.is_finished() {
            return Err(GatewayError::Conflict("test already completed".into()));
        }
        let Some(section_state) = attempt_state.sections.get(&section_id) else {
            return Err(GatewayError::NotFound);
        };
        if section_state.completed {
            return Err(GatewayError::Conflict("section already completed".into()));
        }
        let started_at = section_state.started_at;

        for answer in answers {
            attempt_state
                .answers
                .insert(answer.question_id, answer.value.clone());
        }

        let score = Self::score_section(entry, &attempt_state.answers, section_id);
        let elapsed = (now - started_at).num_seconds().max(0);
        let section_state = attempt_state
            .sections
            .get_mut(&section_id)
            .ok_or(GatewayError::NotFound)?;
        section_state.completed = true;
        section_state.score = score;
        section_state.time_taken_secs = u32::try_from(elapsed).unwrap_or(u32::MAX);

        if let Some(next) = next_section {
            attempt_state
                .attempt
                .advance_to(next)
                .map_err(|e| GatewayError::Conflict(e.to_string()))?;
        }

        Ok(SectionOutcome { next_section })
    }

    async fn complete_test(
        &self,
        exam_id: ExamId,
        attempt_id: AttemptId,
        answers: &[AttemptAnswer],
        time_taken_secs: u32,
    ) -> Result<TestCompletion, GatewayError> {
        let now = self.clock.now();
        let mut state = self.lock()?;
        let state = &mut *state;
        state.counts.complete_test += 1;

        if state.fail_test_completions > 0 {
            state.fail_test_completions -= 1;
            return Err(GatewayError::Network("injected finalize failure".into()));
        }

        let entry = state.exams.get(&exam_id).ok_or(GatewayError::NotFound)?;
        let exam = &entry.exam;

        let attempt_state = state
            .attempts
            .get_mut(&exam_id)
            .ok_or(GatewayError::NotFound)?;
        if attempt_state.attempt.id() != attempt_id {
            return Err(GatewayError::Validation("unknown attempt id".into()));
        }
        if attempt_state.attempt.is_finished() {
            return Err(GatewayError::Conflict("test already completed".into()));
        }

        for answer in answers {
            attempt_state
                .answers
                .insert(answer.question_id, answer.value.clone());
        }
        attempt_state.final_answers = Some(answers.to_vec());

        let score = Self::score_total(entry, &attempt_state.answers);
        let passed = score >= exam.passing_marks();

        let mut section_results = Vec::new();
        for section in exam.sections() {
            if let Some(section_state) = attempt_state.sections.get(&section.id()) {
                section_results.push(
                    SectionResult::new(
                        section.name(),
                        section_state.score,
                        section_state.total_marks,
                        section_state.time_taken_secs,
                    )
                    .map_err(|e| GatewayError::Validation(e.to_string()))?,
                );
            }
        }

        attempt_state
            .attempt
            .complete()
            .map_err(|e| GatewayError::Conflict(e.to_string()))?;

        // The full breakdown is only served by `fetch_result`; the completion
        // call acknowledges with the headline numbers.
        let result = AttemptResult::new(
            score,
            exam.total_marks(),
            time_taken_secs,
            passed,
            Some(now),
            section_results,
        )
        .map_err(|e| GatewayError::Validation(e.to_string()))?;
        attempt_state.result = Some(result);

        Ok(TestCompletion {
            score,
            total_marks: exam.total_marks(),
            time_taken_secs: Some(time_taken_secs),
        })
    }

    async fn fetch_result(&self, exam_id: ExamId) -> Result<AttemptResult, GatewayError> {
        let mut state = self.lock()?;
        state.counts.fetch_result += 1;

        let attempt_state = state.attempts.get(&exam_id).ok_or(GatewayError::NotFound)?;
        if !attempt_state.attempt.is_finished() {
            return Err(GatewayError::NotFound);
        }
        attempt_state.result.clone().ok_or(GatewayError::NotFound)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use exam_core::model::{Choice, ChoiceLabel, Difficulty, QuestionKind, Section};
    use exam_core::time::{fixed_clock, fixed_now};

    fn build_exam() -> Exam {
        Exam::new(
            ExamId::new(1),
            "Practice Test",
            None,
            Difficulty::Easy,
            2,
            1,
            vec![
                Section::new(SectionId::new(10), "Reading", 0, 300, 1).unwrap(),
                Section::new(SectionId::new(20), "Math", 1, 300, 1).unwrap(),
            ],
        )
        .unwrap()
    }

    fn build_question(id: u64, correct_hint: &str) -> Question {
        Question::new(
            QuestionId::new(id),
            format!("Question {id}?"),
            None,
            1,
            0,
            QuestionKind::MultipleChoice,
            vec![
                Choice::new(ChoiceId::new(id * 10 + 1), ChoiceLabel::A, correct_hint).unwrap(),
                Choice::new(ChoiceId::new(id * 10 + 2), ChoiceLabel::B, "other").unwrap(),
            ],
        )
        .unwrap()
    }

    fn build_gateway() -> InMemoryGateway {
        let gateway = InMemoryGateway::new().with_clock(fixed_clock());
        gateway.insert_exam(build_exam()).unwrap();
        gateway
            .insert_section_questions(
                ExamId::new(1),
                SectionId::new(10),
                vec![build_question(1, "right")],
            )
            .unwrap();
        gateway
            .insert_section_questions(
                ExamId::new(1),
                SectionId::new(20),
                vec![build_question(2, "right")],
            )
            .unwrap();
        gateway
            .set_correct_choice(ExamId::new(1), QuestionId::new(1), ChoiceId::new(11))
            .unwrap();
        gateway
            .set_correct_choice(ExamId::new(1), QuestionId::new(2), ChoiceId::new(21))
            .unwrap();
        gateway
    }

    fn answer(question: u64, choice: u64) -> AttemptAnswer {
        AttemptAnswer {
            question_id: QuestionId::new(question),
            value: AnswerValue::Choice(ChoiceId::new(choice)),
        }
    }

    #[tokio::test]
    async fn start_is_idempotent_while_in_progress() {
        let gateway = build_gateway();

        let first = gateway.start_attempt(ExamId::new(1)).await.unwrap();
        let second = gateway.start_attempt(ExamId::new(1)).await.unwrap();

        assert_eq!(first.attempt.id(), second.attempt.id());
        assert_eq!(gateway.counts().start_attempt, 2);
    }

    #[tokio::test]
    async fn section_resume_keeps_started_at() {
        let gateway = build_gateway();
        gateway.start_attempt(ExamId::new(1)).await.unwrap();

        let first = gateway
            .start_section(ExamId::new(1), SectionId::new(10))
            .await
            .unwrap();

        // same backend state, thirty seconds later
        let later = gateway
            .clone()
            .with_clock(Clock::fixed(fixed_now() + chrono::Duration::seconds(30)));
        let second = later
            .start_section(ExamId::new(1), SectionId::new(10))
            .await
            .unwrap();

        assert_eq!(first.started_at, second.started_at);
        assert_eq!(second.started_at, fixed_now());
    }

    #[tokio::test]
    async fn answers_overwrite_per_question() {
        let gateway = build_gateway();
        gateway.start_attempt(ExamId::new(1)).await.unwrap();
        gateway
            .start_section(ExamId::new(1), SectionId::new(10))
            .await
            .unwrap();

        gateway
            .save_answer(ExamId::new(1), &answer(1, 11))
            .await
            .unwrap();
        gateway
            .save_answer(ExamId::new(1), &answer(1, 12))
            .await
            .unwrap();

        assert_eq!(
            gateway.saved_answer(ExamId::new(1), QuestionId::new(1)),
            Some(AnswerValue::Choice(ChoiceId::new(12)))
        );
    }

    #[tokio::test]
    async fn foreign_choice_is_rejected() {
        let gateway = build_gateway();
        gateway.start_attempt(ExamId::new(1)).await.unwrap();
        gateway
            .start_section(ExamId::new(1), SectionId::new(10))
            .await
            .unwrap();

        let err = gateway
            .save_answer(ExamId::new(1), &answer(1, 21))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Validation(_)));
    }

    #[tokio::test]
    async fn completed_test_rejects_restart_and_saves() {
        let gateway = build_gateway();
        let started = gateway.start_attempt(ExamId::new(1)).await.unwrap();
        gateway
            .start_section(ExamId::new(1), SectionId::new(10))
            .await
            .unwrap();
        gateway
            .complete_section(ExamId::new(1), SectionId::new(10), &[answer(1, 11)])
            .await
            .unwrap();
        gateway
            .start_section(ExamId::new(1), SectionId::new(20))
            .await
            .unwrap();
        gateway
            .complete_section(ExamId::new(1), SectionId::new(20), &[answer(2, 22)])
            .await
            .unwrap();
        gateway
            .complete_test(ExamId::new(1), started.attempt.id(), &[], 120)
            .await
            .unwrap();

        let err = gateway.start_attempt(ExamId::new(1)).await.unwrap_err();
        assert!(matches!(err, GatewayError::Conflict(_)));
        let err = gateway
            .save_answer(ExamId::new(1), &answer(1, 11))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Conflict(_)));
    }

    #[tokio::test]
    async fn scoring_uses_hidden_key() {
        let gateway = build_gateway();
        let started = gateway.start_attempt(ExamId::new(1)).await.unwrap();
        gateway
            .start_section(ExamId::new(1), SectionId::new(10))
            .await
            .unwrap();
        gateway
            .complete_section(ExamId::new(1), SectionId::new(10), &[answer(1, 11)])
            .await
            .unwrap();
        gateway
            .start_section(ExamId::new(1), SectionId::new(20))
            .await
            .unwrap();
        gateway
            .complete_section(ExamId::new(1), SectionId::new(20), &[answer(2, 22)])
            .await
            .unwrap();

        let ack = gateway
            .complete_test(ExamId::new(1), started.attempt.id(), &[], 60)
            .await
            .unwrap();

        // question 1 right, question 2 wrong
        assert_eq!(ack.score, 1);
        assert_eq!(ack.total_marks, 2);
        assert_eq!(ack.time_taken_secs, Some(60));

        let result = gateway.fetch_result(ExamId::new(1)).await.unwrap();
        assert!(result.passed());
        assert_eq!(result.completed_at(), Some(fixed_now()));
        assert_eq!(result.section_results().len(), 2);
        assert_eq!(result.section_results()[0].score(), 1);
        assert_eq!(result.section_results()[1].score(), 0);
    }

    #[tokio::test]
    async fn injected_failures_consume_and_recover() {
        let gateway = build_gateway();
        gateway.start_attempt(ExamId::new(1)).await.unwrap();
        gateway
            .start_section(ExamId::new(1), SectionId::new(10))
            .await
            .unwrap();

        gateway.fail_next_saves(1);
        let err = gateway
            .save_answer(ExamId::new(1), &answer(1, 11))
            .await
            .unwrap_err();
        assert!(err.is_retriable());

        gateway
            .save_answer(ExamId::new(1), &answer(1, 11))
            .await
            .unwrap();
        assert_eq!(gateway.counts().save_answer, 2);
    }

    #[tokio::test]
    async fn failed_completion_leaves_section_open() {
        let gateway = build_gateway();
        gateway.start_attempt(ExamId::new(1)).await.unwrap();
        gateway
            .start_section(ExamId::new(1), SectionId::new(10))
            .await
            .unwrap();

        gateway.fail_next_completions(1);
        let err = gateway
            .complete_section(ExamId::new(1), SectionId::new(10), &[answer(1, 11)])
            .await
            .unwrap_err();
        assert!(err.is_retriable());

        // retry succeeds and still advances to the next section
        let outcome = gateway
            .complete_section(ExamId::new(1), SectionId::new(10), &[answer(1, 11)])
            .await
            .unwrap();
        assert_eq!(outcome.next_section, Some(SectionId::new(20)));
    }

    #[tokio::test]
    async fn start_by_code_finds_exam() {
        let gateway = build_gateway();
        gateway
            .set_test_code(ExamId::new(1), TestCode::new("483920").unwrap())
            .unwrap();

        let started = gateway
            .start_attempt_by_code(&TestCode::new("483920").unwrap())
            .await
            .unwrap();
        assert_eq!(started.exam.id(), ExamId::new(1));

        let err = gateway
            .start_attempt_by_code(&TestCode::new("000000").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::NotFound));
    }

    #[tokio::test]
    async fn result_is_only_available_after_completion() {
        let gateway = build_gateway();
        gateway.start_attempt(ExamId::new(1)).await.unwrap();

        let err = gateway.fetch_result(ExamId::new(1)).await.unwrap_err();
        assert!(matches!(err, GatewayError::NotFound));
    }
}
