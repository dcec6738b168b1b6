use chrono::{DateTime, Utc};

use exam_core::countdown::{Countdown, CountdownStep};
use exam_core::model::{AnswerValue, AttemptAnswer, Question, QuestionId, SectionId};
use gateway::SectionStart;

use super::answers::AnswerSheet;
use super::navigation::Navigator;
use super::progress::AttemptProgress;
use crate::error::AttemptError;

/// In-memory runtime for one section of an attempt.
///
/// Holds the question list, the local answer sheet, navigation state, and the
/// countdown, all hydrated from the backend's section-start response. The
/// countdown derives from the server's start timestamp, so rebuilding this
/// object after a reload never grants extra time.
#[derive(Debug)]
pub struct AttemptSession {
    section_id: SectionId,
    section_name: String,
    questions: Vec<Question>,
    sheet: AnswerSheet,
    navigator: Navigator,
    countdown: Countdown,
}

impl AttemptSession {
    /// Build the section runtime from a section-start response.
    ///
    /// Questions are ordered by their `order` field, previously saved answers
    /// re-seed the sheet, and the countdown hydrates from the server start
    /// timestamp and budget.
    #[must_use]
    pub fn from_start(start: SectionStart, section_name: impl Into<String>) -> Self {
        let SectionStart {
            section_id,
            started_at,
            time_limit_secs,
            mut questions,
            saved_answers,
        } = start;

        questions.sort_by_key(Question::order);
        let navigator = Navigator::new(questions.len());
        let sheet = AnswerSheet::seeded(saved_answers);
        let mut countdown = Countdown::new();
        countdown.hydrate(started_at, time_limit_secs);

        Self {
            section_id,
            section_name: section_name.into(),
            questions,
            sheet,
            navigator,
            countdown,
        }
    }

    // Accessors
    #[must_use]
    pub fn section_id(&self) -> SectionId {
        self.section_id
    }

    #[must_use]
    pub fn section_name(&self) -> &str {
        &self.section_name
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.navigator.index()
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.navigator.index())
    }

    #[must_use]
    pub fn question(&self, id: QuestionId) -> Option<&Question> {
        self.questions.iter().find(|q| q.id() == id)
    }

    //
    // ─── ANSWERS ───────────────────────────────────────────────────────────────
    //

    /// Record an answer for a question in this section, replacing any prior
    /// one.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::Expired` once the section budget ran out,
    /// `AttemptError::UnknownQuestion` for a question outside this section,
    /// and `AttemptError::ForeignChoice` for a choice that belongs to a
    /// different question.
    pub fn record_answer(
        &mut self,
        question_id: QuestionId,
        value: AnswerValue,
    ) -> Result<(), AttemptError> {
        if self.countdown.is_expired() {
            return Err(AttemptError::Expired);
        }
        let Some(question) = self.question(question_id) else {
            return Err(AttemptError::UnknownQuestion(question_id));
        };
        if let AnswerValue::Choice(choice_id) = value {
            if !question.has_choice(choice_id) {
                return Err(AttemptError::ForeignChoice(choice_id));
            }
        }

        self.sheet.record(question_id, value);
        Ok(())
    }

    #[must_use]
    pub fn answer(&self, question_id: QuestionId) -> Option<&AnswerValue> {
        self.sheet.answer(question_id)
    }

    #[must_use]
    pub fn is_answered(&self, question_id: QuestionId) -> bool {
        self.sheet.is_answered(question_id)
    }

    /// Answers serialized for submission, in question order; unanswered
    /// questions are omitted.
    #[must_use]
    pub fn answers_for_submission(&self) -> Vec<AttemptAnswer> {
        self.sheet.to_submission(&self.questions)
    }

    //
    // ─── NAVIGATION ────────────────────────────────────────────────────────────
    //

    pub fn go_to(&mut self, index: usize) -> usize {
        self.navigator.go_to(index)
    }

    pub fn next(&mut self) -> usize {
        self.navigator.next()
    }

    pub fn previous(&mut self) -> usize {
        self.navigator.previous()
    }

    /// Toggle the review mark on the current question.
    ///
    /// Returns `None` when the section has no questions.
    pub fn toggle_mark_current(&mut self) -> Option<bool> {
        let question_id = self.current_question().map(Question::id)?;
        Some(self.navigator.toggle_mark(question_id))
    }

    #[must_use]
    pub fn is_marked(&self, question_id: QuestionId) -> bool {
        self.navigator.is_marked(question_id)
    }

    //
    // ─── TIME & PROGRESS ───────────────────────────────────────────────────────
    //

    /// Advance the countdown to `now`.
    pub fn tick(&mut self, now: DateTime<Utc>) -> CountdownStep {
        self.countdown.tick(now)
    }

    /// Seconds left at `now`.
    #[must_use]
    pub fn remaining_secs(&self, now: DateTime<Utc>) -> Option<u32> {
        self.countdown.remaining_secs(now)
    }

    #[must_use]
    pub fn time_limit_secs(&self) -> u32 {
        self.countdown.limit_secs()
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.countdown.is_expired()
    }

    /// Returns a summary of the current section progress.
    #[must_use]
    pub fn progress(&self) -> AttemptProgress {
        let total = self.questions.len();
        let answered = self.sheet.answered_count();
        AttemptProgress {
            total,
            answered,
            unanswered: total.saturating_sub(answered),
            marked: self.navigator.marked_count(),
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
