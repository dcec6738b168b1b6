use std::collections::HashMap;

use exam_core::model::{AnswerValue, AttemptAnswer, Question, QuestionId};

/// Local answer state for the active section.
///
/// One slot per question, overwrite-only: selecting B after A leaves only B.
/// The sheet never talks to the network; syncing and submission serialization
/// are the flow's job.
#[derive(Debug, Clone, Default)]
pub struct AnswerSheet {
    answers: HashMap<QuestionId, AnswerValue>,
}

impl AnswerSheet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a sheet from answers the backend already has (section resume).
    #[must_use]
    pub fn seeded(answers: impl IntoIterator<Item = AttemptAnswer>) -> Self {
        let mut sheet = Self::new();
        for answer in answers {
            sheet.record(answer.question_id, answer.value);
        }
        sheet
    }

    /// Record an answer, replacing any prior one for the question.
    ///
    /// A blank text answer clears the slot instead, so erased free-form input
    /// does not linger in submissions. Returns the replaced value, if any.
    pub fn record(&mut self, question_id: QuestionId, value: AnswerValue) -> Option<AnswerValue> {
        if value.is_blank() {
            return self.answers.remove(&question_id);
        }
        self.answers.insert(question_id, value)
    }

    #[must_use]
    pub fn answer(&self, question_id: QuestionId) -> Option<&AnswerValue> {
        self.answers.get(&question_id)
    }

    #[must_use]
    pub fn is_answered(&self, question_id: QuestionId) -> bool {
        self.answers.contains_key(&question_id)
    }

    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.answers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }

    /// Serialize answers for submission, in question order.
    ///
    /// Unanswered questions are omitted; the backend treats omission as zero
    /// marks.
    #[must_use]
    pub fn to_submission(&self, questions: &[Question]) -> Vec<AttemptAnswer> {
        questions
            .iter()
            .filter_map(|question| {
                self.answers
                    .get(&question.id())
                    .map(|value| AttemptAnswer {
                        question_id: question.id(),
                        value: value.clone(),
                    })
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.answers.clear();
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
