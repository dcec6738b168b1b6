mod attempt;
mod exam;
mod ids;
mod question;
mod test_code;

pub use ids::{AttemptId, ChoiceId, ExamId, ParseIdError, QuestionId, SectionId};

pub use attempt::{
    AnswerValue, Attempt, AttemptAnswer, AttemptResult, AttemptStateError, AttemptStatus,
    SectionResult,
};
pub use exam::{Difficulty, Exam, ExamError, Section};
pub use question::{Choice, ChoiceLabel, Question, QuestionError, QuestionKind};
pub use test_code::{TEST_CODE_LEN, TestCode, TestCodeError};
