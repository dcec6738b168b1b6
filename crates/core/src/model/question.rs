use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::{ChoiceId, QuestionId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question text cannot be empty")]
    EmptyPrompt,

    #[error("choice text cannot be empty")]
    EmptyChoiceText,

    #[error("question marks must be > 0")]
    ZeroMarks,

    #[error("selectable question must have at least one choice")]
    MissingChoices,

    #[error("short-answer question cannot have choices")]
    UnexpectedChoices,

    #[error("unknown choice label: {0}")]
    UnknownChoiceLabel(String),
}

//
// ─── KIND & LABEL ──────────────────────────────────────────────────────────────
//

/// How a question is answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    MultipleChoice,
    TrueFalse,
    ShortAnswer,
}

impl QuestionKind {
    /// True for kinds answered by picking one of the listed choices.
    #[must_use]
    pub fn is_selectable(&self) -> bool {
        matches!(self, QuestionKind::MultipleChoice | QuestionKind::TrueFalse)
    }
}

/// Position label shown next to a choice (A through D).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChoiceLabel {
    A,
    B,
    C,
    D,
}

impl fmt::Display for ChoiceLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChoiceLabel::A => write!(f, "A"),
            ChoiceLabel::B => write!(f, "B"),
            ChoiceLabel::C => write!(f, "C"),
            ChoiceLabel::D => write!(f, "D"),
        }
    }
}

impl FromStr for ChoiceLabel {
    type Err = QuestionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "A" | "a" => Ok(ChoiceLabel::A),
            "B" | "b" => Ok(ChoiceLabel::B),
            "C" | "c" => Ok(ChoiceLabel::C),
            "D" | "d" => Ok(ChoiceLabel::D),
            other => Err(QuestionError::UnknownChoiceLabel(other.to_owned())),
        }
    }
}

//
// ─── CHOICE ────────────────────────────────────────────────────────────────────
//

/// One selectable option of a question.
///
/// Carries no correctness information. Whether a choice is the right one is
/// only ever known to the backend while an attempt is open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    id: ChoiceId,
    label: ChoiceLabel,
    text: String,
}

impl Choice {
    /// Creates a new Choice.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError::EmptyChoiceText` if the text is empty or
    /// whitespace-only.
    pub fn new(
        id: ChoiceId,
        label: ChoiceLabel,
        text: impl Into<String>,
    ) -> Result<Self, QuestionError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(QuestionError::EmptyChoiceText);
        }

        Ok(Self {
            id,
            label,
            text: text.trim().to_owned(),
        })
    }

    #[must_use]
    pub fn id(&self) -> ChoiceId {
        self.id
    }

    #[must_use]
    pub fn label(&self) -> ChoiceLabel {
        self.label
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A single question inside a section.
///
/// Immutable once the attempt has started; answers live in the attempt, not
/// here.
#[derive(Debug, Clone, PartialEq)]
pub struct Question {
    id: QuestionId,
    prompt: String,
    passage: Option<String>,
    marks: u32,
    order: u32,
    kind: QuestionKind,
    choices: Vec<Choice>,
}

impl Question {
    /// Creates a new Question.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError::EmptyPrompt` for blank question text,
    /// `QuestionError::ZeroMarks` for zero marks,
    /// `QuestionError::MissingChoices` when a selectable question carries no
    /// choices, and `QuestionError::UnexpectedChoices` when a short-answer
    /// question carries any.
    pub fn new(
        id: QuestionId,
        prompt: impl Into<String>,
        passage: Option<String>,
        marks: u32,
        order: u32,
        kind: QuestionKind,
        choices: Vec<Choice>,
    ) -> Result<Self, QuestionError> {
        let prompt = prompt.into();
        if prompt.trim().is_empty() {
            return Err(QuestionError::EmptyPrompt);
        }
        if marks == 0 {
            return Err(QuestionError::ZeroMarks);
        }
        if kind.is_selectable() && choices.is_empty() {
            return Err(QuestionError::MissingChoices);
        }
        if !kind.is_selectable() && !choices.is_empty() {
            return Err(QuestionError::UnexpectedChoices);
        }

        let passage = passage
            .map(|p| p.trim().to_owned())
            .filter(|p| !p.is_empty());

        Ok(Self {
            id,
            prompt: prompt.trim().to_owned(),
            passage,
            marks,
            order,
            kind,
            choices,
        })
    }

    // Accessors
    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Optional reading passage attached to the question.
    #[must_use]
    pub fn passage(&self) -> Option<&str> {
        self.passage.as_deref()
    }

    #[must_use]
    pub fn marks(&self) -> u32 {
        self.marks
    }

    #[must_use]
    pub fn order(&self) -> u32 {
        self.order
    }

    #[must_use]
    pub fn kind(&self) -> QuestionKind {
        self.kind
    }

    #[must_use]
    pub fn choices(&self) -> &[Choice] {
        &self.choices
    }

    #[must_use]
    pub fn choice(&self, id: ChoiceId) -> Option<&Choice> {
        self.choices.iter().find(|c| c.id() == id)
    }

    /// Returns true if the given choice belongs to this question.
    #[must_use]
    pub fn has_choice(&self, id: ChoiceId) -> bool {
        self.choice(id).is_some()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
