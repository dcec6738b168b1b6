use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::model::ids::{ExamId, SectionId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ExamError {
    #[error("exam title cannot be empty")]
    EmptyTitle,

    #[error("section name cannot be empty")]
    EmptySectionName,

    #[error("exam must contain at least one section")]
    NoSections,

    #[error("passing marks cannot exceed total marks")]
    PassingExceedsTotal,
}

//
// ─── DIFFICULTY ────────────────────────────────────────────────────────────────
//

/// Advertised difficulty of an exam.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difficulty::Easy => write!(f, "easy"),
            Difficulty::Medium => write!(f, "medium"),
            Difficulty::Hard => write!(f, "hard"),
        }
    }
}

//
// ─── SECTION ───────────────────────────────────────────────────────────────────
//

/// One timed block of an exam.
///
/// Sections are taken in ascending `order`; a section's time budget only
/// starts counting when the section becomes current.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    id: SectionId,
    name: String,
    order: u32,
    time_limit_secs: u32,
    question_count: u32,
}

impl Section {
    /// Creates a new Section.
    ///
    /// # Errors
    ///
    /// Returns `ExamError::EmptySectionName` if the name is empty or
    /// whitespace-only.
    pub fn new(
        id: SectionId,
        name: impl Into<String>,
        order: u32,
        time_limit_secs: u32,
        question_count: u32,
    ) -> Result<Self, ExamError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ExamError::EmptySectionName);
        }

        Ok(Self {
            id,
            name: name.trim().to_owned(),
            order,
            time_limit_secs,
            question_count,
        })
    }

    // Accessors
    #[must_use]
    pub fn id(&self) -> SectionId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn order(&self) -> u32 {
        self.order
    }

    /// Time budget for this section, in whole seconds. Zero is legal and
    /// means the section expires on the first tick after it starts.
    #[must_use]
    pub fn time_limit_secs(&self) -> u32 {
        self.time_limit_secs
    }

    #[must_use]
    pub fn question_count(&self) -> u32 {
        self.question_count
    }
}

//
// ─── EXAM ──────────────────────────────────────────────────────────────────────
//

/// A sectioned, timed test as advertised by the backend.
///
/// Immutable on the client; the server owns authoring and scoring.
#[derive(Debug, Clone, PartialEq)]
pub struct Exam {
    id: ExamId,
    title: String,
    description: Option<String>,
    difficulty: Difficulty,
    total_marks: u32,
    passing_marks: u32,
    sections: Vec<Section>,
}

impl Exam {
    /// Creates a new Exam. Sections are sorted by their `order` field.
    ///
    /// # Errors
    ///
    /// Returns `ExamError::EmptyTitle` if the title is empty or whitespace-only,
    /// `ExamError::NoSections` if no sections are given, and
    /// `ExamError::PassingExceedsTotal` if `passing_marks > total_marks`.
    pub fn new(
        id: ExamId,
        title: impl Into<String>,
        description: Option<String>,
        difficulty: Difficulty,
        total_marks: u32,
        passing_marks: u32,
        mut sections: Vec<Section>,
    ) -> Result<Self, ExamError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(ExamError::EmptyTitle);
        }
        if sections.is_empty() {
            return Err(ExamError::NoSections);
        }
        if passing_marks > total_marks {
            return Err(ExamError::PassingExceedsTotal);
        }

        let description = description
            .map(|d| d.trim().to_owned())
            .filter(|d| !d.is_empty());

        sections.sort_by_key(Section::order);

        Ok(Self {
            id,
            title: title.trim().to_owned(),
            description,
            difficulty,
            total_marks,
            passing_marks,
            sections,
        })
    }

    // Accessors
    #[must_use]
    pub fn id(&self) -> ExamId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    #[must_use]
    pub fn total_marks(&self) -> u32 {
        self.total_marks
    }

    #[must_use]
    pub fn passing_marks(&self) -> u32 {
        self.passing_marks
    }

    /// Sections in taking order.
    #[must_use]
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    #[must_use]
    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    #[must_use]
    pub fn first_section(&self) -> &Section {
        // invariant: sections is non-empty after construction
        &self.sections[0]
    }

    #[must_use]
    pub fn section(&self, id: SectionId) -> Option<&Section> {
        self.sections.iter().find(|s| s.id() == id)
    }

    /// Position of the section with the given id in taking order.
    #[must_use]
    pub fn section_index(&self, id: SectionId) -> Option<usize> {
        self.sections.iter().position(|s| s.id() == id)
    }

    /// The section taken after the given one, or `None` if it is the last.
    #[must_use]
    pub fn next_section_after(&self, id: SectionId) -> Option<&Section> {
        let idx = self.section_index(id)?;
        self.sections.get(idx + 1)
    }

    /// Returns true if the given section is the last one in taking order.
    #[must_use]
    pub fn is_last_section(&self, id: SectionId) -> bool {
        self.section_index(id) == Some(self.sections.len() - 1)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
