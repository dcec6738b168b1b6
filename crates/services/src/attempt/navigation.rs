use std::collections::HashSet;

use exam_core::model::QuestionId;

/// Position and marked-for-review state inside one section.
///
/// The index stays within `[0, count)` and never wraps. Marks are a local
/// annotation only; they are never transmitted.
#[derive(Debug, Clone, Default)]
pub struct Navigator {
    index: usize,
    count: usize,
    marked: HashSet<QuestionId>,
}

impl Navigator {
    #[must_use]
    pub fn new(count: usize) -> Self {
        Self {
            index: 0,
            count,
            marked: HashSet::new(),
        }
    }

    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.count
    }

    fn last_index(&self) -> usize {
        self.count.saturating_sub(1)
    }

    /// Jump to `index`, clamped to the valid range. Returns the new index.
    pub fn go_to(&mut self, index: usize) -> usize {
        self.index = index.min(self.last_index());
        self.index
    }

    /// Move one question forward, stopping at the last one.
    pub fn next(&mut self) -> usize {
        self.go_to(self.index.saturating_add(1))
    }

    /// Move one question back, stopping at the first one.
    pub fn previous(&mut self) -> usize {
        self.go_to(self.index.saturating_sub(1))
    }

    /// Toggle the mark on a question. Returns true when it is now marked.
    pub fn toggle_mark(&mut self, question_id: QuestionId) -> bool {
        if self.marked.remove(&question_id) {
            false
        } else {
            self.marked.insert(question_id);
            true
        }
    }

    #[must_use]
    pub fn is_marked(&self, question_id: QuestionId) -> bool {
        self.marked.contains(&question_id)
    }

    #[must_use]
    pub fn marked_count(&self) -> usize {
        self.marked.len()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_and_previous_never_leave_bounds() {
        let mut nav = Navigator::new(3);

        assert_eq!(nav.previous(), 0);
        assert_eq!(nav.next(), 1);
        assert_eq!(nav.next(), 2);
        assert_eq!(nav.next(), 2);
        assert_eq!(nav.previous(), 1);
    }

    #[test]
    fn go_to_clamps_to_last_question() {
        let mut nav = Navigator::new(4);

        assert_eq!(nav.go_to(99), 3);
        assert_eq!(nav.go_to(0), 0);
        assert_eq!(nav.go_to(2), 2);
    }

    #[test]
    fn empty_section_pins_index_at_zero() {
        let mut nav = Navigator::new(0);

        assert_eq!(nav.index(), 0);
        assert_eq!(nav.next(), 0);
        assert_eq!(nav.go_to(5), 0);
    }

    #[test]
    fn marks_toggle_per_question() {
        let mut nav = Navigator::new(2);
        let question = QuestionId::new(7);

        assert!(nav.toggle_mark(question));
        assert!(nav.is_marked(question));
        assert_eq!(nav.marked_count(), 1);

        assert!(!nav.toggle_mark(question));
        assert!(!nav.is_marked(question));
        assert_eq!(nav.marked_count(), 0);
    }
}
