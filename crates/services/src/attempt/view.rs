use exam_core::model::QuestionId;

use super::session::AttemptSession;

/// Presentation-agnostic palette entry for one question.
///
/// This is intentionally **not** a UI view-model: no pre-formatted strings,
/// no styling assumptions. The UI decides how current/answered/marked render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaletteEntry {
    pub question_id: QuestionId,
    /// 1-based display number in section order.
    pub number: usize,
    pub is_current: bool,
    pub is_answered: bool,
    pub is_marked: bool,
}

/// Project the question palette from session state.
///
/// Pure function of the session; holds no state of its own.
#[must_use]
pub fn palette(session: &AttemptSession) -> Vec<PaletteEntry> {
    let current = session.current_index();
    session
        .questions()
        .iter()
        .enumerate()
        .map(|(position, question)| PaletteEntry {
            question_id: question.id(),
            number: position + 1,
            is_current: position == current,
            is_answered: session.is_answered(question.id()),
            is_marked: session.is_marked(question.id()),
        })
        .collect()
}

/// Format a second count as `mm:ss`, or `h:mm:ss` from one hour up.
#[must_use]
pub fn format_timer(seconds: u32) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let remainder = seconds % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{remainder:02}")
    } else {
        format!("{minutes:02}:{remainder:02}")
    }
}

/// Label shown next to a palette entry, e.g. `[3*]` for a marked question.
#[must_use]
pub fn palette_label(entry: &PaletteEntry) -> String {
    let mark = if entry.is_marked { "*" } else { "" };
    if entry.is_current {
        format!(">{}{mark}<", entry.number)
    } else if entry.is_answered {
        format!("[{}{mark}]", entry.number)
    } else {
        format!("({}{mark})", entry.number)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use exam_core::model::{
        AnswerValue, Choice, ChoiceId, ChoiceLabel, Question, QuestionKind, SectionId,
    };
    use exam_core::time::fixed_now;
    use gateway::SectionStart;

    fn build_question(id: u64, order: u32) -> Question {
        Question::new(
            QuestionId::new(id),
            format!("Question {id}?"),
            None,
            1,
            order,
            QuestionKind::MultipleChoice,
            vec![Choice::new(ChoiceId::new(id * 10 + 1), ChoiceLabel::A, "only").unwrap()],
        )
        .unwrap()
    }

    fn build_session() -> AttemptSession {
        AttemptSession::from_start(
            SectionStart {
                section_id: SectionId::new(10),
                started_at: fixed_now(),
                time_limit_secs: 300,
                questions: vec![build_question(1, 0), build_question(2, 1), build_question(3, 2)],
                saved_answers: Vec::new(),
            },
            "Reading",
        )
    }

    #[test]
    fn palette_reflects_current_answered_and_marked() {
        let mut session = build_session();
        session
            .record_answer(QuestionId::new(1), AnswerValue::Choice(ChoiceId::new(11)))
            .unwrap();
        session.next();
        session.toggle_mark_current();

        let entries = palette(&session);

        assert_eq!(entries.len(), 3);
        assert!(entries[0].is_answered);
        assert!(!entries[0].is_current);
        assert!(entries[1].is_current);
        assert!(entries[1].is_marked);
        assert!(!entries[2].is_answered);
        assert_eq!(entries[2].number, 3);
    }

    #[test]
    fn timer_formats_minutes_and_hours() {
        assert_eq!(format_timer(0), "00:00");
        assert_eq!(format_timer(65), "01:05");
        assert_eq!(format_timer(600), "10:00");
        assert_eq!(format_timer(3600), "1:00:00");
        assert_eq!(format_timer(3700), "1:01:40");
    }

    #[test]
    fn labels_distinguish_states() {
        let entry = PaletteEntry {
            question_id: QuestionId::new(1),
            number: 2,
            is_current: false,
            is_answered: true,
            is_marked: true,
        };
        assert_eq!(palette_label(&entry), "[2*]");

        let current = PaletteEntry {
            is_current: true,
            is_answered: false,
            is_marked: false,
            ..entry
        };
        assert_eq!(palette_label(&current), ">2<");
    }
}
