use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};

use exam_core::countdown::CountdownStep;
use exam_core::model::{
    AnswerValue, Attempt, AttemptAnswer, AttemptResult, Exam, ExamId, QuestionId, SectionId,
    TestCode,
};
use gateway::GatewayError;
use gateway::api::{ExamGateway, SectionOutcome, StartedAttempt};

use super::progress::AttemptProgress;
use super::session::AttemptSession;
use super::sync::AnswerSyncQueue;
use crate::Clock;
use crate::error::AttemptError;

//
// ─── OUTCOMES ──────────────────────────────────────────────────────────────────
//

/// Coarse lifecycle phase, for rendering and control flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowPhase {
    /// No attempt yet.
    Idle,
    /// Attempt started; a section is waiting to be opened.
    Ready,
    /// A section is open and its timer is running.
    InProgress,
    /// The backend confirmed the final submission.
    Completed,
}

/// What a submission achieved.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// The section closed; this one comes next.
    NextSection(SectionId),
    /// The whole test closed with this result.
    Completed(AttemptResult),
    /// Nothing to submit; repeated clicks land here.
    Ignored,
}

/// What one timer tick observed and did.
#[derive(Debug)]
pub enum TickOutcome {
    /// No section is running.
    Inactive,
    /// The timer is still counting down.
    Running { remaining_secs: u32 },
    /// Time ran out and the section was submitted.
    SectionEnded(SubmitOutcome),
    /// Time ran out but submission failed; the next tick retries.
    SubmitPending(AttemptError),
}

//
// ─── FLOW ──────────────────────────────────────────────────────────────────────
//

#[derive(Debug)]
struct ActiveState {
    attempt: Attempt,
    exam: Exam,
    session: AttemptSession,
    sync: AnswerSyncQueue,
    pending_test: bool,
}

#[derive(Debug)]
enum FlowState {
    Idle,
    Ready {
        attempt: Attempt,
        exam: Exam,
        next: SectionId,
    },
    InProgress(Box<ActiveState>),
    Completed {
        exam: Exam,
        result: AttemptResult,
    },
}

/// Drives one test attempt end to end.
///
/// Owns the lifecycle state: idle until an attempt starts, resting between
/// sections, in progress while a section timer runs, completed once the
/// backend confirms the final submission. Every transition that talks to the
/// backend leaves the current state untouched when the call fails, so callers
/// retry by calling the same operation again.
pub struct AttemptFlow {
    clock: Clock,
    gateway: Arc<dyn ExamGateway>,
    state: FlowState,
}

impl AttemptFlow {
    #[must_use]
    pub fn new(clock: Clock, gateway: Arc<dyn ExamGateway>) -> Self {
        Self {
            clock,
            gateway,
            state: FlowState::Idle,
        }
    }

    // Accessors
    #[must_use]
    pub fn phase(&self) -> FlowPhase {
        match &self.state {
            FlowState::Idle => FlowPhase::Idle,
            FlowState::Ready { .. } => FlowPhase::Ready,
            FlowState::InProgress(_) => FlowPhase::InProgress,
            FlowState::Completed { .. } => FlowPhase::Completed,
        }
    }

    #[must_use]
    pub fn exam(&self) -> Option<&Exam> {
        match &self.state {
            FlowState::Idle => None,
            FlowState::Ready { exam, .. } | FlowState::Completed { exam, .. } => Some(exam),
            FlowState::InProgress(active) => Some(&active.exam),
        }
    }

    #[must_use]
    pub fn attempt(&self) -> Option<&Attempt> {
        match &self.state {
            FlowState::Ready { attempt, .. } => Some(attempt),
            FlowState::InProgress(active) => Some(&active.attempt),
            _ => None,
        }
    }

    /// The running section, while one is open.
    #[must_use]
    pub fn session(&self) -> Option<&AttemptSession> {
        match &self.state {
            FlowState::InProgress(active) => Some(&active.session),
            _ => None,
        }
    }

    /// The section waiting to be opened, while resting between sections.
    #[must_use]
    pub fn next_section(&self) -> Option<SectionId> {
        match &self.state {
            FlowState::Ready { next, .. } => Some(*next),
            _ => None,
        }
    }

    /// The final result, once the test is complete.
    #[must_use]
    pub fn result(&self) -> Option<&AttemptResult> {
        match &self.state {
            FlowState::Completed { result, .. } => Some(result),
            _ => None,
        }
    }

    #[must_use]
    pub fn progress(&self) -> Option<AttemptProgress> {
        self.active().ok().map(|a| a.session.progress())
    }

    #[must_use]
    pub fn remaining_secs(&self) -> Option<u32> {
        let active = self.active().ok()?;
        active.session.remaining_secs(self.clock.now())
    }

    /// Answer saves queued but not yet delivered.
    #[must_use]
    pub fn pending_saves(&self) -> usize {
        self.active().map(|a| a.sync.len()).unwrap_or(0)
    }

    /// Shift a fixed clock forward. No effect on the default clock.
    pub fn advance_clock(&mut self, delta: Duration) {
        self.clock.advance(delta);
    }

    // Lifecycle
    /// Start (or resume) an attempt on the given exam.
    ///
    /// The flow rests before the first unfinished section; call
    /// [`start_section`](Self::start_section) to open it.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::AlreadyStarted` if an attempt is already active,
    /// and `AttemptError::Gateway` when the backend refuses the start.
    pub async fn start(&mut self, exam_id: ExamId) -> Result<SectionId, AttemptError> {
        if !matches!(self.state, FlowState::Idle) {
            return Err(AttemptError::AlreadyStarted);
        }
        let started = self.gateway.start_attempt(exam_id).await?;
        Ok(self.enter_ready(started))
    }

    /// Start (or resume) an attempt through a six-digit access code.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::Code` for a malformed code, without touching the
    /// backend; otherwise fails like [`start`](Self::start).
    pub async fn start_by_code(&mut self, code: &str) -> Result<SectionId, AttemptError> {
        if !matches!(self.state, FlowState::Idle) {
            return Err(AttemptError::AlreadyStarted);
        }
        let code = TestCode::new(code)?;
        let started = self.gateway.start_attempt_by_code(&code).await?;
        Ok(self.enter_ready(started))
    }

    fn enter_ready(&mut self, started: StartedAttempt) -> SectionId {
        let StartedAttempt { attempt, exam } = started;
        let next = attempt
            .current_section()
            .unwrap_or_else(|| exam.first_section().id());
        info!(
            "attempt {} open on \"{}\", next section {next}",
            attempt.id(),
            exam.title()
        );
        self.state = FlowState::Ready {
            attempt,
            exam,
            next,
        };
        next
    }

    /// Open the pending section and fetch its questions.
    ///
    /// On failure the flow stays at rest, so calling again retries.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::NoPendingSection` unless the flow is resting
    /// between sections, and `AttemptError::Gateway` when the fetch fails.
    pub async fn start_section(&mut self) -> Result<SectionId, AttemptError> {
        let (exam_id, next) = match &self.state {
            FlowState::Ready { exam, next, .. } => (exam.id(), *next),
            _ => return Err(AttemptError::NoPendingSection),
        };
        let start = self.gateway.start_section(exam_id, next).await?;

        let FlowState::Ready {
            mut attempt, exam, ..
        } = std::mem::replace(&mut self.state, FlowState::Idle)
        else {
            return Err(AttemptError::NoPendingSection);
        };
        if let Err(e) = attempt.advance_to(start.section_id) {
            warn!("attempt refused section advance: {e}");
        }
        let name = exam
            .section(start.section_id)
            .map(|s| s.name().to_owned())
            .unwrap_or_else(|| format!("Section {}", start.section_id));
        let session = AttemptSession::from_start(start, name);
        let section_id = session.section_id();
        info!(
            "section {section_id} open with {} questions",
            session.question_count()
        );

        self.state = FlowState::InProgress(Box::new(ActiveState {
            attempt,
            exam,
            session,
            sync: AnswerSyncQueue::new(),
            pending_test: false,
        }));
        Ok(section_id)
    }

    // Answering and navigation
    /// Record an answer and queue it for background delivery.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::NoActiveSection` when no section is open, and
    /// the session's own errors for expired timers and foreign ids.
    pub fn record_answer(
        &mut self,
        question_id: QuestionId,
        value: AnswerValue,
    ) -> Result<(), AttemptError> {
        let now = self.clock.now();
        let active = self.active_mut()?;
        active.session.record_answer(question_id, value.clone())?;
        active.sync.enqueue(AttemptAnswer { question_id, value }, now);
        Ok(())
    }

    /// Answer the question currently in view.
    ///
    /// # Errors
    ///
    /// Fails like [`record_answer`](Self::record_answer); an empty section has
    /// no current question and yields `AttemptError::UnknownQuestion`.
    pub fn answer_current(&mut self, value: AnswerValue) -> Result<QuestionId, AttemptError> {
        let question_id = self
            .active()?
            .session
            .current_question()
            .map(|q| q.id())
            .ok_or(AttemptError::NoActiveSection)?;
        self.record_answer(question_id, value)?;
        Ok(question_id)
    }

    /// Move to the next question. Clamped at the last one.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::NoActiveSection` when no section is open.
    pub fn next_question(&mut self) -> Result<usize, AttemptError> {
        Ok(self.active_mut()?.session.next())
    }

    /// Move to the previous question. Clamped at the first one.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::NoActiveSection` when no section is open.
    pub fn previous_question(&mut self) -> Result<usize, AttemptError> {
        Ok(self.active_mut()?.session.previous())
    }

    /// Jump to a question by zero-based position. Clamped into range.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::NoActiveSection` when no section is open.
    pub fn go_to(&mut self, index: usize) -> Result<usize, AttemptError> {
        Ok(self.active_mut()?.session.go_to(index))
    }

    /// Toggle the review mark on the question in view.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::NoActiveSection` when no section is open.
    pub fn toggle_mark(&mut self) -> Result<bool, AttemptError> {
        Ok(self
            .active_mut()?
            .session
            .toggle_mark_current()
            .unwrap_or(false))
    }

    // Submission
    /// Submit the open section, advancing to the next one or completing the
    /// test after the last.
    ///
    /// A second click while nothing is open is ignored rather than rejected,
    /// so double submissions cannot reach the backend.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::NotStarted` before any attempt, and
    /// `AttemptError::Gateway` when completion fails; the section stays open
    /// in that case and submitting again retries.
    pub async fn submit(&mut self) -> Result<SubmitOutcome, AttemptError> {
        match self.state {
            FlowState::Idle => return Err(AttemptError::NotStarted),
            FlowState::Ready { .. } | FlowState::Completed { .. } => {
                return Ok(SubmitOutcome::Ignored);
            }
            FlowState::InProgress(_) => {}
        }

        let outcome = self.run_completion().await?;
        if let SubmitOutcome::NextSection(next) = outcome {
            self.autostart_next(next).await;
        }
        Ok(outcome)
    }

    /// Advance the countdown by one observation of the clock.
    ///
    /// While the timer runs this also delivers queued answer saves. On expiry
    /// it submits the section; a failed expiry submission is retried on the
    /// next tick, and the successful one happens exactly once because it
    /// leaves the in-progress state behind.
    pub async fn tick(&mut self) -> TickOutcome {
        let now = self.clock.now();
        let step = match &mut self.state {
            FlowState::InProgress(active) => active.session.tick(now),
            _ => return TickOutcome::Inactive,
        };

        match step {
            CountdownStep::NotHydrated => TickOutcome::Inactive,
            CountdownStep::Running { remaining_secs } => {
                self.drain_saves(now).await;
                TickOutcome::Running { remaining_secs }
            }
            CountdownStep::JustExpired | CountdownStep::Expired => {
                if matches!(step, CountdownStep::JustExpired) {
                    info!("section time expired, submitting");
                }
                match self.run_completion().await {
                    Ok(outcome) => {
                        if let SubmitOutcome::NextSection(next) = outcome {
                            self.autostart_next(next).await;
                        }
                        TickOutcome::SectionEnded(outcome)
                    }
                    Err(e) => TickOutcome::SubmitPending(e),
                }
            }
        }
    }

    // Results
    /// Fetch the full scored result, with its per-section lines, and keep it
    /// in place of the completion acknowledgement so [`result`](Self::result)
    /// sees the richer copy afterwards.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::NotCompleted` until the test is finalized, and
    /// `AttemptError::Gateway` when the fetch fails; the acknowledgement is
    /// kept in that case.
    pub async fn fetch_result(&mut self) -> Result<&AttemptResult, AttemptError> {
        let exam_id = match &self.state {
            FlowState::Completed { exam, .. } => exam.id(),
            _ => return Err(AttemptError::NotCompleted),
        };
        let fetched = self.gateway.fetch_result(exam_id).await?;
        let FlowState::Completed { result, .. } = &mut self.state else {
            return Err(AttemptError::NotCompleted);
        };
        *result = fetched;
        Ok(result)
    }

    /// Close the open section and, after the last one, the whole test.
    ///
    /// Runs as a pipeline with a hard gate per stage: a failed backend call
    /// restores the in-progress state and surfaces the error, and the next
    /// submission resumes at the failed stage. `pending_test` records that
    /// the section already closed so a retried final submission does not
    /// close it twice.
    async fn run_completion(&mut self) -> Result<SubmitOutcome, AttemptError> {
        let FlowState::InProgress(mut active) =
            std::mem::replace(&mut self.state, FlowState::Idle)
        else {
            return Err(AttemptError::NoActiveSection);
        };

        let exam_id = active.exam.id();
        let section_id = active.session.section_id();
        let answers = active.session.answers_for_submission();

        if !active.pending_test {
            match self
                .gateway
                .complete_section(exam_id, section_id, &answers)
                .await
            {
                Ok(SectionOutcome {
                    next_section: Some(next),
                }) => {
                    info!("section {section_id} closed, section {next} is next");
                    let ActiveState {
                        mut attempt, exam, ..
                    } = *active;
                    if let Err(e) = attempt.advance_to(next) {
                        warn!("attempt refused section advance: {e}");
                    }
                    self.state = FlowState::Ready {
                        attempt,
                        exam,
                        next,
                    };
                    return Ok(SubmitOutcome::NextSection(next));
                }
                Ok(SectionOutcome { next_section: None }) => {
                    info!("section {section_id} closed, finalizing the test");
                    active.pending_test = true;
                }
                Err(e) => {
                    warn!("section {section_id} completion failed: {e}");
                    self.state = FlowState::InProgress(active);
                    return Err(e.into());
                }
            }
        }

        let now = self.clock.now();
        let time_taken = elapsed_secs(active.attempt.started_at(), now);
        match self
            .gateway
            .complete_test(exam_id, active.attempt.id(), &answers, time_taken)
            .await
        {
            Ok(completion) => {
                // The acknowledgement carries headline numbers only; the pass
                // mark lives on the exam, and the section breakdown waits for
                // `fetch_result`.
                let passed = completion.score >= active.exam.passing_marks();
                let assembled = AttemptResult::new(
                    completion.score,
                    completion.total_marks,
                    completion.time_taken_secs.unwrap_or(time_taken),
                    passed,
                    Some(now),
                    Vec::new(),
                );
                let result = match assembled {
                    Ok(result) => result,
                    Err(e) => {
                        warn!("completion acknowledgement is inconsistent: {e}");
                        self.state = FlowState::InProgress(active);
                        return Err(GatewayError::Decode(e.to_string()).into());
                    }
                };
                info!(
                    "test complete: {}/{} marks, {}",
                    result.score(),
                    result.total_marks(),
                    if result.passed() { "passed" } else { "failed" }
                );
                let ActiveState { exam, .. } = *active;
                self.state = FlowState::Completed {
                    exam,
                    result: result.clone(),
                };
                Ok(SubmitOutcome::Completed(result))
            }
            Err(e) => {
                warn!("test submission failed, submitting again retries: {e}");
                self.state = FlowState::InProgress(active);
                Err(e.into())
            }
        }
    }

    /// Open the next section right after the previous one closed. A failure
    /// leaves the flow at rest where `start_section` retries by hand.
    async fn autostart_next(&mut self, next: SectionId) {
        if let Err(e) = self.start_section().await {
            warn!("section {next} did not open, retry from the rest screen: {e}");
        }
    }

    async fn drain_saves(&mut self, now: DateTime<Utc>) {
        let gateway = Arc::clone(&self.gateway);
        let FlowState::InProgress(active) = &mut self.state else {
            return;
        };
        let exam_id = active.exam.id();
        active.sync.drain(gateway.as_ref(), exam_id, now).await;
    }

    fn active(&self) -> Result<&ActiveState, AttemptError> {
        match &self.state {
            FlowState::InProgress(active) => Ok(active),
            _ => Err(AttemptError::NoActiveSection),
        }
    }

    fn active_mut(&mut self) -> Result<&mut ActiveState, AttemptError> {
        match &mut self.state {
            FlowState::InProgress(active) => Ok(active),
            _ => Err(AttemptError::NoActiveSection),
        }
    }
}

fn elapsed_secs(from: DateTime<Utc>, to: DateTime<Utc>) -> u32 {
    u32::try_from((to - from).num_seconds().max(0)).unwrap_or(u32::MAX)
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use exam_core::model::{
        Choice, ChoiceId, ChoiceLabel, Difficulty, Question, QuestionKind, Section,
    };
    use exam_core::time::fixed_now;
    use gateway::InMemoryGateway;

    fn build_exam() -> Exam {
        Exam::new(
            ExamId::new(1),
            "Placement",
            None,
            Difficulty::Medium,
            2,
            1,
            vec![
                Section::new(SectionId::new(10), "Reading", 0, 300, 1).unwrap(),
                Section::new(SectionId::new(20), "Writing", 1, 300, 1).unwrap(),
            ],
        )
        .unwrap()
    }

    fn build_question(id: u64) -> Question {
        Question::new(
            QuestionId::new(id),
            format!("Question {id}"),
            None,
            1,
            0,
            QuestionKind::MultipleChoice,
            vec![
                Choice::new(ChoiceId::new(id * 10 + 1), ChoiceLabel::A, "yes").unwrap(),
                Choice::new(ChoiceId::new(id * 10 + 2), ChoiceLabel::B, "no").unwrap(),
            ],
        )
        .unwrap()
    }

    fn build_flow() -> (AttemptFlow, Arc<InMemoryGateway>) {
        let gateway = InMemoryGateway::new().with_clock(Clock::fixed(fixed_now()));
        gateway.insert_exam(build_exam()).unwrap();
        gateway
            .insert_section_questions(ExamId::new(1), SectionId::new(10), vec![build_question(1)])
            .unwrap();
        gateway
            .insert_section_questions(ExamId::new(1), SectionId::new(20), vec![build_question(2)])
            .unwrap();
        let gateway = Arc::new(gateway);
        let flow = AttemptFlow::new(
            Clock::fixed(fixed_now()),
            Arc::clone(&gateway) as Arc<dyn ExamGateway>,
        );
        (flow, gateway)
    }

    #[tokio::test]
    async fn start_rests_before_the_first_section() {
        let (mut flow, gateway) = build_flow();

        let next = flow.start(ExamId::new(1)).await.unwrap();

        assert_eq!(next, SectionId::new(10));
        assert_eq!(flow.phase(), FlowPhase::Ready);
        assert_eq!(flow.next_section(), Some(SectionId::new(10)));
        // questions are fetched when the section opens, not before
        assert_eq!(gateway.counts().start_section, 0);
    }

    #[tokio::test]
    async fn second_start_is_rejected() {
        let (mut flow, _gateway) = build_flow();
        flow.start(ExamId::new(1)).await.unwrap();

        let err = flow.start(ExamId::new(1)).await.unwrap_err();
        assert!(matches!(err, AttemptError::AlreadyStarted));
    }

    #[tokio::test]
    async fn malformed_code_never_reaches_the_backend() {
        let (mut flow, gateway) = build_flow();

        let err = flow.start_by_code("12ab56").await.unwrap_err();

        assert!(matches!(err, AttemptError::Code(_)));
        assert_eq!(gateway.counts().start_attempt, 0);
        assert_eq!(flow.phase(), FlowPhase::Idle);
    }

    #[tokio::test]
    async fn submit_advances_to_the_next_section() {
        let (mut flow, gateway) = build_flow();
        flow.start(ExamId::new(1)).await.unwrap();
        flow.start_section().await.unwrap();
        flow.answer_current(AnswerValue::Choice(ChoiceId::new(11)))
            .unwrap();

        let outcome = flow.submit().await.unwrap();

        assert_eq!(outcome, SubmitOutcome::NextSection(SectionId::new(20)));
        assert_eq!(flow.phase(), FlowPhase::InProgress);
        assert_eq!(
            flow.session().map(AttemptSession::section_id),
            Some(SectionId::new(20))
        );
        assert_eq!(gateway.counts().start_section, 2);
        assert_eq!(gateway.counts().complete_test, 0);
    }

    #[tokio::test]
    async fn final_submit_completes_the_test() {
        let (mut flow, gateway) = build_flow();
        flow.start(ExamId::new(1)).await.unwrap();
        flow.start_section().await.unwrap();
        flow.answer_current(AnswerValue::Choice(ChoiceId::new(11)))
            .unwrap();
        flow.submit().await.unwrap();
        flow.answer_current(AnswerValue::Choice(ChoiceId::new(21)))
            .unwrap();

        let outcome = flow.submit().await.unwrap();

        let SubmitOutcome::Completed(result) = outcome else {
            panic!("expected completion, got {outcome:?}");
        };
        assert_eq!(flow.phase(), FlowPhase::Completed);
        assert_eq!(result.total_marks(), 2);
        assert_eq!(gateway.counts().complete_section, 2);
        assert_eq!(gateway.counts().complete_test, 1);
        assert_eq!(flow.result().map(AttemptResult::total_marks), Some(2));
    }

    #[tokio::test]
    async fn completion_derives_pass_from_the_exam() {
        let (mut flow, gateway) = build_flow();
        gateway
            .set_correct_choice(ExamId::new(1), QuestionId::new(1), ChoiceId::new(11))
            .unwrap();
        flow.start(ExamId::new(1)).await.unwrap();
        flow.start_section().await.unwrap();
        flow.answer_current(AnswerValue::Choice(ChoiceId::new(11)))
            .unwrap();
        flow.submit().await.unwrap();

        let outcome = flow.submit().await.unwrap();

        // the acknowledgement has no pass flag; one mark meets the pass
        // mark of one
        let SubmitOutcome::Completed(result) = outcome else {
            panic!("expected completion, got {outcome:?}");
        };
        assert_eq!(result.score(), 1);
        assert!(result.passed());
        assert!(result.section_results().is_empty());
    }

    #[tokio::test]
    async fn submit_with_nothing_open_is_ignored() {
        let (mut flow, gateway) = build_flow();

        assert!(matches!(
            flow.submit().await.unwrap_err(),
            AttemptError::NotStarted
        ));

        flow.start(ExamId::new(1)).await.unwrap();
        let outcome = flow.submit().await.unwrap();

        assert_eq!(outcome, SubmitOutcome::Ignored);
        assert_eq!(gateway.counts().complete_section, 0);
    }

    #[tokio::test]
    async fn tick_delivers_queued_saves() {
        let (mut flow, gateway) = build_flow();
        flow.start(ExamId::new(1)).await.unwrap();
        flow.start_section().await.unwrap();
        flow.record_answer(QuestionId::new(1), AnswerValue::Choice(ChoiceId::new(12)))
            .unwrap();
        assert_eq!(flow.pending_saves(), 1);

        let outcome = flow.tick().await;

        assert!(matches!(
            outcome,
            TickOutcome::Running { remaining_secs: 300 }
        ));
        assert_eq!(flow.pending_saves(), 0);
        assert_eq!(
            gateway.saved_answer(ExamId::new(1), QuestionId::new(1)),
            Some(AnswerValue::Choice(ChoiceId::new(12)))
        );
    }

    #[tokio::test]
    async fn expiry_submits_and_opens_the_next_section() {
        let (mut flow, gateway) = build_flow();
        flow.start(ExamId::new(1)).await.unwrap();
        flow.start_section().await.unwrap();
        flow.advance_clock(Duration::seconds(301));

        let outcome = flow.tick().await;

        assert!(matches!(
            outcome,
            TickOutcome::SectionEnded(SubmitOutcome::NextSection(next))
                if next == SectionId::new(20)
        ));
        assert_eq!(flow.phase(), FlowPhase::InProgress);
        assert_eq!(gateway.counts().complete_section, 1);
    }
}
