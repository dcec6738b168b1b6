use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use tracing::{debug, warn};

use exam_core::model::{AttemptAnswer, ExamId};
use gateway::api::ExamGateway;

// Backoff doubles per failed attempt, capped here.
const MAX_BACKOFF_SECS: u32 = 30;

#[derive(Debug, Clone)]
struct PendingSave {
    answer: AttemptAnswer,
    attempts: u32,
    not_before: DateTime<Utc>,
}

/// Best-effort queue of answer saves awaiting delivery.
///
/// One slot per question, last write wins: re-answering a question collapses
/// onto the queued entry and resets its backoff. Failed saves are retried
/// with jittered exponential backoff and never block interaction; the
/// section-completion payload carries the full sheet regardless, so a save
/// that never lands costs nothing at scoring time.
#[derive(Debug, Clone, Default)]
pub struct AnswerSyncQueue {
    pending: Vec<PendingSave>,
}

impl AnswerSyncQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Queue an answer for delivery, collapsing onto any entry already queued
    /// for the same question.
    pub fn enqueue(&mut self, answer: AttemptAnswer, now: DateTime<Utc>) {
        let entry = PendingSave {
            answer,
            attempts: 0,
            not_before: now,
        };
        if let Some(existing) = self
            .pending
            .iter_mut()
            .find(|p| p.answer.question_id == entry.answer.question_id)
        {
            *existing = entry;
        } else {
            self.pending.push(entry);
        }
    }

    /// Try to deliver every due entry once. Returns the number delivered.
    ///
    /// Retriable failures are rescheduled with backoff; anything the backend
    /// rejects outright (unknown question, foreign choice, finished attempt)
    /// is dropped, since retrying cannot fix it.
    pub async fn drain(
        &mut self,
        gateway: &dyn ExamGateway,
        exam_id: ExamId,
        now: DateTime<Utc>,
    ) -> usize {
        let mut delivered = 0;
        let queued = std::mem::take(&mut self.pending);

        for mut entry in queued {
            if entry.not_before > now {
                self.pending.push(entry);
                continue;
            }

            match gateway.save_answer(exam_id, &entry.answer).await {
                Ok(()) => {
                    debug!("saved answer for question {}", entry.answer.question_id);
                    delivered += 1;
                }
                Err(e) if e.is_retriable() => {
                    entry.attempts += 1;
                    entry.not_before = now + backoff(entry.attempts);
                    warn!(
                        "answer save for question {} failed (attempt {}), retrying: {e}",
                        entry.answer.question_id, entry.attempts
                    );
                    self.pending.push(entry);
                }
                Err(e) => {
                    warn!(
                        "answer save for question {} rejected, dropping: {e}",
                        entry.answer.question_id
                    );
                }
            }
        }

        delivered
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

fn backoff(attempts: u32) -> Duration {
    let exp = attempts.min(5);
    let secs = 2u32.pow(exp).min(MAX_BACKOFF_SECS);
    let jitter_ms = rand::rng().random_range(0..1000);
    Duration::seconds(i64::from(secs)) + Duration::milliseconds(jitter_ms)
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
