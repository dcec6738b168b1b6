use chrono::{DateTime, Utc};

//
// ─── STEP ──────────────────────────────────────────────────────────────────────
//

/// Outcome of a single countdown tick.
///
/// The caller drives the countdown once per second and reacts to the step:
/// `JustExpired` is reported exactly once per hydration and is the signal to
/// submit the section without asking for confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownStep {
    /// No server timing data has been applied yet; nothing to count.
    NotHydrated,
    /// Time is still running.
    Running { remaining_secs: u32 },
    /// The budget reached zero on this tick.
    JustExpired,
    /// The budget reached zero on an earlier tick.
    Expired,
}

impl CountdownStep {
    /// Remaining seconds carried by this step, zero once expired.
    #[must_use]
    pub fn remaining_secs(&self) -> Option<u32> {
        match self {
            CountdownStep::NotHydrated => None,
            CountdownStep::Running { remaining_secs } => Some(*remaining_secs),
            CountdownStep::JustExpired | CountdownStep::Expired => Some(0),
        }
    }
}

//
// ─── COUNTDOWN ─────────────────────────────────────────────────────────────────
//

/// Remaining-time state machine for one section of an attempt.
///
/// The countdown never free-runs: remaining time is always recomputed as
/// `max(0, limit − (now − started_at))` from the start timestamp the backend
/// reported, so a page reload or a delayed tick can make the value jump down
/// but never drift up.
///
/// A fresh countdown is unhydrated and reports [`CountdownStep::NotHydrated`]
/// no matter how often it is ticked. Only [`hydrate`](Countdown::hydrate)
/// arms it, and a zero budget at hydration expires on the very next tick.
///
/// # Examples
///
/// ```
/// # use exam_core::countdown::{Countdown, CountdownStep};
/// # use chrono::{Duration, TimeZone, Utc};
/// let start = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();
/// let mut countdown = Countdown::new();
/// assert_eq!(countdown.tick(start), CountdownStep::NotHydrated);
///
/// countdown.hydrate(start, 300);
/// let step = countdown.tick(start + Duration::seconds(10));
/// assert_eq!(step, CountdownStep::Running { remaining_secs: 290 });
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Countdown {
    hydrated: bool,
    started_at: Option<DateTime<Utc>>,
    limit_secs: u32,
    expired: bool,
}

impl Countdown {
    /// Creates an unhydrated countdown.
    #[must_use]
    pub fn new() -> Self {
        Self {
            hydrated: false,
            started_at: None,
            limit_secs: 0,
            expired: false,
        }
    }

    /// Arm the countdown with the backend's section-start data.
    ///
    /// `started_at` is the server-side start timestamp, `limit_secs` the
    /// section budget. Hydrating again replaces the previous timing data and
    /// clears the expiry latch.
    pub fn hydrate(&mut self, started_at: DateTime<Utc>, limit_secs: u32) {
        self.hydrated = true;
        self.started_at = Some(started_at);
        self.limit_secs = limit_secs;
        self.expired = false;
    }

    #[must_use]
    pub fn is_hydrated(&self) -> bool {
        self.hydrated
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expired
    }

    #[must_use]
    pub fn limit_secs(&self) -> u32 {
        self.limit_secs
    }

    #[must_use]
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// Seconds left at `now`, or `None` before hydration.
    ///
    /// Clamped to zero; a `started_at` in the future (client clock behind the
    /// server) counts as no time elapsed rather than extra time granted.
    #[must_use]
    pub fn remaining_secs(&self, now: DateTime<Utc>) -> Option<u32> {
        if !self.hydrated {
            return None;
        }
        let started_at = self.started_at?;
        let elapsed = (now - started_at).num_seconds().max(0);
        let remaining = i64::from(self.limit_secs) - elapsed;
        Some(u32::try_from(remaining.max(0)).unwrap_or(0))
    }

    /// Advance the countdown to `now`.
    ///
    /// Reports [`CountdownStep::JustExpired`] on the first tick at which the
    /// budget is exhausted and [`CountdownStep::Expired`] on every tick after
    /// that, so the caller can trigger auto-submission exactly once.
    pub fn tick(&mut self, now: DateTime<Utc>) -> CountdownStep {
        if !self.hydrated {
            return CountdownStep::NotHydrated;
        }
        if self.expired {
            return CountdownStep::Expired;
        }

        let remaining_secs = self.remaining_secs(now).unwrap_or(0);
        if remaining_secs == 0 {
            self.expired = true;
            return CountdownStep::JustExpired;
        }
        CountdownStep::Running { remaining_secs }
    }
}

impl Default for Countdown {
    fn default() -> Self {
        Self::new()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;
    use chrono::Duration;

    #[test]
    fn unhydrated_never_runs_or_expires() {
        let mut countdown = Countdown::new();
        let start = fixed_now();

        assert_eq!(countdown.tick(start), CountdownStep::NotHydrated);
        assert_eq!(
            countdown.tick(start + Duration::hours(3)),
            CountdownStep::NotHydrated
        );
        assert_eq!(countdown.remaining_secs(start), None);
        assert!(!countdown.is_expired());
    }

    #[test]
    fn remaining_is_limit_minus_elapsed() {
        let start = fixed_now();
        let mut countdown = Countdown::new();
        countdown.hydrate(start, 300);

        assert_eq!(countdown.remaining_secs(start), Some(300));
        assert_eq!(
            countdown.remaining_secs(start + Duration::seconds(90)),
            Some(210)
        );
        assert_eq!(
            countdown.tick(start + Duration::seconds(90)),
            CountdownStep::Running { remaining_secs: 210 }
        );
    }

    #[test]
    fn remaining_never_goes_negative() {
        let start = fixed_now();
        let mut countdown = Countdown::new();
        countdown.hydrate(start, 60);

        assert_eq!(
            countdown.remaining_secs(start + Duration::seconds(300)),
            Some(0)
        );
    }

    #[test]
    fn remaining_never_increases_over_ticks() {
        let start = fixed_now();
        let mut countdown = Countdown::new();
        countdown.hydrate(start, 120);

        let mut previous = u32::MAX;
        for s in 0..=130 {
            let step = countdown.tick(start + Duration::seconds(s));
            if let Some(remaining) = step.remaining_secs() {
                assert!(remaining <= previous, "remaining increased at second {s}");
                previous = remaining;
            }
        }
        assert!(countdown.is_expired());
    }

    #[test]
    fn expiry_fires_exactly_once() {
        let start = fixed_now();
        let mut countdown = Countdown::new();
        countdown.hydrate(start, 5);

        assert_eq!(
            countdown.tick(start + Duration::seconds(4)),
            CountdownStep::Running { remaining_secs: 1 }
        );
        assert_eq!(
            countdown.tick(start + Duration::seconds(5)),
            CountdownStep::JustExpired
        );
        assert_eq!(
            countdown.tick(start + Duration::seconds(6)),
            CountdownStep::Expired
        );
        assert_eq!(
            countdown.tick(start + Duration::seconds(7)),
            CountdownStep::Expired
        );
    }

    #[test]
    fn zero_budget_expires_on_first_tick() {
        let start = fixed_now();
        let mut countdown = Countdown::new();
        countdown.hydrate(start, 0);

        assert_eq!(countdown.tick(start), CountdownStep::JustExpired);
        assert_eq!(countdown.tick(start), CountdownStep::Expired);
    }

    #[test]
    fn future_start_counts_as_full_budget() {
        let start = fixed_now();
        let mut countdown = Countdown::new();
        countdown.hydrate(start + Duration::seconds(30), 60);

        // client clock behind the server: no elapsed time yet
        assert_eq!(countdown.remaining_secs(start), Some(60));
        assert_eq!(
            countdown.tick(start),
            CountdownStep::Running { remaining_secs: 60 }
        );
    }

    #[test]
    fn rehydrate_clears_expiry_latch() {
        let start = fixed_now();
        let mut countdown = Countdown::new();
        countdown.hydrate(start, 1);
        assert_eq!(
            countdown.tick(start + Duration::seconds(2)),
            CountdownStep::JustExpired
        );

        let restart = start + Duration::seconds(10);
        countdown.hydrate(restart, 60);
        assert!(!countdown.is_expired());
        assert_eq!(
            countdown.tick(restart + Duration::seconds(1)),
            CountdownStep::Running { remaining_secs: 59 }
        );
    }

    #[test]
    fn reload_recomputes_from_server_start() {
        // simulates rebuilding the countdown after a reload 40s in
        let start = fixed_now();
        let mut countdown = Countdown::new();
        countdown.hydrate(start, 300);

        let reload_at = start + Duration::seconds(40);
        assert_eq!(
            countdown.tick(reload_at),
            CountdownStep::Running { remaining_secs: 260 }
        );
    }
}
