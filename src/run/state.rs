//! Run lifecycle state and the staleness gate.

use chrono::Utc;

use crate::config::STALE_RUN_WINDOW;

/// Mutable state of the (single) scrape run slot.
#[derive(Debug, Clone, Default)]
pub struct RunState {
    /// Whether a run is currently marked in progress.
    pub running: bool,
    /// Epoch milliseconds when the current run started; 0 when never started.
    pub started_at_ms: i64,
}

/// Outcome of a start request against the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartDecision {
    /// No run in progress; start normally.
    FreshStart,
    /// A run is marked in progress but exceeded the staleness window, so it
    /// is presumed dead (crashed process, killed tab) and gets replaced.
    StaleReset,
    /// A live run is in progress; the request is rejected.
    Rejected,
}

/// Decides whether a start request may proceed.
///
/// A marked-running state only blocks a new run while it is younger than the
/// staleness window; a crashed run can therefore never wedge the slot
/// permanently.
pub fn evaluate_start(state: &RunState, now_ms: i64) -> StartDecision {
    if !state.running {
        return StartDecision::FreshStart;
    }
    let age_ms = now_ms.saturating_sub(state.started_at_ms);
    if age_ms < STALE_RUN_WINDOW.as_millis() as i64 {
        StartDecision::Rejected
    } else {
        StartDecision::StaleReset
    }
}

/// Current time in epoch milliseconds.
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_state_starts_fresh() {
        let state = RunState::default();
        assert_eq!(evaluate_start(&state, 1_000_000), StartDecision::FreshStart);
    }

    #[test]
    fn young_run_rejects_a_second_start() {
        let state = RunState {
            running: true,
            started_at_ms: 1_000_000,
        };
        let within = 1_000_000 + STALE_RUN_WINDOW.as_millis() as i64 - 1;
        assert_eq!(evaluate_start(&state, within), StartDecision::Rejected);
    }

    #[test]
    fn stale_run_is_reset() {
        let state = RunState {
            running: true,
            started_at_ms: 1_000_000,
        };
        let past = 1_000_000 + STALE_RUN_WINDOW.as_millis() as i64;
        assert_eq!(evaluate_start(&state, past), StartDecision::StaleReset);
    }

    #[test]
    fn clock_skew_before_start_still_rejects() {
        let state = RunState {
            running: true,
            started_at_ms: 1_000_000,
        };
        // A now-value before started_at saturates to age 0.
        assert_eq!(evaluate_start(&state, 999_000), StartDecision::Rejected);
    }
}
