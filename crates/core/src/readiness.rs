//! Readiness predicates and the client polling schedule.
//!
//! A section is "ready" only when it holds meaningful content. Rows that
//! merely exist (zeroed scores, blank output) are the transient processing
//! placeholder written by the new-version flow and must read as not ready.

use std::time::Duration;

use serde::Serialize;

use crate::scoring::SubScores;

/// Attempt budget of the client poll loop (~2 minutes with backoff).
pub const MAX_POLL_ATTEMPTS: u32 = 30;

/// First poll delay.
pub const INITIAL_POLL_DELAY: Duration = Duration::from_millis(500);

/// Poll delays never exceed this.
pub const MAX_POLL_DELAY: Duration = Duration::from_secs(5);

const POLL_BACKOFF_FACTOR: f64 = 1.5;

/// Per-prompt processing status as reported to pollers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ReadinessStatus {
    pub evaluation: bool,
    pub output: bool,
}

impl ReadinessStatus {
    pub fn is_complete(&self) -> bool {
        self.evaluation && self.output
    }
}

/// Evaluation is ready when a row exists and at least one sub-score is nonzero.
pub fn is_evaluation_ready(scores: Option<&SubScores>) -> bool {
    scores.is_some_and(|s| !s.is_zeroed())
}

/// Output is ready when a row exists and its text is non-empty after trimming.
pub fn is_output_ready(text: Option<&str>) -> bool {
    text.is_some_and(|t| !t.trim().is_empty())
}

/// Delay before poll number `attempt` (0-based): 0.5s growing by 1.5x, capped at 5s.
pub fn next_poll_delay(attempt: u32) -> Duration {
    let factor = POLL_BACKOFF_FACTOR.powi(attempt.min(32) as i32);
    let millis = (INITIAL_POLL_DELAY.as_millis() as f64 * factor)
        .min(MAX_POLL_DELAY.as_millis() as f64);
    Duration::from_millis(millis as u64)
}

/// Why processing looks stuck once the poll budget is exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StallKind {
    /// Nothing ready and no run in flight: processing never started.
    NotStarted,
    /// One section finished, the other is stuck.
    Partial,
    /// Nothing ready yet but a run is still in flight.
    Slow,
}

/// Classify a stalled prompt. Returns `None` while the budget is not
/// exhausted or when both sections are ready.
pub fn classify_stall(status: ReadinessStatus, attempt: u32, in_flight: bool) -> Option<StallKind> {
    if attempt < MAX_POLL_ATTEMPTS || status.is_complete() {
        return None;
    }
    if status.evaluation || status.output {
        Some(StallKind::Partial)
    } else if in_flight {
        Some(StallKind::Slow)
    } else {
        Some(StallKind::NotStarted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scores(c: i32, s: i32, x: i32, e: i32) -> SubScores {
        SubScores {
            clarity: c,
            specificity: s,
            contextual: x,
            effectiveness: e,
        }
    }

    #[test]
    fn missing_or_zeroed_evaluation_is_not_ready() {
        assert!(!is_evaluation_ready(None));
        assert!(!is_evaluation_ready(Some(&scores(0, 0, 0, 0))));
        assert!(is_evaluation_ready(Some(&scores(0, 0, 0, 1))));
    }

    #[test]
    fn blank_output_is_not_ready() {
        assert!(!is_output_ready(None));
        assert!(!is_output_ready(Some("")));
        assert!(!is_output_ready(Some("  \n\t")));
        assert!(is_output_ready(Some("Hello")));
    }

    #[test]
    fn poll_delay_escalates_and_caps() {
        assert_eq!(next_poll_delay(0), Duration::from_millis(500));
        assert_eq!(next_poll_delay(1), Duration::from_millis(750));
        assert!(next_poll_delay(3) > next_poll_delay(2));
        assert_eq!(next_poll_delay(10), MAX_POLL_DELAY);
        assert_eq!(next_poll_delay(u32::MAX), MAX_POLL_DELAY);
    }

    #[test]
    fn full_budget_is_about_two_minutes() {
        let total: Duration = (0..MAX_POLL_ATTEMPTS).map(next_poll_delay).sum();
        assert!(total >= Duration::from_secs(100));
        assert!(total <= Duration::from_secs(150));
    }

    #[test]
    fn stall_classification() {
        let none = ReadinessStatus::default();
        let half = ReadinessStatus {
            evaluation: true,
            output: false,
        };
        let done = ReadinessStatus {
            evaluation: true,
            output: true,
        };

        assert_eq!(classify_stall(none, 5, false), None);
        assert_eq!(classify_stall(done, 30, false), None);
        assert_eq!(classify_stall(half, 30, true), Some(StallKind::Partial));
        assert_eq!(classify_stall(none, 30, true), Some(StallKind::Slow));
        assert_eq!(classify_stall(none, 31, false), Some(StallKind::NotStarted));
    }
}
