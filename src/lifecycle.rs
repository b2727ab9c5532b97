//! Round lifecycle derived from wall-clock time.
//!
//! A round never stores its state: every read derives it from the immutable
//! window, so no background job has to flip rounds between phases.

use std::time::{Duration, SystemTime};

use crate::dao::models::RoundEntity;

/// Phase of a round at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundPhase {
    /// The round exists but has not opened for taps yet.
    Cooldown,
    /// Taps are accepted. Both window boundaries are inclusive.
    Active,
    /// The window has passed; the score sheet is final.
    Finished,
}

/// Classify `round` at the instant `now`.
///
/// Callers must sample the clock once and pass the same instant to every
/// decision made about a request, so a tap cannot be judged against two
/// different clocks.
pub fn classify(round: &RoundEntity, now: SystemTime) -> RoundPhase {
    if now < round.start_time {
        RoundPhase::Cooldown
    } else if now <= round.end_time {
        RoundPhase::Active
    } else {
        RoundPhase::Finished
    }
}

/// Compute the window of a round created at `now`: taps open after
/// `cooldown` and stay open for `duration`.
pub fn plan_window(
    now: SystemTime,
    cooldown: Duration,
    duration: Duration,
) -> (SystemTime, SystemTime) {
    let start = now + cooldown;
    (start, start + duration)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn round(start: SystemTime, end: SystemTime) -> RoundEntity {
        RoundEntity {
            id: Uuid::new_v4(),
            start_time: start,
            end_time: end,
            total_score: 0,
            winner_id: None,
            created_at: start,
        }
    }

    #[test]
    fn before_start_is_cooldown() {
        let now = SystemTime::now();
        let r = round(now + Duration::from_secs(30), now + Duration::from_secs(90));
        assert_eq!(classify(&r, now), RoundPhase::Cooldown);
    }

    #[test]
    fn boundaries_are_inclusive() {
        let start = SystemTime::now();
        let end = start + Duration::from_secs(60);
        let r = round(start, end);
        assert_eq!(classify(&r, start), RoundPhase::Active);
        assert_eq!(classify(&r, end), RoundPhase::Active);
    }

    #[test]
    fn inside_window_is_active() {
        let start = SystemTime::now();
        let r = round(start, start + Duration::from_secs(60));
        assert_eq!(
            classify(&r, start + Duration::from_secs(30)),
            RoundPhase::Active
        );
    }

    #[test]
    fn after_end_is_finished() {
        let start = SystemTime::now();
        let end = start + Duration::from_secs(60);
        let r = round(start, end);
        assert_eq!(
            classify(&r, end + Duration::from_millis(1)),
            RoundPhase::Finished
        );
    }

    #[test]
    fn planned_window_spans_cooldown_then_duration() {
        let now = SystemTime::now();
        let (start, end) = plan_window(now, Duration::from_secs(30), Duration::from_secs(60));
        assert_eq!(start, now + Duration::from_secs(30));
        assert_eq!(end, now + Duration::from_secs(90));
    }
}
