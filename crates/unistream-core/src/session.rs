//! Live-session bookkeeping math.
//!
//! Elapsed time is always derived from the persisted start checkpoint and the
//! server clock, never from a duration kept in process memory.

use chrono::{DateTime, Utc};

/// Milliseconds in one hour.
pub const MILLIS_PER_HOUR: f64 = 3_600_000.0;

/// Hours elapsed between the checkpoint and `now`.
///
/// A missing checkpoint yields zero. A checkpoint in the future (clock skew
/// between instances) also yields zero rather than a negative session.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn session_hours(started_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> f64 {
    let Some(started_at) = started_at else {
        return 0.0;
    };
    let millis = (now - started_at).num_milliseconds().max(0);
    millis as f64 / MILLIS_PER_HOUR
}

/// Result of closing a broadcast.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionSummary {
    /// Hours credited for the session just closed.
    pub session_hours: f64,
    /// Cumulative hours after the credit.
    pub total_hours: f64,
    /// Whether a start checkpoint existed.
    pub had_checkpoint: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn one_hour_session() {
        let start = Utc::now();
        let hours = session_hours(Some(start), start + Duration::milliseconds(3_600_000));
        assert!((hours - 1.0).abs() < 1e-9);
    }

    #[test]
    fn fractional_hours() {
        let start = Utc::now();
        let hours = session_hours(Some(start), start + Duration::minutes(90));
        assert!((hours - 1.5).abs() < 1e-9);
    }

    #[test]
    fn missing_checkpoint_awards_nothing() {
        assert!(session_hours(None, Utc::now()).abs() < f64::EPSILON);
    }

    #[test]
    fn future_checkpoint_awards_nothing() {
        let now = Utc::now();
        assert!(session_hours(Some(now + Duration::minutes(1)), now).abs() < f64::EPSILON);
    }
}
