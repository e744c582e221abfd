//! Leveling math.
//!
//! Two independent axes exist. A fan's standing with a streamer is graded
//! with that streamer's configurable threshold (points per level), and a
//! streamer's own broadcasting level grows by one every ten live hours.

use serde::Serialize;

/// Threshold used when a streamer never configured one.
pub const DEFAULT_LEVEL_THRESHOLD: i64 = 500;

/// Smallest threshold a streamer may configure.
pub const MIN_LEVEL_THRESHOLD: i64 = 50;

/// Live hours per broadcasting level.
pub const HOURS_PER_STREAMER_LEVEL: f64 = 10.0;

/// Resolve a possibly-missing threshold to a usable divisor.
#[must_use]
pub fn resolve_threshold(threshold: Option<i64>) -> i64 {
    match threshold {
        Some(t) if t > 0 => t,
        _ => DEFAULT_LEVEL_THRESHOLD,
    }
}

/// `floor(points / threshold) + 1`.
#[must_use]
pub fn level(points: i64, threshold: i64) -> i64 {
    let threshold = resolve_threshold(Some(threshold));
    points.max(0) / threshold + 1
}

/// Broadcasting level for a streamer with `total_hours` on record.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn streamer_level(total_hours: f64) -> i64 {
    if !total_hours.is_finite() || total_hours <= 0.0 {
        return 1;
    }
    (total_hours / HOURS_PER_STREAMER_LEVEL).floor() as i64 + 1
}

/// Hours at which the next broadcasting level is reached.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn next_streamer_level_at(total_hours: f64) -> f64 {
    streamer_level(total_hours) as f64 * HOURS_PER_STREAMER_LEVEL
}

/// Position of an XP total inside a threshold's level ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LevelProgress {
    /// Current level (1-based).
    pub level: i64,
    /// Points earned inside the current level.
    pub points_in_level: i64,
    /// Points missing to reach the next level.
    pub points_to_next_level: i64,
    /// Total points at which the next level starts.
    pub next_level_at: i64,
    /// Whole percent of the current level completed (0..=99).
    pub progress_percent: i64,
}

impl LevelProgress {
    /// Grade `points` against `threshold`.
    #[must_use]
    pub fn compute(points: i64, threshold: i64) -> Self {
        let threshold = resolve_threshold(Some(threshold));
        let points = points.max(0);
        let level = points / threshold + 1;
        let points_in_level = points % threshold;
        Self {
            level,
            points_in_level,
            points_to_next_level: threshold - points_in_level,
            next_level_at: level * threshold,
            progress_percent: points_in_level * 100 / threshold,
        }
    }
}

/// Outcome of crediting XP, graded on a single threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelChange {
    /// Level before the credit.
    pub before: i64,
    /// Level after the credit.
    pub after: i64,
}

impl LevelChange {
    /// Compare the level at `points_before` and `points_before + gained`.
    #[must_use]
    pub fn from_gain(points_before: i64, gained: i64, threshold: i64) -> Self {
        Self {
            before: level(points_before, threshold),
            after: level(points_before.saturating_add(gained), threshold),
        }
    }

    /// Whether at least one level boundary was crossed.
    #[must_use]
    pub fn leveled_up(&self) -> bool {
        self.after > self.before
    }
}
