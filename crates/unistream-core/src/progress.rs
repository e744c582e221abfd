//! Community progress: a fan's standing with every streamer they supported.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::leveling::{resolve_threshold, LevelProgress};
use crate::UserId;

/// One point-earning ledger entry joined with its streamer's current settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointEarning {
    /// The streamer the entry was directed at.
    pub streamer_id: UserId,
    /// The streamer's current display name.
    pub streamer_name: String,
    /// The streamer's current threshold.
    pub streamer_threshold: i64,
    /// XP granted by the entry.
    pub points: i64,
}

/// A fan's level with a single streamer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamerProgress {
    /// The streamer.
    pub streamer_id: UserId,
    /// The streamer's display name.
    pub streamer_name: String,
    /// XP accumulated with this streamer.
    pub xp_local: i64,
    /// Threshold in effect now.
    pub xp_threshold: i64,
    /// Current level.
    pub current_level: i64,
    /// XP total at which the next level starts.
    pub next_level_at: i64,
    /// XP missing to the next level.
    pub points_to_next_level: i64,
    /// Whole percent of the current level completed.
    pub progress_percent: i64,
}

/// Group entries by streamer, sum XP and grade each group with the
/// streamer's *current* threshold (thresholds apply retroactively).
///
/// Entries with non-positive points are ignored. Output is ordered by XP
/// descending, then by name.
#[must_use]
pub fn aggregate(entries: impl IntoIterator<Item = PointEarning>) -> Vec<StreamerProgress> {
    let mut groups: HashMap<UserId, (String, i64, i64)> = HashMap::new();

    for entry in entries {
        if entry.points <= 0 {
            continue;
        }
        let group = groups
            .entry(entry.streamer_id)
            .or_insert_with(|| (entry.streamer_name.clone(), entry.streamer_threshold, 0));
        group.2 += entry.points;
    }

    let mut progress: Vec<StreamerProgress> = groups
        .into_iter()
        .map(|(streamer_id, (streamer_name, threshold, xp))| {
            let threshold = resolve_threshold(Some(threshold));
            let level = LevelProgress::compute(xp, threshold);
            StreamerProgress {
                streamer_id,
                streamer_name,
                xp_local: xp,
                xp_threshold: threshold,
                current_level: level.level,
                next_level_at: level.next_level_at,
                points_to_next_level: level.points_to_next_level,
                progress_percent: level.progress_percent,
            }
        })
        .collect();

    progress.sort_by(|a, b| {
        b.xp_local
            .cmp(&a.xp_local)
            .then_with(|| a.streamer_name.cmp(&b.streamer_name))
    });
    progress
}

#[cfg(test)]
mod tests {
    use super::*;

    fn earning(streamer: UserId, name: &str, threshold: i64, points: i64) -> PointEarning {
        PointEarning {
            streamer_id: streamer,
            streamer_name: name.into(),
            streamer_threshold: threshold,
            points,
        }
    }

    #[test]
    fn groups_and_sums_per_streamer() {
        let gozu = UserId::generate();
        let mika = UserId::generate();
        let progress = aggregate(vec![
            earning(gozu, "Gozu", 500, 500),
            earning(mika, "Mika", 100, 50),
            earning(gozu, "Gozu", 500, 250),
        ]);

        assert_eq!(progress.len(), 2);
        let first = &progress[0];
        assert_eq!(first.streamer_id, gozu);
        assert_eq!(first.xp_local, 750);
        assert_eq!(first.current_level, 2);
        assert_eq!(first.points_to_next_level, 250);
        assert_eq!(first.next_level_at, 1000);
        assert_eq!(first.progress_percent, 50);

        let second = &progress[1];
        assert_eq!(second.xp_local, 50);
        assert_eq!(second.xp_threshold, 100);
        assert_eq!(second.current_level, 1);
        assert_eq!(second.progress_percent, 50);
    }

    #[test]
    fn each_streamer_uses_its_own_threshold() {
        let strict = UserId::generate();
        let lenient = UserId::generate();
        let progress = aggregate(vec![
            earning(strict, "Strict", 1000, 600),
            earning(lenient, "Lenient", 50, 600),
        ]);
        let by_id = |id| progress.iter().find(|p| p.streamer_id == id).unwrap();
        assert_eq!(by_id(strict).current_level, 1);
        assert_eq!(by_id(lenient).current_level, 13);
    }

    #[test]
    fn zero_point_entries_are_skipped() {
        let s = UserId::generate();
        assert!(aggregate(vec![earning(s, "S", 500, 0)]).is_empty());
    }

    #[test]
    fn unset_threshold_uses_default() {
        let s = UserId::generate();
        let progress = aggregate(vec![earning(s, "S", 0, 1000)]);
        assert_eq!(progress[0].xp_threshold, 500);
        assert_eq!(progress[0].current_level, 3);
    }
}
