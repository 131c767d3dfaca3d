use core::fmt;
use std::cmp::Reverse;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::ALL_TIME_PARTITION;

/// Time bucket a score is indexed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TimeFrame {
    Daily,
    Monthly,
    Yearly,
    AllTime,
}

impl TimeFrame {
    /// Frames that carry a date and therefore take part in ranking
    pub const DATED: [TimeFrame; 3] = [TimeFrame::Daily, TimeFrame::Monthly, TimeFrame::Yearly];

    pub const ALL: [TimeFrame; 4] = [
        TimeFrame::AllTime,
        TimeFrame::Daily,
        TimeFrame::Monthly,
        TimeFrame::Yearly,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeFrame::Daily => "day",
            TimeFrame::Monthly => "month",
            TimeFrame::Yearly => "year",
            TimeFrame::AllTime => "all",
        }
    }

    /// Derives the partition value for `at`, always evaluated in UTC.
    ///
    /// `2024-03-15T10:00:00Z` maps to `2024-03-15`, `2024-03` and `2024` respectively.
    pub fn partition_value(&self, at: &DateTime<Utc>) -> String {
        match self {
            TimeFrame::Daily => at.format("%Y-%m-%d").to_string(),
            TimeFrame::Monthly => at.format("%Y-%m").to_string(),
            TimeFrame::Yearly => at.format("%Y").to_string(),
            TimeFrame::AllTime => ALL_TIME_PARTITION.to_string(),
        }
    }
}

impl fmt::Display for TimeFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A concrete bucket, e.g. `(Daily, "2024-03-15")`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Partition {
    pub frame: TimeFrame,
    pub value: String,
}

impl Partition {
    pub fn of(frame: TimeFrame, at: &DateTime<Utc>) -> Self {
        Self {
            frame,
            value: frame.partition_value(at),
        }
    }

    /// Every partition a record stamped at `at` is indexed under.
    pub fn all_for(at: &DateTime<Utc>) -> [Partition; 4] {
        TimeFrame::ALL.map(|frame| Partition::of(frame, at))
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.frame, self.value)
    }
}

/// Immutable stored score
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub id: Uuid,
    pub username: String,
    pub score: i64,
    pub recorded_at: DateTime<Utc>,
}

/// Sort key shared by every store: higher score first, then earlier submission, then id.
pub type RankKey = (Reverse<i64>, DateTime<Utc>, Uuid);

impl ScoreRecord {
    /// Callers are expected to have validated `username` and `score` already.
    pub fn new(username: String, score: i64, recorded_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            username,
            score,
            recorded_at,
        }
    }

    pub fn rank_key(&self) -> RankKey {
        (Reverse(self.score), self.recorded_at, self.id)
    }

    pub fn partitions(&self) -> [Partition; 4] {
        Partition::all_for(&self.recorded_at)
    }
}

/// Public shape of a leaderboard row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub username: String,
    pub score: i64,
    pub datetime: DateTime<Utc>,
}

impl From<ScoreRecord> for LeaderboardEntry {
    fn from(value: ScoreRecord) -> Self {
        Self {
            username: value.username,
            score: value.score,
            datetime: value.recorded_at,
        }
    }
}

/// 1-based ranks of a score within the partitions of a given instant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Positions {
    pub daily: u64,
    pub monthly: u64,
    pub yearly: u64,
}

/// Top entries of every frame for a single instant.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub all_time: Vec<LeaderboardEntry>,
    pub daily: Vec<LeaderboardEntry>,
    pub monthly: Vec<LeaderboardEntry>,
    pub yearly: Vec<LeaderboardEntry>,
}

impl Snapshot {
    pub fn slot_mut(&mut self, frame: TimeFrame) -> &mut Vec<LeaderboardEntry> {
        match frame {
            TimeFrame::AllTime => &mut self.all_time,
            TimeFrame::Daily => &mut self.daily,
            TimeFrame::Monthly => &mut self.monthly,
            TimeFrame::Yearly => &mut self.yearly,
        }
    }
}

/// Parses an RFC 3339 timestamp or a bare `YYYY-MM-DD` date (UTC midnight).
pub fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod test {
    use super::*;

    fn at(raw: &str) -> DateTime<Utc> {
        parse_instant(raw).unwrap()
    }

    #[test]
    fn test_partition_values() {
        let ts = at("2024-03-15T10:00:00Z");

        assert_eq!(TimeFrame::Daily.partition_value(&ts), "2024-03-15");
        assert_eq!(TimeFrame::Monthly.partition_value(&ts), "2024-03");
        assert_eq!(TimeFrame::Yearly.partition_value(&ts), "2024");
        assert_eq!(TimeFrame::AllTime.partition_value(&ts), "all");

        // same input, same keys
        assert_eq!(Partition::all_for(&ts), Partition::all_for(&ts));
    }

    #[test]
    fn test_partition_uses_utc() {
        // 23:30 at -05:00 is already the next day in UTC
        let ts = at("2024-12-31T23:30:00-05:00");
        assert_eq!(TimeFrame::Daily.partition_value(&ts), "2025-01-01");
        assert_eq!(TimeFrame::Yearly.partition_value(&ts), "2025");
    }

    #[test]
    fn test_parse_instant() {
        assert_eq!(at("2024-03-15"), at("2024-03-15T00:00:00Z"));
        assert!(parse_instant("yesterday").is_none());
        assert!(parse_instant("2024-13-01").is_none());
        assert!(parse_instant("").is_none());
    }

    #[test]
    fn test_rank_key_ordering() {
        let early = at("2024-03-15T10:00:00Z");
        let late = at("2024-03-15T11:00:00Z");

        let high = ScoreRecord::new("a".into(), 10, late);
        let tie_early = ScoreRecord::new("b".into(), 5, early);
        let tie_late = ScoreRecord::new("c".into(), 5, late);

        let mut records = vec![tie_late.clone(), tie_early.clone(), high.clone()];
        records.sort_by_key(ScoreRecord::rank_key);

        let names: Vec<_> = records.iter().map(|r| r.username.as_str()).collect();
        assert_eq!(names, ["a", "b", "c"]);
    }

    #[test]
    fn test_snapshot_serializes_camel_case() {
        let json = serde_json::to_value(Snapshot::default()).unwrap();
        assert!(json.get("allTime").is_some());
        assert!(json.get("daily").is_some());
    }
}
