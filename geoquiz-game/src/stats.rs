//! Persisted player statistics and the rules that keep them consistent.
//!
//! [`StatsBlob`] is the single document written to the durable store. All
//! mutation goes through [`StatsBlob::apply_attempt`] and
//! [`StatsBlob::close_session`], which recompute every derived value from
//! its counters so nothing drifts across many incremental updates.
use chrono::{DateTime, Utc};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;

use crate::config::StatsConfig;
use crate::numbers::percentage;
use crate::regions::RegionFilter;
use crate::scoring::Attempt;

/// Global aggregates over every recorded attempt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OverallStats {
    pub total_attempts: u64,
    pub total_correct: u64,
    /// Sum of precision coefficients earned.
    pub total_score: f64,
    /// Sum of precision coefficients, kept separately for averaging.
    pub total_precision_sum: f64,
    /// Best single-attempt precision.
    #[serde(alias = "bestScore")]
    pub best_precision: f64,
    /// Best accuracy of any finished session.
    pub best_accuracy: f64,
}

impl OverallStats {
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        percentage(self.total_correct, self.total_attempts)
    }

    /// Mean coefficient over correct attempts.
    #[must_use]
    pub fn average_precision(&self) -> f64 {
        if self.total_correct == 0 {
            return 0.0;
        }
        self.total_precision_sum / crate::numbers::u64_to_f64(self.total_correct)
    }
}

/// Read view of [`OverallStats`] with derived values filled in.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverallReport {
    #[serde(flatten)]
    pub stats: OverallStats,
    pub accuracy: f64,
    pub average_precision: f64,
}

impl From<&OverallStats> for OverallReport {
    fn from(stats: &OverallStats) -> Self {
        Self {
            stats: stats.clone(),
            accuracy: stats.accuracy(),
            average_precision: stats.average_precision(),
        }
    }
}

/// Accuracy bucket for one district or region-group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RegionStats {
    pub attempts: u32,
    pub correct: u32,
    /// `correct / attempts * 100`, recomputed on every update.
    pub accuracy: f64,
}

impl RegionStats {
    fn record(&mut self, correct: bool) {
        self.attempts += 1;
        if correct {
            self.correct += 1;
        }
        self.accuracy = percentage(u64::from(self.correct), u64::from(self.attempts));
    }
}

/// Named bucket returned by queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionEntry {
    pub name: String,
    #[serde(flatten)]
    pub stats: RegionStats,
}

/// Which bucket family a query targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionCategory {
    Group,
    District,
}

impl std::str::FromStr for RegionCategory {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "group" | "kraj" => Ok(Self::Group),
            "district" | "okres" => Ok(Self::District),
            other => Err(format!("unknown region category: {other}")),
        }
    }
}

/// Buckets keyed by name, kept in first-seen order.
///
/// Serialized as a JSON object whose key order is the insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegionBuckets {
    entries: Vec<RegionEntry>,
}

impl RegionBuckets {
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&RegionStats> {
        self.entries
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| &entry.stats)
    }

    /// Count one attempt against `name`, creating the bucket on first use.
    pub fn record(&mut self, name: &str, correct: bool) -> RegionStats {
        let pos = match self.entries.iter().position(|entry| entry.name == name) {
            Some(pos) => pos,
            None => {
                self.entries.push(RegionEntry {
                    name: name.to_string(),
                    stats: RegionStats::default(),
                });
                self.entries.len() - 1
            }
        };
        let stats = &mut self.entries[pos].stats;
        stats.record(correct);
        *stats
    }

    /// Entries by descending accuracy; ties keep first-seen order.
    #[must_use]
    pub fn sorted_by_accuracy(&self) -> Vec<RegionEntry> {
        let mut sorted = self.entries.clone();
        sorted.sort_by(|a, b| b.stats.accuracy.total_cmp(&a.stats.accuracy));
        sorted
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegionEntry> {
        self.entries.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for RegionBuckets {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for entry in &self.entries {
            map.serialize_entry(&entry.name, &entry.stats)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for RegionBuckets {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct BucketsVisitor;

        impl<'de> Visitor<'de> for BucketsVisitor {
            type Value = RegionBuckets;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of region name to statistics")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((name, stats)) = access.next_entry::<String, RegionStats>()? {
                    entries.push(RegionEntry { name, stats });
                }
                Ok(RegionBuckets { entries })
            }
        }

        deserializer.deserialize_map(BucketsVisitor)
    }
}

/// One game run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "SessionRecord")]
pub struct Session {
    pub id: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub filter: RegionFilter,
    pub attempts: u32,
    pub correct: u32,
    pub score: f64,
    pub accuracy: f64,
}

/// Stored session shape, also accepting the older
/// `filterType` / `filterValue` pair.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionRecord {
    id: i64,
    start_time: DateTime<Utc>,
    #[serde(default)]
    end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    filter: Option<RegionFilter>,
    #[serde(default)]
    filter_type: Option<String>,
    #[serde(default)]
    filter_value: Option<String>,
    #[serde(default)]
    attempts: u32,
    #[serde(default)]
    correct: u32,
    #[serde(default)]
    score: f64,
    #[serde(default)]
    accuracy: f64,
}

impl From<SessionRecord> for Session {
    fn from(record: SessionRecord) -> Self {
        let filter = record.filter.unwrap_or_else(|| {
            match (record.filter_type.as_deref(), record.filter_value) {
                (Some(kind), Some(value)) => match kind.parse::<RegionCategory>() {
                    Ok(RegionCategory::Group) => RegionFilter::Group(value),
                    Ok(RegionCategory::District) => RegionFilter::District(value),
                    Err(_) => RegionFilter::All,
                },
                _ => RegionFilter::All,
            }
        });
        Self {
            id: record.id,
            start_time: record.start_time,
            end_time: record.end_time,
            filter,
            attempts: record.attempts,
            correct: record.correct,
            score: record.score,
            accuracy: record.accuracy,
        }
    }
}

impl Session {
    #[must_use]
    pub fn start(filter: RegionFilter, now: DateTime<Utc>) -> Self {
        Self {
            id: now.timestamp_millis(),
            start_time: now,
            end_time: None,
            filter,
            attempts: 0,
            correct: 0,
            score: 0.0,
            accuracy: 0.0,
        }
    }

    fn record(&mut self, correct: bool, precision: f64) {
        self.attempts += 1;
        if correct {
            self.correct += 1;
            self.score += precision;
        }
        self.accuracy = percentage(u64::from(self.correct), u64::from(self.attempts));
    }

    fn finish(&mut self, now: DateTime<Utc>) {
        self.end_time = Some(now);
        self.accuracy = percentage(u64::from(self.correct), u64::from(self.attempts));
    }
}

/// Achievement counters derived from play.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Achievements {
    /// Sessions finished at 100% accuracy with enough attempts.
    #[serde(alias = "perfectScore")]
    pub perfect_sessions: u32,
    /// Attempts at or above the high-precision threshold.
    pub high_precision: u32,
    /// Region-groups mastered; never shrinks.
    #[serde(alias = "masterRegions")]
    pub mastered_groups: BTreeSet<String>,
}

/// First and last time the player recorded anything.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayTimestamps {
    pub first_played: DateTime<Utc>,
    pub last_played: DateTime<Utc>,
}

impl PlayTimestamps {
    fn now() -> Self {
        let now = Utc::now();
        Self {
            first_played: now,
            last_played: now,
        }
    }
}

/// Summary of how long the player has been at it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayTime {
    pub first_played: DateTime<Utc>,
    pub last_played: DateTime<Utc>,
    pub days_since_first: i64,
    pub total_sessions: usize,
}

/// What an attempt changed beyond the counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttemptEffects {
    pub high_precision: bool,
    pub newly_mastered: Option<String>,
}

/// The complete persisted statistics document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsBlob {
    #[serde(default)]
    pub overall: OverallStats,
    #[serde(default, alias = "byKraj")]
    pub by_group: RegionBuckets,
    #[serde(default, alias = "byOkres")]
    pub by_district: RegionBuckets,
    /// Most recent first.
    #[serde(default)]
    pub sessions: Vec<Session>,
    #[serde(default)]
    pub achievements: Achievements,
    #[serde(default = "PlayTimestamps::now")]
    pub timestamps: PlayTimestamps,
}

impl StatsBlob {
    /// Empty statistics stamped with `now`.
    #[must_use]
    pub fn fresh(now: DateTime<Utc>) -> Self {
        Self {
            overall: OverallStats::default(),
            by_group: RegionBuckets::default(),
            by_district: RegionBuckets::default(),
            sessions: Vec::new(),
            achievements: Achievements::default(),
            timestamps: PlayTimestamps {
                first_played: now,
                last_played: now,
            },
        }
    }

    #[must_use]
    pub const fn buckets(&self, category: RegionCategory) -> &RegionBuckets {
        match category {
            RegionCategory::Group => &self.by_group,
            RegionCategory::District => &self.by_district,
        }
    }

    /// Fold one attempt into the global, per-region and session aggregates.
    pub fn apply_attempt(
        &mut self,
        attempt: &Attempt,
        session: &mut Session,
        cfg: &StatsConfig,
        now: DateTime<Utc>,
    ) -> AttemptEffects {
        let correct = attempt.is_correct();
        let precision = attempt.precision();
        let mut effects = AttemptEffects::default();

        let overall = &mut self.overall;
        overall.total_attempts += 1;
        if correct {
            overall.total_correct += 1;
            overall.total_score += precision;
            overall.total_precision_sum += precision;
            overall.best_precision = overall.best_precision.max(precision);
            if precision >= cfg.high_precision_threshold {
                self.achievements.high_precision += 1;
                effects.high_precision = true;
            }
        }

        if let Some(group) = attempt.target_group.as_deref() {
            let stats = self.by_group.record(group, correct);
            let mastered = &mut self.achievements.mastered_groups;
            if stats.accuracy >= cfg.mastery_accuracy_pct
                && stats.attempts >= cfg.mastery_min_attempts
                && mastered.insert(group.to_string())
            {
                effects.newly_mastered = Some(group.to_string());
            }
        }
        if let Some(district) = attempt.target_district.as_deref() {
            self.by_district.record(district, correct);
        }

        session.record(correct, precision);
        self.timestamps.last_played = now;
        effects
    }

    /// Finalize `session` and push it onto the bounded history.
    ///
    /// Returns `true` when the session earned the perfect-score achievement.
    pub fn close_session(
        &mut self,
        mut session: Session,
        cfg: &StatsConfig,
        now: DateTime<Utc>,
    ) -> bool {
        session.finish(now);
        let perfect = session.attempts >= cfg.perfect_min_attempts
            && session.correct == session.attempts;
        if perfect {
            self.achievements.perfect_sessions += 1;
        }
        self.overall.best_accuracy = self.overall.best_accuracy.max(session.accuracy);
        self.sessions.insert(0, session);
        self.sessions.truncate(cfg.history_limit);
        perfect
    }

    #[must_use]
    pub fn play_time(&self) -> PlayTime {
        let PlayTimestamps {
            first_played,
            last_played,
        } = self.timestamps;
        PlayTime {
            first_played,
            last_played,
            days_since_first: (last_played - first_played).num_days(),
            total_sessions: self.sessions.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Coordinate;
    use crate::scoring::Grade;
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, hour, 0, 0).unwrap()
    }

    fn attempt(correct: bool, precision: f64, group: &str, district: &str) -> Attempt {
        Attempt {
            target_code: 1,
            clicked_code: if correct { 1 } else { 2 },
            click: Coordinate::new(49.0, 14.0),
            grade: if correct {
                Grade::hit(0.0, precision)
            } else {
                Grade::miss(80.0, 80.0 / 300.0)
            },
            target_district: Some(district.to_string()),
            target_group: Some(group.to_string()),
        }
    }

    #[test]
    fn attempts_update_every_aggregate() {
        let cfg = StatsConfig::default();
        let mut blob = StatsBlob::fresh(at(8));
        let mut session = Session::start(RegionFilter::All, at(8));

        let tabor = attempt(true, 0.8, "Jihočeský kraj", "Tábor");
        let pisek = attempt(false, 0.0, "Jihočeský kraj", "Písek");
        blob.apply_attempt(&tabor, &mut session, &cfg, at(9));
        blob.apply_attempt(&pisek, &mut session, &cfg, at(9));

        assert_eq!(blob.overall.total_attempts, 2);
        assert_eq!(blob.overall.total_correct, 1);
        assert!((blob.overall.total_score - 0.8).abs() < f64::EPSILON);
        assert!((blob.overall.best_precision - 0.8).abs() < f64::EPSILON);
        assert!((blob.overall.accuracy() - 50.0).abs() < f64::EPSILON);
        assert!(
            (blob.overall.average_precision() - 0.8).abs() < f64::EPSILON
        );

        let group = blob.by_group.get("Jihočeský kraj").unwrap();
        assert_eq!((group.attempts, group.correct), (2, 1));
        assert!((group.accuracy - 50.0).abs() < f64::EPSILON);
        assert_eq!(blob.by_district.len(), 2);
        assert_eq!(session.attempts, 2);
        assert_eq!(blob.timestamps.last_played, at(9));
    }

    #[test]
    fn high_precision_counts_only_correct_attempts_over_threshold() {
        let cfg = StatsConfig::default();
        let mut blob = StatsBlob::fresh(at(8));
        let mut session = Session::start(RegionFilter::All, at(8));
        let sharp = attempt(true, 0.9, "Zlínský kraj", "Zlín");
        let effects = blob.apply_attempt(&sharp, &mut session, &cfg, at(8));
        assert!(effects.high_precision);
        let close = attempt(true, 0.89, "Zlínský kraj", "Zlín");
        let effects = blob.apply_attempt(&close, &mut session, &cfg, at(8));
        assert!(!effects.high_precision);
        assert_eq!(blob.achievements.high_precision, 1);
    }

    #[test]
    fn perfect_session_requires_minimum_attempts() {
        let cfg = StatsConfig::default();
        let mut blob = StatsBlob::fresh(at(8));
        let klatovy = attempt(true, 0.7, "Plzeňský kraj", "Klatovy");

        let mut short = Session::start(RegionFilter::All, at(8));
        for _ in 0..4 {
            blob.apply_attempt(&klatovy, &mut short, &cfg, at(8));
        }
        assert!(!blob.close_session(short, &cfg, at(9)));

        let mut long = Session::start(RegionFilter::All, at(10));
        for _ in 0..5 {
            blob.apply_attempt(&klatovy, &mut long, &cfg, at(10));
        }
        assert!(blob.close_session(long, &cfg, at(11)));
        assert_eq!(blob.achievements.perfect_sessions, 1);
        assert!((blob.overall.best_accuracy - 100.0).abs() < f64::EPSILON);
        assert_eq!(blob.sessions[0].end_time, Some(at(11)));
    }

    #[test]
    fn history_is_bounded_most_recent_first() {
        let cfg = StatsConfig {
            history_limit: 3,
            ..StatsConfig::default()
        };
        let mut blob = StatsBlob::fresh(at(0));
        for hour in 0..6 {
            blob.close_session(Session::start(RegionFilter::All, at(hour)), &cfg, at(hour));
        }
        assert_eq!(blob.sessions.len(), 3);
        assert_eq!(blob.sessions[0].start_time, at(5));
        assert_eq!(blob.sessions[2].start_time, at(3));
    }

    #[test]
    fn buckets_sort_stably_by_accuracy() {
        let mut buckets = RegionBuckets::default();
        buckets.record("first", true);
        buckets.record("second", false);
        buckets.record("third", true);
        buckets.record("fourth", true);
        buckets.record("fourth", false);
        let names: Vec<String> = buckets
            .sorted_by_accuracy()
            .into_iter()
            .map(|entry| entry.name)
            .collect();
        assert_eq!(names, vec!["first", "third", "fourth", "second"]);
    }

    #[test]
    fn buckets_serialize_as_ordered_object() {
        let mut buckets = RegionBuckets::default();
        buckets.record("Zlín", true);
        buckets.record("Aš", false);
        let json = serde_json::to_string(&buckets).unwrap();
        assert!(json.find("Zlín").unwrap() < json.find("Aš").unwrap());
        let back: RegionBuckets = serde_json::from_str(&json).unwrap();
        assert_eq!(back, buckets);
    }

    #[test]
    fn play_time_counts_whole_days() {
        let mut blob = StatsBlob::fresh(at(8));
        blob.timestamps.last_played =
            at(8) + chrono::Duration::days(3) + chrono::Duration::hours(5);
        let play = blob.play_time();
        assert_eq!(play.days_since_first, 3);
        assert_eq!(play.total_sessions, 0);
    }

    #[test]
    fn category_parses_both_vocabularies() {
        assert_eq!("kraj".parse::<RegionCategory>(), Ok(RegionCategory::Group));
        assert_eq!(
            "district".parse::<RegionCategory>(),
            Ok(RegionCategory::District)
        );
        assert!("county".parse::<RegionCategory>().is_err());
    }

    #[test]
    fn sessions_accept_filter_type_and_value() {
        let legacy: Session = serde_json::from_str(
            r#"{"id": 5, "startTime": "2026-03-14T09:00:00Z", "filterType": "okres",
                "filterValue": "Tábor", "attempts": 2, "correct": 1, "score": 0.7}"#,
        )
        .unwrap();
        assert_eq!(legacy.filter, RegionFilter::District("Tábor".into()));
        assert!(legacy.end_time.is_none());

        let unknown: Session = serde_json::from_str(
            r#"{"id": 6, "startTime": "2026-03-14T09:00:00Z", "filterType": "county",
                "filterValue": "Kent"}"#,
        )
        .unwrap();
        assert_eq!(unknown.filter, RegionFilter::All);

        let current = Session::start(RegionFilter::Group("Zlínský kraj".into()), at(9));
        let json = serde_json::to_string(&current).unwrap();
        assert!(!json.contains("filterType"));
        let back: Session = serde_json::from_str(&json).unwrap();
        assert_eq!(back, current);
    }
}
