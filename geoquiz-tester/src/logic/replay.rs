//! Replays of recorded clicks.
//!
//! A replay file is a JSON array of clicks:
//! `[{"target": 1000, "clicked": 3101, "lat": 49.0, "lng": 14.4}]`.
//! When `clicked` is omitted the click is hit-tested against the catalogue
//! and clicks outside every region are skipped.
use anyhow::{Context, Result};
use geoquiz_game::numbers::{percentage, round_f64_to_u32};
use geoquiz_game::{
    Coordinate, RegionCatalogue, RegionFilter, ScoringConfig, ScoringEngine, StatisticsService,
    StatsStore,
};
use serde::Deserialize;
use std::fs;
use std::path::Path;

use super::simulation::RunSummary;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReplayClick {
    pub target: u32,
    #[serde(default)]
    pub clicked: Option<u32>,
    pub lat: f64,
    #[serde(alias = "lon")]
    pub lng: f64,
}

/// Read a replay file.
///
/// # Errors
///
/// Fails when the file is unreadable or not a JSON click array.
pub fn load_replay(path: &Path) -> Result<Vec<ReplayClick>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read replay {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("invalid replay {}", path.display()))
}

/// Grade `clicks` as one session.
///
/// # Errors
///
/// Fails on unknown region codes or when the statistics service rejects an
/// operation.
pub fn run_replay<S: StatsStore>(
    label: &str,
    catalogue: &RegionCatalogue,
    scoring: &ScoringConfig,
    filter: &RegionFilter,
    clicks: &[ReplayClick],
    stats: &mut StatisticsService<S>,
) -> Result<RunSummary> {
    let engine = ScoringEngine::new(catalogue, scoring.clone());
    let mut summary = RunSummary::new(label);
    summary.durable &= stats.restart(filter.clone())?.is_durable();

    for (index, click) in clicks.iter().enumerate() {
        let point = Coordinate::new(click.lat, click.lng);
        let graded = match click.clicked {
            Some(code) => Some(engine.grade(click.target, code, point)?),
            None => engine.grade_click(click.target, point)?,
        };
        let Some(attempt) = graded else {
            log::warn!("{label}: click #{index} hit no region, skipped");
            summary.skipped += 1;
            continue;
        };
        let recorded = stats
            .record_attempt(&attempt)
            .with_context(|| format!("{label}: click #{index}"))?;
        summary.rounds += 1;
        if attempt.is_correct() {
            summary.correct += 1;
            summary.score += attempt.precision();
        }
        if recorded.effects.high_precision {
            summary.high_precision_hits += 1;
        }
        if let Some(group) = recorded.effects.newly_mastered {
            summary.newly_mastered.push(group);
        }
        summary.durable &= recorded.persistence.is_durable();
    }

    summary.durable &= stats.end_session()?.is_durable();
    summary.accuracy_pct = round_f64_to_u32(percentage(
        u64::from(summary.correct),
        u64::from(summary.rounds),
    ));
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geoquiz_game::{MemoryStore, StatsConfig};

    const SAMPLE: &str = include_str!("../../../geoquiz-game/data/sample_orp.geojson");

    #[test]
    fn replays_explicit_and_hit_tested_clicks() {
        let catalogue = RegionCatalogue::from_geojson(SAMPLE).unwrap();
        let mut stats =
            StatisticsService::open(MemoryStore::new(), StatsConfig::default()).unwrap();
        let clicks: Vec<ReplayClick> = serde_json::from_str(
            r#"[
                {"target": 1000, "clicked": 1000, "lat": 50.065, "lng": 14.475},
                {"target": 6202, "lat": 49.2, "lng": 16.6},
                {"target": 3111, "clicked": 3101, "lat": 49.0, "lng": 14.45},
                {"target": 3111, "lat": 0.0, "lon": 0.0}
            ]"#,
        )
        .unwrap();
        let summary = run_replay(
            "fixture",
            &catalogue,
            &ScoringConfig::default(),
            &RegionFilter::All,
            &clicks,
            &mut stats,
        )
        .unwrap();
        assert_eq!(summary.rounds, 3);
        assert_eq!(summary.correct, 2);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.accuracy_pct, 67);
        assert_eq!(stats.overall_stats().stats.total_attempts, 3);
        assert_eq!(stats.recent_sessions(5).len(), 1);
    }

    #[test]
    fn unknown_codes_abort_the_replay() {
        let catalogue = RegionCatalogue::from_geojson(SAMPLE).unwrap();
        let mut stats =
            StatisticsService::open(MemoryStore::new(), StatsConfig::default()).unwrap();
        let clicks = vec![ReplayClick {
            target: 42,
            clicked: Some(1000),
            lat: 50.0,
            lng: 14.0,
        }];
        assert!(
            run_replay(
                "bad",
                &catalogue,
                &ScoringConfig::default(),
                &RegionFilter::All,
                &clicks,
                &mut stats,
            )
            .is_err()
        );
    }

    #[test]
    fn load_replay_reports_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clicks.json");
        fs::write(&path, "not json").unwrap();
        let err = load_replay(&path).unwrap_err();
        assert!(err.to_string().contains("clicks.json"));
    }
}
