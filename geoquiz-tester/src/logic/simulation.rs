//! Seeded simulated players driving full quiz runs.
use anyhow::{Context, Result, bail};
use geoquiz_game::{
    Coordinate, QuizRun, Region, RegionCatalogue, RegionFilter, ScoringConfig,
    StatisticsService, StatsStore,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::Serialize;
use std::rc::Rc;

/// Keeps the player's stream independent from the target draw.
const PLAYER_STREAM_SALT: u64 = 0x9E37_79B9_7F4A_7C15;

/// Largest offset, in degrees, between a confident click and the centroid.
const CLICK_JITTER_DEG: f64 = 0.05;

/// Outcome of one simulated or replayed run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub label: String,
    pub rounds: u32,
    pub correct: u32,
    pub score: f64,
    pub accuracy_pct: u32,
    pub high_precision_hits: u32,
    pub newly_mastered: Vec<String>,
    pub skipped: u32,
    pub durable: bool,
}

impl RunSummary {
    pub(crate) fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            rounds: 0,
            correct: 0,
            score: 0.0,
            accuracy_pct: 0,
            high_precision_hits: 0,
            newly_mastered: Vec::new(),
            skipped: 0,
            durable: true,
        }
    }
}

/// A player who finds the target with probability `skill` and otherwise
/// clicks a random other region.
#[derive(Debug)]
pub struct SimulatedPlayer {
    rng: ChaCha20Rng,
    skill: f64,
}

impl SimulatedPlayer {
    #[must_use]
    pub fn new(seed: u64, skill: f64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed ^ PLAYER_STREAM_SALT),
            skill: skill.clamp(0.0, 1.0),
        }
    }

    /// Pick the clicked region and click point for `target`.
    pub fn choose(&mut self, target: &Region, catalogue: &RegionCatalogue) -> (u32, Coordinate) {
        if self.rng.gen_bool(self.skill) {
            let centroid = target.centroid();
            let click = Coordinate::new(
                centroid.lat + self.rng.gen_range(-CLICK_JITTER_DEG..=CLICK_JITTER_DEG),
                centroid.lng + self.rng.gen_range(-CLICK_JITTER_DEG..=CLICK_JITTER_DEG),
            );
            return (target.code, click);
        }
        let others: Vec<&Region> = catalogue
            .iter()
            .filter(|region| region.code != target.code)
            .collect();
        if others.is_empty() {
            return (target.code, target.centroid());
        }
        let wrong = others[self.rng.gen_range(0..others.len())];
        (wrong.code, wrong.centroid())
    }
}

/// Play `rounds` rounds with one seed and close the session.
///
/// # Errors
///
/// Fails when the filter selects no region or the statistics service
/// rejects an operation.
pub fn run_simulation<S: StatsStore>(
    catalogue: Rc<RegionCatalogue>,
    scoring: &ScoringConfig,
    filter: &RegionFilter,
    seed: u64,
    rounds: u32,
    skill: f64,
    stats: &mut StatisticsService<S>,
) -> Result<RunSummary> {
    let mut run = QuizRun::new(catalogue, scoring.clone(), filter.clone(), seed);
    let mut player = SimulatedPlayer::new(seed, skill);
    let mut summary = RunSummary::new(format!("seed {seed}"));

    summary.durable &= run.start(stats)?.is_durable();
    for round in 0..rounds {
        if round > 0 {
            run.next_round()?;
        }
        let (clicked, click) = {
            let target = run.target().context("no target drawn")?;
            player.choose(target, run.catalogue())
        };
        let Some(outcome) = run.answer(clicked, click, stats)? else {
            bail!("round {round} was not awaiting a click");
        };
        log::debug!(
            "{}: target {} clicked {} -> {}",
            summary.label,
            outcome.attempt.target_code,
            outcome.attempt.clicked_code,
            outcome.attempt.precision()
        );
        summary.durable &= outcome.persistence.is_durable();
        if outcome.effects.high_precision {
            summary.high_precision_hits += 1;
        }
        if let Some(group) = outcome.effects.newly_mastered {
            log::info!("{}: mastered {group}", summary.label);
            summary.newly_mastered.push(group);
        }
    }

    let recorded = stats.end_session()?;
    summary.durable &= recorded.is_durable();
    let score = run.score();
    summary.rounds = score.attempts;
    summary.correct = score.correct;
    summary.score = score.score;
    summary.accuracy_pct = score.accuracy_pct();
    Ok(summary)
}
