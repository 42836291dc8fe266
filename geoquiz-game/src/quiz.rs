//! Round controller for one quiz run.
//!
//! A [`QuizRun`] picks a random target within the active filter, grades the
//! player's click, forwards the attempt to the [`StatisticsService`] and
//! keeps the running score shown during play. Once a round is answered it
//! stays resolved until [`QuizRun::next_round`]; clicks in between are
//! ignored.
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::Serialize;
use std::rc::Rc;

use crate::config::ScoringConfig;
use crate::feedback::Highlight;
use crate::geometry::Coordinate;
use crate::numbers::{percentage, round_f64_to_u32};
use crate::regions::{Region, RegionCatalogue, RegionFilter, UnknownRegion};
use crate::scoring::{Attempt, ScoringEngine};
use crate::service::{Persistence, StatisticsService, StatsError};
use crate::stats::AttemptEffects;
use crate::storage::StatsStore;

#[derive(Debug, thiserror::Error)]
pub enum QuizError {
    #[error("no regions match filter {0}")]
    EmptySelection(RegionFilter),
    #[error(transparent)]
    UnknownRegion(#[from] UnknownRegion),
    #[error(transparent)]
    Stats(#[from] StatsError),
}

/// Running totals for the current run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunScore {
    pub score: f64,
    pub attempts: u32,
    pub correct: u32,
}

impl RunScore {
    /// Whole-number accuracy for display.
    #[must_use]
    pub fn accuracy_pct(&self) -> u32 {
        round_f64_to_u32(percentage(
            u64::from(self.correct),
            u64::from(self.attempts),
        ))
    }

    fn add(&mut self, attempt: &Attempt) {
        self.attempts += 1;
        if attempt.is_correct() {
            self.correct += 1;
            self.score += attempt.precision();
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundPhase {
    /// No target drawn yet.
    Pending,
    AwaitingClick,
    /// Answered; waiting for the next round.
    Resolved,
}

/// Everything the map needs to show after a click.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundOutcome {
    pub attempt: Attempt,
    /// Highlight for the clicked region.
    pub clicked: Highlight,
    /// Highlight revealing the target after a miss.
    pub reveal: Option<Highlight>,
    pub score: RunScore,
    /// Achievements unlocked by this attempt.
    pub effects: AttemptEffects,
    pub persistence: Persistence,
}

pub struct QuizRun {
    catalogue: Rc<RegionCatalogue>,
    scoring: ScoringConfig,
    filter: RegionFilter,
    rng: ChaCha20Rng,
    target: Option<u32>,
    phase: RoundPhase,
    score: RunScore,
}

impl QuizRun {
    #[must_use]
    pub fn new(
        catalogue: Rc<RegionCatalogue>,
        scoring: ScoringConfig,
        filter: RegionFilter,
        seed: u64,
    ) -> Self {
        Self {
            catalogue,
            scoring,
            filter,
            rng: ChaCha20Rng::seed_from_u64(seed),
            target: None,
            phase: RoundPhase::Pending,
            score: RunScore::default(),
        }
    }

    #[must_use]
    pub const fn filter(&self) -> &RegionFilter {
        &self.filter
    }

    #[must_use]
    pub const fn phase(&self) -> RoundPhase {
        self.phase
    }

    #[must_use]
    pub const fn score(&self) -> RunScore {
        self.score
    }

    #[must_use]
    pub fn catalogue(&self) -> &RegionCatalogue {
        &self.catalogue
    }

    #[must_use]
    pub fn engine(&self) -> ScoringEngine<'_> {
        ScoringEngine::new(&self.catalogue, self.scoring.clone())
    }

    /// The region the player is currently asked to find.
    #[must_use]
    pub fn target(&self) -> Option<&Region> {
        self.target.and_then(|code| self.catalogue.get(code))
    }

    /// Open a statistics session for this run and draw the first target.
    ///
    /// # Errors
    ///
    /// Returns [`QuizError::EmptySelection`] if the filter matches nothing.
    pub fn start<S: StatsStore>(
        &mut self,
        stats: &mut StatisticsService<S>,
    ) -> Result<Persistence, QuizError> {
        self.ensure_selectable()?;
        let persistence = stats.restart(self.filter.clone())?;
        self.next_round()?;
        Ok(persistence)
    }

    /// Switch to `filter`, closing the previous session, and start over.
    ///
    /// # Errors
    ///
    /// Returns [`QuizError::EmptySelection`] if the filter matches nothing;
    /// the run is left unchanged in that case.
    pub fn restart<S: StatsStore>(
        &mut self,
        filter: RegionFilter,
        stats: &mut StatisticsService<S>,
    ) -> Result<Persistence, QuizError> {
        let previous = std::mem::replace(&mut self.filter, filter);
        if let Err(err) = self.ensure_selectable() {
            self.filter = previous;
            return Err(err);
        }
        self.score = RunScore::default();
        self.start(stats)
    }

    /// Draw a new random target from the filtered regions.
    ///
    /// # Errors
    ///
    /// Returns [`QuizError::EmptySelection`] if the filter matches nothing.
    pub fn next_round(&mut self) -> Result<&Region, QuizError> {
        let candidates: Vec<&Region> = self
            .catalogue
            .iter()
            .filter(|region| region.matches(&self.filter))
            .collect();
        if candidates.is_empty() {
            return Err(QuizError::EmptySelection(self.filter.clone()));
        }
        let target = candidates[self.rng.gen_range(0..candidates.len())];
        log::debug!("next target: {} ({})", target.name, target.code);
        self.target = Some(target.code);
        self.phase = RoundPhase::AwaitingClick;
        Ok(target)
    }

    /// Grade a click on region `clicked_code` and record it.
    ///
    /// Returns `Ok(None)` when no round is awaiting a click.
    ///
    /// # Errors
    ///
    /// Returns an error if a code is unknown or the statistics service
    /// rejects the attempt.
    pub fn answer<S: StatsStore>(
        &mut self,
        clicked_code: u32,
        click: Coordinate,
        stats: &mut StatisticsService<S>,
    ) -> Result<Option<RoundOutcome>, QuizError> {
        let Some(target) = self.awaiting_target() else {
            log::debug!("click ignored while {:?}", self.phase);
            return Ok(None);
        };
        let attempt = self.engine().grade(target, clicked_code, click)?;
        self.resolve(attempt, stats).map(Some)
    }

    /// Like [`QuizRun::answer`], but finds the clicked region by hit-testing.
    /// Clicks outside every region are ignored.
    ///
    /// # Errors
    ///
    /// See [`QuizRun::answer`].
    pub fn answer_at<S: StatsStore>(
        &mut self,
        click: Coordinate,
        stats: &mut StatisticsService<S>,
    ) -> Result<Option<RoundOutcome>, QuizError> {
        let Some(target) = self.awaiting_target() else {
            return Ok(None);
        };
        let graded = self.engine().grade_click(target, click)?;
        match graded {
            Some(attempt) => self.resolve(attempt, stats).map(Some),
            None => Ok(None),
        }
    }

    fn awaiting_target(&self) -> Option<u32> {
        match self.phase {
            RoundPhase::AwaitingClick => self.target,
            RoundPhase::Pending | RoundPhase::Resolved => None,
        }
    }

    fn resolve<S: StatsStore>(
        &mut self,
        attempt: Attempt,
        stats: &mut StatisticsService<S>,
    ) -> Result<RoundOutcome, QuizError> {
        let recorded = stats.record_attempt(&attempt)?;
        self.phase = RoundPhase::Resolved;
        self.score.add(&attempt);
        Ok(RoundOutcome {
            clicked: Highlight::for_grade(&attempt.grade, &self.scoring),
            reveal: (!attempt.is_correct()).then(Highlight::target),
            score: self.score,
            effects: recorded.effects,
            persistence: recorded.persistence,
            attempt,
        })
    }

    fn ensure_selectable(&self) -> Result<(), QuizError> {
        if self.catalogue.matching(&self.filter).next().is_none() {
            return Err(QuizError::EmptySelection(self.filter.clone()));
        }
        Ok(())
    }
}
