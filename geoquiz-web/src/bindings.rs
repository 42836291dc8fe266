//! JavaScript-facing handle over one quiz run and the player's statistics.
//!
//! Values cross the boundary as plain JSON-compatible objects. Session-state
//! violations coming from UI races are logged to the console and ignored.
use std::rc::Rc;

use geoquiz_game::constants::DEFAULT_RECENT_SESSIONS;
use geoquiz_game::numbers::f64_to_u64_saturating;
use geoquiz_game::{
    Coordinate, GameConfig, Grade, Highlight, Persistence, QuizError, QuizRun, Region,
    RegionCatalogue, RegionCategory, RegionFilter, ResetToken, RoundOutcome, RunScore,
    StatisticsService, StatsError,
};
use serde::Serialize;
use wasm_bindgen::prelude::*;

use crate::dom;
use crate::storage::LocalStorageStore;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RegionView<'a> {
    code: u32,
    name: &'a str,
    district: &'a str,
    group: Option<&'static str>,
    population: u64,
}

impl<'a> From<&'a Region> for RegionView<'a> {
    fn from(region: &'a Region) -> Self {
        Self {
            code: region.code,
            name: &region.name,
            district: &region.district,
            group: region.group_name(),
            population: region.population,
        }
    }
}

#[derive(Debug, Serialize)]
struct HighlightView {
    fill: String,
    border: String,
}

impl From<Highlight> for HighlightView {
    fn from(highlight: Highlight) -> Self {
        Self {
            fill: highlight.fill.to_string(),
            border: highlight.border.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScoreView {
    score: f64,
    attempts: u32,
    correct: u32,
    accuracy_pct: u32,
}

impl From<RunScore> for ScoreView {
    fn from(score: RunScore) -> Self {
        Self {
            score: score.score,
            attempts: score.attempts,
            correct: score.correct,
            accuracy_pct: score.accuracy_pct(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ClickView {
    target_code: u32,
    clicked_code: u32,
    grade: Grade,
    highlight: HighlightView,
    reveal: Option<HighlightView>,
    score: ScoreView,
    high_precision: bool,
    newly_mastered: Option<String>,
    persisted: bool,
}

impl From<RoundOutcome> for ClickView {
    fn from(outcome: RoundOutcome) -> Self {
        Self {
            target_code: outcome.attempt.target_code,
            clicked_code: outcome.attempt.clicked_code,
            grade: outcome.attempt.grade,
            highlight: outcome.clicked.into(),
            reveal: outcome.reveal.map(HighlightView::from),
            score: outcome.score.into(),
            high_precision: outcome.effects.high_precision,
            newly_mastered: outcome.effects.newly_mastered,
            persisted: outcome.persistence.is_durable(),
        }
    }
}

fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, JsError> {
    let serializer = serde_wasm_bindgen::Serializer::json_compatible();
    Ok(value.serialize(&serializer)?)
}

fn parse_filter(value: JsValue) -> Result<RegionFilter, JsError> {
    if value.is_undefined() || value.is_null() {
        return Ok(RegionFilter::All);
    }
    Ok(serde_wasm_bindgen::from_value(value)?)
}

fn warn_if_degraded(persistence: &Persistence) {
    if let Persistence::MemoryOnly(failure) = persistence {
        dom::console_warn(&failure.to_string());
    }
}

#[wasm_bindgen]
pub struct QuizHandle {
    run: QuizRun,
    stats: StatisticsService<LocalStorageStore>,
    reset: Option<ResetToken>,
}

#[wasm_bindgen]
impl QuizHandle {
    /// Load the region catalogue and the stored statistics.
    ///
    /// # Errors
    ///
    /// Fails on malformed GeoJSON or an invalid configuration. Unreadable
    /// stored statistics only degrade persistence until a reset.
    #[wasm_bindgen(constructor)]
    pub fn new(geojson: &str, config_json: Option<String>) -> Result<QuizHandle, JsError> {
        let config = match config_json {
            Some(json) => GameConfig::from_json(&json)?,
            None => GameConfig::default(),
        };
        let catalogue = RegionCatalogue::from_geojson(geojson)?;
        let stats = StatisticsService::open(LocalStorageStore, config.stats)?;
        warn_if_degraded(stats.persistence());
        let seed = f64_to_u64_saturating(dom::now_millis());
        Ok(Self {
            run: QuizRun::new(Rc::new(catalogue), config.scoring, RegionFilter::All, seed),
            stats,
            reset: None,
        })
    }

    /// Start a run under `filter` (`{type: "group" | "district", value}` or
    /// nothing for the whole map) and return the first target.
    ///
    /// # Errors
    ///
    /// Fails if the filter is malformed or matches no region.
    pub fn start(&mut self, filter: JsValue) -> Result<JsValue, JsError> {
        let filter = parse_filter(filter)?;
        let persistence = self.run.restart(filter, &mut self.stats)?;
        warn_if_degraded(&persistence);
        self.target()
    }

    /// The region currently asked for, or `null`.
    ///
    /// # Errors
    ///
    /// Fails only if serialization fails.
    pub fn target(&self) -> Result<JsValue, JsError> {
        self.run
            .target()
            .map_or(Ok(JsValue::NULL), |region| to_js(&RegionView::from(region)))
    }

    /// Draw the next target.
    ///
    /// # Errors
    ///
    /// Fails if the active filter matches no region.
    #[wasm_bindgen(js_name = nextRound)]
    pub fn next_round(&mut self) -> Result<JsValue, JsError> {
        let region = self.run.next_round()?;
        to_js(&RegionView::from(region))
    }

    /// Grade a click on a region layer. Returns `null` when the click is
    /// ignored.
    ///
    /// # Errors
    ///
    /// Fails on an unknown region code.
    #[wasm_bindgen(js_name = handleClick)]
    pub fn handle_click(
        &mut self,
        clicked_code: u32,
        lat: f64,
        lng: f64,
    ) -> Result<JsValue, JsError> {
        let outcome = self
            .run
            .answer(clicked_code, Coordinate::new(lat, lng), &mut self.stats);
        Self::click_result(outcome)
    }

    /// Grade a raw map click, hit-testing it against the catalogue.
    ///
    /// # Errors
    ///
    /// Fails on an unknown target code.
    #[wasm_bindgen(js_name = handleMapClick)]
    pub fn handle_map_click(&mut self, lat: f64, lng: f64) -> Result<JsValue, JsError> {
        let click = Coordinate::new(lat, lng);
        let outcome = self.run.answer_at(click, &mut self.stats);
        Self::click_result(outcome)
    }

    /// Running score of the current run.
    ///
    /// # Errors
    ///
    /// Fails only if serialization fails.
    pub fn score(&self) -> Result<JsValue, JsError> {
        to_js(&ScoreView::from(self.run.score()))
    }

    #[wasm_bindgen(js_name = endSession)]
    pub fn end_session(&mut self) {
        match self.stats.end_session() {
            Ok(persistence) => warn_if_degraded(&persistence),
            Err(err) => {
                log::error!("{err}");
                dom::console_error(&err.to_string());
            }
        }
    }

    /// # Errors
    ///
    /// Fails only if serialization fails.
    #[wasm_bindgen(js_name = overallStats)]
    pub fn overall_stats(&self) -> Result<JsValue, JsError> {
        to_js(&self.stats.overall_stats())
    }

    /// Buckets of `category` (`"group"` or `"district"`), best first.
    ///
    /// # Errors
    ///
    /// Fails on an unknown category.
    #[wasm_bindgen(js_name = regionStats)]
    pub fn region_stats(&self, category: &str) -> Result<JsValue, JsError> {
        let category: RegionCategory = category.parse().map_err(|err: String| JsError::new(&err))?;
        to_js(&self.stats.all_region_stats(category))
    }

    /// # Errors
    ///
    /// Fails only if serialization fails.
    #[wasm_bindgen(js_name = recentSessions)]
    pub fn recent_sessions(&self, limit: Option<u32>) -> Result<JsValue, JsError> {
        let limit = limit.map_or(DEFAULT_RECENT_SESSIONS, |limit| {
            usize::try_from(limit).unwrap_or(usize::MAX)
        });
        to_js(self.stats.recent_sessions(limit))
    }

    /// # Errors
    ///
    /// Fails only if serialization fails.
    pub fn achievements(&self) -> Result<JsValue, JsError> {
        to_js(self.stats.achievements())
    }

    /// # Errors
    ///
    /// Fails only if serialization fails.
    #[wasm_bindgen(js_name = playTime)]
    pub fn play_time(&self) -> Result<JsValue, JsError> {
        to_js(&self.stats.play_time())
    }

    /// `{fileName, contents}` for a download link.
    ///
    /// # Errors
    ///
    /// Fails if the statistics cannot be encoded.
    pub fn export(&self) -> Result<JsValue, JsError> {
        to_js(&self.stats.export()?)
    }

    /// Arm a reset; the UI must call `confirmReset` after the player agrees.
    #[wasm_bindgen(js_name = requestReset)]
    pub fn request_reset(&mut self) {
        self.reset = Some(self.stats.request_reset());
    }

    #[wasm_bindgen(js_name = cancelReset)]
    pub fn cancel_reset(&mut self) {
        self.reset = None;
    }

    /// # Errors
    ///
    /// Fails if no reset was requested.
    #[wasm_bindgen(js_name = confirmReset)]
    pub fn confirm_reset(&mut self) -> Result<(), JsError> {
        let token = self
            .reset
            .take()
            .ok_or_else(|| JsError::new("no reset was requested"))?;
        let persistence = self.stats.confirm_reset(token)?;
        warn_if_degraded(&persistence);
        Ok(())
    }

    /// # Errors
    ///
    /// Fails only if serialization fails.
    pub fn districts(&self) -> Result<JsValue, JsError> {
        to_js(&self.run.catalogue().districts())
    }

    /// # Errors
    ///
    /// Fails only if serialization fails.
    pub fn groups(&self) -> Result<JsValue, JsError> {
        to_js(&self.run.catalogue().groups())
    }

    /// Whether statistics are currently kept in memory only.
    #[wasm_bindgen(js_name = persistenceDegraded)]
    #[must_use]
    pub fn persistence_degraded(&self) -> bool {
        !self.stats.persistence().is_durable()
    }

    /// Colours used to reveal the target after a miss.
    ///
    /// # Errors
    ///
    /// Fails only if serialization fails.
    #[wasm_bindgen(js_name = targetHighlight)]
    pub fn target_highlight() -> Result<JsValue, JsError> {
        to_js(&HighlightView::from(Highlight::target()))
    }

    fn click_result(outcome: Result<Option<RoundOutcome>, QuizError>) -> Result<JsValue, JsError> {
        match outcome {
            Ok(Some(outcome)) => {
                warn_if_degraded(&outcome.persistence);
                to_js(&ClickView::from(outcome))
            }
            Ok(None) => Ok(JsValue::NULL),
            Err(QuizError::Stats(err @ StatsError::InvalidSessionState { .. })) => {
                dom::console_error(&err.to_string());
                Ok(JsValue::NULL)
            }
            Err(err) => Err(err.into()),
        }
    }
}
