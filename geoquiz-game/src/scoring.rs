//! Scoring engine: turns a click into a graded attempt.
//!
//! A correct click is rewarded by how close it lands to the region's
//! centroid. A wrong click is graded by how far the clicked region is from
//! the target, which drives the feedback gradient.
use serde::{Deserialize, Serialize};

use crate::config::ScoringConfig;
use crate::geometry::Coordinate;
use crate::regions::{RegionCatalogue, UnknownRegion};

/// Precision coefficient for a click `offset_km` away from the centroid.
///
/// Linear from the ceiling at the center down to the floor at
/// `precision_span_km`, clamped at the floor beyond.
#[must_use]
pub fn precision_coefficient(offset_km: f64, cfg: &ScoringConfig) -> f64 {
    let ceiling = cfg.precision_ceiling();
    let drop = ceiling - cfg.precision_floor;
    (ceiling - (offset_km / cfg.precision_span_km) * drop).max(cfg.precision_floor)
}

/// Normalized wrong-answer distance in `[0, 1]`.
#[must_use]
pub fn error_severity(distance_km: f64, cfg: &ScoringConfig) -> f64 {
    (distance_km / cfg.error_span_km).clamp(0.0, 1.0)
}

/// Outcome of grading one click, as handed back to the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Grade {
    pub correct: bool,
    /// Precision coefficient in `[0.5, 1.0]`; correct clicks only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coefficient: Option<f64>,
    /// Distance from the click to the centroid; correct clicks only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub click_offset_km: Option<f64>,
    /// Centroid-to-centroid distance; wrong clicks only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_distance_km: Option<f64>,
    /// `error_distance_km` normalized to `[0, 1]`; wrong clicks only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_severity: Option<f64>,
}

impl Grade {
    #[must_use]
    pub const fn hit(click_offset_km: f64, coefficient: f64) -> Self {
        Self {
            correct: true,
            coefficient: Some(coefficient),
            click_offset_km: Some(click_offset_km),
            error_distance_km: None,
            error_severity: None,
        }
    }

    #[must_use]
    pub const fn miss(error_distance_km: f64, error_severity: f64) -> Self {
        Self {
            correct: false,
            coefficient: None,
            click_offset_km: None,
            error_distance_km: Some(error_distance_km),
            error_severity: Some(error_severity),
        }
    }
}

/// Grade a click that landed in the target region.
#[must_use]
pub fn grade_correct(centroid: Coordinate, click: Coordinate, cfg: &ScoringConfig) -> Grade {
    let offset = click.distance_km(&centroid, cfg.earth_radius_km);
    Grade::hit(offset, precision_coefficient(offset, cfg))
}

/// Grade a click that landed in the wrong region.
#[must_use]
pub fn grade_wrong(
    clicked_centroid: Coordinate,
    target_centroid: Coordinate,
    cfg: &ScoringConfig,
) -> Grade {
    let distance = clicked_centroid.distance_km(&target_centroid, cfg.earth_radius_km);
    Grade::miss(distance, error_severity(distance, cfg))
}

/// One graded round, ready to be recorded by the statistics service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attempt {
    pub target_code: u32,
    pub clicked_code: u32,
    pub click: Coordinate,
    pub grade: Grade,
    /// District of the target region, used for statistics bucketing.
    #[serde(default)]
    pub target_district: Option<String>,
    /// Region-group of the target region, used for statistics bucketing.
    #[serde(default)]
    pub target_group: Option<String>,
}

impl Attempt {
    #[must_use]
    pub const fn is_correct(&self) -> bool {
        self.grade.correct
    }

    /// Precision earned by this attempt, zero for wrong answers.
    #[must_use]
    pub fn precision(&self) -> f64 {
        self.grade.coefficient.unwrap_or(0.0)
    }
}

/// Grades clicks against a loaded catalogue.
#[derive(Debug, Clone)]
pub struct ScoringEngine<'a> {
    catalogue: &'a RegionCatalogue,
    config: ScoringConfig,
}

impl<'a> ScoringEngine<'a> {
    #[must_use]
    pub const fn new(catalogue: &'a RegionCatalogue, config: ScoringConfig) -> Self {
        Self { catalogue, config }
    }

    #[must_use]
    pub const fn config(&self) -> &ScoringConfig {
        &self.config
    }

    #[must_use]
    pub const fn catalogue(&self) -> &'a RegionCatalogue {
        self.catalogue
    }

    /// Grade one click on `clicked_code` while `target_code` was asked.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownRegion`] if either code is not in the catalogue.
    pub fn grade(
        &self,
        target_code: u32,
        clicked_code: u32,
        click: Coordinate,
    ) -> Result<Attempt, UnknownRegion> {
        let target = self.catalogue.require(target_code)?;
        let clicked = self.catalogue.require(clicked_code)?;
        let grade = if target.code == clicked.code {
            grade_correct(clicked.centroid(), click, &self.config)
        } else {
            grade_wrong(clicked.centroid(), target.centroid(), &self.config)
        };
        Ok(Attempt {
            target_code,
            clicked_code,
            click,
            grade,
            target_district: Some(target.district.clone()).filter(|name| !name.is_empty()),
            target_group: target.group_name().map(str::to_string),
        })
    }

    /// Grade a raw click by hit-testing it against the catalogue first.
    ///
    /// Returns `Ok(None)` when the click falls outside every region.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownRegion`] if the target is not in the catalogue.
    pub fn grade_click(
        &self,
        target_code: u32,
        click: Coordinate,
    ) -> Result<Option<Attempt>, UnknownRegion> {
        self.catalogue.require(target_code)?;
        let Some(clicked) = self.catalogue.region_at(click) else {
            return Ok(None);
        };
        self.grade(target_code, clicked.code, click).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Boundary;
    use crate::regions::Region;

    fn square(code: u32, district: &str, group: u16, lat: f64, lng: f64) -> Region {
        Region {
            code,
            name: format!("R{code}"),
            district: district.to_string(),
            group_code: Some(group),
            population: 1000,
            boundary: Boundary::rectangle(
                Coordinate::new(lat - 0.2, lng - 0.2),
                Coordinate::new(lat + 0.2, lng + 0.2),
            ),
        }
    }

    fn catalogue() -> RegionCatalogue {
        RegionCatalogue::from_regions(vec![
            square(1, "Tábor", 35, 49.4, 14.7),
            square(2, "Brno-město", 116, 49.2, 16.6),
        ])
        .unwrap()
    }

    #[test]
    fn coefficient_is_exactly_one_at_zero_distance() {
        let cfg = ScoringConfig::default();
        assert!(
            (precision_coefficient(0.0, &cfg) - 1.0).abs() < f64::EPSILON
        );
    }

    #[test]
    fn coefficient_is_linear_then_floored() {
        let cfg = ScoringConfig::default();
        assert!((precision_coefficient(25.0, &cfg) - 0.75).abs() < 1e-12);
        assert!(
            (precision_coefficient(50.0, &cfg) - 0.5).abs() < f64::EPSILON
        );
        assert!(
            (precision_coefficient(500.0, &cfg) - 0.5).abs() < f64::EPSILON
        );
    }

    #[test]
    fn severity_clamps_at_span() {
        let cfg = ScoringConfig::default();
        assert!((error_severity(150.0, &cfg) - 0.5).abs() < f64::EPSILON);
        assert!((error_severity(900.0, &cfg) - 1.0).abs() < f64::EPSILON);
        assert!(error_severity(0.0, &cfg).abs() < f64::EPSILON);
    }

    #[test]
    fn click_at_centroid_scores_full_precision() {
        let catalogue = catalogue();
        let engine = ScoringEngine::new(&catalogue, ScoringConfig::default());
        let centroid = catalogue.centroid(1).unwrap();
        let attempt = engine.grade(1, 1, centroid).unwrap();
        assert!(attempt.is_correct());
        assert_eq!(attempt.grade.coefficient, Some(1.0));
        assert_eq!(attempt.target_group.as_deref(), Some("Jihočeský kraj"));
        assert_eq!(attempt.target_district.as_deref(), Some("Tábor"));
    }

    #[test]
    fn wrong_click_uses_centroid_to_centroid_distance() {
        let catalogue = catalogue();
        let cfg = ScoringConfig::default();
        let engine = ScoringEngine::new(&catalogue, cfg.clone());
        // Click far off the clicked region's center; grading must ignore it.
        let attempt = engine.grade(1, 2, Coordinate::new(49.35, 16.45)).unwrap();
        assert!(!attempt.is_correct());
        assert!(attempt.grade.coefficient.is_none());
        let expected = catalogue
            .centroid(2)
            .unwrap()
            .distance_km(&catalogue.centroid(1).unwrap(), cfg.earth_radius_km);
        assert_eq!(attempt.grade.error_distance_km, Some(expected));
        assert!(attempt.precision().abs() < f64::EPSILON);
        let severity = attempt.grade.error_severity.unwrap();
        assert!(severity > 0.0 && severity < 1.0);
    }

    #[test]
    fn unknown_codes_are_surfaced() {
        let catalogue = catalogue();
        let engine = ScoringEngine::new(&catalogue, ScoringConfig::default());
        let click = Coordinate::new(49.4, 14.7);
        assert_eq!(engine.grade(9, 1, click), Err(UnknownRegion(9)));
        assert_eq!(engine.grade(1, 9, click), Err(UnknownRegion(9)));
    }

    #[test]
    fn grade_click_hit_tests_first() {
        let catalogue = catalogue();
        let engine = ScoringEngine::new(&catalogue, ScoringConfig::default());
        let hit = engine
            .grade_click(2, Coordinate::new(49.25, 16.65))
            .unwrap()
            .unwrap();
        assert_eq!(hit.clicked_code, 2);
        assert!(hit.is_correct());
        let outside = engine.grade_click(2, Coordinate::new(40.0, 0.0));
        assert!(outside.unwrap().is_none());
    }

    #[test]
    fn grade_serializes_only_relevant_fields() {
        let json = serde_json::to_value(Grade::hit(0.0, 1.0)).unwrap();
        assert_eq!(json["correct"], true);
        assert_eq!(json["coefficient"], 1.0);
        assert!(json.get("errorDistanceKm").is_none());

        let json = serde_json::to_value(Grade::miss(120.0, 0.4)).unwrap();
        assert_eq!(json["errorDistanceKm"], 120.0);
        assert!(json.get("coefficient").is_none());
    }
}
