//! Tunable configuration for scoring and statistics.
use serde::{Deserialize, Serialize};

use crate::constants::{
    EARTH_RADIUS_KM, ERROR_SPAN_KM, HIGH_PRECISION_THRESHOLD, HISTORY_LIMIT, MASTERY_ACCURACY_PCT,
    MASTERY_MIN_ATTEMPTS, PERFECT_MIN_ATTEMPTS, PRECISION_CEILING, PRECISION_FLOOR,
    PRECISION_SPAN_KM, STORAGE_KEY,
};

/// Distance scales used when grading clicks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub earth_radius_km: f64,
    /// Offset from the center at which a correct click earns only the floor.
    pub precision_span_km: f64,
    pub precision_floor: f64,
    /// Centroid distance that maps a wrong answer to full severity.
    pub error_span_km: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            earth_radius_km: EARTH_RADIUS_KM,
            precision_span_km: PRECISION_SPAN_KM,
            precision_floor: PRECISION_FLOOR,
            error_span_km: ERROR_SPAN_KM,
        }
    }
}

impl ScoringConfig {
    /// Coefficient for a click exactly at the center.
    #[must_use]
    pub const fn precision_ceiling(&self) -> f64 {
        PRECISION_CEILING
    }

    /// Check that the scales keep coefficients within `[floor, 1.0]`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::OutOfRange`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_positive("scoring.earth_radius_km", self.earth_radius_km)?;
        require_positive("scoring.precision_span_km", self.precision_span_km)?;
        require_positive("scoring.error_span_km", self.error_span_km)?;
        if !(0.0..=PRECISION_CEILING).contains(&self.precision_floor) {
            return Err(ConfigError::OutOfRange {
                field: "scoring.precision_floor",
                expected: "between 0 and 1",
            });
        }
        Ok(())
    }
}

/// Achievement thresholds and retention limits for player statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsConfig {
    pub history_limit: usize,
    pub mastery_accuracy_pct: f64,
    pub mastery_min_attempts: u32,
    pub perfect_min_attempts: u32,
    pub high_precision_threshold: f64,
    pub storage_key: String,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            history_limit: HISTORY_LIMIT,
            mastery_accuracy_pct: MASTERY_ACCURACY_PCT,
            mastery_min_attempts: MASTERY_MIN_ATTEMPTS,
            perfect_min_attempts: PERFECT_MIN_ATTEMPTS,
            high_precision_threshold: HIGH_PRECISION_THRESHOLD,
            storage_key: STORAGE_KEY.to_string(),
        }
    }
}

impl StatsConfig {
    /// Check retention and achievement thresholds.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::OutOfRange`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.history_limit == 0 {
            return Err(ConfigError::OutOfRange {
                field: "stats.history_limit",
                expected: "at least 1",
            });
        }
        if !(0.0..=100.0).contains(&self.mastery_accuracy_pct) {
            return Err(ConfigError::OutOfRange {
                field: "stats.mastery_accuracy_pct",
                expected: "between 0 and 100",
            });
        }
        if !(0.0..=PRECISION_CEILING).contains(&self.high_precision_threshold) {
            return Err(ConfigError::OutOfRange {
                field: "stats.high_precision_threshold",
                expected: "between 0 and 1",
            });
        }
        if self.storage_key.trim().is_empty() {
            return Err(ConfigError::OutOfRange {
                field: "stats.storage_key",
                expected: "a non-empty key",
            });
        }
        Ok(())
    }
}

/// Complete engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GameConfig {
    pub scoring: ScoringConfig,
    pub stats: StatsConfig,
}

impl GameConfig {
    /// Parse and validate a configuration document; missing fields keep
    /// their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Json`] if the JSON is malformed or a field has
    /// the wrong type, and [`ConfigError::OutOfRange`] if a value is unusable.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate both sections.
    ///
    /// # Errors
    ///
    /// See [`ScoringConfig::validate`] and [`StatsConfig::validate`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.scoring.validate()?;
        self.stats.validate()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("configuration JSON is invalid: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{field} must be {expected}")]
    OutOfRange {
        field: &'static str,
        expected: &'static str,
    },
}

fn require_positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            expected: "a positive number",
        })
    }
}
