//! Centralized tuning constants for GeoQuiz scoring and statistics.
//!
//! These are the defaults behind [`crate::config::ScoringConfig`] and
//! [`crate::config::StatsConfig`]. The distance spans are empirical values
//! tuned for the Czech ORP map and carry no deeper derivation.

// Geometry -----------------------------------------------------------------
/// Mean Earth radius used by the Haversine formula.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

// Scoring ------------------------------------------------------------------
/// Click offset from a region's center at which the precision coefficient bottoms out.
pub const PRECISION_SPAN_KM: f64 = 50.0;
/// Lowest coefficient a correct click can earn.
pub const PRECISION_FLOOR: f64 = 0.5;
/// Coefficient for a click exactly at the center.
pub const PRECISION_CEILING: f64 = 1.0;
/// Reference span for wrong answers, roughly the extent of the modeled territory.
pub const ERROR_SPAN_KM: f64 = 300.0;

// Statistics ---------------------------------------------------------------
pub const HISTORY_LIMIT: usize = 50;
pub const MASTERY_ACCURACY_PCT: f64 = 90.0;
pub const MASTERY_MIN_ATTEMPTS: u32 = 10;
pub const PERFECT_MIN_ATTEMPTS: u32 = 5;
pub const HIGH_PRECISION_THRESHOLD: f64 = 0.9;
pub const DEFAULT_RECENT_SESSIONS: usize = 10;

// Persistence --------------------------------------------------------------
/// Fixed key the statistics blob is stored under.
pub const STORAGE_KEY: &str = "geo_quiz_statistics";
pub(crate) const EXPORT_FILE_PREFIX: &str = "geo-quiz-stats-";
