//! GeoQuiz Game Engine
//!
//! Platform-agnostic scoring and statistics for the GeoQuiz map game, where
//! players locate Czech administrative regions (ORP) on a map.
//! This crate provides all game logic without UI or platform-specific dependencies.

pub mod config;
pub mod constants;
pub mod feedback;
pub mod geometry;
pub mod numbers;
pub mod quiz;
pub mod regions;
pub mod scoring;
pub mod service;
pub mod stats;
pub mod storage;

// Re-export commonly used types
pub use config::{ConfigError, GameConfig, ScoringConfig, StatsConfig};
pub use feedback::{Highlight, Rgb, error_color, precision_color};
pub use geometry::{Boundary, Coordinate, GeoError, GeoJsonGeometry, haversine_km};
pub use quiz::{QuizError, QuizRun, RoundOutcome, RoundPhase, RunScore};
pub use regions::{
    CatalogueError, REGION_GROUPS, Region, RegionCatalogue, RegionFilter, RegionGroup,
    UnknownRegion, group_code, group_name,
};
pub use scoring::{
    Attempt, Grade, ScoringEngine, error_severity, grade_correct, grade_wrong,
    precision_coefficient,
};
pub use service::{
    ExportDocument, Persistence, PersistenceUnavailable, Recorded, ResetToken, SessionState,
    StatisticsService, StatsError,
};
pub use stats::{
    Achievements, AttemptEffects, OverallReport, OverallStats, PlayTime, PlayTimestamps,
    RegionBuckets, RegionCategory, RegionEntry, RegionStats, Session, StatsBlob,
};
pub use storage::{FileStore, MemoryStore, StatsStore, StoreError};
