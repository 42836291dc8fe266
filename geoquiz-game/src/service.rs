//! Statistics service: owns the player's statistics and keeps the durable
//! copy in step with every recorded attempt.
//!
//! The service runs a small session state machine (`Idle -> Active -> Ended`)
//! and writes the whole [`StatsBlob`] back to its [`StatsStore`] after each
//! mutation. When the store cannot be used the service keeps working in
//! memory and says so through the [`Persistence`] returned by every mutating
//! call.
use chrono::{NaiveDate, Utc};
use serde::Serialize;

use crate::config::{ConfigError, StatsConfig};
use crate::constants::EXPORT_FILE_PREFIX;
use crate::regions::RegionFilter;
use crate::scoring::Attempt;
use crate::stats::{
    Achievements, AttemptEffects, OverallReport, PlayTime, RegionCategory, RegionEntry,
    RegionStats, Session, StatsBlob,
};
use crate::storage::StatsStore;

/// The durable store could not be read or written.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("statistics persistence unavailable: {reason}")]
pub struct PersistenceUnavailable {
    pub reason: String,
}

impl PersistenceUnavailable {
    fn from_error(err: &dyn std::error::Error) -> Self {
        Self {
            reason: err.to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StatsError {
    #[error("cannot {operation} while the session is {state}")]
    InvalidSessionState {
        operation: &'static str,
        state: &'static str,
    },
    #[error("invalid statistics configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("statistics could not be encoded: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("reset token does not match a pending reset request")]
    InvalidResetToken,
    #[error(transparent)]
    Persistence(#[from] PersistenceUnavailable),
}

/// Where the latest mutation ended up.
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Persistence {
    Durable,
    /// Applied in memory only; the durable copy is stale.
    MemoryOnly(PersistenceUnavailable),
}

impl Persistence {
    #[must_use]
    pub const fn is_durable(&self) -> bool {
        matches!(self, Self::Durable)
    }

    /// Turn a degraded outcome into an error.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceUnavailable`] for [`Persistence::MemoryOnly`].
    pub fn require_durable(self) -> Result<(), PersistenceUnavailable> {
        match self {
            Self::Durable => Ok(()),
            Self::MemoryOnly(err) => Err(err),
        }
    }
}

/// Result of recording one attempt.
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recorded {
    pub effects: AttemptEffects,
    pub persistence: Persistence,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Active(Session),
    Ended,
}

impl SessionState {
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Active(_) => "active",
            Self::Ended => "ended",
        }
    }
}

/// Single-use confirmation for [`StatisticsService::confirm_reset`].
#[derive(Debug, PartialEq, Eq)]
pub struct ResetToken(u64);

/// Statistics rendered for download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub file_name: String,
    pub contents: String,
}

pub struct StatisticsService<S: StatsStore> {
    store: S,
    config: StatsConfig,
    blob: StatsBlob,
    state: SessionState,
    /// Set when the initial read failed; the stored copy is never overwritten.
    read_failure: Option<PersistenceUnavailable>,
    persistence: Persistence,
    pending_reset: Option<u64>,
    reset_nonce: u64,
}

impl<S: StatsStore> StatisticsService<S> {
    /// Load statistics from `store`, creating a fresh document if none exists.
    ///
    /// If the store cannot be read, or holds a document that does not parse,
    /// the service starts from empty statistics in memory-only mode and never
    /// writes, so the stored copy survives. Confirming a reset discards that
    /// copy and resumes writing.
    ///
    /// # Errors
    ///
    /// Returns [`StatsError::Config`] if `config` fails validation.
    pub fn open(store: S, config: StatsConfig) -> Result<Self, StatsError> {
        config.validate()?;
        let now = Utc::now();
        let mut service = Self {
            store,
            config,
            blob: StatsBlob::fresh(now),
            state: SessionState::Idle,
            read_failure: None,
            persistence: Persistence::Durable,
            pending_reset: None,
            reset_nonce: 0,
        };
        match service.store.load(&service.config.storage_key) {
            Ok(Some(raw)) => match serde_json::from_str::<StatsBlob>(&raw) {
                Ok(blob) => {
                    service.blob = blob;
                    log::debug!(
                        "loaded statistics: {} attempts, {} sessions",
                        service.blob.overall.total_attempts,
                        service.blob.sessions.len()
                    );
                }
                Err(err) => service.keep_stored_copy(PersistenceUnavailable {
                    reason: format!("stored statistics could not be parsed: {err}"),
                }),
            },
            Ok(None) => {
                log::debug!("no stored statistics under {}", service.config.storage_key);
                let _ = service.persist();
            }
            Err(err) => service.keep_stored_copy(PersistenceUnavailable::from_error(&err)),
        }
        Ok(service)
    }

    fn keep_stored_copy(&mut self, failure: PersistenceUnavailable) {
        log::warn!(
            "statistics store unreadable, continuing in memory: {failure}"
        );
        self.persistence = Persistence::MemoryOnly(failure.clone());
        self.read_failure = Some(failure);
    }

    #[must_use]
    pub const fn config(&self) -> &StatsConfig {
        &self.config
    }

    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    #[must_use]
    pub const fn blob(&self) -> &StatsBlob {
        &self.blob
    }

    #[must_use]
    pub const fn session_state(&self) -> &SessionState {
        &self.state
    }

    #[must_use]
    pub const fn current_session(&self) -> Option<&Session> {
        match &self.state {
            SessionState::Active(session) => Some(session),
            _ => None,
        }
    }

    /// Outcome of the most recent write attempt.
    pub const fn persistence(&self) -> &Persistence {
        &self.persistence
    }

    /// Begin a session restricted to `filter`.
    ///
    /// # Errors
    ///
    /// Returns [`StatsError::InvalidSessionState`] if a session is already active.
    pub fn start_session(&mut self, filter: RegionFilter) -> Result<(), StatsError> {
        if matches!(self.state, SessionState::Active(_)) {
            return Err(self.invalid_state("start a session"));
        }
        log::debug!("session started ({filter})");
        self.state = SessionState::Active(Session::start(filter, Utc::now()));
        Ok(())
    }

    /// Fold a graded attempt into the statistics and persist them.
    ///
    /// # Errors
    ///
    /// Returns [`StatsError::InvalidSessionState`] without an active session.
    pub fn record_attempt(&mut self, attempt: &Attempt) -> Result<Recorded, StatsError> {
        let SessionState::Active(session) = &mut self.state else {
            return Err(self.invalid_state("record an attempt"));
        };
        let effects = self
            .blob
            .apply_attempt(attempt, session, &self.config, Utc::now());
        log::debug!(
            "recorded attempt on {} (correct: {}, precision: {:.3})",
            attempt.target_code,
            attempt.is_correct(),
            attempt.precision()
        );
        if let Some(group) = &effects.newly_mastered {
            log::info!("region group mastered: {group}");
        }
        Ok(Recorded {
            effects,
            persistence: self.persist(),
        })
    }

    /// Close the active session and push it onto the history.
    ///
    /// # Errors
    ///
    /// Returns [`StatsError::InvalidSessionState`] without an active session.
    pub fn end_session(&mut self) -> Result<Persistence, StatsError> {
        let session = match std::mem::replace(&mut self.state, SessionState::Ended) {
            SessionState::Active(session) => session,
            other => {
                self.state = other;
                return Err(self.invalid_state("end a session"));
            }
        };
        let perfect = self.blob.close_session(session, &self.config, Utc::now());
        if perfect {
            log::info!("perfect session recorded");
        }
        Ok(self.persist())
    }

    /// End the current session if anything was played in it, then start a
    /// new one with `filter`.
    ///
    /// # Errors
    ///
    /// Propagates errors from starting the new session.
    pub fn restart(&mut self, filter: RegionFilter) -> Result<Persistence, StatsError> {
        let played = self
            .current_session()
            .is_some_and(|session| session.attempts > 0);
        let persistence = if played {
            self.end_session()?
        } else {
            if matches!(self.state, SessionState::Active(_)) {
                self.state = SessionState::Idle;
            }
            self.persistence.clone()
        };
        self.start_session(filter)?;
        Ok(persistence)
    }

    /// First half of the reset protocol. Any earlier token is invalidated.
    pub fn request_reset(&mut self) -> ResetToken {
        self.reset_nonce = self.reset_nonce.wrapping_add(1);
        self.pending_reset = Some(self.reset_nonce);
        ResetToken(self.reset_nonce)
    }

    /// Replace all statistics with an empty document.
    ///
    /// An active session is restarted under the same filter. The pending
    /// request is consumed whether or not the token matches. A stored copy
    /// that could not be read at open time is overwritten.
    ///
    /// # Errors
    ///
    /// Returns [`StatsError::InvalidResetToken`] if `token` is not the
    /// outstanding one.
    pub fn confirm_reset(&mut self, token: ResetToken) -> Result<Persistence, StatsError> {
        if self.pending_reset.take() != Some(token.0) {
            log::warn!("reset confirmation rejected");
            return Err(StatsError::InvalidResetToken);
        }
        let now = Utc::now();
        self.blob = StatsBlob::fresh(now);
        if let SessionState::Active(session) = &mut self.state {
            *session = Session::start(session.filter.clone(), now);
        }
        if let Some(failure) = self.read_failure.take() {
            log::warn!("discarding unreadable stored statistics ({failure})");
        }
        log::info!("statistics reset");
        Ok(self.persist())
    }

    #[must_use]
    pub fn overall_stats(&self) -> OverallReport {
        OverallReport::from(&self.blob.overall)
    }

    /// Buckets of one category, best accuracy first.
    #[must_use]
    pub fn all_region_stats(&self, category: RegionCategory) -> Vec<RegionEntry> {
        self.blob.buckets(category).sorted_by_accuracy()
    }

    #[must_use]
    pub fn region_stats(&self, category: RegionCategory, name: &str) -> Option<RegionStats> {
        self.blob.buckets(category).get(name).copied()
    }

    /// Up to `limit` finished sessions, most recent first.
    #[must_use]
    pub fn recent_sessions(&self, limit: usize) -> &[Session] {
        let sessions = &self.blob.sessions;
        &sessions[..limit.min(sessions.len())]
    }

    #[must_use]
    pub const fn achievements(&self) -> &Achievements {
        &self.blob.achievements
    }

    #[must_use]
    pub fn play_time(&self) -> PlayTime {
        self.blob.play_time()
    }

    /// Export dated today (UTC).
    ///
    /// # Errors
    ///
    /// Returns [`StatsError::Encode`] if serialization fails.
    pub fn export(&self) -> Result<ExportDocument, StatsError> {
        self.export_on(Utc::now().date_naive())
    }

    /// Export dated `date`.
    ///
    /// # Errors
    ///
    /// Returns [`StatsError::Encode`] if serialization fails.
    pub fn export_on(&self, date: NaiveDate) -> Result<ExportDocument, StatsError> {
        let contents = serde_json::to_string_pretty(&self.blob).map_err(StatsError::Encode)?;
        Ok(ExportDocument {
            file_name: format!("{EXPORT_FILE_PREFIX}{}.json", date.format("%Y-%m-%d")),
            contents,
        })
    }

    fn invalid_state(&self, operation: &'static str) -> StatsError {
        let err = StatsError::InvalidSessionState {
            operation,
            state: self.state.label(),
        };
        log::error!("{err}");
        err
    }

    fn persist(&mut self) -> Persistence {
        let outcome = if let Some(failure) = &self.read_failure {
            Persistence::MemoryOnly(failure.clone())
        } else {
            match serde_json::to_string(&self.blob) {
                Ok(raw) => match self.store.save(&self.config.storage_key, &raw) {
                    Ok(()) => Persistence::Durable,
                    Err(err) => Persistence::MemoryOnly(PersistenceUnavailable::from_error(&err)),
                },
                Err(err) => Persistence::MemoryOnly(PersistenceUnavailable::from_error(&err)),
            }
        };
        if let Persistence::MemoryOnly(failure) = &outcome {
            log::warn!("statistics kept in memory only: {failure}");
        }
        self.persistence = outcome.clone();
        outcome
    }
}
