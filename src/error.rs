//! Error types for the matchmaking engine
//!
//! This module defines the error types using anyhow for consistent error handling
//! throughout the crate. Expected usage conditions (no more matches, not enough
//! participants) are values, not errors; see [`crate::types::MatchDraw`].

/// Result type alias for convenience
pub type Result<T> = anyhow::Result<T>;

/// Custom error types for specific matchmaking scenarios
#[derive(Debug, thiserror::Error)]
pub enum MatchmakingError {
    #[error("Invalid team sizes: {reason}")]
    InvalidTeamSizes { reason: String },

    #[error("Participant not found: {participant_id}")]
    ParticipantNotFound { participant_id: i64 },

    #[error("Participant already in roster: {participant_id}")]
    DuplicateParticipant { participant_id: i64 },

    #[error("Ranking unavailable: {0}")]
    RankingUnavailable(#[from] HistoryError),

    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    #[error("Internal error: {message}")]
    InternalError { message: String },
}

/// Failure to obtain historical game records
///
/// The two variants let a caller tell "cannot rank right now" apart from
/// "this source can never be ranked".
#[derive(Debug, Clone, thiserror::Error)]
pub enum HistoryError {
    #[error("History source '{source_key}' is unavailable: {reason}")]
    Unavailable { source_key: String, reason: String },

    #[error("History source '{source_key}' cannot be ranked: {reason}")]
    Unrankable { source_key: String, reason: String },
}

impl HistoryError {
    /// Whether retrying later (or falling back to random order) makes sense
    pub fn is_retryable(&self) -> bool {
        matches!(self, HistoryError::Unavailable { .. })
    }

    pub fn source_key(&self) -> &str {
        match self {
            HistoryError::Unavailable { source_key, .. }
            | HistoryError::Unrankable { source_key, .. } => source_key,
        }
    }
}

/// Degenerate regression input
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RegressionError {
    #[error("Not enough observations: {observations} rows, need at least {required}")]
    NotEnoughObservations {
        observations: usize,
        required: usize,
    },

    #[error("Design matrix shape mismatch: {reason}")]
    ShapeMismatch { reason: String },

    #[error("Total sample weight is zero")]
    ZeroWeight,

    #[error("Normal equations are singular at column {column}")]
    Singular { column: usize },

    #[error("Solution contains non-finite coefficients")]
    NonFinite,
}
