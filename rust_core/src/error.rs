//! Error taxonomy for the survivor engine.
//!
//! "No eligible team" is deliberately absent: it is a normal outcome and is
//! returned as [`crate::models::PickAdvice::NoRecommendation`].

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SurvivorError {
    /// Malformed request or schedule data. Rejected before any computation.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An unresolved game in range has no win probability and the engine is
    /// configured to fail fast.
    #[error("insufficient data: no win probability for {team} in week {week}")]
    InsufficientData { week: u8, team: String },

    /// Arithmetic domain faults such as a probability outside [0, 1].
    #[error("internal fault: {0}")]
    Internal(String),
}

impl SurvivorError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        SurvivorError::InvalidInput(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        SurvivorError::Internal(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, SurvivorError>;

/// Reject a probability outside [0, 1] (or NaN) without clamping it.
pub(crate) fn check_probability(value: f64, what: &str) -> Result<f64> {
    if value.is_nan() || !(0.0..=1.0).contains(&value) {
        return Err(SurvivorError::internal(format!(
            "{} has probability {} outside [0, 1]",
            what, value
        )));
    }
    Ok(value)
}
