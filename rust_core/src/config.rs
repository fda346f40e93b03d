//! Engine configuration.
//!
//! Every knob that bounds the amount of work (trial count, batch size, beam
//! width, horizon) lives here so callers can budget a computation purely
//! through parameters.

use crate::error::{Result, SurvivorError};
use serde::{Deserialize, Serialize};

/// What to do when an unresolved game in range has no win probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingProbabilityPolicy {
    /// Reject the computation with `InsufficientData`.
    FailFast,
    /// Treat the game as a 50/50 coin flip and flag the cell.
    AssumeCoinFlip,
}

impl MissingProbabilityPolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "fail_fast" | "fail-fast" | "fail" => Some(Self::FailFast),
            "coin_flip" | "coin-flip" | "assume_coin_flip" | "skip" => Some(Self::AssumeCoinFlip),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Monte Carlo trials per simulation
    pub n_simulations: u32,
    /// RNG seed; `None` draws a fresh seed per run
    pub seed: Option<u64>,
    /// Trials per parallel batch
    pub batch_size: u32,
    /// Beam states kept after each week's expansion
    pub beam_width: usize,
    /// Multiplier applied to a team's current-week win probability for each
    /// earlier entry in the portfolio that already claimed it
    pub diversification_factor: f64,
    /// Policy for unresolved games without a probability
    pub missing_probability: MissingProbabilityPolicy,
    /// Allowed deviation of home + away probability from 1
    pub probability_tolerance: f64,
    /// Last week to plan for; `None` means the end of the season
    pub horizon: Option<u8>,
    /// Require team codes to be known NFL franchises
    pub strict_team_codes: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            n_simulations: 50_000,
            seed: None,
            batch_size: 4_096,
            beam_width: 32,
            diversification_factor: 0.95,
            missing_probability: MissingProbabilityPolicy::FailFast,
            probability_tolerance: 1e-6,
            horizon: None,
            strict_team_codes: false,
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            n_simulations: std::env::var("SURVIVOR_N_SIMULATIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.n_simulations),
            seed: std::env::var("SURVIVOR_SEED")
                .ok()
                .and_then(|v| v.parse().ok()),
            batch_size: std::env::var("SURVIVOR_BATCH_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.batch_size),
            beam_width: std::env::var("SURVIVOR_BEAM_WIDTH")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.beam_width),
            diversification_factor: std::env::var("SURVIVOR_DIVERSIFICATION_FACTOR")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.diversification_factor),
            missing_probability: std::env::var("SURVIVOR_MISSING_PROBABILITY")
                .ok()
                .and_then(|v| MissingProbabilityPolicy::parse(&v))
                .unwrap_or(defaults.missing_probability),
            probability_tolerance: std::env::var("SURVIVOR_PROBABILITY_TOLERANCE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.probability_tolerance),
            horizon: std::env::var("SURVIVOR_HORIZON")
                .ok()
                .and_then(|v| v.parse().ok()),
            strict_team_codes: std::env::var("SURVIVOR_STRICT_TEAMS")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(defaults.strict_team_codes),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.n_simulations == 0 {
            return Err(SurvivorError::invalid("n_simulations must be positive"));
        }
        if self.batch_size == 0 {
            return Err(SurvivorError::invalid("batch_size must be positive"));
        }
        if self.beam_width == 0 {
            return Err(SurvivorError::invalid("beam_width must be at least 1"));
        }
        if !(self.diversification_factor > 0.0 && self.diversification_factor <= 1.0) {
            return Err(SurvivorError::invalid(format!(
                "diversification_factor {} must be in (0, 1]",
                self.diversification_factor
            )));
        }
        if !(self.probability_tolerance >= 0.0 && self.probability_tolerance < 0.5) {
            return Err(SurvivorError::invalid(format!(
                "probability_tolerance {} must be in [0, 0.5)",
                self.probability_tolerance
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_beam_width() {
        let config = EngineConfig {
            beam_width: 0,
            ..EngineConfig::default()
        };
        assert!(matches!(config.validate(), Err(SurvivorError::InvalidInput(_))));
    }

    #[test]
    fn test_rejects_factor_outside_unit_interval() {
        for factor in [0.0, -0.5, 1.01] {
            let config = EngineConfig {
                diversification_factor: factor,
                ..EngineConfig::default()
            };
            assert!(config.validate().is_err(), "factor {} accepted", factor);
        }
    }

    #[test]
    fn test_policy_parse() {
        assert_eq!(
            MissingProbabilityPolicy::parse("coin_flip"),
            Some(MissingProbabilityPolicy::AssumeCoinFlip)
        );
        assert_eq!(
            MissingProbabilityPolicy::parse("FAIL_FAST"),
            Some(MissingProbabilityPolicy::FailFast)
        );
        assert_eq!(MissingProbabilityPolicy::parse("maybe"), None);
    }
}
