//! Survivor Core - decision engine for NFL survivor pools.
//!
//! This module provides:
//! - Win probability providers (stored, rating-based, Platt-calibrated)
//! - A shared week × team win matrix with the missing-probability policy
//! - Seeded parallel Monte Carlo survival simulation via rayon
//! - Beam-search pick optimization for a single entry
//! - Diversified portfolio recommendations across entries
//! - Scarcity analysis of strong teams in future weeks
//! - Entry and pick bookkeeping behind a read/write lock

pub mod config;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod matrix;
pub mod models;
pub mod optimizer;
pub mod portfolio;
pub mod scarcity;
pub mod simulator;
pub mod teams;
pub mod win_prob;

pub use config::{EngineConfig, MissingProbabilityPolicy};
pub use engine::SurvivorEngine;
pub use error::{Result, SurvivorError};
pub use ledger::EntryLedger;
pub use matrix::{TeamMask, WinMatrix};
pub use models::*;
pub use optimizer::BeamSearch;
pub use portfolio::PortfolioOptimizer;
pub use scarcity::{ScarcityLevel, ScarcityReport, WeekScarcity, STRONG_WIN_PROB};
pub use simulator::{CandidatePolicy, SurvivalSimulator};
pub use win_prob::{
    annotate_schedule, Calibrated, RatingModel, ScheduleProbabilities, WinProbabilityProvider,
};
