use anyhow::{anyhow, Context, Result};
use std::env;
use survivor_core::EngineConfig;

#[derive(Debug, Clone)]
pub struct Config {
    /// Season schedule JSON (`{"season": .., "games": [..]}`)
    pub schedule_path: String,
    /// Entries JSON array; no entries when unset
    pub entries_path: Option<String>,
    /// Team → rating JSON map; when set, unplayed games are re-priced by the
    /// rating model instead of using stored probabilities
    pub ratings_path: Option<String>,
    pub home_advantage: f64,
    /// Platt scaling (slope, intercept) applied on top of the rating model
    pub calibration: Option<(f64, f64)>,
    pub engine: EngineConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let schedule_path = env::var("SURVIVOR_SCHEDULE_PATH")
            .context("SURVIVOR_SCHEDULE_PATH must be set (path to schedule JSON)")?;
        let entries_path = env::var("SURVIVOR_ENTRIES_PATH").ok();
        let ratings_path = env::var("SURVIVOR_RATINGS_PATH").ok();
        let home_advantage = parse_f64_env(
            "SURVIVOR_HOME_ADVANTAGE",
            survivor_core::win_prob::NFL_HOME_ADVANTAGE_POINTS,
        )?;

        let calibration = match (
            env::var("SURVIVOR_CALIBRATION_SLOPE").ok(),
            env::var("SURVIVOR_CALIBRATION_INTERCEPT").ok(),
        ) {
            (None, None) => None,
            (slope, intercept) => {
                let slope = slope.as_deref().unwrap_or("1.0");
                let intercept = intercept.as_deref().unwrap_or("0.0");
                Some((
                    slope
                        .parse()
                        .with_context(|| format!("Invalid SURVIVOR_CALIBRATION_SLOPE: {slope}"))?,
                    intercept.parse().with_context(|| {
                        format!("Invalid SURVIVOR_CALIBRATION_INTERCEPT: {intercept}")
                    })?,
                ))
            }
        };

        let engine = EngineConfig::from_env();
        engine
            .validate()
            .map_err(|e| anyhow!("Invalid engine configuration: {e}"))?;

        Ok(Self {
            schedule_path,
            entries_path,
            ratings_path,
            home_advantage,
            calibration,
            engine,
        })
    }
}

fn parse_f64_env(key: &str, default: f64) -> Result<f64> {
    match env::var(key) {
        Ok(raw) => raw
            .parse::<f64>()
            .with_context(|| format!("Invalid {key}: {raw} (expected number)")),
        Err(_) => Ok(default),
    }
}
