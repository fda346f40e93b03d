//! Win probability providers for scheduled games.
//!
//! The rest of the engine treats a provider as a pure lookup: given a game it
//! returns the probability that each side wins. Providers here:
//! - Stored probabilities already annotated on the schedule
//! - Rating-spread logistic model (fallback when no trained model exists)
//! - Platt-scaling calibration wrapper around any provider

use crate::error::{check_probability, Result, SurvivorError};
use crate::models::{Game, Schedule};
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use tracing::debug;

/// Logistic function for probability calculation
#[inline]
fn logistic(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Converts a probability to log-odds.
#[inline]
fn prob_to_log_odds(p: f64) -> f64 {
    (p / (1.0 - p)).ln()
}

/// Home field advantage in rating points
pub const NFL_HOME_ADVANTAGE_POINTS: f64 = 3.0;

/// Rating spread that moves the log-odds by one unit
pub const RATING_SPREAD_SCALE: f64 = 13.86;

/// Source of calibrated win probabilities.
pub trait WinProbabilityProvider: Send + Sync {
    /// (home, away) win probabilities for `game`, or `None` when the provider
    /// has no estimate for it.
    fn win_probabilities(&self, game: &Game) -> Result<Option<(f64, f64)>>;

    /// Provider name for logging and debugging
    fn provider_name(&self) -> &str;
}

/// Reads the probabilities already stored on each game.
#[derive(Debug, Clone)]
pub struct ScheduleProbabilities {
    tolerance: f64,
}

impl ScheduleProbabilities {
    pub fn new(tolerance: f64) -> Self {
        Self { tolerance }
    }
}

impl Default for ScheduleProbabilities {
    fn default() -> Self {
        Self::new(1e-6)
    }
}

impl WinProbabilityProvider for ScheduleProbabilities {
    fn win_probabilities(&self, game: &Game) -> Result<Option<(f64, f64)>> {
        game.probabilities(self.tolerance)
    }

    fn provider_name(&self) -> &str {
        "schedule"
    }
}

/// Logistic model over team rating differentials (SRS-style points above
/// average). A team without a rating is treated as league average.
#[derive(Debug, Clone)]
pub struct RatingModel {
    ratings: FxHashMap<String, f64>,
    home_advantage: f64,
    scale: f64,
}

impl Default for RatingModel {
    fn default() -> Self {
        Self::new()
    }
}

impl RatingModel {
    pub fn new() -> Self {
        Self {
            ratings: FxHashMap::default(),
            home_advantage: NFL_HOME_ADVANTAGE_POINTS,
            scale: RATING_SPREAD_SCALE,
        }
    }

    pub fn from_ratings<I, S>(ratings: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let mut model = Self::new();
        for (team, rating) in ratings {
            model.ratings.insert(team.into(), rating);
        }
        model
    }

    pub fn with_rating(mut self, team: &str, rating: f64) -> Self {
        self.ratings.insert(team.to_string(), rating);
        self
    }

    pub fn with_home_advantage(mut self, points: f64) -> Self {
        self.home_advantage = points;
        self
    }

    /// Home-win probability for a rating spread.
    pub fn home_win_prob(&self, home_rating: f64, away_rating: f64, is_neutral: bool) -> f64 {
        let hfa = if is_neutral { 0.0 } else { self.home_advantage };
        let spread = home_rating - away_rating + hfa;
        logistic(spread / self.scale)
    }
}

impl WinProbabilityProvider for RatingModel {
    fn win_probabilities(&self, game: &Game) -> Result<Option<(f64, f64)>> {
        let home = self.ratings.get(&game.home_team);
        let away = self.ratings.get(&game.away_team);
        if home.is_none() && away.is_none() {
            return Ok(None);
        }
        let p = self.home_win_prob(
            home.copied().unwrap_or(0.0),
            away.copied().unwrap_or(0.0),
            game.is_neutral,
        );
        let p = check_probability(p, "rating model output")?;
        Ok(Some((p, 1.0 - p)))
    }

    fn provider_name(&self) -> &str {
        "rating_logistic"
    }
}

/// Platt scaling: `p' = logistic(a * logit(p) + b)` on the home side.
#[derive(Debug, Clone)]
pub struct Calibrated<P> {
    inner: P,
    slope: f64,
    intercept: f64,
}

impl<P: WinProbabilityProvider> Calibrated<P> {
    pub fn new(inner: P, slope: f64, intercept: f64) -> Result<Self> {
        if !(slope > 0.0 && slope.is_finite()) || !intercept.is_finite() {
            return Err(SurvivorError::invalid(format!(
                "calibration slope {} must be positive and intercept {} finite",
                slope, intercept
            )));
        }
        Ok(Self {
            inner,
            slope,
            intercept,
        })
    }

    fn calibrate(&self, p: f64) -> f64 {
        logistic(self.slope * prob_to_log_odds(p) + self.intercept)
    }
}

impl<P: WinProbabilityProvider> WinProbabilityProvider for Calibrated<P> {
    fn win_probabilities(&self, game: &Game) -> Result<Option<(f64, f64)>> {
        let Some((home, _)) = self.inner.win_probabilities(game)? else {
            return Ok(None);
        };
        let home = check_probability(self.calibrate(home), "calibrated probability")?;
        Ok(Some((home, 1.0 - home)))
    }

    fn provider_name(&self) -> &str {
        self.inner.provider_name()
    }
}

/// Fill in probabilities on every unresolved game the provider can price.
/// Resolved games and games the provider has no estimate for are untouched.
pub fn annotate_schedule(
    schedule: &Schedule,
    provider: &dyn WinProbabilityProvider,
) -> Result<Schedule> {
    let games: Vec<&Game> = schedule.games().collect();
    let annotated = games
        .par_iter()
        .map(|game| -> Result<Game> {
            let mut game = (*game).clone();
            if !game.is_resolved() {
                if let Some((home, away)) = provider.win_probabilities(&game)? {
                    game.home_win_prob = Some(home);
                    game.away_win_prob = Some(away);
                }
            }
            Ok(game)
        })
        .collect::<Result<Vec<_>>>()?;

    debug!(
        "Annotated {} games for season {} with {}",
        annotated.len(),
        schedule.season(),
        provider.provider_name()
    );
    Schedule::new(schedule.season(), annotated)
}
