//! Monte Carlo survival simulation.
//!
//! Trials run in fixed-size batches on the rayon pool. Batch `i` seeds its own
//! `StdRng` from `seed + i` and batch results are combined by integer sums, so
//! a seeded run gives identical output on any number of threads.
//!
//! Every candidate is evaluated against the same drawn outcomes in each trial.

use crate::config::EngineConfig;
use crate::error::{Result, SurvivorError};
use crate::matrix::{FixtureState, TeamMask, WinMatrix};
use crate::models::{SimulationResult, TeamSurvival};
use crate::scarcity::scarcity;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// How a start-week candidate is played after the start week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CandidatePolicy {
    /// Take the candidate, then the best remaining team in every later week.
    #[default]
    GreedyContinuation,
    /// Only the candidate's start-week game counts.
    StartWeekOnly,
}

/// Picks as (week index, team index) pairs.
type Path = Vec<(usize, usize)>;

pub struct SurvivalSimulator<'a> {
    matrix: &'a WinMatrix,
    n_simulations: u32,
    batch_size: u32,
    seed: Option<u64>,
}

impl<'a> SurvivalSimulator<'a> {
    pub fn new(matrix: &'a WinMatrix, config: &EngineConfig) -> Self {
        Self {
            matrix,
            n_simulations: config.n_simulations,
            batch_size: config.batch_size,
            seed: config.seed,
        }
    }

    pub fn with_simulations(mut self, n_simulations: u32) -> Self {
        self.n_simulations = n_simulations;
        self
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    fn check(&self) -> Result<()> {
        if self.n_simulations == 0 {
            return Err(SurvivorError::invalid("n_simulations must be positive"));
        }
        if self.batch_size == 0 {
            return Err(SurvivorError::invalid("batch_size must be positive"));
        }
        Ok(())
    }

    /// Survival estimate for every team available in the first scheduled
    /// week, ranked by survival, then win probability, then team code.
    pub fn simulate(&self, used: TeamMask, policy: CandidatePolicy) -> Result<SimulationResult> {
        self.check()?;
        let matrix = self.matrix;
        if matrix.is_empty() {
            debug!("No games at or after week {}", matrix.from_week());
            return Ok(SimulationResult::empty(
                matrix.season(),
                matrix.from_week(),
                self.n_simulations,
            ));
        }

        let candidates: Vec<usize> = (0..matrix.n_teams())
            .filter(|&team| !used.contains(team) && matrix.slot(0, team).is_playing())
            .collect();
        let paths: Vec<Option<Path>> = candidates
            .iter()
            .map(|&team| self.candidate_path(team, used, policy))
            .collect();

        info!(
            "Simulating {} candidates over {} weeks ({} trials, {:?})",
            candidates.len(),
            matrix.weeks().len(),
            self.n_simulations,
            policy
        );
        let survived = self.run_trials(&paths);

        let n = self.n_simulations as f64;
        let mut teams: Vec<TeamSurvival> = candidates
            .iter()
            .zip(&survived)
            .map(|(&team, &count)| {
                let slot = matrix.slot(0, team);
                TeamSurvival {
                    team: matrix.team_code(team).to_string(),
                    win_prob: slot.win_prob().unwrap_or(0.0),
                    survival_prob: count as f64 / n,
                    opponent: slot
                        .opponent()
                        .map(|o| matrix.team_code(o).to_string())
                        .unwrap_or_default(),
                    is_home: slot.is_home().unwrap_or(false),
                }
            })
            .collect();
        teams.sort_by(|a, b| {
            b.survival_prob
                .partial_cmp(&a.survival_prob)
                .unwrap_or(Ordering::Equal)
                .then_with(|| b.win_prob.partial_cmp(&a.win_prob).unwrap_or(Ordering::Equal))
                .then_with(|| a.team.cmp(&b.team))
        });

        Ok(SimulationResult {
            season: matrix.season(),
            week: matrix.from_week(),
            n_simulations: self.n_simulations,
            teams,
            scarcity_by_week: scarcity(matrix, used),
            flagged: matrix.flagged().to_vec(),
        })
    }

    /// Fraction of trials in which every pick of `strategy` (week → team) wins.
    pub fn simulate_path(&self, strategy: &BTreeMap<u8, String>) -> Result<f64> {
        self.check()?;
        let mut path = Path::with_capacity(strategy.len());
        for (&week, code) in strategy {
            let week_idx = self.matrix.week_index(week).ok_or_else(|| {
                SurvivorError::invalid(format!("no games in week {} within range", week))
            })?;
            let team = self
                .matrix
                .team_index(code)
                .ok_or_else(|| SurvivorError::invalid(format!("unknown team code {}", code)))?;
            if !self.matrix.slot(week_idx, team).is_playing() {
                return Err(SurvivorError::invalid(format!(
                    "{} is on bye in week {}",
                    code, week
                )));
            }
            path.push((week_idx, team));
        }

        let survived = self.run_trials(&[Some(path)]);
        Ok(survived[0] as f64 / self.n_simulations as f64)
    }

    /// `None` when the greedy continuation runs out of teams.
    fn candidate_path(&self, candidate: usize, used: TeamMask, policy: CandidatePolicy) -> Option<Path> {
        let mut path = vec![(0, candidate)];
        if policy == CandidatePolicy::StartWeekOnly {
            return Some(path);
        }
        let mut used = used.with(candidate);
        for week_idx in 1..self.matrix.weeks().len() {
            let (team, _) = self.matrix.best_available(week_idx, used)?;
            used = used.with(team);
            path.push((week_idx, team));
        }
        Some(path)
    }

    /// Winners of every game in one week for one trial.
    fn draw_week<R: Rng>(&self, week_idx: usize, rng: &mut R) -> TeamMask {
        let mut winners = TeamMask::empty();
        for fixture in self.matrix.fixtures(week_idx) {
            match fixture.state {
                FixtureState::Open { home_win_prob } => {
                    let winner = if rng.gen::<f64>() < home_win_prob {
                        fixture.home
                    } else {
                        fixture.away
                    };
                    winners = winners.with(winner);
                }
                FixtureState::Decided { home_won, away_won } => {
                    if home_won {
                        winners = winners.with(fixture.home);
                    }
                    if away_won {
                        winners = winners.with(fixture.away);
                    }
                }
            }
        }
        winners
    }

    /// Surviving trial count per path.
    fn run_trials(&self, paths: &[Option<Path>]) -> Vec<u64> {
        let n = self.n_simulations as u64;
        let batch = self.batch_size as u64;
        let n_batches = n.div_ceil(batch);
        let n_weeks = paths
            .iter()
            .flatten()
            .flat_map(|p| p.iter().map(|(w, _)| w + 1))
            .max()
            .unwrap_or(0);
        let base_seed = self.seed.unwrap_or_else(rand::random);
        debug!(
            "Running {} trials in {} batches (seed {})",
            n, n_batches, base_seed
        );

        (0..n_batches)
            .into_par_iter()
            .map(|batch_idx| {
                let mut rng = StdRng::seed_from_u64(base_seed.wrapping_add(batch_idx));
                let trials = batch.min(n - batch_idx * batch);
                let mut survived = vec![0u64; paths.len()];
                let mut winners = vec![TeamMask::empty(); n_weeks];

                for _ in 0..trials {
                    for (week_idx, slot) in winners.iter_mut().enumerate() {
                        *slot = self.draw_week(week_idx, &mut rng);
                    }
                    for (count, path) in survived.iter_mut().zip(paths) {
                        let Some(path) = path else { continue };
                        if path.iter().all(|&(w, team)| winners[w].contains(team)) {
                            *count += 1;
                        }
                    }
                }
                survived
            })
            .reduce(
                || vec![0u64; paths.len()],
                |mut acc, batch| {
                    for (a, b) in acc.iter_mut().zip(batch) {
                        *a += b;
                    }
                    acc
                },
            )
    }
}
