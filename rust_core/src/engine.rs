//! Survivor pool engine: the entry point callers use.
//!
//! Owns the season schedule, the probability provider, the entry ledger and
//! the configuration. Every computation builds one [`WinMatrix`] and reads one
//! snapshot of the entries it needs.

use crate::config::EngineConfig;
use crate::error::{Result, SurvivorError};
use crate::ledger::EntryLedger;
use crate::matrix::{TeamMask, WinMatrix};
use crate::models::{
    Entry, NoPickReason, Pick, PickAdvice, Schedule, SimulationResult, TeamScheduleView,
};
use crate::optimizer::BeamSearch;
use crate::portfolio::PortfolioOptimizer;
use crate::scarcity::{scarcity_report, team_outlook, ScarcityReport};
use crate::simulator::{CandidatePolicy, SurvivalSimulator};
use crate::win_prob::WinProbabilityProvider;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{info, warn};

pub struct SurvivorEngine {
    schedule: Arc<Schedule>,
    provider: Arc<dyn WinProbabilityProvider>,
    ledger: EntryLedger,
    config: EngineConfig,
}

impl SurvivorEngine {
    pub fn new(
        schedule: Arc<Schedule>,
        provider: Arc<dyn WinProbabilityProvider>,
        config: EngineConfig,
    ) -> Result<Self> {
        config.validate()?;
        info!(
            "Survivor engine: season {}, {} weeks, provider {}",
            schedule.season(),
            schedule.weeks().count(),
            provider.provider_name()
        );
        Ok(Self {
            schedule,
            provider,
            ledger: EntryLedger::new(),
            config,
        })
    }

    /// Replace the ledger with existing entries.
    pub fn with_entries(mut self, entries: Vec<Entry>) -> Result<Self> {
        if let Some(other) = entries.iter().find(|e| e.season != self.schedule.season()) {
            return Err(SurvivorError::invalid(format!(
                "entry {} is for season {}, schedule is {}",
                other.entry_id,
                other.season,
                self.schedule.season()
            )));
        }
        self.ledger = EntryLedger::from_entries(entries)?;
        Ok(self)
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    pub fn ledger(&self) -> &EntryLedger {
        &self.ledger
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn matrix(&self, week: u8) -> Result<WinMatrix> {
        WinMatrix::build(&self.schedule, self.provider.as_ref(), week, None, &self.config)
    }

    fn used_mask(&self, matrix: &WinMatrix, entry_id: Option<u64>) -> Result<TeamMask> {
        match entry_id {
            Some(id) => matrix.mask_of(self.ledger.require(id)?.used_teams()),
            None => Ok(TeamMask::empty()),
        }
    }

    /// Best pick for one entry in `week` plus its planned path.
    pub fn get_recommendation(&self, entry_id: u64, week: u8) -> Result<PickAdvice> {
        let entry = self.ledger.require(entry_id)?;
        if !entry.is_alive {
            return Ok(PickAdvice::NoRecommendation {
                entry_id,
                week,
                reason: NoPickReason::EntryEliminated,
            });
        }
        let matrix = self.matrix(week)?;
        let used = matrix.mask_of(entry.used_teams())?;
        Ok(BeamSearch::new(&matrix, self.config.beam_width)?.recommend(entry_id, used, &[]))
    }

    /// Diversified picks for several entries, ordered by entry id.
    pub fn get_portfolio_recommendations(&self, entry_ids: &[u64], week: u8) -> Result<Vec<PickAdvice>> {
        let ids: BTreeSet<u64> = entry_ids.iter().copied().collect();
        let entries = ids
            .into_iter()
            .map(|id| self.ledger.require(id))
            .collect::<Result<Vec<_>>>()?;
        let matrix = self.matrix(week)?;
        PortfolioOptimizer::new(&matrix, self.config.beam_width, self.config.diversification_factor)?
            .recommend(&entries)
    }

    /// Monte Carlo survival of every available team in `week` under greedy
    /// continuation. Teams the entry already used are not candidates.
    pub fn run_simulation(
        &self,
        week: u8,
        n_simulations: u32,
        entry_id: Option<u64>,
    ) -> Result<SimulationResult> {
        if n_simulations == 0 {
            return Err(SurvivorError::invalid("n_simulations must be positive"));
        }
        let matrix = self.matrix(week)?;
        let used = self.used_mask(&matrix, entry_id)?;
        let result = SurvivalSimulator::new(&matrix, &self.config)
            .with_simulations(n_simulations)
            .simulate(used, CandidatePolicy::GreedyContinuation)?;
        if !result.flagged.is_empty() {
            warn!(
                "Simulation for week {} used {} coin-flip cells",
                week,
                result.flagged.len()
            );
        }
        Ok(result)
    }

    /// Survival probability of a fixed week → team path.
    pub fn simulate_strategy(&self, strategy: &BTreeMap<u8, String>, n_simulations: u32) -> Result<f64> {
        let Some(&first) = strategy.keys().next() else {
            return Err(SurvivorError::invalid("empty strategy"));
        };
        let matrix = self.matrix(first)?;
        SurvivalSimulator::new(&matrix, &self.config)
            .with_simulations(n_simulations)
            .simulate_path(strategy)
    }

    pub fn get_scarcity(&self, week: u8, entry_id: Option<u64>) -> Result<ScarcityReport> {
        let matrix = self.matrix(week)?;
        let used = self.used_mask(&matrix, entry_id)?;
        Ok(scarcity_report(&matrix, used))
    }

    /// Team → week → win probability from `week` to the horizon.
    pub fn team_outlook(
        &self,
        week: u8,
        entry_id: Option<u64>,
    ) -> Result<BTreeMap<String, BTreeMap<u8, f64>>> {
        let matrix = self.matrix(week)?;
        let used = self.used_mask(&matrix, entry_id)?;
        Ok(team_outlook(&matrix, used))
    }

    /// One team's season with provider probabilities for unplayed games.
    pub fn team_schedule(&self, team: &str) -> Result<TeamScheduleView> {
        if !self.schedule.teams().contains(team) {
            return Err(SurvivorError::invalid(format!("unknown team code {}", team)));
        }
        let mut games = self
            .schedule
            .team_schedule(team, self.config.probability_tolerance)?;
        for row in games.iter_mut().filter(|g| !g.is_played) {
            let Some(game) = self.schedule.game_for(team, row.week) else {
                continue;
            };
            row.win_prob = self
                .provider
                .win_probabilities(game)?
                .map(|(home, away)| if row.is_home { home } else { away });
        }
        Ok(TeamScheduleView {
            team: team.to_string(),
            season: self.schedule.season(),
            games,
            used_by_entries: self.ledger.entries_using(team),
        })
    }

    /// Submit a pick, recording the model probability and whether it matches
    /// the current recommendation.
    pub fn submit_pick(&self, entry_id: u64, week: u8, team: &str) -> Result<Pick> {
        let game = self.schedule.game_for(team, week).ok_or_else(|| {
            SurvivorError::invalid(format!("{} has no game in week {}", team, week))
        })?;
        let win_prob = self
            .provider
            .win_probabilities(game)?
            .map(|(home, away)| if game.home_team == team { home } else { away });
        let is_recommended = match self.get_recommendation(entry_id, week) {
            Ok(advice) => advice.team() == Some(team),
            Err(SurvivorError::InsufficientData { .. }) => false,
            Err(e) => return Err(e),
        };
        self.ledger
            .submit_pick(&self.schedule, entry_id, week, team, win_prob, is_recommended)
    }

    /// Settle `week` from the schedule's final scores.
    pub fn resolve_week(&self, week: u8) -> Result<Vec<u64>> {
        self.ledger.resolve_week(&self.schedule, week)
    }
}
