// Shared models for the survivor engine
use crate::error::{check_probability, Result, SurvivorError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Highest week number accepted (regular season plus postseason rounds).
pub const MAX_WEEK: u8 = 22;

// ============================================================================
// Games & Schedule
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameOutcome {
    HomeWon,
    AwayWon,
    /// Neither side won; a tie eliminates entries that picked either team
    Tie,
    #[default]
    Unresolved,
}

/// One matchup. Owned by the data collaborator; read-only to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    pub season: u16,
    pub week: u8,
    pub home_team: String,
    pub away_team: String,
    #[serde(default)]
    pub home_score: Option<u16>,
    #[serde(default)]
    pub away_score: Option<u16>,
    #[serde(default)]
    pub outcome: GameOutcome,
    #[serde(default)]
    pub home_win_prob: Option<f64>,
    #[serde(default)]
    pub away_win_prob: Option<f64>,
    #[serde(default)]
    pub is_neutral: bool,
}

impl Game {
    /// Unresolved game with a modeled home-win probability.
    pub fn new(season: u16, week: u8, home_team: &str, away_team: &str, home_win_prob: f64) -> Self {
        Self {
            season,
            week,
            home_team: home_team.to_string(),
            away_team: away_team.to_string(),
            home_score: None,
            away_score: None,
            outcome: GameOutcome::Unresolved,
            home_win_prob: Some(home_win_prob),
            away_win_prob: Some(1.0 - home_win_prob),
            is_neutral: false,
        }
    }

    /// Unresolved game with no probability yet (model not run for this week).
    pub fn unpriced(season: u16, week: u8, home_team: &str, away_team: &str) -> Self {
        Self {
            home_win_prob: None,
            away_win_prob: None,
            ..Self::new(season, week, home_team, away_team, 0.5)
        }
    }

    /// Mark the game final, deriving the outcome from the score.
    pub fn with_final_score(mut self, home_score: u16, away_score: u16) -> Self {
        self.home_score = Some(home_score);
        self.away_score = Some(away_score);
        self.outcome = match home_score.cmp(&away_score) {
            std::cmp::Ordering::Greater => GameOutcome::HomeWon,
            std::cmp::Ordering::Less => GameOutcome::AwayWon,
            std::cmp::Ordering::Equal => GameOutcome::Tie,
        };
        self
    }

    pub fn with_outcome(mut self, outcome: GameOutcome) -> Self {
        self.outcome = outcome;
        self
    }

    pub fn involves(&self, team: &str) -> bool {
        self.home_team == team || self.away_team == team
    }

    pub fn is_home(&self, team: &str) -> Option<bool> {
        if self.home_team == team {
            Some(true)
        } else if self.away_team == team {
            Some(false)
        } else {
            None
        }
    }

    pub fn opponent_of(&self, team: &str) -> Option<&str> {
        match self.is_home(team)? {
            true => Some(&self.away_team),
            false => Some(&self.home_team),
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.outcome != GameOutcome::Unresolved
    }

    /// Realized result for `team`, if the game is final and the team played.
    pub fn won_by(&self, team: &str) -> Option<bool> {
        let is_home = self.is_home(team)?;
        match self.outcome {
            GameOutcome::HomeWon => Some(is_home),
            GameOutcome::AwayWon => Some(!is_home),
            GameOutcome::Tie => Some(false),
            GameOutcome::Unresolved => None,
        }
    }

    /// Stored (home, away) probabilities. A missing side is derived as the
    /// complement; both present must sum to 1 within `tolerance`.
    pub fn probabilities(&self, tolerance: f64) -> Result<Option<(f64, f64)>> {
        let what = format!("{}@{} week {}", self.away_team, self.home_team, self.week);
        match (self.home_win_prob, self.away_win_prob) {
            (None, None) => Ok(None),
            (Some(home), None) => {
                let home = check_probability(home, &what)?;
                Ok(Some((home, 1.0 - home)))
            }
            (None, Some(away)) => {
                let away = check_probability(away, &what)?;
                Ok(Some((1.0 - away, away)))
            }
            (Some(home), Some(away)) => {
                let home = check_probability(home, &what)?;
                let away = check_probability(away, &what)?;
                if (home + away - 1.0).abs() > tolerance {
                    return Err(SurvivorError::invalid(format!(
                        "{} probabilities {:.6} + {:.6} do not sum to 1",
                        what, home, away
                    )));
                }
                Ok(Some((home, away)))
            }
        }
    }

    pub fn win_prob_for(&self, team: &str, tolerance: f64) -> Result<Option<f64>> {
        let Some(is_home) = self.is_home(team) else {
            return Ok(None);
        };
        Ok(self
            .probabilities(tolerance)?
            .map(|(home, away)| if is_home { home } else { away }))
    }
}

/// One season of games, ordered by week.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Schedule {
    season: u16,
    weeks: BTreeMap<u8, Vec<Game>>,
}

impl Schedule {
    /// Build a schedule, enforcing: one season, weeks in 1..=MAX_WEEK, distinct
    /// opponents, and each team at most once per week.
    pub fn new(season: u16, games: Vec<Game>) -> Result<Self> {
        let mut weeks: BTreeMap<u8, Vec<Game>> = BTreeMap::new();
        let mut seen: BTreeSet<(u8, String)> = BTreeSet::new();

        for game in games {
            if game.season != season {
                return Err(SurvivorError::invalid(format!(
                    "game {}@{} belongs to season {}, schedule is {}",
                    game.away_team, game.home_team, game.season, season
                )));
            }
            if game.week == 0 || game.week > MAX_WEEK {
                return Err(SurvivorError::invalid(format!(
                    "week {} outside 1..={}",
                    game.week, MAX_WEEK
                )));
            }
            if game.home_team.is_empty() || game.away_team.is_empty() {
                return Err(SurvivorError::invalid("empty team code"));
            }
            if game.home_team == game.away_team {
                return Err(SurvivorError::invalid(format!(
                    "{} cannot play itself in week {}",
                    game.home_team, game.week
                )));
            }
            for team in [&game.home_team, &game.away_team] {
                if !seen.insert((game.week, team.clone())) {
                    return Err(SurvivorError::invalid(format!(
                        "{} scheduled twice in week {}",
                        team, game.week
                    )));
                }
            }
            weeks.entry(game.week).or_default().push(game);
        }

        Ok(Self { season, weeks })
    }

    pub fn season(&self) -> u16 {
        self.season
    }

    pub fn is_empty(&self) -> bool {
        self.weeks.is_empty()
    }

    pub fn weeks(&self) -> impl Iterator<Item = u8> + '_ {
        self.weeks.keys().copied()
    }

    pub fn last_week(&self) -> Option<u8> {
        self.weeks.keys().next_back().copied()
    }

    pub fn games_in_week(&self, week: u8) -> &[Game] {
        self.weeks.get(&week).map(|g| g.as_slice()).unwrap_or(&[])
    }

    pub fn games(&self) -> impl Iterator<Item = &Game> {
        self.weeks.values().flatten()
    }

    /// Whether anything is left to play at or after `week`.
    pub fn has_games_from(&self, week: u8) -> bool {
        self.weeks.range(week..).next().is_some()
    }

    /// Every team that appears anywhere in the season.
    pub fn teams(&self) -> BTreeSet<String> {
        self.games()
            .flat_map(|g| [g.home_team.clone(), g.away_team.clone()])
            .collect()
    }

    pub fn game_for(&self, team: &str, week: u8) -> Option<&Game> {
        self.games_in_week(week).iter().find(|g| g.involves(team))
    }

    pub fn is_bye(&self, team: &str, week: u8) -> bool {
        self.game_for(team, week).is_none()
    }

    /// Rebuild with every game passed through `f`. Used to annotate
    /// probabilities without mutating `self`.
    pub fn map_games<F>(&self, mut f: F) -> Result<Self>
    where
        F: FnMut(&Game) -> Result<Game>,
    {
        let games = self.games().map(|g| f(g)).collect::<Result<Vec<_>>>()?;
        Self::new(self.season, games)
    }

    /// One team's season, week by week.
    pub fn team_schedule(&self, team: &str, tolerance: f64) -> Result<Vec<TeamGame>> {
        let mut rows = Vec::new();
        for game in self.games().filter(|g| g.involves(team)) {
            let is_home = game.home_team == team;
            rows.push(TeamGame {
                week: game.week,
                opponent: game.opponent_of(team).unwrap_or_default().to_string(),
                is_home,
                win_prob: game.win_prob_for(team, tolerance)?,
                is_played: game.is_resolved(),
                won: game.won_by(team),
            });
        }
        Ok(rows)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamGame {
    pub week: u8,
    pub opponent: String,
    pub is_home: bool,
    pub win_prob: Option<f64>,
    pub is_played: bool,
    pub won: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamScheduleView {
    pub team: String,
    pub season: u16,
    pub games: Vec<TeamGame>,
    pub used_by_entries: Vec<u64>,
}

// ============================================================================
// Entries & Picks
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryPick {
    pub week: u8,
    pub team: String,
}

/// A participant's pool submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub entry_id: u64,
    pub name: String,
    pub season: u16,
    #[serde(default = "default_alive")]
    pub is_alive: bool,
    #[serde(default)]
    pub eliminated_week: Option<u8>,
    /// Pick order; each team and each week at most once
    #[serde(default)]
    pub picks: Vec<EntryPick>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

fn default_alive() -> bool {
    true
}

impl Entry {
    pub fn new(entry_id: u64, name: &str, season: u16) -> Self {
        Self {
            entry_id,
            name: name.to_string(),
            season,
            is_alive: true,
            eliminated_week: None,
            picks: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Teams already used, in pick order.
    pub fn used_teams(&self) -> Vec<&str> {
        self.picks.iter().map(|p| p.team.as_str()).collect()
    }

    pub fn has_used(&self, team: &str) -> bool {
        self.picks.iter().any(|p| p.team == team)
    }

    pub fn pick_for_week(&self, week: u8) -> Option<&str> {
        self.picks
            .iter()
            .find(|p| p.week == week)
            .map(|p| p.team.as_str())
    }

    /// Append a pick, enforcing the entry invariants.
    pub fn record_pick(&mut self, week: u8, team: &str) -> Result<()> {
        if !self.is_alive {
            return Err(SurvivorError::invalid(format!(
                "entry {} was eliminated in week {}",
                self.entry_id,
                self.eliminated_week.unwrap_or_default()
            )));
        }
        if let Some(existing) = self.pick_for_week(week) {
            return Err(SurvivorError::invalid(format!(
                "entry {} already picked {} for week {}",
                self.entry_id, existing, week
            )));
        }
        if let Some(prior) = self.picks.iter().find(|p| p.team == team) {
            return Err(SurvivorError::invalid(format!(
                "{} already used by entry {} (week {})",
                team, self.entry_id, prior.week
            )));
        }
        self.picks.push(EntryPick {
            week,
            team: team.to_string(),
        });
        Ok(())
    }

    pub fn eliminate(&mut self, week: u8) {
        if self.is_alive {
            self.is_alive = false;
            self.eliminated_week = Some(week);
        }
    }

    /// Check an entry handed in from outside (e.g. deserialized).
    pub fn validate(&self) -> Result<()> {
        let mut teams = BTreeSet::new();
        let mut weeks = BTreeSet::new();
        for pick in &self.picks {
            if !teams.insert(pick.team.as_str()) {
                return Err(SurvivorError::invalid(format!(
                    "entry {} uses {} more than once",
                    self.entry_id, pick.team
                )));
            }
            if !weeks.insert(pick.week) {
                return Err(SurvivorError::invalid(format!(
                    "entry {} has two picks in week {}",
                    self.entry_id, pick.week
                )));
            }
        }
        if self.is_alive && self.eliminated_week.is_some() {
            return Err(SurvivorError::invalid(format!(
                "entry {} is alive but has an eliminated week",
                self.entry_id
            )));
        }
        Ok(())
    }
}

/// One entry's selection for one week. Append-only; the outcome is set once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pick {
    pub entry_id: u64,
    pub team: String,
    pub season: u16,
    pub week: u8,
    pub win_prob: Option<f64>,
    pub is_recommended: bool,
    pub outcome: Option<bool>,
    pub submitted_at: DateTime<Utc>,
}

impl Pick {
    pub fn set_outcome(&mut self, won: bool) -> Result<()> {
        if self.outcome.is_some() {
            return Err(SurvivorError::invalid(format!(
                "pick of {} for entry {} week {} already resolved",
                self.team, self.entry_id, self.week
            )));
        }
        self.outcome = Some(won);
        Ok(())
    }
}

// ============================================================================
// Engine Output
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub entry_id: u64,
    pub week: u8,
    pub team: String,
    /// Model probability that `team` wins this week
    pub win_prob: f64,
    /// Probability the search actually used (after portfolio penalties)
    pub effective_win_prob: f64,
    /// Probability the planned path survives through the horizon
    pub survival_prob: f64,
    /// Share of the other entries whose pick this week differs
    pub portfolio_coverage: f64,
    /// Planned team per week, starting with this week's pick
    pub strategy: BTreeMap<u8, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoPickReason {
    EntryEliminated,
    AllTeamsUsed,
    AllRemainingOnBye,
    NoGamesScheduled,
}

impl NoPickReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            NoPickReason::EntryEliminated => "entry eliminated",
            NoPickReason::AllTeamsUsed => "all teams used",
            NoPickReason::AllRemainingOnBye => "all remaining teams on bye",
            NoPickReason::NoGamesScheduled => "no games scheduled",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PickAdvice {
    Pick(Recommendation),
    NoRecommendation {
        entry_id: u64,
        week: u8,
        reason: NoPickReason,
    },
}

impl PickAdvice {
    pub fn entry_id(&self) -> u64 {
        match self {
            PickAdvice::Pick(rec) => rec.entry_id,
            PickAdvice::NoRecommendation { entry_id, .. } => *entry_id,
        }
    }

    pub fn recommendation(&self) -> Option<&Recommendation> {
        match self {
            PickAdvice::Pick(rec) => Some(rec),
            PickAdvice::NoRecommendation { .. } => None,
        }
    }

    pub fn team(&self) -> Option<&str> {
        self.recommendation().map(|r| r.team.as_str())
    }
}

/// A week/team cell whose missing probability was filled with 0.5.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FlaggedCell {
    pub week: u8,
    pub team: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamSurvival {
    pub team: String,
    pub win_prob: f64,
    pub survival_prob: f64,
    pub opponent: String,
    pub is_home: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub season: u16,
    pub week: u8,
    pub n_simulations: u32,
    /// Ranked by survival, then win probability, then team code
    pub teams: Vec<TeamSurvival>,
    pub scarcity_by_week: BTreeMap<u8, usize>,
    pub flagged: Vec<FlaggedCell>,
}

impl SimulationResult {
    pub fn empty(season: u16, week: u8, n_simulations: u32) -> Self {
        Self {
            season,
            week,
            n_simulations,
            teams: Vec::new(),
            scarcity_by_week: BTreeMap::new(),
            flagged: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.teams.is_empty()
    }

    pub fn survival_of(&self, team: &str) -> Option<f64> {
        self.teams
            .iter()
            .find(|t| t.team == team)
            .map(|t| t.survival_prob)
    }
}
