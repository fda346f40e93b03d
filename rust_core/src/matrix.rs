//! Week × team win-probability matrix.
//!
//! Built once per computation from a schedule and a provider. This is the only
//! place where the missing-probability policy is applied, so the simulator, the
//! optimizers and the scarcity analyzer always agree on every cell.

use crate::config::{EngineConfig, MissingProbabilityPolicy};
use crate::error::{check_probability, Result, SurvivorError};
use crate::models::{FlaggedCell, Schedule, MAX_WEEK};
use crate::teams::is_known_team;
use crate::win_prob::WinProbabilityProvider;
use rustc_hash::FxHashMap;
use tracing::warn;

/// Upper bound on distinct teams in one season's matrix.
pub const MAX_TEAMS: usize = 64;

/// Set of team indices.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TeamMask(u64);

impl TeamMask {
    pub fn empty() -> Self {
        Self(0)
    }

    #[inline]
    pub fn contains(&self, team: usize) -> bool {
        self.0 & (1u64 << team) != 0
    }

    #[inline]
    pub fn with(self, team: usize) -> Self {
        Self(self.0 | (1u64 << team))
    }

    pub fn count(&self) -> u32 {
        self.0.count_ones()
    }
}

/// Realized or modeled state of one game.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FixtureState {
    Open { home_win_prob: f64 },
    Decided { home_won: bool, away_won: bool },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fixture {
    pub home: usize,
    pub away: usize,
    pub state: FixtureState,
}

/// What one team faces in one week.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Slot {
    Bye,
    Open {
        fixture: usize,
        opponent: usize,
        is_home: bool,
        win_prob: f64,
    },
    Decided {
        fixture: usize,
        opponent: usize,
        is_home: bool,
        won: bool,
    },
}

impl Slot {
    /// Probability this team's pick survives the week. A decided game counts
    /// as certain survival (won) or certain elimination (lost).
    pub fn win_prob(&self) -> Option<f64> {
        match *self {
            Slot::Bye => None,
            Slot::Open { win_prob, .. } => Some(win_prob),
            Slot::Decided { won, .. } => Some(if won { 1.0 } else { 0.0 }),
        }
    }

    pub fn is_playing(&self) -> bool {
        !matches!(self, Slot::Bye)
    }

    pub fn opponent(&self) -> Option<usize> {
        match *self {
            Slot::Bye => None,
            Slot::Open { opponent, .. } | Slot::Decided { opponent, .. } => Some(opponent),
        }
    }

    pub fn is_home(&self) -> Option<bool> {
        match *self {
            Slot::Bye => None,
            Slot::Open { is_home, .. } | Slot::Decided { is_home, .. } => Some(is_home),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WinMatrix {
    season: u16,
    from_week: u8,
    weeks: Vec<u8>,
    teams: Vec<String>,
    index: FxHashMap<String, usize>,
    /// [week][team]
    slots: Vec<Vec<Slot>>,
    /// [week][fixture]
    fixtures: Vec<Vec<Fixture>>,
    flagged: Vec<FlaggedCell>,
}

impl WinMatrix {
    /// Build the matrix for weeks `from_week..=horizon` (horizon defaults to the
    /// configured horizon, then the season's last week). Weeks with no games in
    /// that range are skipped.
    pub fn build(
        schedule: &Schedule,
        provider: &dyn WinProbabilityProvider,
        from_week: u8,
        horizon: Option<u8>,
        config: &EngineConfig,
    ) -> Result<Self> {
        if from_week == 0 || from_week > MAX_WEEK {
            return Err(SurvivorError::invalid(format!(
                "week {} outside 1..={}",
                from_week, MAX_WEEK
            )));
        }
        let horizon = match horizon.or(config.horizon) {
            Some(h) if h < from_week => {
                return Err(SurvivorError::invalid(format!(
                    "horizon {} precedes week {}",
                    h, from_week
                )))
            }
            Some(h) if h > MAX_WEEK => {
                return Err(SurvivorError::invalid(format!(
                    "horizon {} outside 1..={}",
                    h, MAX_WEEK
                )))
            }
            Some(h) => h,
            None => schedule.last_week().unwrap_or(from_week).max(from_week),
        };

        let teams: Vec<String> = schedule.teams().into_iter().collect();
        if teams.len() > MAX_TEAMS {
            return Err(SurvivorError::invalid(format!(
                "{} teams exceeds the supported {}",
                teams.len(),
                MAX_TEAMS
            )));
        }
        if config.strict_team_codes {
            if let Some(unknown) = teams.iter().find(|t| !is_known_team(t)) {
                return Err(SurvivorError::invalid(format!("unknown team code {}", unknown)));
            }
        }
        let index: FxHashMap<String, usize> = teams
            .iter()
            .enumerate()
            .map(|(i, t)| (t.clone(), i))
            .collect();

        let mut weeks = Vec::new();
        let mut slots = Vec::new();
        let mut fixtures = Vec::new();
        let mut flagged = Vec::new();

        for week in schedule.weeks().filter(|w| (from_week..=horizon).contains(w)) {
            let mut week_slots = vec![Slot::Bye; teams.len()];
            let mut week_fixtures = Vec::new();

            for game in schedule.games_in_week(week) {
                // schedule.teams() indexed every code above
                let home = index[&game.home_team];
                let away = index[&game.away_team];
                let fixture = week_fixtures.len();

                let state = if let Some(home_won) = game.won_by(&game.home_team) {
                    let away_won = game.won_by(&game.away_team).unwrap_or(false);
                    FixtureState::Decided { home_won, away_won }
                } else {
                    let home_win_prob = match provider.win_probabilities(game)? {
                        Some((h, a)) => {
                            let what = format!("{}@{} week {}", game.away_team, game.home_team, week);
                            let h = check_probability(h, &what)?;
                            let a = check_probability(a, &what)?;
                            if (h + a - 1.0).abs() > config.probability_tolerance {
                                return Err(SurvivorError::internal(format!(
                                    "{} provider {} returned {:.6} + {:.6} != 1",
                                    what,
                                    provider.provider_name(),
                                    h,
                                    a
                                )));
                            }
                            h
                        }
                        None => match config.missing_probability {
                            MissingProbabilityPolicy::FailFast => {
                                return Err(SurvivorError::InsufficientData {
                                    week,
                                    team: game.home_team.clone(),
                                })
                            }
                            MissingProbabilityPolicy::AssumeCoinFlip => {
                                warn!(
                                    "No win probability for {}@{} week {}, assuming 0.5",
                                    game.away_team, game.home_team, week
                                );
                                for team in [&game.home_team, &game.away_team] {
                                    flagged.push(FlaggedCell {
                                        week,
                                        team: team.clone(),
                                    });
                                }
                                0.5
                            }
                        },
                    };
                    FixtureState::Open { home_win_prob }
                };

                match state {
                    FixtureState::Open { home_win_prob } => {
                        week_slots[home] = Slot::Open {
                            fixture,
                            opponent: away,
                            is_home: true,
                            win_prob: home_win_prob,
                        };
                        week_slots[away] = Slot::Open {
                            fixture,
                            opponent: home,
                            is_home: false,
                            win_prob: 1.0 - home_win_prob,
                        };
                    }
                    FixtureState::Decided { home_won, away_won } => {
                        week_slots[home] = Slot::Decided {
                            fixture,
                            opponent: away,
                            is_home: true,
                            won: home_won,
                        };
                        week_slots[away] = Slot::Decided {
                            fixture,
                            opponent: home,
                            is_home: false,
                            won: away_won,
                        };
                    }
                }
                week_fixtures.push(Fixture { home, away, state });
            }

            weeks.push(week);
            slots.push(week_slots);
            fixtures.push(week_fixtures);
        }

        flagged.sort();
        Ok(Self {
            season: schedule.season(),
            from_week,
            weeks,
            teams,
            index,
            slots,
            fixtures,
            flagged,
        })
    }

    pub fn season(&self) -> u16 {
        self.season
    }

    /// Week the matrix was requested from. It may have no games itself.
    pub fn from_week(&self) -> u8 {
        self.from_week
    }

    pub fn is_empty(&self) -> bool {
        self.weeks.is_empty()
    }

    /// True when the requested week itself has games.
    pub fn starts_on_from_week(&self) -> bool {
        self.weeks.first() == Some(&self.from_week)
    }

    pub fn weeks(&self) -> &[u8] {
        &self.weeks
    }

    pub fn week_index(&self, week: u8) -> Option<usize> {
        self.weeks.iter().position(|w| *w == week)
    }

    pub fn n_teams(&self) -> usize {
        self.teams.len()
    }

    pub fn team_code(&self, team: usize) -> &str {
        &self.teams[team]
    }

    pub fn team_index(&self, code: &str) -> Option<usize> {
        self.index.get(code).copied()
    }

    pub fn slot(&self, week_idx: usize, team: usize) -> Slot {
        self.slots[week_idx][team]
    }

    pub fn fixtures(&self, week_idx: usize) -> &[Fixture] {
        &self.fixtures[week_idx]
    }

    pub fn flagged(&self) -> &[FlaggedCell] {
        &self.flagged
    }

    /// Mask for a set of team codes; unknown codes are rejected.
    pub fn mask_of<'a, I>(&self, codes: I) -> Result<TeamMask>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut mask = TeamMask::empty();
        for code in codes {
            let team = self
                .team_index(code)
                .ok_or_else(|| SurvivorError::invalid(format!("unknown team code {}", code)))?;
            mask = mask.with(team);
        }
        Ok(mask)
    }

    /// Highest win probability among teams playing in the week and not in
    /// `used`. Ties go to the lower index, i.e. the lexicographically smaller
    /// code.
    pub fn best_available(&self, week_idx: usize, used: TeamMask) -> Option<(usize, f64)> {
        let mut best: Option<(usize, f64)> = None;
        for (team, slot) in self.slots[week_idx].iter().enumerate() {
            if used.contains(team) {
                continue;
            }
            if let Some(p) = slot.win_prob() {
                if best.map_or(true, |(_, b)| p > b) {
                    best = Some((team, p));
                }
            }
        }
        best
    }
}
