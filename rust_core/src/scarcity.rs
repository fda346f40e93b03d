//! Scarcity of high-confidence teams in future weeks.
//!
//! This module provides:
//! - Per-week counts of strong teams still available to an entry
//! - Scarcity levels and the list of critical weeks
//! - A team × week outlook of win probabilities

use crate::matrix::{TeamMask, WinMatrix};
use crate::models::FlaggedCell;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Win probability at or above which a team counts as a strong pick.
pub const STRONG_WIN_PROB: f64 = 0.65;

/// Counts at or below this are critical.
pub const CRITICAL_MAX_TEAMS: usize = 2;

/// Counts at or below this (and above critical) are tight.
pub const TIGHT_MAX_TEAMS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScarcityLevel {
    Critical,
    Tight,
    Comfortable,
}

impl ScarcityLevel {
    pub fn from_count(count: usize) -> Self {
        if count <= CRITICAL_MAX_TEAMS {
            ScarcityLevel::Critical
        } else if count <= TIGHT_MAX_TEAMS {
            ScarcityLevel::Tight
        } else {
            ScarcityLevel::Comfortable
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekScarcity {
    pub week: u8,
    pub count: usize,
    pub level: ScarcityLevel,
    pub strong_teams: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScarcityReport {
    pub season: u16,
    pub week: u8,
    pub weeks: Vec<WeekScarcity>,
    pub critical_weeks: Vec<u8>,
    pub flagged: Vec<FlaggedCell>,
}

impl ScarcityReport {
    pub fn counts(&self) -> BTreeMap<u8, usize> {
        self.weeks.iter().map(|w| (w.week, w.count)).collect()
    }

    pub fn count_for(&self, week: u8) -> Option<usize> {
        self.weeks.iter().find(|w| w.week == week).map(|w| w.count)
    }
}

fn strong_teams(matrix: &WinMatrix, week_idx: usize, used: TeamMask) -> Vec<usize> {
    (0..matrix.n_teams())
        .filter(|&team| !used.contains(team))
        .filter(|&team| {
            matrix
                .slot(week_idx, team)
                .win_prob()
                .is_some_and(|p| p >= STRONG_WIN_PROB)
        })
        .collect()
}

/// Week → number of teams not on bye, not in `used`, with win probability of
/// at least [`STRONG_WIN_PROB`].
pub fn scarcity(matrix: &WinMatrix, used: TeamMask) -> BTreeMap<u8, usize> {
    matrix
        .weeks()
        .iter()
        .enumerate()
        .map(|(idx, &week)| (week, strong_teams(matrix, idx, used).len()))
        .collect()
}

pub fn scarcity_report(matrix: &WinMatrix, used: TeamMask) -> ScarcityReport {
    let weeks: Vec<WeekScarcity> = matrix
        .weeks()
        .iter()
        .enumerate()
        .map(|(idx, &week)| {
            let strong: Vec<String> = strong_teams(matrix, idx, used)
                .into_iter()
                .map(|team| matrix.team_code(team).to_string())
                .collect();
            WeekScarcity {
                week,
                count: strong.len(),
                level: ScarcityLevel::from_count(strong.len()),
                strong_teams: strong,
            }
        })
        .collect();

    let critical_weeks = weeks
        .iter()
        .filter(|w| w.level == ScarcityLevel::Critical)
        .map(|w| w.week)
        .collect();

    ScarcityReport {
        season: matrix.season(),
        week: matrix.from_week(),
        weeks,
        critical_weeks,
        flagged: matrix.flagged().to_vec(),
    }
}

/// Team → week → win probability over the matrix range. Bye weeks are
/// omitted; teams in `used` are left out entirely.
pub fn team_outlook(matrix: &WinMatrix, used: TeamMask) -> BTreeMap<String, BTreeMap<u8, f64>> {
    let mut outlook = BTreeMap::new();
    for team in (0..matrix.n_teams()).filter(|&t| !used.contains(t)) {
        let row: BTreeMap<u8, f64> = matrix
            .weeks()
            .iter()
            .enumerate()
            .filter_map(|(idx, &week)| matrix.slot(idx, team).win_prob().map(|p| (week, p)))
            .collect();
        outlook.insert(matrix.team_code(team).to_string(), row);
    }
    outlook
}
