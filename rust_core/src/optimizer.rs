//! Single-entry pick optimizer.
//!
//! Beam search over pick sequences scored by chained log win probability.
//! States carry the full used-team mask (history included) so no team is
//! ever picked twice and bye weeks are never filled.

use crate::error::{Result, SurvivorError};
use crate::matrix::{TeamMask, WinMatrix};
use crate::models::{NoPickReason, PickAdvice, Recommendation};
use rustc_hash::FxHashSet;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::debug;

/// Scores are compared after rounding to this many units per log-point so
/// that float noise cannot reorder equal paths.
const SCORE_QUANTUM: f64 = 1e12;

#[inline]
fn quantize(value: f64) -> i64 {
    (value * SCORE_QUANTUM).round() as i64
}

#[derive(Debug, Clone)]
struct BeamState {
    used: TeamMask,
    /// (week index, team index)
    path: Vec<(usize, usize)>,
    /// Log survival with portfolio penalties applied; drives ranking
    score: f64,
    /// Log survival with model probabilities; what gets reported
    raw_score: f64,
    /// Could not be extended in some week
    stranded: bool,
}

struct Ranked<'m> {
    state: BeamState,
    score: i64,
    lookahead: i64,
    codes: Vec<&'m str>,
}

pub struct BeamSearch<'a> {
    matrix: &'a WinMatrix,
    beam_width: usize,
}

impl<'a> BeamSearch<'a> {
    pub fn new(matrix: &'a WinMatrix, beam_width: usize) -> Result<Self> {
        if beam_width == 0 {
            return Err(SurvivorError::invalid("beam_width must be at least 1"));
        }
        Ok(Self { matrix, beam_width })
    }

    /// Best pick for the matrix's first week plus the planned path to the
    /// horizon. `first_week_multipliers[team]` scales that team's first-week
    /// probability during the search (missing entries mean 1.0).
    pub fn recommend(
        &self,
        entry_id: u64,
        used: TeamMask,
        first_week_multipliers: &[f64],
    ) -> PickAdvice {
        let matrix = self.matrix;
        let week = matrix.from_week();
        let no_pick = |reason| PickAdvice::NoRecommendation {
            entry_id,
            week,
            reason,
        };

        if !matrix.starts_on_from_week() {
            return no_pick(NoPickReason::NoGamesScheduled);
        }
        let eligible = (0..matrix.n_teams())
            .filter(|&t| !used.contains(t) && matrix.slot(0, t).is_playing())
            .count();
        if eligible == 0 {
            let any_unused = (0..matrix.n_teams()).any(|t| !used.contains(t));
            return no_pick(if any_unused {
                NoPickReason::AllRemainingOnBye
            } else {
                NoPickReason::AllTeamsUsed
            });
        }

        let multiplier = |team: usize| first_week_multipliers.get(team).copied().unwrap_or(1.0);

        let mut beam = vec![BeamState {
            used,
            path: Vec::new(),
            score: 0.0,
            raw_score: 0.0,
            stranded: false,
        }];

        for week_idx in 0..matrix.weeks().len() {
            let mut next = Vec::with_capacity(beam.len() * matrix.n_teams());
            for state in &beam {
                if state.stranded {
                    next.push(state.clone());
                    continue;
                }
                let mut extended = false;
                for team in 0..matrix.n_teams() {
                    if state.used.contains(team) {
                        continue;
                    }
                    let Some(p) = matrix.slot(week_idx, team).win_prob() else {
                        continue;
                    };
                    let effective = if week_idx == 0 { p * multiplier(team) } else { p };
                    let mut path = state.path.clone();
                    path.push((week_idx, team));
                    next.push(BeamState {
                        used: state.used.with(team),
                        path,
                        score: state.score + effective.ln(),
                        raw_score: state.raw_score + p.ln(),
                        stranded: false,
                    });
                    extended = true;
                }
                if !extended {
                    next.push(BeamState {
                        stranded: true,
                        ..state.clone()
                    });
                }
            }
            beam = self.prune(week_idx, next);
        }

        // The first week always has an eligible team, so the best state has a pick.
        let Some(best) = beam.into_iter().next() else {
            return no_pick(NoPickReason::AllTeamsUsed);
        };
        let Some(&(_, first)) = best.path.first() else {
            return no_pick(NoPickReason::AllTeamsUsed);
        };

        let win_prob = matrix.slot(0, first).win_prob().unwrap_or(0.0);
        let survival_prob = if best.stranded { 0.0 } else { best.raw_score.exp() };
        let strategy: BTreeMap<u8, String> = best
            .path
            .iter()
            .map(|&(w, t)| (matrix.weeks()[w], matrix.team_code(t).to_string()))
            .collect();

        debug!(
            "Entry {} week {}: {} (p={:.3}, survival={:.4}, {} weeks planned{})",
            entry_id,
            week,
            matrix.team_code(first),
            win_prob,
            survival_prob,
            strategy.len(),
            if best.stranded { ", stranded" } else { "" }
        );

        PickAdvice::Pick(Recommendation {
            entry_id,
            week,
            team: matrix.team_code(first).to_string(),
            win_prob,
            effective_win_prob: win_prob * multiplier(first),
            survival_prob,
            portfolio_coverage: 1.0,
            strategy,
        })
    }

    /// Rank, merge states with identical used sets, keep the best `beam_width`.
    fn prune(&self, week_idx: usize, states: Vec<BeamState>) -> Vec<BeamState> {
        let matrix = self.matrix;
        let next_week = week_idx + 1;
        let mut ranked: Vec<Ranked<'_>> = states
            .into_iter()
            .map(|state| {
                let lookahead = if next_week < matrix.weeks().len() && !state.stranded {
                    matrix
                        .best_available(next_week, state.used)
                        .map_or(0.0, |(_, p)| p)
                } else {
                    0.0
                };
                Ranked {
                    score: quantize(state.score),
                    lookahead: quantize(lookahead),
                    codes: state.path.iter().map(|&(_, t)| matrix.team_code(t)).collect(),
                    state,
                }
            })
            .collect();

        ranked.sort_by(|a, b| Self::compare(a, b));

        let mut seen = FxHashSet::default();
        ranked
            .into_iter()
            .filter(|r| seen.insert(r.state.used))
            .take(self.beam_width)
            .map(|r| r.state)
            .collect()
    }

    fn compare(a: &Ranked<'_>, b: &Ranked<'_>) -> Ordering {
        a.state
            .stranded
            .cmp(&b.state.stranded)
            .then_with(|| b.score.cmp(&a.score))
            .then_with(|| b.lookahead.cmp(&a.lookahead))
            .then_with(|| a.codes.cmp(&b.codes))
    }
}
