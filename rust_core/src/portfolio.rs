//! Multi-entry portfolio recommendations.
//!
//! Entries are searched one at a time in ascending id order. Each pick made
//! for an earlier entry scales that team's current-week probability by the
//! diversification factor for every later entry, which pushes later entries
//! onto different teams when the cost of doing so is small.

use crate::error::{Result, SurvivorError};
use crate::matrix::WinMatrix;
use crate::models::{Entry, NoPickReason, PickAdvice};
use crate::optimizer::BeamSearch;
use rustc_hash::FxHashMap;
use tracing::info;

pub struct PortfolioOptimizer<'a> {
    matrix: &'a WinMatrix,
    beam_width: usize,
    diversification_factor: f64,
}

impl<'a> PortfolioOptimizer<'a> {
    pub fn new(matrix: &'a WinMatrix, beam_width: usize, diversification_factor: f64) -> Result<Self> {
        if !(diversification_factor > 0.0 && diversification_factor <= 1.0) {
            return Err(SurvivorError::invalid(format!(
                "diversification_factor {} must be in (0, 1]",
                diversification_factor
            )));
        }
        if beam_width == 0 {
            return Err(SurvivorError::invalid("beam_width must be at least 1"));
        }
        Ok(Self {
            matrix,
            beam_width,
            diversification_factor,
        })
    }

    /// One advice per entry, ordered by entry id. Eliminated entries get
    /// `EntryEliminated` and take no part in penalties or coverage.
    pub fn recommend(&self, entries: &[Entry]) -> Result<Vec<PickAdvice>> {
        let matrix = self.matrix;
        let search = BeamSearch::new(matrix, self.beam_width)?;

        let mut ordered: Vec<&Entry> = entries.iter().collect();
        ordered.sort_by_key(|e| e.entry_id);

        let mut claims: FxHashMap<usize, i32> = FxHashMap::default();
        let mut advice = Vec::with_capacity(ordered.len());

        for entry in &ordered {
            if !entry.is_alive {
                advice.push(PickAdvice::NoRecommendation {
                    entry_id: entry.entry_id,
                    week: matrix.from_week(),
                    reason: NoPickReason::EntryEliminated,
                });
                continue;
            }
            let used = matrix.mask_of(entry.used_teams())?;
            let multipliers: Vec<f64> = (0..matrix.n_teams())
                .map(|team| {
                    let count = claims.get(&team).copied().unwrap_or(0);
                    self.diversification_factor.powi(count)
                })
                .collect();

            let result = search.recommend(entry.entry_id, used, &multipliers);
            if let Some(team) = result.team().and_then(|code| matrix.team_index(code)) {
                *claims.entry(team).or_insert(0) += 1;
            }
            advice.push(result);
        }

        apply_coverage(&mut advice, &ordered);

        info!(
            "Portfolio week {}: {} entries, {} picks, {} distinct teams",
            matrix.from_week(),
            advice.len(),
            advice.iter().filter(|a| a.team().is_some()).count(),
            claims.len()
        );
        Ok(advice)
    }
}

/// Coverage of an entry = share of the other alive entries that have a pick
/// and picked a different team (1.0 with no other alive entries).
fn apply_coverage(advice: &mut [PickAdvice], entries: &[&Entry]) {
    let alive = entries.iter().filter(|e| e.is_alive).count();
    let teams: Vec<Option<String>> = advice.iter().map(|a| a.team().map(str::to_string)).collect();

    for (i, item) in advice.iter_mut().enumerate() {
        let PickAdvice::Pick(rec) = item else { continue };
        let others = alive.saturating_sub(1);
        rec.portfolio_coverage = if others == 0 {
            1.0
        } else {
            let differing = teams
                .iter()
                .enumerate()
                .filter(|(j, team)| *j != i && team.as_deref().is_some_and(|t| t != rec.team))
                .count();
            differing as f64 / others as f64
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::models::{Game, Schedule};
    use crate::win_prob::ScheduleProbabilities;

    fn matrix() -> WinMatrix {
        let schedule = Schedule::new(
            2024,
            vec![
                Game::new(2024, 1, "KC", "DEN", 0.80),
                Game::new(2024, 1, "BUF", "MIA", 0.78),
                Game::new(2024, 1, "SF", "SEA", 0.60),
            ],
        )
        .unwrap();
        WinMatrix::build(
            &schedule,
            &ScheduleProbabilities::default(),
            1,
            None,
            &EngineConfig::default(),
        )
        .unwrap()
    }

    fn entries(n: u64) -> Vec<Entry> {
        (1..=n).map(|id| Entry::new(id, &format!("Entry {}", id), 2024)).collect()
    }

    /// Share of picks that repeat a team chosen by an earlier entry.
    fn duplicate_fraction(advice: &[PickAdvice]) -> f64 {
        let mut seen = std::collections::HashSet::new();
        let picks: Vec<&str> = advice.iter().filter_map(|a| a.team()).collect();
        let dups = picks.iter().filter(|t| !seen.insert(**t)).count();
        dups as f64 / picks.len() as f64
    }

    #[test]
    fn test_shared_best_team_lowers_coverage() {
        let m = matrix();
        let advice = PortfolioOptimizer::new(&m, 8, 1.0)
            .unwrap()
            .recommend(&entries(2))
            .unwrap();
        let first = advice[0].recommendation().unwrap();
        let second = advice[1].recommendation().unwrap();
        assert_eq!(first.team, "KC");
        assert_eq!(second.team, "KC");
        assert!(second.portfolio_coverage < 1.0);
        assert!(second.effective_win_prob <= first.effective_win_prob);
    }

    #[test]
    fn test_default_factor_diversifies_second_entry() {
        let m = matrix();
        let advice = PortfolioOptimizer::new(&m, 8, 0.95)
            .unwrap()
            .recommend(&entries(2))
            .unwrap();
        assert_eq!(advice[0].team(), Some("KC"));
        assert_eq!(advice[1].team(), Some("BUF"));
        let second = advice[1].recommendation().unwrap();
        assert!((second.win_prob - 0.78).abs() < 1e-12);
        assert_eq!(second.portfolio_coverage, 1.0);
    }

    #[test]
    fn test_lower_factor_never_adds_duplicates() {
        let m = matrix();
        let mut last = f64::INFINITY;
        for factor in [1.0, 0.99, 0.95, 0.8, 0.5, 0.1] {
            let advice = PortfolioOptimizer::new(&m, 8, factor)
                .unwrap()
                .recommend(&entries(3))
                .unwrap();
            let dup = duplicate_fraction(&advice);
            assert!(
                dup <= last,
                "factor {} gave duplicate fraction {} above {}",
                factor,
                dup,
                last
            );
            last = dup;
        }
        assert_eq!(last, 0.0);
    }

    #[test]
    fn test_penalty_compounds_per_claim() {
        let m = matrix();
        let advice = PortfolioOptimizer::new(&m, 8, 0.95)
            .unwrap()
            .recommend(&entries(3))
            .unwrap();
        // KC (0.80), BUF (0.78), then KC again at 0.76 beats BUF at 0.741
        let teams: Vec<_> = advice.iter().filter_map(|a| a.team()).collect();
        assert_eq!(teams, vec!["KC", "BUF", "KC"]);
        let third = advice[2].recommendation().unwrap();
        assert!((third.effective_win_prob - 0.76).abs() < 1e-12);
    }

    #[test]
    fn test_eliminated_entry_skipped() {
        let m = matrix();
        let mut es = entries(2);
        es[0].eliminate(1);
        let advice = PortfolioOptimizer::new(&m, 8, 0.95)
            .unwrap()
            .recommend(&es)
            .unwrap();
        assert!(matches!(
            advice[0],
            PickAdvice::NoRecommendation {
                reason: NoPickReason::EntryEliminated,
                ..
            }
        ));
        let rec = advice[1].recommendation().unwrap();
        assert_eq!(rec.team, "KC", "an eliminated entry claims nothing");
        assert_eq!(rec.portfolio_coverage, 1.0);
    }

    #[test]
    fn test_entry_without_pick_does_not_stop_batch() {
        let m = matrix();
        let mut es = entries(2);
        for (week, team) in ["KC", "DEN", "BUF", "MIA", "SF", "SEA"].iter().enumerate() {
            es[0].picks.push(crate::models::EntryPick {
                week: week as u8 + 1,
                team: team.to_string(),
            });
        }
        let advice = PortfolioOptimizer::new(&m, 8, 0.95)
            .unwrap()
            .recommend(&es)
            .unwrap();
        assert!(advice[0].recommendation().is_none());
        let rec = advice[1].recommendation().unwrap();
        assert_eq!(rec.team, "KC");
        assert_eq!(rec.portfolio_coverage, 0.0, "the other entry has no pick");
    }

    #[test]
    fn test_factor_out_of_range() {
        let m = matrix();
        assert!(PortfolioOptimizer::new(&m, 8, 0.0).is_err());
        assert!(PortfolioOptimizer::new(&m, 8, 1.2).is_err());
    }
}
