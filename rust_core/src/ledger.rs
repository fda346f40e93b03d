//! Entry and pick bookkeeping.
//!
//! This module provides:
//! - Entry creation and lookup
//! - Pick submission with the no-reuse / one-per-week / alive checks
//! - Week resolution: pick outcomes and eliminations
//!
//! Readers get cloned snapshots taken under a read guard, so a computation
//! never observes a half-applied submission.

use crate::error::{Result, SurvivorError};
use crate::models::{Entry, Pick, Schedule};
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use tracing::info;

#[derive(Debug, Default)]
pub struct EntryLedger {
    entries: RwLock<BTreeMap<u64, Entry>>,
    picks: RwLock<Vec<Pick>>,
}

impl EntryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the ledger with existing entries. Duplicate ids and entries that
    /// break the pick invariants are rejected. Each loaded pick becomes an
    /// unsettled [`Pick`] so a later [`resolve_week`](Self::resolve_week)
    /// settles it like a submitted one.
    pub fn from_entries(entries: Vec<Entry>) -> Result<Self> {
        let mut map = BTreeMap::new();
        let mut picks = Vec::new();
        for entry in entries {
            entry.validate()?;
            let id = entry.entry_id;
            picks.extend(entry.picks.iter().map(|p| Pick {
                entry_id: id,
                team: p.team.clone(),
                season: entry.season,
                week: p.week,
                win_prob: None,
                is_recommended: false,
                outcome: None,
                submitted_at: entry.created_at,
            }));
            if map.insert(id, entry).is_some() {
                return Err(SurvivorError::invalid(format!("duplicate entry id {}", id)));
            }
        }
        picks.sort_by_key(|p| (p.week, p.entry_id));
        Ok(Self {
            entries: RwLock::new(map),
            picks: RwLock::new(picks),
        })
    }

    pub fn create_entry(&self, name: &str, season: u16) -> Entry {
        let mut entries = self.entries.write();
        let id = entries.keys().next_back().map_or(1, |last| last + 1);
        let entry = Entry::new(id, name, season);
        entries.insert(id, entry.clone());
        info!("Created entry {} ({}) for season {}", id, name, season);
        entry
    }

    pub fn get(&self, entry_id: u64) -> Option<Entry> {
        self.entries.read().get(&entry_id).cloned()
    }

    /// Like [`get`](Self::get) but an unknown id is an input error.
    pub fn require(&self, entry_id: u64) -> Result<Entry> {
        self.get(entry_id)
            .ok_or_else(|| SurvivorError::invalid(format!("unknown entry id {}", entry_id)))
    }

    /// All entries, ascending by id.
    pub fn snapshot(&self) -> Vec<Entry> {
        self.entries.read().values().cloned().collect()
    }

    pub fn picks(&self) -> Vec<Pick> {
        self.picks.read().clone()
    }

    pub fn picks_for_entry(&self, entry_id: u64) -> Vec<Pick> {
        self.picks
            .read()
            .iter()
            .filter(|p| p.entry_id == entry_id)
            .cloned()
            .collect()
    }

    /// Ids of entries that have used `team`.
    pub fn entries_using(&self, team: &str) -> Vec<u64> {
        self.entries
            .read()
            .values()
            .filter(|e| e.has_used(team))
            .map(|e| e.entry_id)
            .collect()
    }

    /// Record `team` for `entry_id` in `week`. The team must play that week.
    pub fn submit_pick(
        &self,
        schedule: &Schedule,
        entry_id: u64,
        week: u8,
        team: &str,
        win_prob: Option<f64>,
        is_recommended: bool,
    ) -> Result<Pick> {
        let mut entries = self.entries.write();
        let entry = entries
            .get_mut(&entry_id)
            .ok_or_else(|| SurvivorError::invalid(format!("unknown entry id {}", entry_id)))?;
        if entry.season != schedule.season() {
            return Err(SurvivorError::invalid(format!(
                "entry {} is for season {}, schedule is {}",
                entry_id,
                entry.season,
                schedule.season()
            )));
        }
        if schedule.game_for(team, week).is_none() {
            return Err(SurvivorError::invalid(format!(
                "{} has no game in week {}",
                team, week
            )));
        }
        entry.record_pick(week, team)?;

        let pick = Pick {
            entry_id,
            team: team.to_string(),
            season: entry.season,
            week,
            win_prob,
            is_recommended,
            outcome: None,
            submitted_at: Utc::now(),
        };
        self.picks.write().push(pick.clone());
        info!(
            "Entry {} picked {} for week {}{}",
            entry_id,
            team,
            week,
            if is_recommended { " (recommended)" } else { "" }
        );
        Ok(pick)
    }

    /// Set outcomes for unresolved picks of `week` whose game is final and
    /// eliminate entries whose team did not win. Returns the eliminated ids.
    pub fn resolve_week(&self, schedule: &Schedule, week: u8) -> Result<Vec<u64>> {
        let mut entries = self.entries.write();
        let mut picks = self.picks.write();
        let mut eliminated = Vec::new();
        let mut resolved = 0usize;

        for pick in picks
            .iter_mut()
            .filter(|p| p.week == week && p.season == schedule.season() && p.outcome.is_none())
        {
            let Some(won) = schedule.game_for(&pick.team, week).and_then(|g| g.won_by(&pick.team))
            else {
                continue;
            };
            pick.set_outcome(won)?;
            resolved += 1;
            if !won {
                if let Some(entry) = entries.get_mut(&pick.entry_id) {
                    if entry.is_alive {
                        entry.eliminate(week);
                        eliminated.push(pick.entry_id);
                    }
                }
            }
        }

        info!(
            "Resolved week {}: {} picks settled, {} entries eliminated",
            week,
            resolved,
            eliminated.len()
        );
        Ok(eliminated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Game;

    fn schedule() -> Schedule {
        Schedule::new(
            2024,
            vec![
                Game::new(2024, 1, "KC", "BAL", 0.7),
                Game::new(2024, 1, "SF", "NYJ", 0.8),
                Game::new(2024, 2, "KC", "SF", 0.5),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_create_assigns_increasing_ids() {
        let ledger = EntryLedger::new();
        assert_eq!(ledger.create_entry("A", 2024).entry_id, 1);
        assert_eq!(ledger.create_entry("B", 2024).entry_id, 2);
        assert_eq!(ledger.snapshot().len(), 2);
    }

    #[test]
    fn test_submit_pick_rules() {
        let ledger = EntryLedger::new();
        let schedule = schedule();
        let id = ledger.create_entry("A", 2024).entry_id;

        let pick = ledger
            .submit_pick(&schedule, id, 1, "KC", Some(0.7), true)
            .unwrap();
        assert_eq!(pick.win_prob, Some(0.7));
        assert!(pick.is_recommended);

        // second pick in the same week
        assert!(ledger.submit_pick(&schedule, id, 1, "SF", None, false).is_err());
        // team reuse
        assert!(ledger.submit_pick(&schedule, id, 2, "KC", None, false).is_err());
        // bye
        assert!(ledger.submit_pick(&schedule, id, 2, "BAL", None, false).is_err());
        // unknown entry
        assert!(ledger.submit_pick(&schedule, 99, 2, "SF", None, false).is_err());

        ledger.submit_pick(&schedule, id, 2, "SF", None, false).unwrap();
        let entry = ledger.get(id).unwrap();
        assert_eq!(entry.used_teams(), vec!["KC", "SF"]);
        assert_eq!(ledger.entries_using("SF"), vec![id]);
        assert_eq!(ledger.picks_for_entry(id).len(), 2);
    }

    #[test]
    fn test_resolve_week_eliminates_losers() {
        let ledger = EntryLedger::new();
        let schedule = schedule();
        let a = ledger.create_entry("A", 2024).entry_id;
        let b = ledger.create_entry("B", 2024).entry_id;
        ledger.submit_pick(&schedule, a, 1, "KC", None, false).unwrap();
        ledger.submit_pick(&schedule, b, 1, "BAL", None, false).unwrap();

        // Nothing final yet
        assert!(ledger.resolve_week(&schedule, 1).unwrap().is_empty());

        let final_schedule = schedule
            .map_games(|g| {
                Ok(if g.week == 1 && g.home_team == "KC" {
                    g.clone().with_final_score(24, 17)
                } else {
                    g.clone()
                })
            })
            .unwrap();
        assert_eq!(ledger.resolve_week(&final_schedule, 1).unwrap(), vec![b]);

        let loser = ledger.get(b).unwrap();
        assert!(!loser.is_alive);
        assert_eq!(loser.eliminated_week, Some(1));
        assert!(ledger.get(a).unwrap().is_alive);
        assert!(ledger
            .submit_pick(&final_schedule, b, 2, "SF", None, false)
            .is_err());

        // Outcomes are set once; a second pass changes nothing
        assert!(ledger.resolve_week(&final_schedule, 1).unwrap().is_empty());
        let outcomes: Vec<_> = ledger.picks().iter().map(|p| p.outcome).collect();
        assert_eq!(outcomes, vec![Some(true), Some(false)]);
    }

    #[test]
    fn test_loaded_picks_are_settled_on_resolve() {
        let mut entry = Entry::new(1, "Loaded", 2024);
        entry.record_pick(1, "KC").unwrap();
        let ledger = EntryLedger::from_entries(vec![entry]).unwrap();
        assert_eq!(ledger.picks_for_entry(1).len(), 1);
        assert_eq!(ledger.picks()[0].outcome, None);

        let final_schedule = schedule()
            .map_games(|g| {
                Ok(if g.week == 1 && g.home_team == "KC" {
                    g.clone().with_final_score(17, 23)
                } else {
                    g.clone()
                })
            })
            .unwrap();
        assert_eq!(ledger.resolve_week(&final_schedule, 1).unwrap(), vec![1]);

        let entry = ledger.get(1).unwrap();
        assert!(!entry.is_alive);
        assert_eq!(entry.eliminated_week, Some(1));
        assert_eq!(ledger.picks()[0].outcome, Some(false));
    }

    #[test]
    fn test_from_entries_rejects_duplicates() {
        let entries = vec![Entry::new(1, "A", 2024), Entry::new(1, "B", 2024)];
        assert!(EntryLedger::from_entries(entries).is_err());
    }
}
