use std::collections::BTreeMap;
use std::sync::Arc;
use survivor_core::teams::get_all_team_codes;
use survivor_core::{
    annotate_schedule, EngineConfig, Entry, Game, MissingProbabilityPolicy, NoPickReason,
    PickAdvice, RatingModel, Schedule, ScheduleProbabilities, SurvivorEngine, SurvivorError,
};

fn engine(games: Vec<Game>, entries: Vec<Entry>, config: EngineConfig) -> SurvivorEngine {
    let schedule = Schedule::new(2024, games).unwrap();
    SurvivorEngine::new(
        Arc::new(schedule),
        Arc::new(ScheduleProbabilities::default()),
        config,
    )
    .unwrap()
    .with_entries(entries)
    .unwrap()
}

fn seeded() -> EngineConfig {
    EngineConfig::default().with_seed(2024)
}

/// Round-robin-ish season: 8 teams, 4 weeks, every team plays every week.
fn small_season() -> Vec<Game> {
    let weeks: [[(&str, &str, f64); 4]; 4] = [
        [("KC", "LV", 0.82), ("BUF", "MIA", 0.68), ("SF", "ARI", 0.74), ("DAL", "NYG", 0.66)],
        [("LV", "BUF", 0.30), ("MIA", "KC", 0.35), ("ARI", "DAL", 0.40), ("NYG", "SF", 0.22)],
        [("KC", "ARI", 0.78), ("SF", "MIA", 0.71), ("BUF", "NYG", 0.80), ("DAL", "LV", 0.69)],
        [("LV", "SF", 0.27), ("NYG", "KC", 0.25), ("MIA", "DAL", 0.45), ("ARI", "BUF", 0.33)],
    ];
    weeks
        .iter()
        .enumerate()
        .flat_map(|(w, games)| {
            games
                .iter()
                .map(move |&(home, away, p)| Game::new(2024, w as u8 + 1, home, away, p))
        })
        .collect()
}

#[test]
fn single_game_favorite_is_recommended() {
    let engine = engine(
        vec![Game::new(2024, 1, "KC", "BAL", 0.80)],
        vec![Entry::new(1, "Solo", 2024)],
        seeded(),
    );
    let advice = engine.get_recommendation(1, 1).unwrap();
    let rec = advice.recommendation().expect("KC should be recommended");
    assert_eq!(rec.team, "KC");
    assert!((rec.survival_prob - 0.80).abs() < 1e-9);
}

#[test]
fn used_favorite_gives_underdog() {
    let mut entry = Entry::new(1, "Solo", 2024);
    entry.record_pick(1, "KC").unwrap();
    let engine = engine(
        vec![Game::new(2024, 2, "KC", "BAL", 0.80)],
        vec![entry],
        seeded(),
    );
    let advice = engine.get_recommendation(1, 2).unwrap();
    let rec = advice.recommendation().expect("BAL is still available");
    assert_eq!(rec.team, "BAL");
    assert!((rec.win_prob - 0.20).abs() < 1e-9);
    assert!((rec.survival_prob - 0.20).abs() < 1e-9);
}

#[test]
fn both_sides_used_gives_no_recommendation() {
    let mut entry = Entry::new(1, "Solo", 2024);
    entry.record_pick(1, "KC").unwrap();
    entry.record_pick(2, "BAL").unwrap();
    let engine = engine(
        vec![Game::new(2024, 3, "KC", "BAL", 0.80)],
        vec![entry],
        seeded(),
    );
    assert_eq!(
        engine.get_recommendation(1, 3).unwrap(),
        PickAdvice::NoRecommendation {
            entry_id: 1,
            week: 3,
            reason: NoPickReason::AllTeamsUsed
        }
    );
}

#[test]
fn two_entries_sharing_best_team() {
    let config = EngineConfig {
        diversification_factor: 1.0,
        ..seeded()
    };
    let engine = engine(
        vec![
            Game::new(2024, 1, "KC", "BAL", 0.80),
            Game::new(2024, 1, "SF", "NYJ", 0.60),
        ],
        vec![Entry::new(1, "A", 2024), Entry::new(2, "B", 2024)],
        config,
    );
    let advice = engine.get_portfolio_recommendations(&[2, 1], 1).unwrap();
    assert_eq!(advice[0].entry_id(), 1, "results come back in entry id order");
    let first = advice[0].recommendation().unwrap();
    let second = advice[1].recommendation().unwrap();
    assert_eq!(first.team, second.team);
    assert!(second.portfolio_coverage < 1.0);
    assert!(second.win_prob <= first.win_prob);
}

#[test]
fn scarcity_counts_three_strong_teams() {
    let codes = get_all_team_codes();
    let mut games: Vec<Game> = codes[..30]
        .chunks(2)
        .enumerate()
        .map(|(i, pair)| Game::new(2024, 9, pair[0], pair[1], if i < 3 { 0.70 } else { 0.50 }))
        .collect();
    games.push(Game::new(2024, 10, codes[30], codes[31], 0.90));
    let engine = engine(games, Vec::new(), seeded());

    let report = engine.get_scarcity(9, None).unwrap();
    assert_eq!(report.count_for(9), Some(3));
    assert_eq!(report.count_for(10), Some(1));
    assert_eq!(report.counts().len(), 2);
}

#[test]
fn optimizer_survival_matches_simulated_path() {
    let engine = engine(small_season(), vec![Entry::new(1, "A", 2024)], seeded());
    let advice = engine.get_recommendation(1, 1).unwrap();
    let rec = advice.recommendation().unwrap();
    assert_eq!(rec.strategy.len(), 4);

    let n = 200_000;
    let simulated = engine.simulate_strategy(&rec.strategy, n).unwrap();
    let p = rec.survival_prob;
    let sigma = (p * (1.0 - p) / n as f64).sqrt();
    assert!(
        (simulated - p).abs() < 5.0 * sigma,
        "simulated {} vs closed form {} (sigma {})",
        simulated,
        p,
        sigma
    );
}

#[test]
fn n_picks_use_n_distinct_teams() {
    let games = small_season();
    let schedule = Schedule::new(2024, games.clone()).unwrap();
    let engine = engine(games, Vec::new(), seeded());
    let id = engine.ledger().create_entry("Runner", 2024).entry_id;

    for week in 1..=4u8 {
        let advice = engine.get_recommendation(id, week).unwrap();
        let team = advice.team().expect("a pick every week").to_string();
        assert!(!schedule.is_bye(&team, week));
        engine.submit_pick(id, week, &team).unwrap();
    }
    let entry = engine.ledger().get(id).unwrap();
    let used = entry.used_teams();
    let distinct: std::collections::BTreeSet<_> = used.iter().collect();
    assert_eq!(used.len(), 4);
    assert_eq!(distinct.len(), 4);
    assert!(engine.ledger().picks().iter().all(|p| p.is_recommended));
}

#[test]
fn seeded_simulation_is_reproducible() {
    let engine_a = engine(small_season(), Vec::new(), seeded());
    let engine_b = engine(small_season(), Vec::new(), seeded());
    let a = engine_a.run_simulation(1, 20_000, None).unwrap();
    let b = engine_b.run_simulation(1, 20_000, None).unwrap();
    assert_eq!(a, b);
    assert_eq!(a.teams.len(), 8);
    assert!(a.teams.windows(2).all(|w| w[0].survival_prob >= w[1].survival_prob));
}

#[test]
fn missing_probability_policies() {
    let games = vec![
        Game::new(2024, 1, "KC", "BAL", 0.7),
        Game::unpriced(2024, 2, "KC", "SF"),
    ];
    let strict = engine(games.clone(), vec![Entry::new(1, "A", 2024)], seeded());
    assert!(matches!(
        strict.get_recommendation(1, 1),
        Err(SurvivorError::InsufficientData { week: 2, .. })
    ));

    let lenient = engine(
        games,
        vec![Entry::new(1, "A", 2024)],
        EngineConfig {
            missing_probability: MissingProbabilityPolicy::AssumeCoinFlip,
            ..seeded()
        },
    );
    assert!(lenient.get_recommendation(1, 1).unwrap().team().is_some());
    let result = lenient.run_simulation(1, 1_000, None).unwrap();
    assert_eq!(result.flagged.len(), 2);
}

#[test]
fn resolved_week_eliminates_and_blocks_recommendations() {
    let games = vec![
        Game::new(2024, 1, "KC", "BAL", 0.7).with_final_score(17, 23),
        Game::new(2024, 2, "KC", "SF", 0.6),
    ];
    let schedule = Schedule::new(2024, games).unwrap();
    let engine = SurvivorEngine::new(
        Arc::new(schedule),
        Arc::new(ScheduleProbabilities::default()),
        seeded(),
    )
    .unwrap();
    let id = engine.ledger().create_entry("A", 2024).entry_id;
    engine.submit_pick(id, 1, "KC").unwrap();
    assert_eq!(engine.resolve_week(1).unwrap(), vec![id]);
    assert_eq!(
        engine.get_recommendation(id, 2).unwrap(),
        PickAdvice::NoRecommendation {
            entry_id: id,
            week: 2,
            reason: NoPickReason::EntryEliminated
        }
    );
}

#[test]
fn rating_model_prices_unplayed_games() {
    let schedule = Schedule::new(
        2024,
        vec![
            Game::unpriced(2024, 1, "KC", "LV"),
            Game::unpriced(2024, 1, "BUF", "MIA"),
        ],
    )
    .unwrap();
    let model = RatingModel::from_ratings([("KC", 7.0), ("LV", -3.0), ("BUF", 4.0), ("MIA", 2.0)]);
    let priced = annotate_schedule(&schedule, &model).unwrap();
    let engine = SurvivorEngine::new(
        Arc::new(priced),
        Arc::new(ScheduleProbabilities::default()),
        seeded(),
    )
    .unwrap();
    let id = engine.ledger().create_entry("A", 2024).entry_id;
    let advice = engine.get_recommendation(id, 1).unwrap();
    assert_eq!(advice.team(), Some("KC"));

    let strategy = BTreeMap::from([(1u8, "KC".to_string())]);
    assert!(engine.simulate_strategy(&strategy, 1_000).unwrap() > 0.5);
}

#[test]
fn loaded_entry_is_eliminated_when_week_resolves() {
    let mut entry = Entry::new(1, "Loaded", 2024);
    entry.record_pick(1, "KC").unwrap();
    let engine = engine(
        vec![
            Game::new(2024, 1, "KC", "BAL", 0.7).with_final_score(17, 23),
            Game::new(2024, 2, "KC", "SF", 0.6),
        ],
        vec![entry],
        seeded(),
    );

    assert_eq!(engine.resolve_week(1).unwrap(), vec![1]);
    let entry = engine.ledger().get(1).unwrap();
    assert!(!entry.is_alive);
    assert_eq!(entry.eliminated_week, Some(1));
    assert_eq!(
        engine.get_recommendation(1, 2).unwrap(),
        PickAdvice::NoRecommendation {
            entry_id: 1,
            week: 2,
            reason: NoPickReason::EntryEliminated
        }
    );
}
