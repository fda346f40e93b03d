mod config;

use anyhow::{anyhow, bail, Context, Result};
use config::Config;
use dotenv::dotenv;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::sync::Arc;
use survivor_core::teams::{get_team, normalize_team_code};
use survivor_core::{
    annotate_schedule, Calibrated, Entry, Game, RatingModel, Schedule, ScheduleProbabilities,
    SurvivorEngine, WinProbabilityProvider,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "\
usage: survivor_cli <command> [args]

commands:
  recommend <entry_id> <week>          best pick and planned path for one entry
  portfolio <week> [entry_id ...]      diversified picks (all alive entries by default)
  simulate <week> [n] [entry_id]       Monte Carlo survival per available team
  scarcity <week> [entry_id]           strong teams left per future week
  outlook <week> [entry_id]            team x week win probabilities
  team <code>                          one team's season and which entries used it
  submit <entry_id> <week> <team>      record a pick for an entry
  resolve <week>                       settle a week from final scores";

#[derive(Debug, Deserialize)]
struct ScheduleFile {
    season: u16,
    games: Vec<Game>,
}

/// Team code plus the registry name when known.
#[derive(Debug, Serialize)]
struct TeamLabel<'a> {
    code: &'a str,
    name: Option<&'static str>,
}

fn load_schedule(path: &str) -> Result<Schedule> {
    let raw = fs::read_to_string(path).with_context(|| format!("Failed to read {path}"))?;
    let file: ScheduleFile =
        serde_json::from_str(&raw).with_context(|| format!("Failed to parse schedule {path}"))?;
    let games = file
        .games
        .into_iter()
        .map(|mut g| {
            g.home_team = normalize_team_code(&g.home_team);
            g.away_team = normalize_team_code(&g.away_team);
            g
        })
        .collect();
    Schedule::new(file.season, games).map_err(|e| anyhow!("Invalid schedule {path}: {e}"))
}

fn load_entries(path: &str) -> Result<Vec<Entry>> {
    let raw = fs::read_to_string(path).with_context(|| format!("Failed to read {path}"))?;
    let mut entries: Vec<Entry> =
        serde_json::from_str(&raw).with_context(|| format!("Failed to parse entries {path}"))?;
    for entry in &mut entries {
        for pick in &mut entry.picks {
            pick.team = normalize_team_code(&pick.team);
        }
    }
    Ok(entries)
}

/// Re-price unplayed games from team ratings when a ratings file is given.
fn price_schedule(schedule: Schedule, config: &Config) -> Result<Schedule> {
    let Some(path) = &config.ratings_path else {
        return Ok(schedule);
    };
    let raw = fs::read_to_string(path).with_context(|| format!("Failed to read {path}"))?;
    let ratings: FxHashMap<String, f64> =
        serde_json::from_str(&raw).with_context(|| format!("Failed to parse ratings {path}"))?;
    let model = RatingModel::from_ratings(
        ratings
            .into_iter()
            .map(|(team, rating)| (normalize_team_code(&team), rating)),
    )
    .with_home_advantage(config.home_advantage);

    let provider: Box<dyn WinProbabilityProvider> = match config.calibration {
        Some((slope, intercept)) => Box::new(
            Calibrated::new(model, slope, intercept)
                .map_err(|e| anyhow!("Invalid calibration: {e}"))?,
        ),
        None => Box::new(model),
    };
    info!("Pricing schedule with {}", provider.provider_name());
    annotate_schedule(&schedule, provider.as_ref()).map_err(|e| anyhow!("Pricing failed: {e}"))
}

fn arg<T: std::str::FromStr>(args: &[String], idx: usize, name: &str) -> Result<T> {
    let raw = args
        .get(idx)
        .ok_or_else(|| anyhow!("missing <{name}>\n\n{USAGE}"))?;
    raw.parse()
        .map_err(|_| anyhow!("invalid <{name}>: {raw}"))
}

fn opt_arg<T: std::str::FromStr>(args: &[String], idx: usize, name: &str) -> Result<Option<T>> {
    match args.get(idx) {
        Some(_) => arg(args, idx, name).map(Some),
        None => Ok(None),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run(engine: &SurvivorEngine, args: &[String]) -> Result<()> {
    let Some(command) = args.first() else {
        bail!("{USAGE}");
    };
    match command.as_str() {
        "recommend" => {
            let entry_id: u64 = arg(args, 1, "entry_id")?;
            let week: u8 = arg(args, 2, "week")?;
            print_json(&engine.get_recommendation(entry_id, week)?)
        }
        "portfolio" => {
            let week: u8 = arg(args, 1, "week")?;
            let mut ids = args[2..]
                .iter()
                .map(|raw| raw.parse::<u64>().map_err(|_| anyhow!("invalid <entry_id>: {raw}")))
                .collect::<Result<Vec<_>>>()?;
            if ids.is_empty() {
                ids = engine
                    .ledger()
                    .snapshot()
                    .iter()
                    .filter(|e| e.is_alive)
                    .map(|e| e.entry_id)
                    .collect();
            }
            print_json(&engine.get_portfolio_recommendations(&ids, week)?)
        }
        "simulate" => {
            let week: u8 = arg(args, 1, "week")?;
            let n = opt_arg(args, 2, "n")?.unwrap_or(engine.config().n_simulations);
            let entry_id: Option<u64> = opt_arg(args, 3, "entry_id")?;
            print_json(&engine.run_simulation(week, n, entry_id)?)
        }
        "scarcity" => {
            let week: u8 = arg(args, 1, "week")?;
            let entry_id: Option<u64> = opt_arg(args, 2, "entry_id")?;
            let report = engine.get_scarcity(week, entry_id)?;
            if !report.critical_weeks.is_empty() {
                warn!("Critical weeks ahead: {:?}", report.critical_weeks);
            }
            print_json(&report)
        }
        "outlook" => {
            let week: u8 = arg(args, 1, "week")?;
            let entry_id: Option<u64> = opt_arg(args, 2, "entry_id")?;
            print_json(&engine.team_outlook(week, entry_id)?)
        }
        "team" => {
            let raw: String = arg(args, 1, "code")?;
            let code = normalize_team_code(&raw);
            let view = engine.team_schedule(&code)?;
            let label = TeamLabel {
                code: &code,
                name: get_team(&code).map(|t| t.name),
            };
            print_json(&serde_json::json!({ "team": label, "schedule": view }))
        }
        "submit" => {
            let entry_id: u64 = arg(args, 1, "entry_id")?;
            let week: u8 = arg(args, 2, "week")?;
            let raw: String = arg(args, 3, "team")?;
            let pick = engine.submit_pick(entry_id, week, &normalize_team_code(&raw))?;
            print_json(&pick)
        }
        "resolve" => {
            let week: u8 = arg(args, 1, "week")?;
            let eliminated = engine.resolve_week(week)?;
            if !eliminated.is_empty() {
                info!("Week {}: eliminated entries {:?}", week, eliminated);
            }
            print_json(&serde_json::json!({
                "week": week,
                "eliminated": eliminated,
                "entries": engine.ledger().snapshot(),
            }))
        }
        other => bail!("unknown command {other}\n\n{USAGE}"),
    }
}

fn main() -> Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    if matches!(args.first().map(String::as_str), Some("-h" | "--help")) {
        println!("{USAGE}");
        return Ok(());
    }

    let config = Config::from_env().context("Failed to load configuration")?;
    info!("Loading schedule from {}", config.schedule_path);
    let schedule = price_schedule(load_schedule(&config.schedule_path)?, &config)?;

    let entries = match &config.entries_path {
        Some(path) => load_entries(path)?,
        None => Vec::new(),
    };
    info!(
        "Season {}: {} entries loaded",
        schedule.season(),
        entries.len()
    );

    let provider = Arc::new(ScheduleProbabilities::new(config.engine.probability_tolerance));
    let engine = SurvivorEngine::new(Arc::new(schedule), provider, config.engine.clone())
        .and_then(|e| e.with_entries(entries))
        .map_err(|e| anyhow!("Failed to start engine: {e}"))?;

    run(&engine, &args)
}
