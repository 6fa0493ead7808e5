// src/main.rs

use fastmath::{database, repository, Engine, EngineConfig, LevelChange, Result};
use log::{error, info};
use rusqlite::Connection;
use std::env;
use std::io::{self, BufRead, Write};
use std::time::Instant;

const DEFAULT_DB: &str = "fastmath.db";
const DEFAULT_PROFILE: &str = "default";

fn load_config() -> Result<EngineConfig> {
    match env::var("FASTMATH_CONFIG") {
        Ok(path) => {
            info!("Loading config from {}", path);
            EngineConfig::load(path)
        }
        Err(_) => Ok(EngineConfig::default()),
    }
}

fn run() -> Result<()> {
    let db_path = env::var("FASTMATH_DB").unwrap_or_else(|_| DEFAULT_DB.to_string());
    let profile = env::var("FASTMATH_PROFILE").unwrap_or_else(|_| DEFAULT_PROFILE.to_string());
    info!("Database path: {:?}, profile: {}", db_path, profile);

    let config = load_config()?;
    let mut conn = Connection::open(&db_path)?;
    database::init_db(&conn)?;

    let state = repository::load_profile(&conn, &profile, config.selection.history_capacity)?;
    let mut engine = Engine::with_profile(config, state);

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut lines = stdin.lock().lines();

    loop {
        let problem = engine.next_problem();
        write!(stdout, "{} = ", problem)?;
        stdout.flush()?;

        let started = Instant::now();
        let line = match lines.next() {
            Some(line) => line?,
            None => break,
        };
        let input = line.trim();
        if input.eq_ignore_ascii_case("q") {
            break;
        }
        let answer: i64 = match input.parse() {
            Ok(n) => n,
            Err(_) => {
                writeln!(stdout, "not a number, skipping")?;
                continue;
            }
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        let outcome = engine.submit_answer(problem, answer, elapsed_ms);
        if outcome.correct {
            writeln!(stdout, "correct ({:.1}s)", outcome.normalized_secs)?;
        } else {
            writeln!(stdout, "wrong, it was {}", outcome.expected)?;
        }
        match outcome.level_change {
            LevelChange::Promoted { to, .. } => {
                writeln!(stdout, "{} level up: {}", problem.operation, to)?
            }
            LevelChange::Demoted { to, .. } => {
                writeln!(stdout, "{} level down: {}", problem.operation, to)?
            }
            LevelChange::Unchanged => {}
        }

        repository::save_profile(&mut conn, &profile, &engine.profile_state())?;
    }

    let stats = engine.stats_snapshot();
    writeln!(
        stdout,
        "tier {}, longest streak {}",
        stats.skill_tier.as_str(),
        stats.longest_streak
    )?;
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("Starting fastmath drill...");
    if let Err(e) = run() {
        error!("fastmath failed: {}", e);
        std::process::exit(1);
    }
}
