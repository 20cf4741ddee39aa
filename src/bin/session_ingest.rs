use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};

use gridpace::session_fetch::{self, SessionType};
use gridpace::session_store;

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let season = parse_u16_arg("--season").unwrap_or(2024);
    let event = parse_string_arg("--event").unwrap_or_else(|| "China".to_string());
    let session = match parse_string_arg("--session") {
        Some(raw) => {
            SessionType::parse(&raw).ok_or_else(|| anyhow!("unknown session type {raw:?}"))?
        }
        None => SessionType::Race,
    };
    let force = std::env::args().any(|arg| arg == "--force");

    let db_path = parse_path_arg("--db")
        .or_else(session_store::default_db_path)
        .context("unable to resolve sqlite path")?;
    let mut conn = session_store::open_db(&db_path)?;

    let (laps, from_cache) = if force {
        let laps = session_fetch::fetch_session_laps(season, &event, session)?;
        session_store::store_session_laps(&mut conn, season, &event, session, &laps)?;
        (laps, false)
    } else {
        let loaded = session_store::load_or_fetch_session(&mut conn, season, &event, session)?;
        (loaded.laps, loaded.from_cache)
    };

    let complete = laps.iter().filter(|lap| lap.is_complete()).count();
    let mut drivers: Vec<&str> = laps.iter().map(|lap| lap.driver_code.as_str()).collect();
    drivers.sort_unstable();
    drivers.dedup();

    println!("Session ingest complete");
    println!("DB: {}", db_path.display());
    println!("Session: {season} {event} ({})", session.as_str());
    println!(
        "Laps: {} ({} fully timed), drivers: {}",
        laps.len(),
        complete,
        drivers.len()
    );
    println!(
        "Source: {}",
        if from_cache { "cache" } else { "network" }
    );

    Ok(())
}

fn parse_string_arg(name: &str) -> Option<String> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    for (idx, arg) in args.iter().enumerate() {
        if let Some(value) = arg.strip_prefix(&format!("{name}=")) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if arg == name {
            let Some(next) = args.get(idx + 1) else {
                continue;
            };
            if !next.trim().is_empty() {
                return Some(next.trim().to_string());
            }
        }
    }
    None
}

fn parse_u16_arg(name: &str) -> Option<u16> {
    parse_string_arg(name).and_then(|raw| raw.parse::<u16>().ok())
}

fn parse_path_arg(name: &str) -> Option<PathBuf> {
    parse_string_arg(name).map(PathBuf::from)
}
