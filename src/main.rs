use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};

use gridpace::gbrt::GbrtConfig;
use gridpace::grid;
use gridpace::predict::{self, PredictOptions};
use gridpace::report::{ReportSpec, render_ranking};
use gridpace::session_fetch::SessionType;
use gridpace::session_store;

const DEFAULT_SEASON: u16 = 2024;
const DEFAULT_EVENT: &str = "China";

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Configuration problems should surface before any network or model
    // work happens.
    grid::validate_grid()?;

    let season = parse_u16_arg("--season").unwrap_or(DEFAULT_SEASON);
    let event = parse_string_arg("--event").unwrap_or_else(|| DEFAULT_EVENT.to_string());
    let session = match parse_string_arg("--session") {
        Some(raw) => {
            SessionType::parse(&raw).ok_or_else(|| anyhow!("unknown session type {raw:?}"))?
        }
        None => SessionType::Race,
    };
    let top = parse_usize_arg("--top");
    let refit = has_flag("--refit-full");

    let db_path = parse_path_arg("--db")
        .or_else(db_path_from_env)
        .or_else(session_store::default_db_path)
        .context("unable to resolve sqlite path")?;
    let mut conn = session_store::open_db(&db_path)?;

    let loaded = session_store::load_or_fetch_session(&mut conn, season, &event, session)?;

    let opts = PredictOptions {
        refit_on_full_data: refit,
        config: GbrtConfig::default(),
    };
    let report = predict::predict_race(&loaded.laps, grid::QUALIFYING, opts)?;

    let rows: Vec<(String, f64)> = report
        .rankings
        .iter()
        .map(|r| (r.driver.clone(), r.predicted_seconds))
        .collect();
    let spec = ReportSpec {
        title: "Predicted Race Results",
        label_header: "Driver",
        value_label: "Predicted Race Time (s)",
        ascending: true,
        limit: top,
        decimals: 3,
    };
    print!("{}", render_ranking(&spec, &rows));
    println!();
    println!("Model Error (MAE): {:.2} seconds", report.mae_seconds);

    Ok(())
}

fn args() -> Vec<String> {
    std::env::args().skip(1).collect()
}

fn parse_string_arg(name: &str) -> Option<String> {
    let args = args();
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

fn parse_usize_arg(name: &str) -> Option<usize> {
    parse_string_arg(name).and_then(|raw| raw.parse::<usize>().ok())
}

fn parse_path_arg(name: &str) -> Option<PathBuf> {
    parse_string_arg(name).map(PathBuf::from)
}

fn has_flag(name: &str) -> bool {
    args().iter().any(|arg| arg == name)
}

fn db_path_from_env() -> Option<PathBuf> {
    let raw = std::env::var("GRIDPACE_DB").ok()?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(PathBuf::from(trimmed))
}
