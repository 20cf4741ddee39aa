use std::collections::HashMap;

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::PaceError;
use crate::http_cache::fetch_json_cached;
use crate::http_client::http_client;

const DEFAULT_API_BASE: &str = "https://api.openf1.org";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionType {
    Practice,
    Qualifying,
    Race,
}

impl SessionType {
    pub fn api_name(self) -> &'static str {
        match self {
            SessionType::Practice => "Practice",
            SessionType::Qualifying => "Qualifying",
            SessionType::Race => "Race",
        }
    }

    /// Stable key used in the SQLite cache.
    pub fn as_str(self) -> &'static str {
        match self {
            SessionType::Practice => "practice",
            SessionType::Qualifying => "qualifying",
            SessionType::Race => "race",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "practice" | "p" | "fp" => Some(SessionType::Practice),
            "qualifying" | "quali" | "q" => Some(SessionType::Qualifying),
            "race" | "r" => Some(SessionType::Race),
            _ => None,
        }
    }
}

/// One lap as the provider reports it. Timing fields stay optional: the
/// aggregator decides what an incomplete lap means, not the fetch layer.
#[derive(Debug, Clone, PartialEq)]
pub struct LapRecord {
    pub driver_code: String,
    pub lap_seconds: Option<f64>,
    pub sector1_seconds: Option<f64>,
    pub sector2_seconds: Option<f64>,
    pub sector3_seconds: Option<f64>,
}

impl LapRecord {
    pub fn is_complete(&self) -> bool {
        self.lap_seconds.is_some()
            && self.sector1_seconds.is_some()
            && self.sector2_seconds.is_some()
            && self.sector3_seconds.is_some()
    }
}

/// Fetch every lap of one historical session. Any transport, decode, or
/// lookup failure surfaces as `DataUnavailable`; there is no retry.
pub fn fetch_session_laps(
    season: u16,
    event: &str,
    session: SessionType,
) -> Result<Vec<LapRecord>, PaceError> {
    fetch_session_laps_impl(season, event, session)
        .map_err(|err| PaceError::unavailable(format!("{err:#}")))
}

fn fetch_session_laps_impl(season: u16, event: &str, session: SessionType) -> Result<Vec<LapRecord>> {
    let client = http_client()?;
    let base = api_base();

    let url = format!(
        "{base}/v1/sessions?year={season}&country_name={}&session_name={}",
        encode_query(event),
        session.api_name()
    );
    let body = fetch_json_cached(client, &url).context("session lookup failed")?;
    let session_key = parse_sessions_json(&body)?
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("no {} session found for {event} {season}", session.api_name()))?;
    debug!(session_key, season, event, "resolved session");

    let url = format!("{base}/v1/drivers?session_key={session_key}");
    let body = fetch_json_cached(client, &url).context("driver lookup failed")?;
    let codes = parse_drivers_json(&body)?;
    if codes.is_empty() {
        return Err(anyhow!("session {session_key} has no driver entries"));
    }

    let url = format!("{base}/v1/laps?session_key={session_key}");
    let body = fetch_json_cached(client, &url).context("lap fetch failed")?;
    let laps = parse_laps_json(&body, &codes)?;
    if laps.is_empty() {
        return Err(anyhow!("session {session_key} has no laps"));
    }
    debug!(laps = laps.len(), "fetched session laps");
    Ok(laps)
}

#[derive(Debug, Deserialize)]
struct ApiSession {
    session_key: u64,
}

#[derive(Debug, Deserialize)]
struct ApiDriver {
    driver_number: u32,
    #[serde(default)]
    name_acronym: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiLap {
    driver_number: u32,
    #[serde(default)]
    lap_duration: Option<f64>,
    #[serde(default)]
    duration_sector_1: Option<f64>,
    #[serde(default)]
    duration_sector_2: Option<f64>,
    #[serde(default)]
    duration_sector_3: Option<f64>,
}

pub fn parse_sessions_json(raw: &str) -> Result<Vec<u64>> {
    let rows: Vec<ApiSession> = serde_json::from_str(raw).context("decode sessions response")?;
    Ok(rows.into_iter().map(|s| s.session_key).collect())
}

/// driver_number -> three-letter acronym. Entries without an acronym are
/// dropped; their laps cannot be keyed.
pub fn parse_drivers_json(raw: &str) -> Result<HashMap<u32, String>> {
    let rows: Vec<ApiDriver> = serde_json::from_str(raw).context("decode drivers response")?;
    let mut codes = HashMap::with_capacity(rows.len());
    for row in rows {
        let Some(acronym) = row.name_acronym else {
            warn!(driver_number = row.driver_number, "driver entry without acronym");
            continue;
        };
        let acronym = acronym.trim().to_ascii_uppercase();
        if !acronym.is_empty() {
            codes.insert(row.driver_number, acronym);
        }
    }
    Ok(codes)
}

/// Decode lap rows, keeping nulls as `None`. Laps whose driver number has
/// no acronym are skipped with a warning.
pub fn parse_laps_json(raw: &str, codes: &HashMap<u32, String>) -> Result<Vec<LapRecord>> {
    let rows: Vec<ApiLap> = serde_json::from_str(raw).context("decode laps response")?;
    let mut laps = Vec::with_capacity(rows.len());
    let mut unknown = 0usize;
    for row in rows {
        let Some(code) = codes.get(&row.driver_number) else {
            unknown += 1;
            continue;
        };
        laps.push(LapRecord {
            driver_code: code.clone(),
            lap_seconds: row.lap_duration,
            sector1_seconds: row.duration_sector_1,
            sector2_seconds: row.duration_sector_2,
            sector3_seconds: row.duration_sector_3,
        });
    }
    if unknown > 0 {
        warn!(unknown, "laps skipped for unmapped driver numbers");
    }
    Ok(laps)
}

fn api_base() -> String {
    match std::env::var("GRIDPACE_API_BASE") {
        Ok(raw) if !raw.trim().is_empty() => raw.trim().trim_end_matches('/').to_string(),
        _ => DEFAULT_API_BASE.to_string(),
    }
}

fn encode_query(raw: &str) -> String {
    raw.trim().replace(' ', "%20")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codes() -> HashMap<u32, String> {
        HashMap::from([(1, "VER".to_string()), (4, "NOR".to_string())])
    }

    #[test]
    fn session_type_parses_aliases() {
        assert_eq!(SessionType::parse("R"), Some(SessionType::Race));
        assert_eq!(SessionType::parse("quali"), Some(SessionType::Qualifying));
        assert_eq!(SessionType::parse("Practice"), Some(SessionType::Practice));
        assert_eq!(SessionType::parse("sprint"), None);
    }

    #[test]
    fn laps_keep_null_fields_as_none() {
        let raw = r#"[
            {"driver_number": 1, "lap_duration": 95.2, "duration_sector_1": 30.1,
             "duration_sector_2": 35.2, "duration_sector_3": 29.9},
            {"driver_number": 1, "lap_duration": null, "duration_sector_1": 30.3,
             "duration_sector_2": null, "duration_sector_3": 30.0}
        ]"#;
        let laps = parse_laps_json(raw, &codes()).unwrap();
        assert_eq!(laps.len(), 2);
        assert!(laps[0].is_complete());
        assert!(!laps[1].is_complete());
        assert_eq!(laps[1].lap_seconds, None);
        assert_eq!(laps[1].sector2_seconds, None);
    }

    #[test]
    fn laps_for_unmapped_numbers_are_skipped() {
        let raw = r#"[
            {"driver_number": 99, "lap_duration": 95.2, "duration_sector_1": 30.1,
             "duration_sector_2": 35.2, "duration_sector_3": 29.9},
            {"driver_number": 4, "lap_duration": 96.0, "duration_sector_1": 30.5,
             "duration_sector_2": 35.4, "duration_sector_3": 30.1}
        ]"#;
        let laps = parse_laps_json(raw, &codes()).unwrap();
        assert_eq!(laps.len(), 1);
        assert_eq!(laps[0].driver_code, "NOR");
    }

    #[test]
    fn drivers_without_acronym_are_dropped() {
        let raw = r#"[
            {"driver_number": 1, "name_acronym": "ver"},
            {"driver_number": 2, "name_acronym": null},
            {"driver_number": 3}
        ]"#;
        let codes = parse_drivers_json(raw).unwrap();
        assert_eq!(codes.len(), 1);
        assert_eq!(codes.get(&1).map(String::as_str), Some("VER"));
    }

    #[test]
    fn sessions_json_yields_keys_in_order() {
        let raw = r#"[{"session_key": 9673}, {"session_key": 9700}]"#;
        assert_eq!(parse_sessions_json(raw).unwrap(), vec![9673, 9700]);
    }
}
