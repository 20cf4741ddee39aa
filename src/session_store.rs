use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{Connection, params};
use tracing::info;

use crate::error::PaceError;
use crate::http_cache::app_cache_dir;
use crate::session_fetch::{self, LapRecord, SessionType};

/// Laps loaded for one session, with provenance for the caller's logs.
#[derive(Debug, Clone)]
pub struct SessionLaps {
    pub laps: Vec<LapRecord>,
    pub from_cache: bool,
}

pub fn default_db_path() -> Option<PathBuf> {
    app_cache_dir().map(|dir| dir.join("sessions.sqlite"))
}

pub fn open_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    let conn =
        Connection::open(path).with_context(|| format!("open sqlite db {}", path.display()))?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;
        CREATE TABLE IF NOT EXISTS laps (
            lap_id INTEGER PRIMARY KEY AUTOINCREMENT,
            season INTEGER NOT NULL,
            event TEXT NOT NULL,
            session_type TEXT NOT NULL,
            driver_code TEXT NOT NULL,
            lap_seconds REAL NULL,
            sector1_seconds REAL NULL,
            sector2_seconds REAL NULL,
            sector3_seconds REAL NULL
        );
        CREATE INDEX IF NOT EXISTS idx_laps_session ON laps(season, event, session_type);

        CREATE TABLE IF NOT EXISTS fetch_runs (
            run_id INTEGER PRIMARY KEY AUTOINCREMENT,
            fetched_at TEXT NOT NULL,
            season INTEGER NOT NULL,
            event TEXT NOT NULL,
            session_type TEXT NOT NULL,
            laps_stored INTEGER NOT NULL
        );
        "#,
    )
    .context("create sqlite schema")?;
    Ok(())
}

/// Load cached laps for one session, in insertion order. Empty vec means
/// the session has never been stored.
pub fn load_session_laps(
    conn: &Connection,
    season: u16,
    event: &str,
    session: SessionType,
) -> Result<Vec<LapRecord>> {
    let mut stmt = conn
        .prepare(
            r#"
            SELECT driver_code, lap_seconds, sector1_seconds, sector2_seconds, sector3_seconds
            FROM laps
            WHERE season = ?1 AND event = ?2 AND session_type = ?3
            ORDER BY lap_id ASC
            "#,
        )
        .context("prepare lap query")?;

    let rows = stmt
        .query_map(
            params![season as i64, session_event_key(event), session.as_str()],
            |row| {
                Ok(LapRecord {
                    driver_code: row.get(0)?,
                    lap_seconds: row.get(1)?,
                    sector1_seconds: row.get(2)?,
                    sector2_seconds: row.get(3)?,
                    sector3_seconds: row.get(4)?,
                })
            },
        )
        .context("query session laps")?;

    let mut laps = Vec::new();
    for row in rows {
        laps.push(row.context("read lap row")?);
    }
    Ok(laps)
}

/// Replace the stored laps for one session and record the fetch in the
/// audit table. Records are stored verbatim, nulls included.
pub fn store_session_laps(
    conn: &mut Connection,
    season: u16,
    event: &str,
    session: SessionType,
    laps: &[LapRecord],
) -> Result<usize> {
    let event_key = session_event_key(event);
    let tx = conn.transaction().context("begin store transaction")?;
    tx.execute(
        "DELETE FROM laps WHERE season = ?1 AND event = ?2 AND session_type = ?3",
        params![season as i64, event_key, session.as_str()],
    )
    .context("clear stale session laps")?;

    for lap in laps {
        tx.execute(
            r#"
            INSERT INTO laps(season, event, session_type, driver_code,
                             lap_seconds, sector1_seconds, sector2_seconds, sector3_seconds)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                season as i64,
                event_key,
                session.as_str(),
                lap.driver_code,
                lap.lap_seconds,
                lap.sector1_seconds,
                lap.sector2_seconds,
                lap.sector3_seconds,
            ],
        )
        .context("insert lap")?;
    }

    tx.execute(
        "INSERT INTO fetch_runs(fetched_at, season, event, session_type, laps_stored)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            Utc::now().to_rfc3339(),
            season as i64,
            event_key,
            session.as_str(),
            laps.len() as i64
        ],
    )
    .context("record fetch run")?;

    tx.commit().context("commit store transaction")?;
    Ok(laps.len())
}

/// Fetch-through load: serve from the cache when the session is present,
/// otherwise hit the provider once and persist what it returned.
pub fn load_or_fetch_session(
    conn: &mut Connection,
    season: u16,
    event: &str,
    session: SessionType,
) -> Result<SessionLaps, PaceError> {
    let cached = load_session_laps(conn, season, event, session)
        .map_err(|err| PaceError::unavailable(format!("session cache read failed: {err:#}")))?;
    if !cached.is_empty() {
        info!(laps = cached.len(), season, event, "session served from cache");
        return Ok(SessionLaps {
            laps: cached,
            from_cache: true,
        });
    }

    let laps = session_fetch::fetch_session_laps(season, event, session)?;
    store_session_laps(conn, season, event, session, &laps)
        .map_err(|err| PaceError::unavailable(format!("session cache write failed: {err:#}")))?;
    info!(laps = laps.len(), season, event, "session fetched and cached");
    Ok(SessionLaps {
        laps,
        from_cache: false,
    })
}

fn session_event_key(event: &str) -> String {
    event.trim().to_string()
}
