use std::collections::BTreeMap;

use crate::session_fetch::LapRecord;

/// Per-driver average sector times over fully-timed laps. Drivers with no
/// fully-timed lap get no profile at all; absence of a key is what lets
/// the candidate builder apply its explicit zero-fill downstream.
#[derive(Debug, Clone, PartialEq)]
pub struct SectorProfile {
    pub driver_code: String,
    pub avg_sector1: f64,
    pub avg_sector2: f64,
    pub avg_sector3: f64,
    pub valid_laps: u32,
}

#[derive(Debug, Default)]
struct SectorAccum {
    sector1: f64,
    sector2: f64,
    sector3: f64,
    lap: f64,
    n: u32,
}

/// Mean of each sector independently, grouped by exact driver code.
/// Output is sorted by driver code and independent of input order.
pub fn build_profiles(laps: &[LapRecord]) -> Vec<SectorProfile> {
    accumulate(laps)
        .into_iter()
        .map(|(driver_code, acc)| {
            let n = acc.n as f64;
            SectorProfile {
                driver_code,
                avg_sector1: acc.sector1 / n,
                avg_sector2: acc.sector2 / n,
                avg_sector3: acc.sector3 / n,
                valid_laps: acc.n,
            }
        })
        .collect()
}

/// Per-driver mean lap time over the same filtered laps. Kept separate
/// from the sector profile: this is the regression target, not a feature.
pub fn average_race_pace(laps: &[LapRecord]) -> BTreeMap<String, f64> {
    accumulate(laps)
        .into_iter()
        .map(|(driver_code, acc)| (driver_code, acc.lap / acc.n as f64))
        .collect()
}

fn accumulate(laps: &[LapRecord]) -> BTreeMap<String, SectorAccum> {
    let mut by_driver: BTreeMap<String, SectorAccum> = BTreeMap::new();
    for lap in laps {
        // A lap missing any timing field contributes to nothing.
        let (Some(lap_s), Some(s1), Some(s2), Some(s3)) = (
            lap.lap_seconds,
            lap.sector1_seconds,
            lap.sector2_seconds,
            lap.sector3_seconds,
        ) else {
            continue;
        };
        let acc = by_driver.entry(lap.driver_code.clone()).or_default();
        acc.sector1 += s1;
        acc.sector2 += s2;
        acc.sector3 += s3;
        acc.lap += lap_s;
        acc.n += 1;
    }
    by_driver
}
