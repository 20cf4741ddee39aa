use std::collections::HashMap;

use crate::error::PaceError;
use crate::grid::{self, QualifyingEntry};
use crate::sector_profile::SectorProfile;

/// One qualifying entry joined with historical sector averages. Drivers
/// with no historical profile carry literal 0.0 sectors; the row count
/// always equals the qualifying entry count.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateRow {
    pub driver: String,
    pub driver_code: String,
    pub qualifying_seconds: f64,
    pub avg_sector1: f64,
    pub avg_sector2: f64,
    pub avg_sector3: f64,
}

impl CandidateRow {
    /// Feature vector in model order.
    pub fn features(&self) -> Vec<f64> {
        vec![
            self.qualifying_seconds,
            self.avg_sector1,
            self.avg_sector2,
            self.avg_sector3,
        ]
    }
}

/// Left join of qualifying entries onto sector profiles via the static
/// code table, preserving entry order. An unmapped display name aborts the
/// build; a missing profile does not (zero-fill policy, rookies included).
pub fn build_rows(
    entries: &[QualifyingEntry],
    profiles: &[SectorProfile],
) -> Result<Vec<CandidateRow>, PaceError> {
    let by_code: HashMap<&str, &SectorProfile> = profiles
        .iter()
        .map(|p| (p.driver_code.as_str(), p))
        .collect();

    let mut rows = Vec::with_capacity(entries.len());
    for entry in entries {
        let code = grid::driver_code(entry.driver).ok_or_else(|| PaceError::Mapping {
            driver: entry.driver.to_string(),
        })?;

        let (s1, s2, s3) = match by_code.get(code) {
            Some(p) => (p.avg_sector1, p.avg_sector2, p.avg_sector3),
            None => (0.0, 0.0, 0.0),
        };
        rows.push(CandidateRow {
            driver: entry.driver.to_string(),
            driver_code: code.to_string(),
            qualifying_seconds: entry.qualifying_seconds,
            avg_sector1: s1,
            avg_sector2: s2,
            avg_sector3: s3,
        });
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(code: &str, s1: f64, s2: f64, s3: f64) -> SectorProfile {
        SectorProfile {
            driver_code: code.to_string(),
            avg_sector1: s1,
            avg_sector2: s2,
            avg_sector3: s3,
            valid_laps: 3,
        }
    }

    fn entry(driver: &'static str, seconds: f64) -> QualifyingEntry {
        QualifyingEntry {
            driver,
            qualifying_seconds: seconds,
        }
    }

    #[test]
    fn joins_profile_by_code() {
        let rows = build_rows(
            &[entry("Max Verstappen", 90.817)],
            &[profile("VER", 30.2, 35.1, 28.0)],
        )
        .unwrap();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.driver_code, "VER");
        assert_eq!(row.features(), vec![90.817, 30.2, 35.1, 28.0]);
    }

    #[test]
    fn missing_profile_zero_fills_exactly() {
        let rows = build_rows(&[entry("Isack Hadjar", 91.079)], &[]).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].avg_sector1, 0.0);
        assert_eq!(rows[0].avg_sector2, 0.0);
        assert_eq!(rows[0].avg_sector3, 0.0);
        assert_eq!(rows[0].qualifying_seconds, 91.079);
    }

    #[test]
    fn cardinality_and_order_preserved() {
        let entries = [
            entry("Lando Norris", 90.793),
            entry("Max Verstappen", 90.817),
            entry("Jack Doohan", 92.092),
        ];
        let rows = build_rows(&entries, &[profile("VER", 30.2, 35.1, 28.0)]).unwrap();
        assert_eq!(rows.len(), entries.len());
        assert_eq!(rows[0].driver, "Lando Norris");
        assert_eq!(rows[1].driver, "Max Verstappen");
        assert_eq!(rows[2].driver, "Jack Doohan");
    }

    #[test]
    fn unmapped_driver_is_surfaced_not_skipped() {
        let err = build_rows(&[entry("Juan Pablo Montoya", 89.0)], &[]).unwrap_err();
        assert!(matches!(err, PaceError::Mapping { .. }));
    }
}
