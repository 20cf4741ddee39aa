use crate::error::PaceError;

/// One hand-entered qualifying result for the upcoming race.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualifyingEntry {
    pub driver: &'static str,
    pub qualifying_seconds: f64,
}

const fn q(driver: &'static str, qualifying_seconds: f64) -> QualifyingEntry {
    QualifyingEntry {
        driver,
        qualifying_seconds,
    }
}

/// 2025 Chinese GP qualifying, grid order. Hand-curated configuration, not
/// fetched: the timed session ends hours before this tool is useful.
pub const QUALIFYING: &[QualifyingEntry] = &[
    q("Oscar Piastri", 90.641),
    q("George Russell", 90.723),
    q("Lando Norris", 90.793),
    q("Max Verstappen", 90.817),
    q("Lewis Hamilton", 90.927),
    q("Charles Leclerc", 91.021),
    q("Isack Hadjar", 91.079),
    q("Andrea Kimi Antonelli", 91.103),
    q("Yuki Tsunoda", 91.638),
    q("Alexander Albon", 91.706),
    q("Esteban Ocon", 91.625),
    q("Nico Hülkenberg", 91.632),
    q("Fernando Alonso", 91.688),
    q("Lance Stroll", 91.773),
    q("Carlos Sainz Jr.", 91.840),
    q("Pierre Gasly", 91.992),
    q("Oliver Bearman", 92.018),
    q("Jack Doohan", 92.092),
    q("Gabriel Bortoleto", 92.141),
    q("Liam Lawson", 92.174),
];

/// Display name -> three-letter timing code. Every name in `QUALIFYING`
/// must appear here; `validate_grid` enforces that at startup.
pub const DRIVER_CODES: &[(&str, &str)] = &[
    ("Oscar Piastri", "PIA"),
    ("George Russell", "RUS"),
    ("Lando Norris", "NOR"),
    ("Max Verstappen", "VER"),
    ("Lewis Hamilton", "HAM"),
    ("Charles Leclerc", "LEC"),
    ("Isack Hadjar", "HAD"),
    ("Andrea Kimi Antonelli", "ANT"),
    ("Yuki Tsunoda", "TSU"),
    ("Alexander Albon", "ALB"),
    ("Esteban Ocon", "OCO"),
    ("Nico Hülkenberg", "HUL"),
    ("Fernando Alonso", "ALO"),
    ("Lance Stroll", "STR"),
    ("Carlos Sainz Jr.", "SAI"),
    ("Pierre Gasly", "GAS"),
    ("Oliver Bearman", "BEA"),
    ("Jack Doohan", "DOO"),
    ("Gabriel Bortoleto", "BOR"),
    ("Liam Lawson", "LAW"),
];

pub fn driver_code(display_name: &str) -> Option<&'static str> {
    DRIVER_CODES
        .iter()
        .find(|(name, _)| *name == display_name)
        .map(|(_, code)| *code)
}

/// Fail fast: every qualifying name must resolve to a code before the
/// pipeline touches the network or the model.
pub fn validate_grid() -> Result<(), PaceError> {
    validate_entries(QUALIFYING)
}

pub fn validate_entries(entries: &[QualifyingEntry]) -> Result<(), PaceError> {
    for entry in entries {
        if driver_code(entry.driver).is_none() {
            return Err(PaceError::Mapping {
                driver: entry.driver.to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_grid_is_fully_mapped() {
        validate_grid().expect("every qualifying name should have a code");
        assert_eq!(QUALIFYING.len(), 20);
        assert_eq!(DRIVER_CODES.len(), 20);
    }

    #[test]
    fn codes_are_unique() {
        let mut codes: Vec<&str> = DRIVER_CODES.iter().map(|(_, c)| *c).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), DRIVER_CODES.len());
    }

    #[test]
    fn unknown_name_fails_validation() {
        let entries = [q("Michael Schumacher", 88.0)];
        let err = validate_entries(&entries).unwrap_err();
        assert!(matches!(err, PaceError::Mapping { .. }));
        assert!(err.to_string().contains("Michael Schumacher"));
    }

    #[test]
    fn lookup_is_exact() {
        assert_eq!(driver_code("Max Verstappen"), Some("VER"));
        assert_eq!(driver_code("max verstappen"), None);
    }
}
