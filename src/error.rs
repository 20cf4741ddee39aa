use thiserror::Error;

/// Fatal pipeline failures. A driver without historical sector data is
/// deliberately absent here: that case is handled by the zero-fill policy
/// in `candidates` and must never abort a run.
#[derive(Debug, Error)]
pub enum PaceError {
    /// The timing provider could not produce lap data for the requested
    /// session, or the data is unusable for training.
    #[error("session data unavailable: {reason}")]
    DataUnavailable { reason: String },

    /// A qualifying display name has no entry in the driver code table.
    /// Raised before any prediction is attempted; never skipped.
    #[error("no driver code mapped for {driver:?}")]
    Mapping { driver: String },

    /// Feature matrix dimensions do not match what fit/predict expects.
    #[error("{what}: expected {expected}, got {got}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },
}

impl PaceError {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::DataUnavailable {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_readable() {
        let err = PaceError::Mapping {
            driver: "Max Verstappen".to_string(),
        };
        assert!(err.to_string().contains("Max Verstappen"));

        let err = PaceError::ShapeMismatch {
            what: "feature width",
            expected: 4,
            got: 3,
        };
        assert_eq!(err.to_string(), "feature width: expected 4, got 3");
    }
}
