/// error.rs — Error taxonomy for the pairs engine
///
/// Four failure kinds, each carrying enough context to say which stage
/// and which timestamp / column / field caused the abort:
///
///   EmptyIntersection — the two price series share no timestamp
///   DegenerateInput   — zero-variance regressor or zero-variance spread
///   InvalidConfig     — parameter out of range or thresholds mis-ordered
///   DataIntegrity     — missing / non-finite value at a bar being processed
use chrono::{DateTime, Utc};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PairsError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PairsError {
    #[error("no overlapping timestamps between {left} ({left_len} rows) and {right} ({right_len} rows)")]
    EmptyIntersection {
        left: String,
        right: String,
        left_len: usize,
        right_len: usize,
    },

    #[error("degenerate input in {stage}: {reason}")]
    DegenerateInput { stage: &'static str, reason: String },

    #[error("invalid config: {field}: {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    #[error("data integrity error at bar {index} ({timestamp}), column {column}: {reason}")]
    DataIntegrity {
        index: usize,
        timestamp: DateTime<Utc>,
        column: &'static str,
        reason: String,
    },
}

/// Discriminant of [`PairsError`], for callers that branch on the failure
/// class without inspecting the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    EmptyIntersection,
    DegenerateInput,
    InvalidConfig,
    DataIntegrity,
}

impl PairsError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PairsError::EmptyIntersection { .. } => ErrorKind::EmptyIntersection,
            PairsError::DegenerateInput { .. } => ErrorKind::DegenerateInput,
            PairsError::InvalidConfig { .. } => ErrorKind::InvalidConfig,
            PairsError::DataIntegrity { .. } => ErrorKind::DataIntegrity,
        }
    }

    pub(crate) fn invalid_config(field: &'static str, reason: impl Into<String>) -> Self {
        PairsError::InvalidConfig { field, reason: reason.into() }
    }

    pub(crate) fn degenerate(stage: &'static str, reason: impl Into<String>) -> Self {
        PairsError::DegenerateInput { stage, reason: reason.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_matches_variant() {
        let e = PairsError::invalid_config("exit_threshold", "must be < entry_threshold");
        assert_eq!(e.kind(), ErrorKind::InvalidConfig);
        assert!(e.to_string().contains("exit_threshold"));

        let e = PairsError::degenerate("spread", "std = 0");
        assert_eq!(e.kind(), ErrorKind::DegenerateInput);
    }
}
