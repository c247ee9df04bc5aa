use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A single offending field in an incoming payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldViolation {
    /// Path of the field, e.g. `rows[2].month`
    pub field: String,
    pub message: String,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn join_violations(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Error, Debug)]
pub enum MetricsError {
    #[error("Validation failed ({} field(s)): {}", .0.len(), join_violations(.0))]
    Validation(Vec<FieldViolation>),

    #[error("Narrative generation failed: {0}")]
    NarrativeFailed(String),

    #[error("Invalid configuration value for {key}: {details}")]
    Config { key: String, details: String },

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    HttpError(String),
}

#[cfg(feature = "gemini")]
impl From<reqwest::Error> for MetricsError {
    fn from(err: reqwest::Error) -> Self {
        MetricsError::HttpError(err.to_string())
    }
}

impl MetricsError {
    /// Offending fields when this is a validation failure, empty otherwise.
    pub fn violations(&self) -> &[FieldViolation] {
        match self {
            MetricsError::Validation(violations) => violations,
            _ => &[],
        }
    }
}

pub type Result<T> = std::result::Result<T, MetricsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_lists_every_field() {
        let err = MetricsError::Validation(vec![
            FieldViolation::new("rows[0].entity", "is required"),
            FieldViolation::new("rows[1].month", "must not be empty"),
        ]);

        let msg = err.to_string();
        assert!(msg.contains("2 field(s)"));
        assert!(msg.contains("rows[0].entity: is required"));
        assert!(msg.contains("rows[1].month: must not be empty"));
        assert_eq!(err.violations().len(), 2);
    }

    #[test]
    fn test_non_validation_has_no_violations() {
        let err = MetricsError::NarrativeFailed("timeout".to_string());
        assert!(err.violations().is_empty());
    }
}
