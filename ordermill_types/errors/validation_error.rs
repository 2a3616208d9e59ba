use serde::Serialize;
use thiserror::Error;

/// A single field that failed a shape or range check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
}

/// Raised when an incoming command or query fails its declared checks.
/// The violations are kept in the order they were found.
#[derive(Debug, Clone, Default, PartialEq, Eq, Error, Serialize)]
#[error("Validation failed on {} field(s)", .violations.len())]
pub struct ValidationError {
    violations: Vec<FieldViolation>,
}

impl ValidationError {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.violations.push(FieldViolation {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn violations(&self) -> &[FieldViolation] {
        &self.violations
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    /// `Ok(())` when nothing was collected, otherwise the error itself.
    pub fn into_result(self) -> Result<(), ValidationError> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }

    /// Machine-readable detail payload.
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.violations).unwrap_or_else(|_| self.to_string())
    }
}
