use serde::Serialize;
use std::error::Error;

use ordermill_types::errors::{AppError, ValidationError};

use crate::cqrs::event_name;

/// Name and description of one underlying error captured by a [`Failure`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureCause {
    pub name: String,
    pub description: String,
}

/// A human-readable message plus the ordered list of errors that led to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    message: String,
    causes: Vec<FailureCause>,
}

impl Failure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            causes: Vec::new(),
        }
    }

    pub fn with_cause(mut self, name: impl Into<String>, description: impl Into<String>) -> Self {
        self.causes.push(FailureCause {
            name: name.into(),
            description: description.into(),
        });
        self
    }

    /// Captures `err` and its whole `source()` chain, outermost first.
    /// Without an explicit message the error's display text is used.
    pub fn from_error<E: Error + 'static>(err: &E, message: Option<String>) -> Self {
        let mut failure = Self::new(message.unwrap_or_else(|| err.to_string()));
        failure.causes.push(FailureCause {
            name: event_name::<E>().to_string(),
            description: err.to_string(),
        });

        let mut source = err.source();
        while let Some(cause) = source {
            failure.causes.push(FailureCause {
                name: leading_ident(&format!("{cause:?}")),
                description: cause.to_string(),
            });
            source = cause.source();
        }

        failure
    }

    /// The JSON detail payload of the validation error becomes the message.
    pub fn from_validation(err: &ValidationError) -> Self {
        Self::from_error(err, Some(err.to_json()))
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn causes(&self) -> &[FailureCause] {
        &self.causes
    }
}

/// Outcome of a handled command or query: either a value or a [`Failure`], never both.
///
/// Reading the value of a failed outcome (or the message of a successful one) is a
/// contract violation reported as a typed [`AppError`], not a panic.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "data", rename_all = "snake_case")]
pub enum Outcome<T> {
    Success(T),
    Failure(Failure),
}

impl<T> Outcome<T> {
    pub fn success(value: T) -> Self {
        Outcome::Success(value)
    }

    pub fn fail(failure: Failure) -> Self {
        Outcome::Failure(failure)
    }

    pub fn failed(&self) -> bool {
        matches!(self, Outcome::Failure(_))
    }

    pub fn value(&self) -> Result<&T, AppError> {
        match self {
            Outcome::Success(value) => Ok(value),
            Outcome::Failure(_) => Err(AppError::NoValuePresent),
        }
    }

    pub fn into_value(self) -> Result<T, AppError> {
        match self {
            Outcome::Success(value) => Ok(value),
            Outcome::Failure(_) => Err(AppError::NoValuePresent),
        }
    }

    pub fn error_message(&self) -> Result<&str, AppError> {
        self.failure()
            .map(Failure::message)
            .ok_or(AppError::NoFailurePresent)
    }

    pub fn failure(&self) -> Option<&Failure> {
        match self {
            Outcome::Success(_) => None,
            Outcome::Failure(failure) => Some(failure),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Success(value) => Outcome::Success(f(value)),
            Outcome::Failure(failure) => Outcome::Failure(failure),
        }
    }
}

// `Debug` of an error enum starts with the variant name, e.g. `Database(..)`.
fn leading_ident(debug: &str) -> String {
    let ident: String = debug
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == '_')
        .collect();
    if ident.is_empty() {
        "Error".to_string()
    } else {
        ident
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ordermill_types::errors::{ApplicationError, DbError};

    #[test]
    fn test_success_exposes_value_only() {
        let outcome = Outcome::success(42);

        assert!(!outcome.failed());
        assert_eq!(outcome.value().ok(), Some(&42));
        assert!(matches!(
            outcome.error_message(),
            Err(AppError::NoFailurePresent)
        ));
        assert_eq!(outcome.into_value().ok(), Some(42));
    }

    #[test]
    fn test_failure_forbids_value_access() {
        let outcome: Outcome<i64> = Outcome::fail(Failure::new("Order was not found"));

        assert!(outcome.failed());
        assert_eq!(outcome.error_message().ok(), Some("Order was not found"));
        assert!(matches!(outcome.value(), Err(AppError::NoValuePresent)));
        assert!(matches!(outcome.into_value(), Err(AppError::NoValuePresent)));
    }

    #[test]
    fn test_failure_captures_error_chain() {
        let err = ApplicationError::Db(DbError::Transaction("commit refused".to_string()));
        let failure = Failure::from_error(&err, None);

        assert_eq!(failure.message(), "Transaction error: commit refused");
        assert_eq!(failure.causes()[0].name, "ApplicationError");
        assert_eq!(
            failure.causes()[0].description,
            "Transaction error: commit refused"
        );
    }

    #[test]
    fn test_failure_from_validation_uses_json_detail() {
        let mut err = ValidationError::new();
        err.add("id", "must be positive");
        let failure = Failure::from_validation(&err);

        assert!(failure.message().starts_with('['));
        assert!(failure.message().contains("must be positive"));
        assert_eq!(failure.causes()[0].name, "ValidationError");
    }

    #[test]
    fn test_map_keeps_failure() {
        let failed: Outcome<i64> = Outcome::fail(Failure::new("nope"));
        let mapped = failed.map(|v| v * 2);
        assert_eq!(mapped.error_message().ok(), Some("nope"));

        assert_eq!(Outcome::success(2).map(|v| v * 2), Outcome::success(4));
    }

    #[test]
    fn test_outcome_serializes_with_status_tag() {
        let json = serde_json::to_value(Outcome::success(7)).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["data"], 7);

        let json = serde_json::to_value(Outcome::<i64>::fail(Failure::new("x"))).unwrap();
        assert_eq!(json["status"], "failure");
        assert_eq!(json["data"]["message"], "x");
    }
}
