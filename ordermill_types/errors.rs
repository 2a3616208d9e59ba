use thiserror::Error;

pub mod app_error;
pub mod db_error;
pub mod validation_error;

pub use app_error::AppError;
pub use db_error::{ConstraintKind, DbError};
pub use validation_error::{FieldViolation, ValidationError};

pub type Result<T, E = ApplicationError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error(transparent)]
    App(#[from] AppError),

    #[error(transparent)]
    Db(#[from] DbError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("JSON error")]
    Json(#[from] serde_json::Error),

    #[error("Infrastructure error: {0}")]
    Infrastructure(String),

    #[error("An unknown error occurred: {0}")]
    Unknown(String),
}

// signals, sockets and files the process itself depends on
impl From<std::io::Error> for ApplicationError {
    fn from(err: std::io::Error) -> Self {
        ApplicationError::Infrastructure(err.to_string())
    }
}

impl From<anyhow::Error> for ApplicationError {
    fn from(err: anyhow::Error) -> Self {
        ApplicationError::Unknown(err.to_string())
    }
}

impl ApplicationError {
    /// Returns the constraint violation carried by this error, if any.
    pub fn constraint_violation(&self) -> Option<(&str, ConstraintKind)> {
        match self {
            ApplicationError::Db(DbError::ConstraintViolation {
                constraint, kind, ..
            }) => Some((constraint.as_str(), *kind)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constraint_violation_is_exposed() {
        let err: ApplicationError = DbError::ConstraintViolation {
            constraint: "users_username_key".to_string(),
            kind: ConstraintKind::Unique,
            detail: "Key (username)=(bob) already exists.".to_string(),
        }
        .into();

        assert_eq!(
            err.constraint_violation(),
            Some(("users_username_key", ConstraintKind::Unique))
        );
        assert!(err.to_string().contains("users_username_key"));
    }

    #[test]
    fn test_other_errors_have_no_constraint() {
        let err: ApplicationError = AppError::NoValuePresent.into();
        assert_eq!(err.constraint_violation(), None);

        let err: ApplicationError = anyhow::anyhow!("boom").into();
        assert!(matches!(err, ApplicationError::Unknown(ref m) if m == "boom"));
    }

    #[test]
    fn test_io_error_is_infrastructure() {
        let io = std::io::Error::other("signal handler unavailable");

        let err: ApplicationError = io.into();

        assert!(matches!(err, ApplicationError::Infrastructure(_)));
        assert_eq!(
            err.to_string(),
            "Infrastructure error: signal handler unavailable"
        );
    }
}
