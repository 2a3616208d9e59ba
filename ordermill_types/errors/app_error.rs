use thiserror::Error;

/// Errors for app logic.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Unrecognized event {0}: no command or query handler registered")]
    UnrecognizedEvent(&'static str),

    #[error("No handler registered for {0}")]
    HandlerNotFound(&'static str),

    #[error("Handler for {0} registered more than once")]
    DuplicateHandler(&'static str),

    #[error("Outcome is a failure, no value present")]
    NoValuePresent,

    #[error("Outcome is a success, no failure present")]
    NoFailurePresent,

    #[error("Wrong authentication credentials")]
    WrongAuthCredentials,

    #[error("Wrong password")]
    PasswordError,

    #[error(transparent)]
    PasswordHash(#[from] password_hash::Error),
}
