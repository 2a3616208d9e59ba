//! Handler decorators.
//!
//! A decorator owns exactly one inner handler and implements [`Handler`] for the same
//! event and output, so chains are built by plain nesting:
//!
//! ```ignore
//! let handler = FailureDecorator::new(ValidationDecorator::new(CreateOrderHandler::new(provider)));
//! ```

use async_trait::async_trait;

use ordermill_types::errors::{ApplicationError, ValidationError};

use crate::cqrs::{Failure, Handler, Outcome};

/// Shape and range checks an event declares about itself.
/// Implementations only inspect the event, they never rewrite it.
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError>;
}

/// Runs [`Validate::validate`] before the inner handler and short-circuits with a
/// failed outcome when it does not pass. The inner handler is never invoked for an
/// invalid event.
pub struct ValidationDecorator<H> {
    inner: H,
}

impl<H> ValidationDecorator<H> {
    pub fn new(inner: H) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<E, H> Handler<E> for ValidationDecorator<H>
where
    E: Validate + Send + 'static,
    H: Handler<E>,
{
    type Output = H::Output;

    async fn handle(&self, event: E) -> Result<Outcome<Self::Output>, ApplicationError> {
        if let Err(err) = event.validate() {
            tracing::debug!(violations = err.violations().len(), "rejected invalid event");
            return Ok(Outcome::fail(Failure::from_validation(&err)));
        }
        self.inner.handle(event).await
    }
}

/// Turns errors raised by the inner handler into failed outcomes, keeping the error
/// chain as the failure's causes.
pub struct FailureDecorator<H> {
    inner: H,
}

impl<H> FailureDecorator<H> {
    pub fn new(inner: H) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<E, H> Handler<E> for FailureDecorator<H>
where
    E: Send + 'static,
    H: Handler<E>,
{
    type Output = H::Output;

    async fn handle(&self, event: E) -> Result<Outcome<Self::Output>, ApplicationError> {
        match self.inner.handle(event).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                tracing::warn!(error = %err, "handler raised, converting to failure");
                Ok(Outcome::fail(Failure::from_error(&err, None)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ordermill_types::errors::{DbError, ValidationError};
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    #[derive(Debug)]
    struct Ping {
        count: i64,
    }

    impl Validate for Ping {
        fn validate(&self) -> Result<(), ValidationError> {
            let mut err = ValidationError::new();
            if self.count < 1 {
                err.add("count", "must be at least 1");
            }
            err.into_result()
        }
    }

    #[derive(Default)]
    struct CountingHandler {
        calls: Arc<AtomicUsize>,
        raise: bool,
    }

    #[async_trait]
    impl Handler<Ping> for CountingHandler {
        type Output = i64;

        async fn handle(&self, event: Ping) -> Result<Outcome<i64>, ApplicationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.raise {
                return Err(DbError::Transaction("connection reset".to_string()).into());
            }
            Ok(Outcome::success(event.count * 10))
        }
    }

    #[tokio::test]
    async fn test_validation_short_circuits() {
        let calls = Arc::new(AtomicUsize::new(0));
        let handler = ValidationDecorator::new(CountingHandler {
            calls: calls.clone(),
            raise: false,
        });

        let outcome = handler.handle(Ping { count: 0 }).await.unwrap();

        assert!(outcome.failed());
        assert!(outcome.error_message().unwrap().contains("count"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_validation_delegates_valid_event() {
        let calls = Arc::new(AtomicUsize::new(0));
        let handler = ValidationDecorator::new(CountingHandler {
            calls: calls.clone(),
            raise: false,
        });

        let outcome = handler.handle(Ping { count: 3 }).await.unwrap();

        assert_eq!(outcome, Outcome::success(30));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failure_decorator_converts_errors() {
        let handler = FailureDecorator::new(CountingHandler {
            raise: true,
            ..Default::default()
        });

        let outcome = handler.handle(Ping { count: 1 }).await.unwrap();

        assert!(outcome.failed());
        assert_eq!(
            outcome.error_message().unwrap(),
            "Transaction error: connection reset"
        );
    }

    #[tokio::test]
    async fn test_decorators_nest() {
        let calls = Arc::new(AtomicUsize::new(0));
        let handler = FailureDecorator::new(ValidationDecorator::new(CountingHandler {
            calls: calls.clone(),
            raise: true,
        }));

        let invalid = handler.handle(Ping { count: -1 }).await.unwrap();
        assert!(invalid.error_message().unwrap().contains("must be at least 1"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let raised = handler.handle(Ping { count: 2 }).await.unwrap();
        assert!(raised.failed());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
