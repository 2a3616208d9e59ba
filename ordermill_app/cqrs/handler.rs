use async_trait::async_trait;
use std::sync::Arc;

use ordermill_types::errors::ApplicationError;

use crate::cqrs::Outcome;

/// A trait for handlers that execute one kind of event.
///
/// Business failures are returned as `Ok(Outcome::Failure(..))`; an `Err` means the
/// handler itself broke (store unreachable, transaction failure, ...), which is what
/// the mediator records and, for queries, falls back on.
///
/// Handlers may hold injected dependencies but no per-call state.
#[async_trait]
pub trait Handler<E>: Send + Sync
where
    E: Send + 'static,
{
    type Output: Send + 'static;

    async fn handle(&self, event: E) -> Result<Outcome<Self::Output>, ApplicationError>;
}

#[async_trait]
impl<E, H> Handler<E> for Arc<H>
where
    E: Send + 'static,
    H: Handler<E> + ?Sized,
{
    type Output = H::Output;

    async fn handle(&self, event: E) -> Result<Outcome<Self::Output>, ApplicationError> {
        (**self).handle(event).await
    }
}

#[async_trait]
impl<E, H> Handler<E> for Box<H>
where
    E: Send + 'static,
    H: Handler<E> + ?Sized,
{
    type Output = H::Output;

    async fn handle(&self, event: E) -> Result<Outcome<Self::Output>, ApplicationError> {
        (**self).handle(event).await
    }
}
