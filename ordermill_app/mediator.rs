use tracing::Instrument;
use uuid::Uuid;

use ordermill_types::errors::{AppError, ApplicationError};

use crate::{
    cqrs::{Command, Event, Failure, Outcome, Query, event_name},
    registry::{DynHandler, HandlerRegistry, Route},
};

/// Routes commands and queries to the handlers of a [`HandlerRegistry`].
///
/// - A command goes to its single handler; an error it raises is logged and returned.
/// - A query goes through its candidate handlers one at a time, in order, until one
///   completes without raising. When all of them raise, the caller gets a failed
///   outcome listing every captured error.
/// - An event type with no registration is an [`AppError::UnrecognizedEvent`] and
///   reaches no handler.
///
/// The mediator holds no per-request state, so concurrent `handle` calls are
/// independent of each other.
pub struct Mediator {
    registry: HandlerRegistry,
}

impl Mediator {
    pub fn new(registry: HandlerRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    pub async fn handle<E: Event>(&self, event: E) -> Result<Outcome<E::Output>, ApplicationError> {
        let name = event_name::<E>();
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("dispatch", event = name, %request_id);

        let Some(route) = self.registry.route::<E>() else {
            span.in_scope(|| tracing::error!("no handler registered"));
            return Err(AppError::UnrecognizedEvent(name).into());
        };

        async move {
            tracing::debug!("dispatching");
            match route {
                Route::Command(handler) => dispatch_command(handler, event).await,
                Route::Query { handlers, retry } => {
                    dispatch_query(name, handlers, *retry, event).await
                }
            }
        }
        .instrument(span)
        .await
    }

    pub async fn execute<C: Command>(
        &self,
        command: C,
    ) -> Result<Outcome<C::Output>, ApplicationError> {
        self.handle(command).await
    }

    pub async fn query<Q: Query>(&self, query: Q) -> Result<Outcome<Q::Output>, ApplicationError> {
        self.handle(query).await
    }
}

async fn dispatch_command<E: Event>(
    handler: &DynHandler<E>,
    event: E,
) -> Result<Outcome<E::Output>, ApplicationError> {
    match handler.handle(event).await {
        Ok(outcome) => Ok(outcome),
        Err(err) => {
            tracing::error!(error = %err, "command handler failed");
            Err(err)
        }
    }
}

async fn dispatch_query<E: Event>(
    name: &'static str,
    handlers: &[DynHandler<E>],
    retry: fn(&E) -> E,
    event: E,
) -> Result<Outcome<E::Output>, ApplicationError> {
    let last = handlers.len().saturating_sub(1);
    let mut pending = Some(event);
    let mut errors = Vec::new();

    for (attempt, handler) in handlers.iter().enumerate() {
        let Some(current) = pending.take() else {
            break;
        };
        if attempt < last {
            pending = Some(retry(&current));
        }

        match handler.handle(current).await {
            Ok(outcome) => return Ok(outcome),
            Err(err) => {
                tracing::warn!(attempt, error = %err, "query handler failed, trying next");
                errors.push(err);
            }
        }
    }

    tracing::error!(attempts = errors.len(), "every query handler failed");
    let mut failure = Failure::new(format!("No handler could answer {name}"));
    for err in &errors {
        for cause in Failure::from_error(err, None).causes() {
            failure = failure.with_cause(cause.name.clone(), cause.description.clone());
        }
    }
    Ok(Outcome::fail(failure))
}
