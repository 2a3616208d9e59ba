use std::{
    any::{Any, TypeId},
    collections::HashMap,
    sync::Arc,
};

use ordermill_types::errors::AppError;

use crate::cqrs::{Command, Event, Handler, Query, event_name};

/// A registered handler behind a trait object, for the event `E`.
pub type DynHandler<E> = Arc<dyn Handler<E, Output = <E as Event>::Output>>;

/// How the mediator dispatches `E`.
pub(crate) enum Route<E: Event> {
    /// The single owner of a command.
    Command(DynHandler<E>),
    /// Candidate handlers of a query, in registration order. `retry` copies the
    /// event for every attempt but the last.
    Query {
        handlers: Vec<DynHandler<E>>,
        retry: fn(&E) -> E,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Command,
    Query,
}

struct Registration {
    name: &'static str,
    kind: EventKind,
    // Route<E> for the event type it is keyed by
    route: Box<dyn Any + Send + Sync>,
}

/// Event type → handler(s). Built once through [`HandlerRegistry::builder`], read-only
/// afterwards.
pub struct HandlerRegistry {
    routes: HashMap<TypeId, Registration>,
}

impl HandlerRegistry {
    pub fn builder() -> HandlerRegistryBuilder {
        HandlerRegistryBuilder::default()
    }

    pub fn kind_of<E: Event>(&self) -> Option<EventKind> {
        self.routes.get(&TypeId::of::<E>()).map(|r| r.kind)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Names of every registered event, sorted.
    pub fn event_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.routes.values().map(|r| r.name).collect();
        names.sort_unstable();
        names
    }

    pub(crate) fn route<E: Event>(&self) -> Option<&Route<E>> {
        self.routes
            .get(&TypeId::of::<E>())
            .and_then(|r| r.route.downcast_ref::<Route<E>>())
    }
}

#[derive(Default)]
pub struct HandlerRegistryBuilder {
    routes: HashMap<TypeId, Registration>,
    expected: Vec<(TypeId, &'static str)>,
    errors: Vec<AppError>,
}

impl HandlerRegistryBuilder {
    /// Registers the owner of `C`. A command has exactly one handler.
    pub fn command<C, H>(mut self, handler: H) -> Self
    where
        C: Command,
        H: Handler<C, Output = C::Output> + 'static,
    {
        let id = TypeId::of::<C>();
        if self.routes.contains_key(&id) {
            self.errors.push(AppError::DuplicateHandler(event_name::<C>()));
            return self;
        }

        let handler: DynHandler<C> = Arc::new(handler);
        self.routes.insert(
            id,
            Registration {
                name: event_name::<C>(),
                kind: EventKind::Command,
                route: Box::new(Route::Command(handler)),
            },
        );
        self
    }

    /// Appends a candidate handler for `Q`; candidates are tried in the order
    /// they were registered.
    pub fn query<Q, H>(mut self, handler: H) -> Self
    where
        Q: Query,
        H: Handler<Q, Output = Q::Output> + 'static,
    {
        let handler: DynHandler<Q> = Arc::new(handler);
        let registration = self
            .routes
            .entry(TypeId::of::<Q>())
            .or_insert_with(|| Registration {
                name: event_name::<Q>(),
                kind: EventKind::Query,
                route: Box::new(Route::<Q>::Query {
                    handlers: Vec::new(),
                    retry: Q::clone,
                }),
            });

        match registration.route.downcast_mut::<Route<Q>>() {
            Some(Route::Query { handlers, .. }) => handlers.push(handler),
            _ => self.errors.push(AppError::DuplicateHandler(event_name::<Q>())),
        }
        self
    }

    /// Declares that `E` must have a handler by the time [`build`](Self::build) runs.
    pub fn expect<E: Event>(mut self) -> Self {
        self.expected.push((TypeId::of::<E>(), event_name::<E>()));
        self
    }

    pub fn build(self) -> Result<HandlerRegistry, AppError> {
        if let Some(err) = self.errors.into_iter().next() {
            return Err(err);
        }
        if let Some((_, name)) = self
            .expected
            .iter()
            .find(|(id, _)| !self.routes.contains_key(id))
        {
            return Err(AppError::HandlerNotFound(name));
        }

        tracing::debug!(events = self.routes.len(), "handler registry built");
        Ok(HandlerRegistry {
            routes: self.routes,
        })
    }
}
