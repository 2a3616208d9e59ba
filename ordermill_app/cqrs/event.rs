use std::fmt::Debug;

/// Anything the mediator can route. Dispatch keys off the concrete type,
/// never off field values.
pub trait Event: Debug + Send + Sync + 'static {
    /// The value a successful handling produces.
    type Output: Send + 'static;
}

/// A marker trait for Command structs.
/// Commands are operations that change the state of the system
/// and are owned by exactly one handler.
pub trait Command: Event {}

/// A marker trait for Query structs.
/// Queries read the state of the system. A query can have several candidate
/// handlers, tried in order, so it must be cloneable.
pub trait Query: Event + Clone {}

/// Unqualified type name of `E`, without generic arguments: `CreateOrder`.
pub fn event_name<E: ?Sized>() -> &'static str {
    let full = std::any::type_name::<E>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
