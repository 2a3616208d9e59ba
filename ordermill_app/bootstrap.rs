use std::sync::Arc;

use ordermill_types::errors::AppError;

use crate::{
    command_handlers::{CreateOrderHandler, DeleteOrderHandler, RegisterUserHandler},
    config::Config,
    cqrs::{
        commands::{CreateOrder, DeleteOrder, RegisterUser},
        decorators::{FailureDecorator, ValidationDecorator},
        queries::{AuthenticateUser, GetAllOrders, GetOrderById, GetUserById},
    },
    mediator::Mediator,
    queries_handlers::{
        AuthenticateUserHandler, GetAllOrdersHandler, GetOrderByIdHandler, GetUserByIdHandler,
    },
    registry::HandlerRegistry,
    uow::UnitOfWorkProvider,
};

/// Wires every use case into a mediator.
///
/// Commands run behind `FailureDecorator(ValidationDecorator(..))`, so callers always get
/// an outcome back. Query handlers keep raising, which is what lets the mediator fall
/// back to another candidate.
pub fn build_mediator(
    uow_provider: Arc<dyn UnitOfWorkProvider>,
    config: Arc<Config>,
) -> Result<Mediator, AppError> {
    let registry = HandlerRegistry::builder()
        .command::<CreateOrder, _>(FailureDecorator::new(ValidationDecorator::new(
            CreateOrderHandler::new(uow_provider.clone()),
        )))
        .command::<DeleteOrder, _>(FailureDecorator::new(ValidationDecorator::new(
            DeleteOrderHandler::new(uow_provider.clone()),
        )))
        .command::<RegisterUser, _>(FailureDecorator::new(ValidationDecorator::new(
            RegisterUserHandler::new(uow_provider.clone(), config),
        )))
        .query::<GetOrderById, _>(ValidationDecorator::new(GetOrderByIdHandler::new(
            uow_provider.clone(),
        )))
        .query::<GetAllOrders, _>(GetAllOrdersHandler::new(uow_provider.clone()))
        .query::<GetUserById, _>(GetUserByIdHandler::new(uow_provider.clone()))
        .query::<AuthenticateUser, _>(AuthenticateUserHandler::new(uow_provider))
        .expect::<CreateOrder>()
        .expect::<DeleteOrder>()
        .expect::<RegisterUser>()
        .expect::<GetOrderById>()
        .expect::<GetAllOrders>()
        .expect::<GetUserById>()
        .expect::<AuthenticateUser>()
        .build()?;

    tracing::info!(events = ?registry.event_names(), "mediator ready");
    Ok(Mediator::new(registry))
}
