pub mod auth;
pub mod bootstrap;
pub mod command_handlers;
pub mod config;
pub mod cqrs;
pub mod dto;
pub mod mediator;
pub mod models;
pub mod order_service;
pub mod queries_handlers;
pub mod registry;
pub mod repository;
pub mod uow;

#[cfg(any(test, feature = "test-utils"))]
#[cfg(not(tarpaulin_include))]
pub mod test_utils;
