pub mod mapping;
pub mod session;
pub mod uow;

mod connection;
mod sql;

pub use connection::{DbPool, establish_connection_pool, establish_test_connection_pool};
pub use session::PostgresSession;
pub use uow::PostgresUnitOfWorkProvider;
