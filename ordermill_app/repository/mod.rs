//! Generic CRUD over any [`Entity`], driven by [`Predicate`] filters.
//!
//! ```ignore
//! let items = uow.repository::<OrderItem>();
//! items.delete(&[order_item::ORDER_ID.eq(order_id)]).await?;
//! items.rebind::<Order>().delete(&[order::ID.eq(order_id)]).await?;
//! ```

mod connection;
mod crud;
mod entity;
mod filter;
mod record;
mod value;

pub use connection::Connection;
pub use crud::Repository;
pub use entity::{Entity, Table};
pub use filter::{Column, CompareOp, Predicate};
pub use record::Record;
pub use value::{FromValue, Value, Values};
