use async_trait::async_trait;
use std::sync::Arc;

use ordermill_types::{Result, errors::ApplicationError};

use crate::{
    cqrs::{Failure, Handler, Outcome, commands::DeleteOrder},
    models::{Order, OrderItem, order, order_item},
    repository::Repository,
    uow::UnitOfWorkProvider,
};

pub struct DeleteOrderHandler {
    uow_provider: Arc<dyn UnitOfWorkProvider>,
}

impl DeleteOrderHandler {
    pub fn new(uow_provider: Arc<dyn UnitOfWorkProvider>) -> Self {
        Self { uow_provider }
    }
}

#[async_trait]
impl Handler<DeleteOrder> for DeleteOrderHandler {
    type Output = ();

    async fn handle(&self, command: DeleteOrder) -> Result<Outcome<()>, ApplicationError> {
        let uow = self.uow_provider.open();
        let items = uow.repository::<OrderItem>();
        let order_id = command.order_id;

        let deleted = uow
            .run(move || async move { delete_order(&items, order_id).await })
            .await?;

        if deleted {
            tracing::info!(order_id, "order deleted");
            Ok(Outcome::success(()))
        } else {
            Ok(Outcome::fail(Failure::new("Order was not found")))
        }
    }
}

/// Positions go first so the order row is no longer referenced.
async fn delete_order(items: &Repository<OrderItem>, order_id: i64) -> Result<bool> {
    let positions = items.delete(&[order_item::ORDER_ID.eq(order_id)]).await?;
    let orders = items.rebind::<Order>().delete(&[order::ID.eq(order_id)]).await?;
    tracing::debug!(order_id, positions = positions.len(), "order rows removed");
    Ok(!orders.is_empty())
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::{
        repository::{Connection, Values},
        test_utils::{InMemoryConnection, InMemoryDatabase, InMemoryUnitOfWorkProvider},
    };

    async fn seed_order(db: &Arc<InMemoryDatabase>) -> i64 {
        let conn: Arc<dyn Connection> = Arc::new(InMemoryConnection::new(db.clone()));
        let orders = Repository::<Order>::new(conn);
        let order_id = orders
            .add(Values::new().set("order_date", Utc::now()))
            .await
            .unwrap();
        orders
            .rebind::<OrderItem>()
            .add_many(&[OrderItem::new(order_id, 1, 2), OrderItem::new(order_id, 2, 1)])
            .await
            .unwrap();
        order_id
    }

    fn setup() -> (Arc<InMemoryDatabase>, DeleteOrderHandler) {
        let db = InMemoryDatabase::with_order_schema();
        db.seed_product(1, 1_000, 2);
        db.seed_product(2, 250, 1);
        let provider = Arc::new(InMemoryUnitOfWorkProvider::new(db.clone()));
        (db, DeleteOrderHandler::new(provider))
    }

    #[tokio::test]
    async fn test_removes_order_and_its_positions() {
        let (db, handler) = setup();
        let order_id = seed_order(&db).await;
        let other = seed_order(&db).await;

        let outcome = handler.handle(DeleteOrder { order_id }).await.unwrap();

        assert_eq!(outcome, Outcome::success(()));
        assert_eq!(db.rows("orders").len(), 1);
        assert_eq!(db.rows("order_items").len(), 2);
        assert_eq!(
            db.rows("orders")[0].get::<i64>("id").unwrap(),
            other
        );
    }

    #[tokio::test]
    async fn test_missing_order_is_a_failure() {
        let (db, handler) = setup();

        let outcome = handler.handle(DeleteOrder { order_id: 404 }).await.unwrap();

        assert_eq!(outcome.error_message().unwrap(), "Order was not found");
        assert_eq!(db.commits(), 1);
    }

    #[tokio::test]
    async fn test_failed_commit_keeps_everything() {
        let (db, handler) = setup();
        let order_id = seed_order(&db).await;
        db.fail_next_commit();

        let result = handler.handle(DeleteOrder { order_id }).await;

        assert!(result.is_err());
        assert_eq!(db.rows("orders").len(), 1);
        assert_eq!(db.rows("order_items").len(), 2);
    }
}
