use async_trait::async_trait;
use std::sync::Arc;

use ordermill_types::{
    Result,
    errors::{ApplicationError, ConstraintKind, ValidationError},
};

use crate::{
    cqrs::{Failure, Handler, Outcome, commands::CreateOrder},
    dto::CreateOrderDto,
    models::{Order, OrderItem, order},
    repository::{Repository, Values},
    uow::UnitOfWorkProvider,
};

pub struct CreateOrderHandler {
    uow_provider: Arc<dyn UnitOfWorkProvider>,
}

impl CreateOrderHandler {
    pub fn new(uow_provider: Arc<dyn UnitOfWorkProvider>) -> Self {
        Self { uow_provider }
    }
}

#[async_trait]
impl Handler<CreateOrder> for CreateOrderHandler {
    type Output = i64;

    async fn handle(&self, command: CreateOrder) -> Result<Outcome<i64>, ApplicationError> {
        let uow = self.uow_provider.open();
        let orders = uow.repository::<Order>();

        let scope = uow.scope().await?;
        let created = insert_order(&orders, &command.order).await;
        match scope.finish(created).await {
            Ok(order_id) => {
                tracing::info!(order_id, positions = command.order.products.len(), "order created");
                Ok(Outcome::success(order_id))
            }
            Err(e) if is_unknown_product(&e) => Ok(Outcome::fail(Failure::from_error(
                &e,
                Some("Product was not found".to_string()),
            ))),
            Err(e) => Err(e),
        }
    }
}

/// The order row first, then one position row per product.
async fn insert_order(orders: &Repository<Order>, dto: &CreateOrderDto) -> Result<i64> {
    let order_id = orders
        .add(Values::new().set(order::ORDER_DATE.name(), dto.order_date))
        .await?;

    let mut positions = Vec::with_capacity(dto.products.len());
    for (i, product) in dto.products.iter().enumerate() {
        let quantity = i16::try_from(product.quantity).map_err(|_| {
            let mut err = ValidationError::new();
            err.add(format!("products[{i}].quantity"), "is out of range");
            err
        })?;
        positions.push(OrderItem::new(order_id, product.id, quantity));
    }
    orders.rebind::<OrderItem>().add_many(&positions).await?;

    Ok(order_id)
}

fn is_unknown_product(err: &ApplicationError) -> bool {
    err.constraint_violation() == Some((OrderItem::PRODUCT_FK, ConstraintKind::ForeignKey))
}
