use async_trait::async_trait;
use std::sync::Arc;

use ordermill_types::{Result, errors::ApplicationError};

use crate::{
    cqrs::{Failure, Handler, Outcome, queries::GetOrderById},
    dto::ObtainedOrderDto,
    models::{Order, order},
    queries_handlers::obtain_orders,
    repository::Repository,
    uow::UnitOfWorkProvider,
};

pub struct GetOrderByIdHandler {
    uow_provider: Arc<dyn UnitOfWorkProvider>,
}

impl GetOrderByIdHandler {
    pub fn new(uow_provider: Arc<dyn UnitOfWorkProvider>) -> Self {
        Self { uow_provider }
    }
}

#[async_trait]
impl Handler<GetOrderById> for GetOrderByIdHandler {
    type Output = ObtainedOrderDto;

    async fn handle(
        &self,
        query: GetOrderById,
    ) -> Result<Outcome<ObtainedOrderDto>, ApplicationError> {
        let uow = self.uow_provider.open();
        let orders = uow.repository::<Order>();

        let found = uow
            .run(move || async move { find_order(&orders, query.id).await })
            .await?;

        match found {
            Some(dto) => Ok(Outcome::success(dto)),
            None => Ok(Outcome::fail(Failure::new("Order was not found"))),
        }
    }
}

async fn find_order(orders: &Repository<Order>, id: i64) -> Result<Option<ObtainedOrderDto>> {
    let Some(found) = orders.get_one(&[order::ID.eq(id)]).await? else {
        return Ok(None);
    };
    Ok(obtain_orders(orders, vec![found]).await?.pop())
}
