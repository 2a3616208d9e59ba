use async_trait::async_trait;
use std::sync::Arc;

use ordermill_types::{Result, errors::ApplicationError};

use crate::{
    cqrs::{Handler, Outcome, queries::GetAllOrders},
    dto::ObtainedOrderDto,
    models::Order,
    queries_handlers::obtain_orders,
    repository::Repository,
    uow::UnitOfWorkProvider,
};

pub struct GetAllOrdersHandler {
    uow_provider: Arc<dyn UnitOfWorkProvider>,
}

impl GetAllOrdersHandler {
    pub fn new(uow_provider: Arc<dyn UnitOfWorkProvider>) -> Self {
        Self { uow_provider }
    }
}

#[async_trait]
impl Handler<GetAllOrders> for GetAllOrdersHandler {
    type Output = Vec<ObtainedOrderDto>;

    async fn handle(
        &self,
        _query: GetAllOrders,
    ) -> Result<Outcome<Vec<ObtainedOrderDto>>, ApplicationError> {
        let uow = self.uow_provider.open();
        let orders = uow.repository::<Order>();

        let all = uow
            .run(move || async move { all_orders(&orders).await })
            .await?;

        Ok(Outcome::success(all))
    }
}

async fn all_orders(orders: &Repository<Order>) -> Result<Vec<ObtainedOrderDto>> {
    let found = orders.get_all(&[]).await?;
    obtain_orders(orders, found).await
}
