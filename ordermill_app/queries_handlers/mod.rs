mod authenticate_user;
mod get_all_orders;
mod get_order_by_id;
mod get_user_by_id;

pub use authenticate_user::AuthenticateUserHandler;
pub use get_all_orders::GetAllOrdersHandler;
pub use get_order_by_id::GetOrderByIdHandler;
pub use get_user_by_id::GetUserByIdHandler;

use std::collections::HashMap;

use ordermill_types::Result;

use crate::{
    dto::{ObtainedOrderDto, ObtainedProductDto},
    models::{Order, OrderItem, Product, order_item, product},
    order_service::OrderService,
    repository::Repository,
};

/// Loads the positions and products of `found` and assembles their DTOs,
/// keeping the order of `found`.
pub(crate) async fn obtain_orders(
    orders: &Repository<Order>,
    found: Vec<Order>,
) -> Result<Vec<ObtainedOrderDto>> {
    if found.is_empty() {
        return Ok(Vec::new());
    }

    let order_ids: Vec<i64> = found.iter().map(|o| o.id).collect();
    let items = orders
        .rebind::<OrderItem>()
        .get_all(&[order_item::ORDER_ID.is_in(order_ids)])
        .await?;

    let mut product_ids: Vec<i64> = items.iter().map(|i| i.product_id).collect();
    product_ids.sort_unstable();
    product_ids.dedup();
    let products: HashMap<i64, Product> = orders
        .rebind::<Product>()
        .get_all(&[product::ID.is_in(product_ids)])
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();

    Ok(found
        .into_iter()
        .map(|order| {
            let positions: Vec<ObtainedProductDto> = items
                .iter()
                .filter(|item| item.order_id == order.id)
                .filter_map(|item| {
                    products
                        .get(&item.product_id)
                        .map(|p| ObtainedProductDto::new(p, item.quantity))
                })
                .collect();
            ObtainedOrderDto {
                id: order.id,
                total: OrderService::total(&positions),
                products: positions,
                order_date: order.order_date,
                created_at: order.created_at,
            }
        })
        .collect())
}
