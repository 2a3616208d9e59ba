mod create_order;
mod delete_order;
mod register_user;

pub use create_order::CreateOrderHandler;
pub use delete_order::DeleteOrderHandler;
pub use register_user::RegisterUserHandler;
