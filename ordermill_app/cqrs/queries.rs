use ordermill_types::errors::ValidationError;

use crate::{
    cqrs::{Event, Query, decorators::Validate},
    dto::{ObtainedOrderDto, UserDto},
};

#[derive(Debug, Clone)]
pub struct GetOrderById {
    pub id: i64,
}

impl Event for GetOrderById {
    type Output = ObtainedOrderDto;
}

impl Query for GetOrderById {}

impl Validate for GetOrderById {
    fn validate(&self) -> Result<(), ValidationError> {
        let mut err = ValidationError::new();
        if self.id < 1 {
            err.add("id", "must be a positive integer");
        }
        err.into_result()
    }
}

#[derive(Debug, Clone)]
pub struct GetAllOrders;

impl Event for GetAllOrders {
    type Output = Vec<ObtainedOrderDto>;
}

impl Query for GetAllOrders {}

#[derive(Debug, Clone)]
pub struct GetUserById {
    pub id: i64,
}

impl Event for GetUserById {
    type Output = UserDto;
}

impl Query for GetUserById {}

#[derive(Clone)]
pub struct AuthenticateUser {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for AuthenticateUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticateUser")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl Event for AuthenticateUser {
    type Output = UserDto;
}

impl Query for AuthenticateUser {}
