use async_trait::async_trait;
use std::sync::Arc;

use ordermill_types::errors::ApplicationError;

use crate::{
    cqrs::{Failure, Handler, Outcome, queries::GetUserById},
    dto::UserDto,
    models::{User, user},
    uow::UnitOfWorkProvider,
};

pub struct GetUserByIdHandler {
    uow_provider: Arc<dyn UnitOfWorkProvider>,
}

impl GetUserByIdHandler {
    pub fn new(uow_provider: Arc<dyn UnitOfWorkProvider>) -> Self {
        Self { uow_provider }
    }
}

#[async_trait]
impl Handler<GetUserById> for GetUserByIdHandler {
    type Output = UserDto;

    async fn handle(&self, query: GetUserById) -> Result<Outcome<UserDto>, ApplicationError> {
        let uow = self.uow_provider.open();
        let users = uow.repository::<User>();

        match users.get_one(&[user::ID.eq(query.id)]).await? {
            Some(found) => Ok(Outcome::success(found.into())),
            None => Ok(Outcome::fail(Failure::new("User was not found"))),
        }
    }
}
