use async_trait::async_trait;
use std::sync::Arc;

use ordermill_types::errors::{AppError, ApplicationError};

use crate::{
    auth::verify_password,
    cqrs::{Failure, Handler, Outcome, queries::AuthenticateUser},
    dto::UserDto,
    models::{User, user},
    uow::UnitOfWorkProvider,
};

pub struct AuthenticateUserHandler {
    uow_provider: Arc<dyn UnitOfWorkProvider>,
}

impl AuthenticateUserHandler {
    pub fn new(uow_provider: Arc<dyn UnitOfWorkProvider>) -> Self {
        Self { uow_provider }
    }
}

#[async_trait]
impl Handler<AuthenticateUser> for AuthenticateUserHandler {
    type Output = UserDto;

    async fn handle(&self, query: AuthenticateUser) -> Result<Outcome<UserDto>, ApplicationError> {
        let uow = self.uow_provider.open();
        let users = uow.repository::<User>();

        // Unknown usernames and wrong passwords look the same to the caller.
        let rejected = || {
            Outcome::fail(Failure::from_error(&AppError::WrongAuthCredentials, None))
        };

        let Some(found) = users
            .get_one(&[user::USERNAME.eq(query.username.as_str())])
            .await?
        else {
            return Ok(rejected());
        };

        match verify_password(&found.password_hash, &query.password) {
            Ok(()) => Ok(Outcome::success(found.into())),
            Err(AppError::PasswordError) => Ok(rejected()),
            Err(e) => Err(e.into()),
        }
    }
}
