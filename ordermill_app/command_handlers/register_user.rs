use async_trait::async_trait;
use std::sync::Arc;

use ordermill_types::errors::{ApplicationError, ConstraintKind};

use crate::{
    auth::hash_password,
    config::Config,
    cqrs::{Failure, Handler, Outcome, commands::RegisterUser},
    models::{User, user},
    repository::Values,
    uow::UnitOfWorkProvider,
};

pub struct RegisterUserHandler {
    uow_provider: Arc<dyn UnitOfWorkProvider>,
    config: Arc<Config>,
}

impl RegisterUserHandler {
    pub fn new(uow_provider: Arc<dyn UnitOfWorkProvider>, config: Arc<Config>) -> Self {
        Self {
            uow_provider,
            config,
        }
    }
}

#[async_trait]
impl Handler<RegisterUser> for RegisterUserHandler {
    type Output = i64;

    async fn handle(&self, command: RegisterUser) -> Result<Outcome<i64>, ApplicationError> {
        let dto = command.user;
        if dto.password.chars().count() < self.config.min_password_length {
            return Ok(Outcome::fail(Failure::new(format!(
                "Password must be at least {} characters long",
                self.config.min_password_length
            ))));
        }

        let password_hash = hash_password(&dto.password)?;
        let values = Values::new()
            .set(user::FIRST_NAME.name(), dto.first_name)
            .set(user::LAST_NAME.name(), dto.last_name)
            .set(user::USERNAME.name(), dto.username)
            .set(user::PASSWORD_HASH.name(), password_hash)
            .set(user::EMAIL.name(), dto.email);

        let uow = self.uow_provider.open();
        let users = uow.repository::<User>();
        let added = uow
            .run(move || async move { users.add(values).await })
            .await;

        match added {
            Ok(user_id) => {
                tracing::info!(user_id, "user registered");
                Ok(Outcome::success(user_id))
            }
            Err(e) if e.constraint_violation() == Some((user::USERNAME_KEY, ConstraintKind::Unique)) => {
                Ok(Outcome::fail(Failure::from_error(
                    &e,
                    Some("Username is already taken".to_string()),
                )))
            }
            Err(e) => Err(e),
        }
    }
}
