use async_trait::async_trait;
use axum_login::{AuthnBackend, UserId as SessionUserId};
use serde::Deserialize;
use sqlx::PgPool;

use crate::{
    domain::User,
    repositories::{RepositoryError, UserRepository, UserRepositoryImpl},
};

use super::password::verify_password;

#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

#[derive(Debug, Clone)]
pub struct AuthBackend {
    db: PgPool,
}

impl AuthBackend {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AuthnBackend for AuthBackend {
    type User = User;
    type Credentials = Credentials;
    type Error = BackendError;

    async fn authenticate(
        &self,
        creds: Self::Credentials,
    ) -> Result<Option<Self::User>, Self::Error> {
        let user_repo = UserRepositoryImpl::new(self.db.clone());
        let user = user_repo.get_user_by_email(&creds.email).await?;

        Ok(user.filter(|user| verify_password(&creds.password, &user.password_hash)))
    }

    async fn get_user(
        &self,
        user_id: &SessionUserId<Self>,
    ) -> Result<Option<Self::User>, Self::Error> {
        let user_repo = UserRepositoryImpl::new(self.db.clone());
        match user_repo.get_user(*user_id).await {
            Ok(user) => Ok(Some(user)),
            Err(RepositoryError::NotFound(_)) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

pub type AuthSession = axum_login::AuthSession<AuthBackend>;
