use axum::{
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};

use crate::app_state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/me", get(self::get::me))
        .route("/login", post(self::post::login))
        .route("/logout", post(self::post::logout))
}

mod post {
    use tracing::instrument;

    use crate::auth::backend::{AuthSession, Credentials};
    use crate::domain::User;
    use crate::routes::ApiError;

    use super::*;

    #[instrument(name = "login", skip(auth_session, creds))]
    pub async fn login(
        mut auth_session: AuthSession,
        Json(creds): Json<Credentials>,
    ) -> Result<Json<User>, ApiError> {
        let user = match auth_session.authenticate(creds).await {
            Ok(Some(user)) => user,
            Ok(None) => return Err(ApiError::unauthorized("Invalid email or password")),
            Err(e) => {
                tracing::error!("Authentication failed: {}", e);
                return Err(ApiError::internal("Authentication failed"));
            }
        };

        if let Err(e) = auth_session.login(&user).await {
            tracing::error!("Failed to log in user: {}", e);
            return Err(ApiError::internal("Failed to create session"));
        }

        Ok(Json(user))
    }

    pub async fn logout(mut auth_session: AuthSession) -> StatusCode {
        match auth_session.logout().await {
            Ok(_) => StatusCode::NO_CONTENT,
            Err(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

mod get {
    use crate::auth::backend::AuthSession;
    use crate::domain::User;

    use super::*;

    pub async fn me(auth_session: AuthSession) -> Result<Json<User>, StatusCode> {
        let user = match auth_session.user {
            Some(user) => user,
            None => return Err(StatusCode::UNAUTHORIZED),
        };

        Ok(Json(user))
    }
}
