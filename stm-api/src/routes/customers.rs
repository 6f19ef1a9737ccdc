use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;
use tracing::instrument;

use crate::{
    app_state::AppState,
    auth::AuthUser,
    domain::{Customer, Role},
    repositories::{CustomerUpdate, NewCustomer},
    routes::ApiError,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_customers).post(create_customer))
        .route("/:id", put(update_customer).delete(delete_customer))
}

fn require_admin(user: &AuthUser) -> Result<(), ApiError> {
    if user.role != Role::Admin {
        return Err(ApiError::forbidden("admin role required"));
    }

    Ok(())
}

#[derive(Debug, Deserialize)]
struct CustomerBody {
    name: Option<String>,
    number: Option<String>,
}

async fn list_customers(
    State(app_state): State<AppState>,
) -> Result<Json<Vec<Customer>>, ApiError> {
    let customers = app_state.customer_repo.all_customers().await?;

    Ok(Json(customers))
}

#[instrument(name = "create_customer", skip(user, app_state))]
async fn create_customer(
    user: AuthUser,
    State(app_state): State<AppState>,
    Json(body): Json<CustomerBody>,
) -> Result<(StatusCode, Json<Customer>), ApiError> {
    require_admin(&user)?;

    let name = body
        .name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| ApiError::bad_request("name required"))?;

    let customer = app_state
        .customer_repo
        .create_customer(&NewCustomer {
            name: name.to_string(),
            number: body.number,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(customer)))
}

#[instrument(name = "update_customer", skip(user, app_state))]
async fn update_customer(
    user: AuthUser,
    State(app_state): State<AppState>,
    Path(id): Path<i32>,
    Json(body): Json<CustomerBody>,
) -> Result<Json<Customer>, ApiError> {
    require_admin(&user)?;

    let name = match body.name.as_deref().map(str::trim) {
        Some("") => return Err(ApiError::bad_request("name must not be empty")),
        Some(name) => Some(name.to_string()),
        None => None,
    };

    let customer = app_state
        .customer_repo
        .update_customer(
            id,
            &CustomerUpdate {
                name,
                number: body.number,
            },
        )
        .await?;

    Ok(Json(customer))
}

#[instrument(name = "delete_customer", skip(user, app_state))]
async fn delete_customer(
    user: AuthUser,
    State(app_state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    require_admin(&user)?;

    app_state.customer_repo.delete_customer(id).await?;

    Ok(StatusCode::NO_CONTENT)
}
