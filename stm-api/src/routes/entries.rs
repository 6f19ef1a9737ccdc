use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;
use time::Date;
use tracing::instrument;

use crate::{
    app_state::AppState,
    auth::AuthUser,
    domain::{parse_entry_date, EntryDraft, TimeEntry},
    routes::ApiError,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_entries).post(create_entry))
        .route("/:id", put(update_entry).delete(delete_entry))
}

#[derive(Debug, Deserialize)]
struct RangeQuery {
    from: Option<String>,
    to: Option<String>,
}

fn parse_date_param(raw: Option<&str>) -> Result<Option<Date>, ApiError> {
    raw.map(|raw| {
        parse_entry_date(raw).map_err(|_| ApiError::bad_request(format!("invalid date: {raw}")))
    })
    .transpose()
}

#[instrument(name = "list_entries", skip(user, app_state))]
async fn list_entries(
    user: AuthUser,
    State(app_state): State<AppState>,
    Query(range): Query<RangeQuery>,
) -> Result<Json<Vec<TimeEntry>>, ApiError> {
    let from = parse_date_param(range.from.as_deref())?;
    let to = parse_date_param(range.to.as_deref())?;

    let entries = app_state.entry_service.list(user.id, from, to).await?;

    Ok(Json(entries))
}

#[instrument(name = "create_entry", skip(user, app_state))]
async fn create_entry(
    user: AuthUser,
    State(app_state): State<AppState>,
    Json(draft): Json<EntryDraft>,
) -> Result<(StatusCode, Json<TimeEntry>), ApiError> {
    let entry = app_state.entry_service.create(user.id, draft).await?;

    Ok((StatusCode::CREATED, Json(entry)))
}

#[instrument(name = "update_entry", skip(user, app_state))]
async fn update_entry(
    user: AuthUser,
    State(app_state): State<AppState>,
    Path(id): Path<i32>,
    Json(draft): Json<EntryDraft>,
) -> Result<Json<TimeEntry>, ApiError> {
    let entry = app_state.entry_service.update(user.id, id, draft).await?;

    Ok(Json(entry))
}

#[instrument(name = "delete_entry", skip(user, app_state))]
async fn delete_entry(
    user: AuthUser,
    State(app_state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    app_state.entry_service.delete(user.id, id).await?;

    Ok(StatusCode::NO_CONTENT)
}
