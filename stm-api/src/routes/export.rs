use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use tracing::instrument;

use crate::{
    app_state::AppState,
    auth::AuthUser,
    domain::{format_entry_date, parse_entry_date, TimeEntry},
    routes::ApiError,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/csv", get(export_csv))
}

#[derive(Debug, Deserialize)]
struct ExportQuery {
    from: Option<String>,
    to: Option<String>,
}

#[instrument(name = "export_csv", skip(user, app_state))]
async fn export_csv(
    user: AuthUser,
    State(app_state): State<AppState>,
    Query(query): Query<ExportQuery>,
) -> Result<Response, ApiError> {
    let (Some(raw_from), Some(raw_to)) = (query.from.as_deref(), query.to.as_deref()) else {
        return Err(ApiError::bad_request("from and to required (YYYY-MM-DD)"));
    };
    let from = parse_entry_date(raw_from)
        .map_err(|_| ApiError::bad_request(format!("invalid date: {raw_from}")))?;
    let to = parse_entry_date(raw_to)
        .map_err(|_| ApiError::bad_request(format!("invalid date: {raw_to}")))?;

    let entries = app_state
        .entry_service
        .list(user.id, Some(from), Some(to))
        .await?;

    let csv = entries_to_csv(&entries).map_err(|e| {
        tracing::error!("Failed to build CSV export: {}", e);
        ApiError::internal("failed to build CSV export")
    })?;

    let from_label = format_entry_date(from).unwrap_or_else(|_| raw_from.to_string());
    let to_label = format_entry_date(to).unwrap_or_else(|_| raw_to.to_string());
    let headers = [
        (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"export_{from_label}_{to_label}.csv\""),
        ),
    ];

    Ok((headers, csv).into_response())
}

fn entries_to_csv(entries: &[TimeEntry]) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer.write_record([
        "Date",
        "Code",
        "Start",
        "End",
        "Area/Customer",
        "Description",
        "Order",
        "Todo",
    ])?;

    for entry in entries {
        writer.write_record(&[
            format_entry_date(entry.date)?,
            entry.code.to_string(),
            entry.start.to_string(),
            entry.end.to_string(),
            entry.area_or_customer.clone().unwrap_or_default(),
            entry.description.clone().unwrap_or_default(),
            entry.order_number.clone().unwrap_or_default(),
            entry.todo.to_string(),
        ])?;
    }

    Ok(writer.into_inner()?)
}
