//! `/admin` handlers. Authentication is applied by the router.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderValue, header};
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use scoreazy_core::admin::{ExportFilter, ListQuery, UpdateRequest};
use scoreazy_core::export::export_filename;
use serde_json::{Value, json};

use super::json_body;
use crate::{ApiError, ApiResult, AppState};

const ADMIN_PAGE_SIZE: u32 = 20;

pub async fn dashboard(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let dashboard = state.admin.dashboard(Utc::now()).await?;
    Ok(Json(json!({ "success": true, "data": dashboard })))
}

pub async fn list_contacts(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Value>> {
    let page = state.admin.list(&query, ADMIN_PAGE_SIZE).await?;
    Ok(Json(json!({ "success": true, "data": page })))
}

pub async fn get_contact(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let contact = state.admin.get(&id).await?;
    Ok(Json(json!({ "success": true, "data": contact })))
}

pub async fn update_contact(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<UpdateRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let request = json_body(body)?;
    let contact = state.admin.update(&id, request, Utc::now()).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Contact updated successfully",
        "data": contact,
    })))
}

pub async fn delete_contact(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    state.admin.delete(&id).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Contact deleted successfully",
    })))
}

/// CSV download of every matching contact.
pub async fn export_contacts(
    State(state): State<AppState>,
    Query(filter): Query<ExportFilter>,
) -> ApiResult<Response> {
    let csv = state.admin.export_csv(&filter).await?;
    let disposition = format!(
        "attachment; filename={}",
        export_filename(Utc::now().date_naive())
    );
    let disposition = HeaderValue::from_str(&disposition)
        .map_err(|e| ApiError::Internal(format!("invalid content-disposition: {e}")))?;

    Ok((
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/csv; charset=utf-8"),
            ),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    )
        .into_response())
}
