//! `/api/contact`: public submission plus the admin aliases.

use std::net::SocketAddr;

use axum::Json;
use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::{ConnectInfo, Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use chrono::Utc;
use scoreazy_core::admin::ListQuery;
use scoreazy_core::validation::RawSubmission;
use serde::Deserialize;
use serde_json::{Value, json};

use super::{client_origin, json_body};
use crate::{ApiError, ApiResult, AppState};

const ALIAS_PAGE_SIZE: u32 = 10;

pub const THANK_YOU: &str =
    "Thank you for your message! We'll get back to you within 24 hours.";

/// `POST /api/contact`
///
/// The rate guard is charged before the body is parsed, so malformed
/// bodies count against the origin's budget.
pub async fn submit(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let origin = client_origin(&headers, peer, state.trust_forwarded_for);
    let now = Utc::now();
    state.intake.admit(&origin, now)?;

    let raw: RawSubmission = serde_json::from_slice(&body).map_err(|err| {
        tracing::debug!(origin = %origin, error = %err, "Unparseable contact body");
        ApiError::BadRequest("Invalid request body")
    })?;
    let referer = headers
        .get(header::REFERER)
        .and_then(|value| value.to_str().ok());

    let receipt = state.intake.submit_admitted(&raw, referer, now).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": THANK_YOU,
            "data": receipt,
        })),
    ))
}

/// `GET /api/contact`
pub async fn list_contacts(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Value>> {
    let page = state.admin.list(&query, ALIAS_PAGE_SIZE).await?;
    Ok(Json(json!({ "success": true, "data": page })))
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    #[serde(default)]
    pub status: String,
}

/// `PUT /api/contact/:id/status`
pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<StatusUpdate>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let update = json_body(body)?;
    let contact = state
        .admin
        .set_status(&id, &update.status, Utc::now())
        .await?;
    Ok(Json(json!({
        "success": true,
        "message": "Status updated successfully",
        "data": contact,
    })))
}

/// `GET /api/contact/stats`
pub async fn stats(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let stats = state.admin.stats(Utc::now()).await?;
    Ok(Json(json!({ "success": true, "data": stats })))
}
