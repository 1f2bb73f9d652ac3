//! Alert feed endpoints.
//!
//! Routes:
//! - `GET  /alerts`              : synthetic alerts followed by a page of stored ones
//! - `POST /alerts`              : store a user-created alert
//! - `GET  /alerts/summary`      : expired / expiring / scrapped counts
//! - `POST /alerts/:id/read`     : mark a stored alert as read
//! - `POST /alerts/:id/resolve`  : mark a stored alert as resolved
//!
//! The feed carries an `ETag`; a matching `If-None-Match` gets a bodiless
//! `304 Not Modified`, so dashboards can poll cheaply.

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use super::headers::{compute_etag, if_none_match_matches};
use super::{ApiState, PageQuery};
use crate::error::AppError;
use crate::lifecycle::{Alert, AlertRequest, FeedSummary};

const DEFAULT_ALERT_LIMIT: u32 = 50;

/// `GET /alerts`
pub async fn list_alerts(
    State(state): State<ApiState>,
    Query(params): Query<PageQuery>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let alerts = state
        .engine
        .list_alerts(params.page(DEFAULT_ALERT_LIMIT))
        .await?;

    let body = serde_json::to_vec(&alerts).map_err(|e| AppError::Unknown(e.to_string()))?;
    let etag = compute_etag(&body);
    let etag_value =
        HeaderValue::from_str(&etag).map_err(|e| AppError::Unknown(e.to_string()))?;

    if if_none_match_matches(&headers, &etag) {
        return Ok((StatusCode::NOT_MODIFIED, [(header::ETAG, etag_value)]).into_response());
    }

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/json")),
            (header::CACHE_CONTROL, HeaderValue::from_static("no-cache")),
            (header::ETAG, etag_value),
        ],
        body,
    )
        .into_response())
}

/// `POST /alerts`
pub async fn create_alert(
    State(state): State<ApiState>,
    Json(body): Json<AlertRequest>,
) -> Result<(StatusCode, Json<Alert>), AppError> {
    let alert = state.engine.create_alert(body).await?;
    Ok((StatusCode::CREATED, Json(alert)))
}

/// `GET /alerts/summary`
pub async fn feed_summary(State(state): State<ApiState>) -> Result<Json<FeedSummary>, AppError> {
    Ok(Json(state.engine.feed_summary().await?))
}

/// `POST /alerts/:id/read`
pub async fn mark_read(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
) -> Result<Json<Alert>, AppError> {
    Ok(Json(state.engine.mark_alert_read(id).await?))
}

/// `POST /alerts/:id/resolve`
pub async fn resolve(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
) -> Result<Json<Alert>, AppError> {
    Ok(Json(state.engine.resolve_alert(id).await?))
}
