//! Tool inventory endpoints.
//!
//! Routes:
//! - `GET    /tools`              : list, with `search`, `status`, `offset`, `limit`
//! - `POST   /tools`              : register a tool
//! - `GET    /tools/:id`          : fetch one tool
//! - `PATCH  /tools/:id`          : sparse update
//! - `DELETE /tools/:id`          : delete a tool and its inspections
//! - `GET    /tools/qr/:qr_code`  : look a tool up by its QR code

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use super::{ApiState, PageQuery};
use crate::error::AppError;
use crate::lifecycle::{NewTool, Tool, ToolFilter, ToolStatus, ToolUpdate};

const DEFAULT_TOOL_LIMIT: u32 = 100;

#[derive(Debug, Default, Deserialize)]
pub struct ToolListQuery {
    pub search: Option<String>,
    pub status: Option<ToolStatus>,
    pub offset: Option<u32>,
    pub limit: Option<u32>,
}

/// `GET /tools`
pub async fn list_tools(
    State(state): State<ApiState>,
    Query(params): Query<ToolListQuery>,
) -> Result<Json<Vec<Tool>>, AppError> {
    let page = PageQuery { offset: params.offset, limit: params.limit }.page(DEFAULT_TOOL_LIMIT);
    let filter = ToolFilter {
        search: params.search.filter(|s| !s.trim().is_empty()),
        status: params.status,
    };
    let tools = state.engine.list_tools(&filter, page).await?;
    Ok(Json(tools))
}

/// `POST /tools`
pub async fn create_tool(
    State(state): State<ApiState>,
    Json(body): Json<NewTool>,
) -> Result<(StatusCode, Json<Tool>), AppError> {
    let tool = state.engine.create_tool(body).await?;
    Ok((StatusCode::CREATED, Json(tool)))
}

/// `GET /tools/:id`
pub async fn get_tool(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
) -> Result<Json<Tool>, AppError> {
    Ok(Json(state.engine.get_tool(id).await?))
}

/// `GET /tools/qr/:qr_code`
pub async fn get_tool_by_qr(
    State(state): State<ApiState>,
    Path(qr_code): Path<String>,
) -> Result<Json<Tool>, AppError> {
    Ok(Json(state.engine.find_tool_by_qr(&qr_code).await?))
}

/// `PATCH /tools/:id`
pub async fn update_tool(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
    Json(body): Json<ToolUpdate>,
) -> Result<Json<Tool>, AppError> {
    Ok(Json(state.engine.update_tool(id, body).await?))
}

/// `DELETE /tools/:id`
pub async fn delete_tool(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state.engine.delete_tool(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
