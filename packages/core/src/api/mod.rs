//! HTTP surface.
//!
//! Handlers are thin: they extract input, call the [`ToolLifecycleEngine`]
//! and let [`AppError`](crate::error::AppError) shape failures into
//! `{"error": ...}` bodies.

pub mod alerts;
pub mod headers;
pub mod health;
pub mod identity;
pub mod inspections;
pub mod tools;
pub mod users;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use tower_http::cors::CorsLayer;

use crate::lifecycle::{Page, ToolLifecycleEngine};
use crate::metrics::{track_http, AppMetrics};

/// Everything the handlers share.
pub struct AppContext {
    pub engine: Arc<ToolLifecycleEngine>,
    pub metrics: Arc<AppMetrics>,
}

/// Shared state type for all routes.
pub type ApiState = Arc<AppContext>;

/// `offset`/`limit` query parameters with per-route defaults.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub offset: Option<u32>,
    pub limit: Option<u32>,
}

/// Upper bound on any single listing window.
pub const MAX_PAGE_LIMIT: u32 = 1000;

impl PageQuery {
    pub fn page(&self, default_limit: u32) -> Page {
        Page::new(
            self.offset.unwrap_or(0),
            self.limit.unwrap_or(default_limit).clamp(1, MAX_PAGE_LIMIT),
        )
    }
}

/// Assemble the full router.
pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/metrics", get(health::metrics))
        .route("/tools", get(tools::list_tools).post(tools::create_tool))
        .route("/tools/qr/:qr_code", get(tools::get_tool_by_qr))
        .route(
            "/tools/:id",
            get(tools::get_tool)
                .patch(tools::update_tool)
                .delete(tools::delete_tool),
        )
        .route(
            "/inspections",
            get(inspections::recent_inspections).post(inspections::create_inspection),
        )
        .route("/inspections/tool/:id", get(inspections::inspections_for_tool))
        .route("/alerts", get(alerts::list_alerts).post(alerts::create_alert))
        .route("/alerts/summary", get(alerts::feed_summary))
        .route("/alerts/:id/read", post(alerts::mark_read))
        .route("/alerts/:id/resolve", post(alerts::resolve))
        .route("/users", post(users::register_user))
        .route("/users/me", get(users::me))
        .route("/users/:id", get(users::get_user))
        .route_layer(middleware::from_fn_with_state(
            state.metrics.clone(),
            track_http,
        ))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use axum::body::Body;
    use chrono::{DateTime, TimeZone, Utc};
    use http_body_util::BodyExt;

    use crate::clock::FixedClock;
    use crate::lifecycle::{LifecycleConfig, NewUser};
    use crate::store::MemoryStore;

    pub fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    pub fn make_state() -> (ApiState, Arc<FixedClock>) {
        let clock = Arc::new(FixedClock::new(fixed_now()));
        let engine = ToolLifecycleEngine::new(
            Arc::new(MemoryStore::new()),
            clock.clone(),
            LifecycleConfig::default(),
        );
        let state = Arc::new(AppContext {
            engine: Arc::new(engine),
            metrics: Arc::new(AppMetrics::new().unwrap()),
        });
        (state, clock)
    }

    pub async fn seed_inspector(state: &ApiState) -> i64 {
        state
            .engine
            .register_user(NewUser {
                username: "inspector1".to_string(),
                email: "inspector1@example.com".to_string(),
                full_name: Some("Ida Inspector".to_string()),
                role: "inspector".to_string(),
                site: Some("Yard A".to_string()),
                phone: None,
            })
            .await
            .unwrap()
            .id
    }

    pub async fn body_json(body: Body) -> serde_json::Value {
        let bytes = body.collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }
}
