//! Inspection endpoints.
//!
//! Routes:
//! - `POST /inspections`           : record an inspection as the calling user
//! - `GET  /inspections`           : most recent inspections with their tool
//! - `GET  /inspections/tool/:id`  : inspection history of one tool

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use super::{identity::CallerIdentity, ApiState, PageQuery};
use crate::error::AppError;
use crate::lifecycle::{Inspection, InspectionOutcome, InspectionRequest, InspectionWithTool};

const DEFAULT_RECENT_LIMIT: u32 = 5;

/// `POST /inspections`
pub async fn create_inspection(
    State(state): State<ApiState>,
    CallerIdentity(caller): CallerIdentity,
    Json(body): Json<InspectionRequest>,
) -> Result<(StatusCode, Json<InspectionOutcome>), AppError> {
    let outcome = state.engine.record_inspection(&caller, body).await?;

    state.metrics.inspections_total.inc();
    if outcome.alert.is_some() {
        state.metrics.low_usability_alerts_total.inc();
    }

    Ok((StatusCode::CREATED, Json(outcome)))
}

/// `GET /inspections`
pub async fn recent_inspections(
    State(state): State<ApiState>,
    Query(params): Query<PageQuery>,
) -> Result<Json<Vec<InspectionWithTool>>, AppError> {
    let inspections = state
        .engine
        .recent_inspections(params.page(DEFAULT_RECENT_LIMIT))
        .await?;
    Ok(Json(inspections))
}

/// `GET /inspections/tool/:id`
pub async fn inspections_for_tool(
    State(state): State<ApiState>,
    Path(tool_id): Path<i64>,
) -> Result<Json<Vec<Inspection>>, AppError> {
    Ok(Json(state.engine.inspections_for_tool(tool_id).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Method, Request},
        routing::get,
        Router,
    };
    use tower::ServiceExt;

    use crate::api::test_support::{body_json, make_state, seed_inspector};
    use crate::lifecycle::NewTool;

    fn make_app(state: ApiState) -> Router {
        Router::new()
            .route("/inspections", get(recent_inspections).post(create_inspection))
            .route("/inspections/tool/:id", get(inspections_for_tool))
            .with_state(state)
    }

    async fn seed_tool(state: &ApiState) -> i64 {
        state
            .engine
            .create_tool(NewTool {
                qr_code: "QR-1".to_string(),
                description: "Chain block".to_string(),
                make: "Acme".to_string(),
                capacity: "2T".to_string(),
                safe_working_load: "2000kg".to_string(),
                current_site: Some("Yard A".to_string()),
                ..NewTool::default()
            })
            .await
            .unwrap()
            .id
    }

    fn post_inspection(user_id: Option<i64>, body: String) -> Request<Body> {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri("/inspections")
            .header("content-type", "application/json");
        if let Some(id) = user_id {
            builder = builder.header("X-User-Id", id.to_string());
        }
        builder.body(Body::from(body)).unwrap()
    }

    #[tokio::test]
    async fn failing_inspection_scraps_tool_and_raises_alert() {
        let (state, _clock) = make_state();
        let user_id = seed_inspector(&state).await;
        let tool_id = seed_tool(&state).await;
        let app = make_app(state.clone());

        let body = format!(
            r#"{{"tool_id":{},"result":"fail","usability_percentage":65}}"#,
            tool_id
        );
        let resp = app.oneshot(post_inspection(Some(user_id), body)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);

        let json = body_json(resp.into_body()).await;
        assert_eq!(json["inspection"]["inspector_id"], user_id);
        assert_eq!(json["tool"]["status"], "scrap");
        assert_eq!(json["tool"]["inspection_result"], "not-usable");
        assert_eq!(json["alert"]["type"], "low-usability");
        assert_eq!(json["alert"]["severity"], "critical");
        assert!(json["alert"]["message"].as_str().unwrap().contains("65"));

        assert!((state.metrics.inspections_total.get() - 1.0).abs() < f64::EPSILON);
        assert!((state.metrics.low_usability_alerts_total.get() - 1.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn inspector_id_in_body_is_ignored() {
        let (state, _clock) = make_state();
        let user_id = seed_inspector(&state).await;
        let tool_id = seed_tool(&state).await;
        let app = make_app(state);

        let body = format!(
            r#"{{"tool_id":{},"inspector_id":999,"result":"pass","usability_percentage":95}}"#,
            tool_id
        );
        let resp = app.oneshot(post_inspection(Some(user_id), body)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);

        let json = body_json(resp.into_body()).await;
        assert_eq!(json["inspection"]["inspector_id"], user_id);
        assert!(json["alert"].is_null());
    }

    #[tokio::test]
    async fn missing_identity_returns_401() {
        let (state, _clock) = make_state();
        let tool_id = seed_tool(&state).await;
        let app = make_app(state);

        let body = format!(r#"{{"tool_id":{},"result":"pass"}}"#, tool_id);
        let resp = app.oneshot(post_inspection(None, body)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn unknown_tool_returns_400() {
        let (state, _clock) = make_state();
        let user_id = seed_inspector(&state).await;
        let app = make_app(state);

        let body = r#"{"tool_id":404,"result":"pass"}"#.to_string();
        let resp = app.oneshot(post_inspection(Some(user_id), body)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn percentage_out_of_range_returns_400() {
        let (state, _clock) = make_state();
        let user_id = seed_inspector(&state).await;
        let tool_id = seed_tool(&state).await;
        let app = make_app(state);

        let body = format!(
            r#"{{"tool_id":{},"result":"pass","usability_percentage":140}}"#,
            tool_id
        );
        let resp = app.oneshot(post_inspection(Some(user_id), body)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn history_and_recent_listings() {
        let (state, _clock) = make_state();
        let user_id = seed_inspector(&state).await;
        let tool_id = seed_tool(&state).await;
        let app = make_app(state);

        for (day, result) in [(10, "pass"), (12, "pass")] {
            let body = format!(
                r#"{{"tool_id":{},"date":"2025-05-{}T09:00:00Z","result":"{}"}}"#,
                tool_id, day, result
            );
            app.clone().oneshot(post_inspection(Some(user_id), body)).await.unwrap();
        }

        let resp = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri(format!("/inspections/tool/{}", tool_id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let json = body_json(resp.into_body()).await;
        assert_eq!(json.as_array().unwrap().len(), 2);
        assert_eq!(json[0]["date"], "2025-05-12T09:00:00Z");

        let resp = app
            .oneshot(Request::builder().uri("/inspections?limit=1").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let json = body_json(resp.into_body()).await;
        assert_eq!(json.as_array().unwrap().len(), 1);
        assert_eq!(json[0]["tool"]["qr_code"], "QR-1");
        assert_eq!(json[0]["date"], "2025-05-12T09:00:00Z");
    }

    #[tokio::test]
    async fn history_of_unknown_tool_returns_404() {
        let (state, _clock) = make_state();
        let app = make_app(state);

        let resp = app
            .oneshot(Request::builder().uri("/inspections/tool/9").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
