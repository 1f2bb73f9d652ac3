//! User endpoints.
//!
//! Routes:
//! - `POST /users`      : register a user
//! - `GET  /users/me`   : the calling user
//! - `GET  /users/:id`  : fetch one user

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use super::{identity::CallerIdentity, ApiState};
use crate::error::AppError;
use crate::lifecycle::{NewUser, User};

/// `POST /users`
pub async fn register_user(
    State(state): State<ApiState>,
    Json(body): Json<NewUser>,
) -> Result<(StatusCode, Json<User>), AppError> {
    let user = state.engine.register_user(body).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// `GET /users/me`
pub async fn me(
    State(state): State<ApiState>,
    CallerIdentity(caller): CallerIdentity,
) -> Result<Json<User>, AppError> {
    Ok(Json(state.engine.get_user(caller.user_id).await?))
}

/// `GET /users/:id`
pub async fn get_user(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
) -> Result<Json<User>, AppError> {
    Ok(Json(state.engine.get_user(id).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Method, Request},
        routing::{get, post},
        Router,
    };
    use tower::ServiceExt;

    use crate::api::test_support::{body_json, make_state};
    use crate::lifecycle::Page;

    fn make_app(state: ApiState) -> Router {
        Router::new()
            .route("/users", post(register_user))
            .route("/users/me", get(me))
            .route("/users/:id", get(get_user))
            .with_state(state)
    }

    fn register(body: &str) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri("/users")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn register_creates_user_and_alert() {
        let (state, _clock) = make_state();
        let app = make_app(state.clone());

        let resp = app
            .oneshot(register(
                r#"{"username":"sam","email":"sam@example.com","full_name":"Sam Rigger","role":"supervisor","site":"Yard A"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        let json = body_json(resp.into_body()).await;
        assert_eq!(json["username"], "sam");
        assert_eq!(json["status"], "active");

        let feed = state.engine.list_alerts(Page::ALL).await.unwrap();
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].message, "New user created: Sam Rigger (supervisor)");
    }

    #[tokio::test]
    async fn role_defaults_to_worker() {
        let (state, _clock) = make_state();
        let app = make_app(state);

        let resp = app
            .oneshot(register(r#"{"username":"kim","email":"kim@example.com"}"#))
            .await
            .unwrap();
        let json = body_json(resp.into_body()).await;
        assert_eq!(json["role"], "worker");
    }

    #[tokio::test]
    async fn duplicate_username_returns_409() {
        let (state, _clock) = make_state();
        let app = make_app(state);

        app.clone()
            .oneshot(register(r#"{"username":"sam","email":"sam@example.com"}"#))
            .await
            .unwrap();
        let resp = app
            .oneshot(register(r#"{"username":"sam","email":"other@example.com"}"#))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::CONFLICT);
        let json = body_json(resp.into_body()).await;
        assert_eq!(json["error"], "Conflict: Username already registered");
    }

    #[tokio::test]
    async fn me_resolves_caller_from_headers() {
        let (state, _clock) = make_state();
        let app = make_app(state);

        app.clone()
            .oneshot(register(r#"{"username":"sam","email":"sam@example.com"}"#))
            .await
            .unwrap();

        let req = Request::builder()
            .uri("/users/me")
            .header("X-User-Id", "1")
            .body(Body::empty())
            .unwrap();
        let resp = app.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp.into_body()).await["username"], "sam");

        let anonymous = Request::builder().uri("/users/me").body(Body::empty()).unwrap();
        let resp = app.oneshot(anonymous).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn unknown_user_returns_404() {
        let (state, _clock) = make_state();
        let app = make_app(state);

        let resp = app
            .oneshot(Request::builder().uri("/users/5").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
