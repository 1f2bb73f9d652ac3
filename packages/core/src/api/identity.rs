//! Caller identity extraction.
//!
//! Authentication happens upstream (gateway or auth proxy). It forwards the
//! resolved user as `X-User-Id` and `X-User-Role`; handlers that act on
//! behalf of a user take a [`CallerIdentity`] and never read ids from the
//! request body.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::error::AppError;
use crate::lifecycle::Caller;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

const DEFAULT_ROLE: &str = "worker";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity(pub Caller);

#[async_trait]
impl<S> FromRequestParts<S> for CallerIdentity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw_id = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or_else(|| AppError::Unauthorized("X-User-Id header is required".to_string()))?;

        let user_id = raw_id
            .to_str()
            .ok()
            .and_then(|v| v.trim().parse::<i64>().ok())
            .filter(|id| *id > 0)
            .ok_or_else(|| {
                AppError::Unauthorized("X-User-Id header must be a positive integer".to_string())
            })?;

        let role = parts
            .headers
            .get(USER_ROLE_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .unwrap_or(DEFAULT_ROLE)
            .to_string();

        Ok(CallerIdentity(Caller { user_id, role }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, http::StatusCode, routing::get, Router};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    async fn whoami(CallerIdentity(caller): CallerIdentity) -> String {
        format!("{}:{}", caller.user_id, caller.role)
    }

    fn make_app() -> Router {
        Router::new().route("/whoami", get(whoami))
    }

    async fn call(headers: &[(&str, &str)]) -> (StatusCode, String) {
        let mut builder = Request::builder().uri("/whoami");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let resp = make_app()
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn id_and_role_are_read_from_headers() {
        let (status, body) = call(&[("X-User-Id", "7"), ("X-User-Role", "inspector")]).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "7:inspector");
    }

    #[tokio::test]
    async fn role_defaults_to_worker() {
        let (status, body) = call(&[("X-User-Id", "3")]).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "3:worker");
    }

    #[tokio::test]
    async fn missing_id_is_unauthorized() {
        let (status, body) = call(&[]).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.contains("X-User-Id header is required"));
    }

    #[tokio::test]
    async fn malformed_id_is_unauthorized() {
        for bad in ["abc", "0", "-4"] {
            let (status, _) = call(&[("X-User-Id", bad)]).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "accepted {}", bad);
        }
    }
}
