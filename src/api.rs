//! Shared HTTP surface types: the uniform response envelope every endpoint
//! returns, and the pre-validated caller context forwarded by the gateway.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::workflows::ids::{Role, UserId};

/// Uniform response envelope: `code` mirrors the HTTP status (200 success,
/// 4xx business error, 5xx unexpected), `message` is human-readable, `data`
/// carries the payload when there is one.
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T> {
    pub code: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            code: 200,
            message: "success".to_string(),
            data: Some(data),
        }
    }

    pub fn error(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

/// Caller identity extracted and validated upstream (gateway JWT filter) and
/// forwarded as trusted headers. This service never inspects credentials
/// itself; a request without an `x-user-id` header is unauthenticated.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub user_id: UserId,
    pub roles: Vec<Role>,
}

impl RequestContext {
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get("x-user-id")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<i64>().ok())
            .map(UserId)
            .ok_or_else(|| {
                ApiResponse::<()>::error(401, "caller is not authenticated").into_response()
            })?;

        let roles = parts
            .headers
            .get("x-user-roles")
            .and_then(|value| value.to_str().ok())
            .map(|raw| raw.split(',').filter_map(Role::parse).collect())
            .unwrap_or_default();

        Ok(Self { user_id, roles })
    }
}
