//! Application error type and its HTTP rendering.
//!
//! Every fallible handler and service returns [`AppError`]. The error carries
//! the HTTP status to respond with, the underlying [`anyhow::Error`] whose
//! message becomes the `error` field of the JSON body, and an optional
//! machine readable `code` for clients that branch on failure kinds
//! (for example `SUBSCRIPTION_INACTIVE`).
//!
//! ```ignore
//! use campusflow_core::AppError;
//!
//! let err = AppError::forbidden("Access denied".to_string())
//!     .with_code("INSUFFICIENT_PERMISSIONS");
//! // => 403 {"error": "Access denied", "code": "INSUFFICIENT_PERMISSIONS"}
//! ```

use anyhow::Error;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub error: Error,
    pub code: Option<&'static str>,
}

impl AppError {
    pub fn new<E>(status: StatusCode, err: E) -> Self
    where
        E: Into<Error>,
    {
        Self {
            status,
            error: err.into(),
            code: None,
        }
    }

    /// Attaches a stable error code rendered next to the message.
    #[must_use]
    pub fn with_code(mut self, code: &'static str) -> Self {
        self.code = Some(code);
        self
    }

    pub fn internal<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, err)
    }

    pub fn internal_error(message: String) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, anyhow::anyhow!(message))
    }

    pub fn not_found<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(StatusCode::NOT_FOUND, err)
    }

    pub fn unprocessable<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, err)
    }

    pub fn bad_request<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(StatusCode::BAD_REQUEST, err)
    }

    pub fn conflict<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(StatusCode::CONFLICT, err)
    }

    pub fn unauthorized(message: String) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, anyhow::anyhow!(message))
    }

    pub fn forbidden(message: String) -> Self {
        Self::new(StatusCode::FORBIDDEN, anyhow::anyhow!(message))
    }

    pub fn database<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, err)
    }

    /// Message that will be sent to the client.
    pub fn message(&self) -> String {
        self.error.to_string()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(error = ?self.error, status = %self.status, "Request failed");
        }

        let body = match self.code {
            Some(code) => json!({ "error": self.error.to_string(), "code": code }),
            None => json!({ "error": self.error.to_string() }),
        };

        (self.status, Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<Error>,
{
    fn from(err: E) -> Self {
        AppError::internal(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn renders_message_without_code() {
        let (status, body) = body_json(AppError::not_found(anyhow::anyhow!("Tenant not found"))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Tenant not found");
        assert!(body.get("code").is_none());
    }

    #[tokio::test]
    async fn renders_code_when_present() {
        let err = AppError::forbidden("Subscription expired or inactive".to_string())
            .with_code("SUBSCRIPTION_INACTIVE");
        let (status, body) = body_json(err).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "SUBSCRIPTION_INACTIVE");
    }

    #[test]
    fn constructors_pick_status() {
        assert_eq!(
            AppError::unauthorized("x".into()).status,
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::bad_request(anyhow::anyhow!("x")).status,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::conflict(anyhow::anyhow!("x")).status,
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::internal_error("x".into()).status,
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn foreign_errors_become_internal() {
        let parse_err = "abc".parse::<i32>().unwrap_err();
        let err: AppError = parse_err.into();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
