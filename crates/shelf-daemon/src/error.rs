//! One error type for every handler, rendered as `{"error": "<message>"}`.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        FromRequest, FromRequestParts,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use shelf_db::{classify, OrderError, Violation};
use uuid::Uuid;

use crate::api_types::ErrorResponse;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    /// `message` is what the client sees; `cause` only reaches the log.
    #[error("{message}")]
    Internal {
        message: String,
        cause: anyhow::Error,
    },
}

impl ApiError {
    pub fn internal(cause: anyhow::Error) -> Self {
        Self::Internal {
            message: "internal server error".to_string(),
            cause,
        }
    }

    /// Map a store failure. `on_foreign_key` decides what a foreign-key
    /// violation means for this call: a conflict when deleting a referenced
    /// row, a bad request when inserting a dangling reference.
    pub fn from_store(err: anyhow::Error, on_foreign_key: ApiError) -> Self {
        match classify(&err) {
            Some(Violation::Invalid(msg)) => Self::BadRequest(msg),
            Some(Violation::Unique { .. }) => Self::Conflict("already exists".to_string()),
            Some(Violation::ForeignKey { .. }) => on_foreign_key,
            Some(Violation::Check { constraint }) => Self::BadRequest(format!(
                "value violates {}",
                constraint.as_deref().unwrap_or("a check constraint")
            )),
            None => Self::internal(err),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::from_store(err, ApiError::Conflict("row is still referenced".to_string()))
    }
}

impl From<OrderError> for ApiError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::Validation(msg) => Self::BadRequest(msg),
            OrderError::Persistence(cause) => Self::Internal {
                message: "could not create order".to_string(),
                cause,
            },
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if let Self::Internal { cause, .. } = &self {
            let error_id = Uuid::new_v4();
            tracing::error!(%error_id, error = %format!("{cause:#}"), "request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %self, "request rejected");
        }
        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

/// `axum::Json` whose rejection is an [`ApiError`] (400 with the usual body).
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// `axum::extract::Path` whose rejection is an [`ApiError`].
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(ApiError::BadRequest("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::Unauthorized("x".into()).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::Conflict("x".into()).status(), StatusCode::CONFLICT);
        assert_eq!(
            ApiError::internal(anyhow::anyhow!("db down")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn internal_message_hides_cause() {
        let err = ApiError::internal(anyhow::anyhow!("password authentication failed"));
        assert_eq!(err.to_string(), "internal server error");
    }

    #[test]
    fn order_errors_map_to_400_and_500() {
        let v: ApiError = OrderError::Validation("order must contain at least one item".into()).into();
        assert_eq!(v.status(), StatusCode::BAD_REQUEST);
        assert_eq!(v.to_string(), "order must contain at least one item");

        let p: ApiError = OrderError::Persistence(anyhow::anyhow!("book 7 not found")).into();
        assert_eq!(p.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(p.to_string(), "could not create order");
    }

    #[test]
    fn unclassified_store_error_is_internal() {
        let err: ApiError = anyhow::anyhow!("connection reset").into();
        assert!(matches!(err, ApiError::Internal { .. }));
    }
}
