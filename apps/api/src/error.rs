use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use roadwatch_core::AppError;

mod types;

pub use types::ErrorResponse;

/// HTTP API error wrapper around core application errors.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(value: AppError) -> Self {
        Self(value)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            AppError::Validation(_) | AppError::InvalidFields(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::RemoteSync(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let payload = match self.0 {
            AppError::InvalidFields(fields) => ErrorResponse::with_fields(fields),
            other => ErrorResponse::new(other.to_string()),
        };

        (status, Json(payload)).into_response()
    }
}

/// Standard API result type.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use roadwatch_core::{AppError, FieldErrors};
    use serde_json::{Value, json};

    use super::ApiError;

    async fn render(error: AppError) -> (StatusCode, Value) {
        let response = ApiError(error).into_response();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap_or_default();
        (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn statuses_follow_error_category() {
        let cases = [
            (AppError::Validation("bad".to_owned()), StatusCode::BAD_REQUEST),
            (AppError::NotFound("gone".to_owned()), StatusCode::NOT_FOUND),
            (AppError::Conflict("dup".to_owned()), StatusCode::CONFLICT),
            (AppError::RemoteSync("503".to_owned()), StatusCode::BAD_GATEWAY),
            (
                AppError::Internal("boom".to_owned()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected) in cases {
            let (status, body) = render(error).await;
            assert_eq!(status, expected);
            assert!(body.get("error").and_then(Value::as_str).is_some());
            assert!(body.get("fields").is_none());
        }
    }

    #[tokio::test]
    async fn field_errors_are_listed() {
        let mut fields = FieldErrors::new();
        fields.insert("name", "Name is required");

        let (status, body) = render(AppError::InvalidFields(fields)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            json!({
                "error": "Validation failed",
                "fields": {"name": "Name is required"}
            })
        );
    }
}
