use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::services::store::StoreError;
use crate::services::validation::ValidationError;

pub type Result<T> = std::result::Result<T, AppError>;

/// Client-facing messages.
pub mod messages {
    pub const INVALID_SCORE: &str = "유효하지 않은 점수입니다.";
    pub const UNPROCESSABLE_REQUEST: &str = "요청을 처리할 수 없습니다.";
    pub const METHOD_NOT_ALLOWED: &str = "메서드를 지원하지 않습니다.";
    pub const INTERNAL: &str = "서버 오류가 발생했습니다.";
    pub const INVALID_PATH: &str = "잘못된 경로입니다.";
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("Internal server error: {0}")]
    Internal(String),
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let message = match self {
            AppError::Validation(ValidationError::InvalidScore) => messages::INVALID_SCORE,
            AppError::BadRequest(_) => messages::UNPROCESSABLE_REQUEST,
            AppError::MethodNotAllowed => messages::METHOD_NOT_ALLOWED,
            AppError::Storage(_) | AppError::Internal(_) => {
                // Details stay in the log
                tracing::error!("Request failed: {}", self);
                messages::INTERNAL
            }
        };

        HttpResponse::build(self.status_code()).json(ErrorResponse {
            error: message.to_string(),
        })
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            AppError::Storage(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    async fn body_of(err: AppError) -> (StatusCode, ErrorResponse) {
        let response = err.error_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body()).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[actix_web::test]
    async fn test_validation_maps_to_400() {
        let (status, body) = body_of(ValidationError::InvalidScore.into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error, messages::INVALID_SCORE);
    }

    #[actix_web::test]
    async fn test_method_not_allowed_maps_to_405() {
        let (status, body) = body_of(AppError::MethodNotAllowed).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body.error, messages::METHOD_NOT_ALLOWED);
    }

    #[actix_web::test]
    async fn test_storage_error_is_not_leaked() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "/srv/data is read-only");
        let (status, body) = body_of(AppError::Storage(StoreError::Io(io))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error, messages::INTERNAL);
        assert!(!body.error.contains("read-only"));
    }
}
