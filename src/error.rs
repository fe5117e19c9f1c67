use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;

use crate::models::ApiResponse;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sea_orm::DbErr),

    #[error("Insufficient inventory: requested {requested}, remaining {remaining}")]
    InsufficientInventory { requested: u32, remaining: u64 },

    #[error("Persistence failure: {0}")]
    PersistenceFailure(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Prize pool is locked")]
    PoolLocked,

    #[error("Prize draw is closed")]
    DrawClosed,

    #[error("Invalid reveal transition: {0}")]
    InvalidTransition(String),

    #[error("Auth error: {0}")]
    AuthError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Permission denied")]
    PermissionDenied,

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Internal server error: {0}")]
    InternalError(String),

    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    #[error("JSON serialization/deserialization error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),
}

impl AppError {
    /// 面向调用方的错误码（HTTP 响应与日志共用）
    pub fn code(&self) -> &'static str {
        match self {
            AppError::InsufficientInventory { .. } => "INSUFFICIENT_INVENTORY",
            AppError::PersistenceFailure(_) => "PERSISTENCE_FAILURE",
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::PoolLocked => "POOL_LOCKED",
            AppError::DrawClosed => "DRAW_CLOSED",
            AppError::InvalidTransition(_) => "INVALID_TRANSITION",
            AppError::AuthError(_) => "AUTH_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::PermissionDenied => "FORBIDDEN",
            AppError::DatabaseError(_) => "DATABASE_ERROR",
            _ => "INTERNAL_ERROR",
        }
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let (status_code, message) = match self {
            AppError::InsufficientInventory { .. } => {
                log::warn!("{self}");
                (actix_web::http::StatusCode::CONFLICT, self.to_string())
            }
            AppError::PersistenceFailure(msg) => {
                log::error!("Persistence failure: {msg}");
                (
                    actix_web::http::StatusCode::BAD_GATEWAY,
                    "Failed to persist prize pool, please retry".to_string(),
                )
            }
            AppError::ValidationError(msg) => {
                log::warn!("Validation error: {msg}");
                (actix_web::http::StatusCode::BAD_REQUEST, msg.clone())
            }
            AppError::PoolLocked | AppError::DrawClosed => {
                log::warn!("{self}");
                (actix_web::http::StatusCode::CONFLICT, self.to_string())
            }
            AppError::InvalidTransition(msg) => {
                log::warn!("Invalid reveal transition: {msg}");
                (actix_web::http::StatusCode::CONFLICT, msg.clone())
            }
            AppError::AuthError(msg) => {
                log::warn!("Authentication error: {msg}");
                (actix_web::http::StatusCode::UNAUTHORIZED, msg.clone())
            }
            AppError::NotFound(msg) => (actix_web::http::StatusCode::NOT_FOUND, msg.clone()),
            AppError::PermissionDenied => {
                log::warn!("Permission denied");
                (
                    actix_web::http::StatusCode::FORBIDDEN,
                    "Permission denied".to_string(),
                )
            }
            AppError::DatabaseError(err) => {
                log::error!("Database error: {err}");
                (
                    actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error".to_string(),
                )
            }
            _ => {
                log::error!("Internal error: {self}");
                (
                    actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        HttpResponse::build(status_code).json(ApiResponse::<()>::error(self.code(), message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;

    #[test]
    fn test_status_mapping() {
        let err = AppError::InsufficientInventory {
            requested: 3,
            remaining: 2,
        };
        assert_eq!(err.error_response().status(), StatusCode::CONFLICT);
        assert_eq!(err.code(), "INSUFFICIENT_INVENTORY");

        let err = AppError::PersistenceFailure("timeout".into());
        assert_eq!(err.error_response().status(), StatusCode::BAD_GATEWAY);

        assert_eq!(
            AppError::PermissionDenied.error_response().status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::ValidationError("bad".into())
                .error_response()
                .status(),
            StatusCode::BAD_REQUEST
        );
    }
}
