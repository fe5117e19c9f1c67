use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// 统一响应包装: `{ success, data?, message?, error? }`
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// 如 INSUFFICIENT_INVENTORY / POOL_LOCKED
    pub code: String,
    pub message: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            error: None,
        }
    }

    pub fn success_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: Some(message.into()),
            error: None,
        }
    }
}

impl ApiResponse<()> {
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        ApiResponse {
            success: false,
            data: None,
            message: None,
            error: Some(ApiError {
                code: code.into(),
                message: message.into(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_envelope_shape() {
        let body = serde_json::to_value(ApiResponse::<()>::error("DRAW_CLOSED", "closed")).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "DRAW_CLOSED");
        assert!(body.get("data").is_none());
    }

    #[test]
    fn test_success_with_message() {
        let body = serde_json::to_value(ApiResponse::success_with_message(3u64, "done")).unwrap();
        assert_eq!(body["data"], 3);
        assert_eq!(body["message"], "done");
    }
}
