use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// 管理员登录
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AuthResponse {
    pub access_token: String,
    pub token_type: String,
    /// 秒
    pub expires_in: i64,
    pub is_admin: bool,
}
