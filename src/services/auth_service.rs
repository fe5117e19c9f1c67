use crate::config::AdminConfig;
use crate::error::{AppError, AppResult};
use crate::models::{AuthResponse, LoginRequest};
use crate::utils::{JwtService, verify_password};

/// 管理员登录；账号来自配置文件
#[derive(Clone)]
pub struct AuthService {
    admin: AdminConfig,
    jwt_service: JwtService,
}

impl AuthService {
    pub fn new(admin: AdminConfig, jwt_service: JwtService) -> Self {
        Self { admin, jwt_service }
    }

    pub async fn login(&self, request: LoginRequest) -> AppResult<AuthResponse> {
        if self.admin.email.is_empty() || self.admin.password_hash.is_empty() {
            return Err(AppError::AuthError(
                "Admin account is not configured".to_string(),
            ));
        }

        let email_matches = request.email.trim().eq_ignore_ascii_case(&self.admin.email);
        // 邮箱不匹配时不泄露具体原因
        if !email_matches || !verify_password(&request.password, &self.admin.password_hash)? {
            log::warn!("Admin login failed for {}", request.email.trim());
            return Err(AppError::AuthError("Invalid email or password".to_string()));
        }

        let access_token = self
            .jwt_service
            .generate_access_token(&self.admin.email, true)?;
        log::info!("Admin {} logged in", self.admin.email);

        Ok(AuthResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: self.jwt_service.get_access_token_expires_in(),
            is_admin: true,
        })
    }
}
