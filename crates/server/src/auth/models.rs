use serde::{Deserialize, Serialize};
use utils::AppConfig;

/// JWT Claims 结构
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// 用户ID
    pub sub: String,
    pub email: String,
    /// 是否为运营人员
    pub is_superuser: bool,
    /// 过期时间
    pub exp: u64,
    /// 签发时间
    pub iat: u64,
    /// 签发者
    pub iss: String,
}

/// 认证用户信息(由中间件写入请求扩展)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: String,
    pub email: String,
    pub is_superuser: bool,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            email: claims.email,
            is_superuser: claims.is_superuser,
        }
    }
}

/// 认证配置
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_expires_in_minutes: i64,
}

impl From<&AppConfig> for AuthConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            jwt_secret: config.jwt_secret.clone(),
            jwt_expires_in_minutes: config.jwt_expires_in_minutes,
        }
    }
}
