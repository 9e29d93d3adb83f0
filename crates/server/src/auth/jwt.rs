use crate::auth::models::{AuthConfig, Claims};
use chrono::{Duration, Utc};
use database::User;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use utils::{AppError, AppResult};

const ISSUER: &str = "affiliate-api";

/// JWT令牌管理器
#[derive(Clone)]
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    config: AuthConfig,
}

impl JwtManager {
    pub fn new(config: AuthConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.jwt_secret.as_ref());
        let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_ref());

        Self {
            encoding_key,
            decoding_key,
            config,
        }
    }

    /// 令牌有效期(秒)
    pub fn expires_in(&self) -> u64 {
        (self.config.jwt_expires_in_minutes.max(0) * 60) as u64
    }

    /// 生成JWT令牌
    pub fn generate_token(&self, user: &User) -> AppResult<String> {
        let now = Utc::now();
        let expires_at = now + Duration::minutes(self.config.jwt_expires_in_minutes);

        let claims = Claims {
            sub: user.id.clone(),
            email: user.email.clone(),
            is_superuser: user.is_superuser,
            exp: expires_at.timestamp() as u64,
            iat: now.timestamp() as u64,
            iss: ISSUER.to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::InternalServerErrorWithContext(format!("Failed to generate JWT token: {}", e)))
    }

    /// 验证JWT令牌(签名、签发者、过期时间)
    pub fn verify_token(&self, token: &str) -> AppResult<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[ISSUER]);

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|e| AppError::Unauthorized(format!("Invalid JWT token: {}", e)))?;

        let now = Utc::now().timestamp() as u64;
        if token_data.claims.exp < now {
            return Err(AppError::Unauthorized("JWT token has expired".to_string()));
        }

        Ok(token_data.claims)
    }
}

/// JWT令牌提取器
pub struct TokenExtractor;

impl TokenExtractor {
    /// 从Authorization头部提取Bearer令牌
    pub fn extract_bearer_token(auth_header: Option<&str>) -> Option<String> {
        auth_header
            .and_then(|header| header.strip_prefix("Bearer "))
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty())
    }
}
