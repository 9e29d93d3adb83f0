use crate::{
    auth::{AuthUser, JwtManager, TokenExtractor},
    services::{user::UserServiceTrait, Services},
};
use axum::{
    async_trait,
    extract::{FromRequestParts, Request},
    http::request::Parts,
    middleware::Next,
    response::Response,
    Extension,
};
use std::sync::Arc;
use tracing::warn;
use utils::AppError;

/// JWT认证中间件
///
/// 令牌校验通过后重新读取用户，已停用或已删除的账号立即失效。
pub async fn jwt_auth_middleware(
    Extension(jwt_manager): Extension<Arc<JwtManager>>,
    Extension(services): Extension<Services>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token =
        TokenExtractor::extract_bearer_token(request.headers().get("authorization").and_then(|v| v.to_str().ok()));

    let Some(token) = token else {
        warn!("No authentication token provided");
        return Err(AppError::Unauthorized("Missing bearer token".to_string()));
    };

    let claims = jwt_manager.verify_token(&token).map_err(|e| {
        warn!("Token verification failed: {}", e);
        e
    })?;

    let user = match services.user.get_user(&claims.sub).await {
        Ok(user) => user,
        Err(AppError::NotFound(_)) => {
            warn!("Token subject {} no longer exists", claims.sub);
            return Err(AppError::Unauthorized("Account no longer exists".to_string()));
        }
        Err(e) => return Err(e),
    };
    if !user.is_active {
        warn!("Inactive user {} presented a valid token", user.id);
        return Err(AppError::Forbidden("Account is inactive".to_string()));
    }

    // 权限以存储中的当前值为准
    let mut auth_user = AuthUser::from(claims);
    auth_user.is_superuser = user.is_superuser;
    request.extensions_mut().insert(auth_user);
    Ok(next.run(request).await)
}

/// 运营人员权限检查中间件(需位于 jwt_auth_middleware 之后)
pub async fn require_superuser(request: Request, next: Next) -> Result<Response, AppError> {
    match request.extensions().get::<AuthUser>() {
        Some(auth_user) if auth_user.is_superuser => Ok(next.run(request).await),
        Some(auth_user) => {
            warn!("Non-superuser {} attempted admin operation", auth_user.user_id);
            Err(AppError::Forbidden("Operator permission required".to_string()))
        }
        None => {
            warn!("Unauthenticated request attempted admin operation");
            Err(AppError::Unauthorized("Missing bearer token".to_string()))
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("Missing bearer token".to_string()))
    }
}
