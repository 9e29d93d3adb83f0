use crate::{
    auth::{jwt_auth_middleware, AuthUser},
    dtos::{
        auth_dto::{LoginDto, SignupDto, TokenResponse},
        user_dto::UserResponse,
    },
    extractors::validation_extractor::ValidationExtractor,
    services::{user::SignupInput, Services},
};
use axum::{
    http::StatusCode,
    middleware,
    routing::{get, post},
    Extension, Json, Router,
};
use utils::AppResult;

/// 用户注册
///
/// 推荐码可选，无法识别的推荐码会被忽略
#[utoipa::path(
    post,
    path = "/api/v1/auth/signup",
    tag = "auth",
    request_body = SignupDto,
    responses(
        (status = 201, description = "注册成功", body = UserResponse),
        (status = 409, description = "邮箱已被注册"),
        (status = 422, description = "请求参数校验失败")
    )
)]
pub async fn signup(
    Extension(services): Extension<Services>,
    ValidationExtractor(req): ValidationExtractor<SignupDto>,
) -> AppResult<(StatusCode, Json<UserResponse>)> {
    let user = services
        .user
        .signup(SignupInput {
            email: req.email,
            password: req.password,
            full_name: req.full_name,
            phone: req.phone,
            referral_code: req.referral_code,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(user.into())))
}

/// 邮箱密码登录
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "auth",
    request_body = LoginDto,
    responses(
        (status = 200, description = "登录成功", body = TokenResponse),
        (status = 401, description = "邮箱或密码错误"),
        (status = 403, description = "账号已停用")
    )
)]
pub async fn login(
    Extension(services): Extension<Services>,
    ValidationExtractor(req): ValidationExtractor<LoginDto>,
) -> AppResult<Json<TokenResponse>> {
    let outcome = services.user.login(&req.email, &req.password).await?;

    Ok(Json(TokenResponse {
        access_token: outcome.access_token,
        token_type: "bearer".to_string(),
        expires_in: outcome.expires_in,
        user: outcome.user.into(),
    }))
}

/// 当前登录用户
#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    tag = "auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "当前用户信息", body = UserResponse),
        (status = 401, description = "未登录或令牌无效")
    )
)]
pub async fn me(Extension(services): Extension<Services>, auth_user: AuthUser) -> AppResult<Json<UserResponse>> {
    let user = services.user.get_user(&auth_user.user_id).await?;

    Ok(Json(user.into()))
}

pub struct AuthController;
impl AuthController {
    pub fn app() -> Router {
        let protected = Router::new()
            .route("/me", get(me))
            .route_layer(middleware::from_fn(jwt_auth_middleware));

        Router::new()
            .route("/signup", post(signup))
            .route("/login", post(login))
            .merge(protected)
    }
}
