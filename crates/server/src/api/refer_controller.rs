use crate::{
    auth::{jwt_auth_middleware, AuthUser},
    dtos::user_dto::UserResponse,
    services::Services,
};
use axum::{middleware, routing::get, Extension, Json, Router};
use utils::AppResult;

/// 我直接推荐的用户
#[utoipa::path(
    get,
    path = "/api/v1/refer/referrals",
    tag = "refer",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "直推用户列表", body = Vec<UserResponse>)
    )
)]
pub async fn get_referrals(
    Extension(services): Extension<Services>,
    auth_user: AuthUser,
) -> AppResult<Json<Vec<UserResponse>>> {
    let lowers = services.user.get_lowers(&auth_user.user_id).await?;

    Ok(Json(lowers.into_iter().map(UserResponse::from).collect()))
}

/// 我的上级推荐链(由近及远)
#[utoipa::path(
    get,
    path = "/api/v1/refer/uppers",
    tag = "refer",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "上级推荐人列表", body = Vec<UserResponse>)
    )
)]
pub async fn get_uppers(
    Extension(services): Extension<Services>,
    auth_user: AuthUser,
) -> AppResult<Json<Vec<UserResponse>>> {
    let uppers = services.user.get_uppers(&auth_user.user_id).await?;

    Ok(Json(uppers.into_iter().map(UserResponse::from).collect()))
}

pub struct ReferController;
impl ReferController {
    pub fn app() -> Router {
        Router::new()
            .route("/referrals", get(get_referrals))
            .route("/uppers", get(get_uppers))
            .route_layer(middleware::from_fn(jwt_auth_middleware))
    }
}
