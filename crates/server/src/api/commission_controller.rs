use crate::{
    auth::{jwt_auth_middleware, AuthUser},
    dtos::commission_dto::CommissionQuery,
    services::Services,
};
use axum::{extract::Query, middleware, routing::get, Extension, Json, Router};
use database::{Commission, CommissionStatus, CommissionSummary};
use utils::{AppError, AppResult};

/// 我的佣金列表
#[utoipa::path(
    get,
    path = "/api/v1/commission",
    tag = "commission",
    security(("bearer_auth" = [])),
    params(CommissionQuery),
    responses(
        (status = 200, description = "佣金列表(按创建时间倒序)", body = Vec<Commission>),
        (status = 400, description = "未知的状态")
    )
)]
pub async fn list_commissions(
    Extension(services): Extension<Services>,
    auth_user: AuthUser,
    Query(query): Query<CommissionQuery>,
) -> AppResult<Json<Vec<Commission>>> {
    let status = query
        .status
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.parse::<CommissionStatus>())
        .transpose()
        .map_err(AppError::BadRequest)?;

    let commissions = services
        .commission
        .list_commissions(&auth_user.user_id, status)
        .await?;

    Ok(Json(commissions))
}

/// 我的收益汇总
#[utoipa::path(
    get,
    path = "/api/v1/commission/summary",
    tag = "commission",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "按状态汇总的佣金金额", body = CommissionSummary)
    )
)]
pub async fn get_summary(
    Extension(services): Extension<Services>,
    auth_user: AuthUser,
) -> AppResult<Json<CommissionSummary>> {
    let summary = services.commission.summary(&auth_user.user_id).await?;

    Ok(Json(summary))
}

pub struct CommissionController;
impl CommissionController {
    pub fn app() -> Router {
        Router::new()
            .route("/", get(list_commissions))
            .route("/summary", get(get_summary))
            .route_layer(middleware::from_fn(jwt_auth_middleware))
    }
}
