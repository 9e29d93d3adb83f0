use crate::{
    auth::{jwt_auth_middleware, require_superuser, AuthUser},
    dtos::{
        admin_dto::{CreatePayoutDto, PayCommissionDto},
        user_dto::{SetActiveDto, UserResponse},
    },
    extractors::validation_extractor::ValidationExtractor,
    services::{commission::BackfillReport, Services},
};
use axum::{extract::Path, middleware, routing::post, Extension, Json, Router};
use database::{Commission, Transaction};
use tracing::info;
use utils::AppResult;

/// 审批佣金 (pending -> approved)
#[utoipa::path(
    post,
    path = "/api/v1/admin/commission/{id}/approve",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "佣金ID")),
    responses(
        (status = 200, description = "已审批", body = Commission),
        (status = 404, description = "佣金不存在"),
        (status = 409, description = "当前状态不允许审批")
    )
)]
pub async fn approve_commission(
    Extension(services): Extension<Services>,
    operator: AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<Commission>> {
    info!("🛠️ 运营 {} 审批佣金 {}", operator.email, id);
    let commission = services.commission.approve(&id).await?;

    Ok(Json(commission))
}

/// 标记佣金已发放 (approved -> paid)
#[utoipa::path(
    post,
    path = "/api/v1/admin/commission/{id}/pay",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "佣金ID")),
    request_body = PayCommissionDto,
    responses(
        (status = 200, description = "已发放", body = Commission),
        (status = 404, description = "佣金或发放交易不存在"),
        (status = 409, description = "当前状态不允许发放或发放交易不匹配")
    )
)]
pub async fn pay_commission(
    Extension(services): Extension<Services>,
    operator: AuthUser,
    Path(id): Path<String>,
    ValidationExtractor(req): ValidationExtractor<PayCommissionDto>,
) -> AppResult<Json<Commission>> {
    info!(
        "🛠️ 运营 {} 发放佣金 {} (交易 {})",
        operator.email, id, req.payout_transaction_id
    );
    let commission = services
        .commission
        .mark_paid(&id, &req.payout_transaction_id)
        .await?;

    Ok(Json(commission))
}

/// 取消佣金
#[utoipa::path(
    post,
    path = "/api/v1/admin/commission/{id}/cancel",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "佣金ID")),
    responses(
        (status = 200, description = "已取消", body = Commission),
        (status = 409, description = "佣金已是终态")
    )
)]
pub async fn cancel_commission(
    Extension(services): Extension<Services>,
    operator: AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<Commission>> {
    info!("🛠️ 运营 {} 取消佣金 {}", operator.email, id);
    let commission = services.commission.cancel(&id).await?;

    Ok(Json(commission))
}

/// 登记一笔佣金发放交易
///
/// 发放在线下完成，结算流水号作为完成凭证，交易直接记为 completed
#[utoipa::path(
    post,
    path = "/api/v1/admin/payouts",
    tag = "admin",
    security(("bearer_auth" = [])),
    request_body = CreatePayoutDto,
    responses(
        (status = 200, description = "发放交易已结算", body = Transaction),
        (status = 404, description = "收款用户不存在")
    )
)]
pub async fn create_payout(
    Extension(services): Extension<Services>,
    operator: AuthUser,
    ValidationExtractor(req): ValidationExtractor<CreatePayoutDto>,
) -> AppResult<Json<Transaction>> {
    info!("🛠️ 运营 {} 登记发放 {} -> {}", operator.email, req.amount, req.user_id);
    let payout = services
        .ledger
        .record_payout(&req.user_id, req.amount, &req.reference, req.description)
        .await?;

    Ok(Json(payout))
}

/// 对所有已完成购买补算佣金
#[utoipa::path(
    post,
    path = "/api/v1/admin/commission/backfill",
    tag = "admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "补算结果", body = BackfillReport)
    )
)]
pub async fn backfill_commissions(
    Extension(services): Extension<Services>,
    operator: AuthUser,
) -> AppResult<Json<BackfillReport>> {
    info!("🛠️ 运营 {} 触发佣金补算", operator.email);
    let report = services.engine.backfill().await?;

    Ok(Json(report))
}

/// 启用/停用用户
#[utoipa::path(
    post,
    path = "/api/v1/admin/user/{id}/active",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "用户ID")),
    request_body = SetActiveDto,
    responses(
        (status = 200, description = "用户状态已更新", body = UserResponse),
        (status = 404, description = "用户不存在")
    )
)]
pub async fn set_user_active(
    Extension(services): Extension<Services>,
    Path(id): Path<String>,
    ValidationExtractor(req): ValidationExtractor<SetActiveDto>,
) -> AppResult<Json<UserResponse>> {
    let user = services.user.set_active(&id, req.is_active).await?;

    Ok(Json(user.into()))
}

pub struct AdminController;
impl AdminController {
    pub fn app() -> Router {
        Router::new()
            .route("/commission/backfill", post(backfill_commissions))
            .route("/commission/:id/approve", post(approve_commission))
            .route("/commission/:id/pay", post(pay_commission))
            .route("/commission/:id/cancel", post(cancel_commission))
            .route("/payouts", post(create_payout))
            .route("/user/:id/active", post(set_user_active))
            .route_layer(middleware::from_fn(require_superuser))
            .route_layer(middleware::from_fn(jwt_auth_middleware))
    }
}
