use crate::{
    auth::{jwt_auth_middleware, AuthUser},
    dtos::payment_dto::{CreateOrderDto, FailPaymentDto, VerifyPaymentDto},
    extractors::validation_extractor::ValidationExtractor,
    services::{
        ledger::{Checkout, CompletionOutcome, PaymentProof},
        Services,
    },
};
use axum::{
    middleware,
    routing::{get, post},
    Extension, Json, Router,
};
use database::Transaction;
use utils::{AppError, AppResult};

/// 只允许操作自己的交易
async fn own_transaction(services: &Services, auth_user: &AuthUser, transaction_id: &str) -> AppResult<Transaction> {
    let transaction = services.ledger.get_transaction(transaction_id).await?;
    if transaction.user_id != auth_user.user_id {
        return Err(AppError::NotFound(format!("Transaction {} not found.", transaction_id)));
    }

    Ok(transaction)
}

/// 创建套餐支付订单
#[utoipa::path(
    post,
    path = "/api/v1/payment/orders",
    tag = "payment",
    security(("bearer_auth" = [])),
    request_body = CreateOrderDto,
    responses(
        (status = 200, description = "订单已创建，交易处于 pending", body = Checkout)
    )
)]
pub async fn create_order(
    Extension(services): Extension<Services>,
    auth_user: AuthUser,
    ValidationExtractor(req): ValidationExtractor<CreateOrderDto>,
) -> AppResult<Json<Checkout>> {
    let checkout = services
        .ledger
        .create_checkout(&auth_user.user_id, req.package_type)
        .await?;

    Ok(Json(checkout))
}

/// 校验支付签名并完成交易
///
/// 成功后同步计算推荐佣金
#[utoipa::path(
    post,
    path = "/api/v1/payment/verify",
    tag = "payment",
    security(("bearer_auth" = [])),
    request_body = VerifyPaymentDto,
    responses(
        (status = 200, description = "交易已完成", body = CompletionOutcome),
        (status = 400, description = "支付签名无效"),
        (status = 409, description = "交易已是终态")
    )
)]
pub async fn verify_payment(
    Extension(services): Extension<Services>,
    auth_user: AuthUser,
    ValidationExtractor(req): ValidationExtractor<VerifyPaymentDto>,
) -> AppResult<Json<CompletionOutcome>> {
    own_transaction(&services, &auth_user, &req.transaction_id).await?;

    let outcome = services
        .ledger
        .complete(
            &req.transaction_id,
            PaymentProof::Gateway {
                payment_id: req.payment_id,
                signature: req.signature,
            },
        )
        .await?;

    Ok(Json(outcome))
}

/// 支付失败回调
#[utoipa::path(
    post,
    path = "/api/v1/payment/fail",
    tag = "payment",
    security(("bearer_auth" = [])),
    request_body = FailPaymentDto,
    responses(
        (status = 200, description = "交易已标记为失败", body = Transaction),
        (status = 409, description = "交易已是终态")
    )
)]
pub async fn fail_payment(
    Extension(services): Extension<Services>,
    auth_user: AuthUser,
    ValidationExtractor(req): ValidationExtractor<FailPaymentDto>,
) -> AppResult<Json<Transaction>> {
    own_transaction(&services, &auth_user, &req.transaction_id).await?;

    let transaction = services
        .ledger
        .fail(&req.transaction_id, req.reason.as_deref().unwrap_or_default())
        .await?;

    Ok(Json(transaction))
}

/// 我的交易记录
#[utoipa::path(
    get,
    path = "/api/v1/payment/transactions",
    tag = "payment",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "交易列表(按创建时间倒序)", body = Vec<Transaction>)
    )
)]
pub async fn list_transactions(
    Extension(services): Extension<Services>,
    auth_user: AuthUser,
) -> AppResult<Json<Vec<Transaction>>> {
    let transactions = services.ledger.list_transactions(&auth_user.user_id).await?;

    Ok(Json(transactions))
}

pub struct PaymentController;
impl PaymentController {
    pub fn app() -> Router {
        Router::new()
            .route("/orders", post(create_order))
            .route("/verify", post(verify_payment))
            .route("/fail", post(fail_payment))
            .route("/transactions", get(list_transactions))
            .route_layer(middleware::from_fn(jwt_auth_middleware))
    }
}
