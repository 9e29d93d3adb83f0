pub mod admin_controller;
pub mod auth_controller;
pub mod commission_controller;
pub mod package_controller;
pub mod payment_controller;
pub mod refer_controller;


use axum::routing::{get, Router};

/// 系统健康检查
///
/// 返回服务器运行状态
#[utoipa::path(
    get,
    path = "/api/v1",
    responses(
        (status = 200, description = "服务器运行正常", body = String)
    ),
    tag = "系统状态"
)]
pub async fn health() -> &'static str {
    "Server is running! 🚀"
}

pub fn app() -> Router {
    Router::new()
        .route("/", get(health))
        .nest("/auth", auth_controller::AuthController::app())
        .nest("/refer", refer_controller::ReferController::app())
        .nest("/packages", package_controller::PackageController::app())
        .nest("/payment", payment_controller::PaymentController::app())
        .nest("/commission", commission_controller::CommissionController::app())
        .nest("/admin", admin_controller::AdminController::app())
}
