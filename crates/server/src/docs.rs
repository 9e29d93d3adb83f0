use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Affiliate Learning Platform API",
        description = "课程套餐购买、推荐关系与多级佣金结算 API 文档",
        version = "1.0.0",
        contact(
            name = "API Support",
            email = "support@example.com"
        )
    ),
    paths(
        // System health check
        crate::api::health,
        // Auth endpoints
        crate::api::auth_controller::signup,
        crate::api::auth_controller::login,
        crate::api::auth_controller::me,
        // Refer endpoints
        crate::api::refer_controller::get_referrals,
        crate::api::refer_controller::get_uppers,
        // Package endpoints
        crate::api::package_controller::list_packages,
        // Payment endpoints
        crate::api::payment_controller::create_order,
        crate::api::payment_controller::verify_payment,
        crate::api::payment_controller::fail_payment,
        crate::api::payment_controller::list_transactions,
        // Commission endpoints
        crate::api::commission_controller::list_commissions,
        crate::api::commission_controller::get_summary,
        // Admin endpoints
        crate::api::admin_controller::approve_commission,
        crate::api::admin_controller::pay_commission,
        crate::api::admin_controller::cancel_commission,
        crate::api::admin_controller::create_payout,
        crate::api::admin_controller::backfill_commissions,
        crate::api::admin_controller::set_user_active,
    ),
    components(
        schemas(
            // Database models
            database::PackageType,
            database::Transaction,
            database::TransactionStatus,
            database::TransactionType,
            database::Commission,
            database::CommissionStatus,
            database::CommissionType,
            database::CommissionSummary,
            // Service results
            crate::services::ledger::Checkout,
            crate::services::ledger::CompletionOutcome,
            crate::services::commission::BackfillReport,
            // DTOs
            crate::dtos::auth_dto::SignupDto,
            crate::dtos::auth_dto::LoginDto,
            crate::dtos::auth_dto::TokenResponse,
            crate::dtos::user_dto::UserResponse,
            crate::dtos::user_dto::SetActiveDto,
            crate::dtos::package_dto::PackageResponse,
            crate::dtos::payment_dto::CreateOrderDto,
            crate::dtos::payment_dto::VerifyPaymentDto,
            crate::dtos::payment_dto::FailPaymentDto,
            crate::dtos::admin_dto::PayCommissionDto,
            crate::dtos::admin_dto::CreatePayoutDto,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "系统状态", description = "健康检查"),
        (name = "auth", description = "注册与登录"),
        (name = "refer", description = "推荐关系"),
        (name = "package", description = "课程套餐"),
        (name = "payment", description = "支付与交易"),
        (name = "commission", description = "我的佣金"),
        (name = "admin", description = "运营操作(需 superuser)")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
