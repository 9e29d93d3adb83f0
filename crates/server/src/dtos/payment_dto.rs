use database::PackageType;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// 创建支付订单
#[derive(Clone, Serialize, Deserialize, Debug, Validate, ToSchema)]
pub struct CreateOrderDto {
    pub package_type: PackageType,
}

/// 支付网关回调
#[derive(Clone, Serialize, Deserialize, Debug, Validate, Default, ToSchema)]
pub struct VerifyPaymentDto {
    #[validate(length(min = 1))]
    pub transaction_id: String,
    #[validate(length(min = 1))]
    pub payment_id: String,
    #[validate(length(min = 1))]
    pub signature: String,
}

#[derive(Clone, Serialize, Deserialize, Debug, Validate, Default, ToSchema)]
pub struct FailPaymentDto {
    #[validate(length(min = 1))]
    pub transaction_id: String,
    #[validate(length(max = 512))]
    pub reason: Option<String>,
}
