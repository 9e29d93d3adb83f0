use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

fn validate_positive_amount(amount: &Decimal) -> Result<(), ValidationError> {
    if amount.is_sign_negative() || amount.is_zero() {
        return Err(ValidationError::new("amount must be positive"));
    }
    Ok(())
}

/// 标记佣金已发放
#[derive(Clone, Serialize, Deserialize, Debug, Validate, Default, ToSchema)]
pub struct PayCommissionDto {
    #[validate(length(min = 1))]
    pub payout_transaction_id: String,
}

/// 登记一笔线下完成的佣金发放
#[derive(Clone, Serialize, Deserialize, Debug, Validate, Default, ToSchema)]
pub struct CreatePayoutDto {
    #[validate(length(min = 1))]
    pub user_id: String,
    #[validate(custom = "validate_positive_amount")]
    #[schema(value_type = String)]
    pub amount: Decimal,
    /// 银行流水号等结算凭证
    #[validate(length(min = 1, max = 128))]
    pub reference: String,
    pub description: Option<String>,
}
