use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{now_timestamp, user::model::PackageType};

/// 交易类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    PackagePurchase,
    CommissionPayout,
    Refund,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::PackagePurchase => "package_purchase",
            TransactionType::CommissionPayout => "commission_payout",
            TransactionType::Refund => "refund",
        }
    }
}

/// 交易状态，只能从 pending 单向迁出
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
    Cancelled,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Completed => "completed",
            TransactionStatus::Failed => "failed",
            TransactionStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_final(&self) -> bool {
        match self {
            TransactionStatus::Pending => false,
            TransactionStatus::Completed | TransactionStatus::Failed | TransactionStatus::Cancelled => true,
        }
    }
}

/// 交易记录
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Transaction {
    #[serde(rename = "_id")]
    pub id: String,
    /// 所属用户ID
    pub user_id: String,
    #[schema(value_type = String)]
    pub amount: Decimal,
    pub currency: String,
    pub transaction_type: TransactionType,
    pub status: TransactionStatus,
    /// 支付网关订单号
    pub gateway_order_id: Option<String>,
    pub gateway_payment_id: Option<String>,
    pub gateway_signature: Option<String>,
    pub package_type: Option<PackageType>,
    #[schema(value_type = Object)]
    pub metadata: serde_json::Value,
    pub description: Option<String>,
    pub failure_reason: Option<String>,
    pub completed_at: Option<u64>,
    pub created_at: u64,
    pub updated_at: u64,
}

impl Transaction {
    pub fn new_pending(
        user_id: &str,
        amount: Decimal,
        currency: &str,
        transaction_type: TransactionType,
        package_type: Option<PackageType>,
        metadata: serde_json::Value,
    ) -> Self {
        let now = now_timestamp();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            amount,
            currency: currency.to_string(),
            transaction_type,
            status: TransactionStatus::Pending,
            gateway_order_id: None,
            gateway_payment_id: None,
            gateway_signature: None,
            package_type,
            metadata,
            description: None,
            failure_reason: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_completed_purchase(&self) -> bool {
        self.transaction_type == TransactionType::PackagePurchase && self.status == TransactionStatus::Completed
    }
}

/// 已通过校验的完成凭证
#[derive(Debug, Clone)]
pub struct GatewayCompletion {
    pub payment_id: String,
    /// 运营人员手工结算时没有网关签名
    pub signature: Option<String>,
}
