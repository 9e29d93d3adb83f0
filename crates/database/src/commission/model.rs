use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utils::{AppError, AppResult};
use utoipa::ToSchema;

use crate::now_timestamp;

/// 佣金类型: 第1级为直推，第2级及以上为间推
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CommissionType {
    Direct,
    Indirect,
}

impl CommissionType {
    pub fn for_level(level: u8) -> Self {
        if level <= 1 {
            CommissionType::Direct
        } else {
            CommissionType::Indirect
        }
    }
}

/// 佣金状态
///
/// pending -> approved -> paid
/// pending -> cancelled, approved -> cancelled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CommissionStatus {
    Pending,
    Approved,
    Paid,
    Cancelled,
}

impl CommissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommissionStatus::Pending => "pending",
            CommissionStatus::Approved => "approved",
            CommissionStatus::Paid => "paid",
            CommissionStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, CommissionStatus::Paid | CommissionStatus::Cancelled)
    }

    pub fn can_transition_to(&self, next: CommissionStatus) -> bool {
        matches!(
            (*self, next),
            (CommissionStatus::Pending, CommissionStatus::Approved)
                | (CommissionStatus::Approved, CommissionStatus::Paid)
                | (CommissionStatus::Pending, CommissionStatus::Cancelled)
                | (CommissionStatus::Approved, CommissionStatus::Cancelled)
        )
    }
}

impl std::str::FromStr for CommissionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(CommissionStatus::Pending),
            "approved" => Ok(CommissionStatus::Approved),
            "paid" => Ok(CommissionStatus::Paid),
            "cancelled" => Ok(CommissionStatus::Cancelled),
            other => Err(format!("unknown commission status: {}", other)),
        }
    }
}

/// 佣金记录
///
/// `commission_rate` 与 `amount` 在创建时冻结，之后只有状态相关字段会变化。
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Commission {
    #[serde(rename = "_id")]
    pub id: String,
    /// 受益人(上级)
    pub user_id: String,
    /// 产生佣金的购买者
    pub referred_user_id: String,
    pub source_transaction_id: Option<String>,
    pub level: u8,
    #[schema(value_type = String)]
    pub amount: Decimal,
    pub commission_type: CommissionType,
    #[schema(value_type = String)]
    pub commission_rate: Decimal,
    pub status: CommissionStatus,
    pub approved_at: Option<u64>,
    pub paid_at: Option<u64>,
    pub cancelled_at: Option<u64>,
    pub payout_transaction_id: Option<String>,
    pub created_at: u64,
    pub updated_at: u64,
}

impl Commission {
    pub fn new_pending(
        user_id: &str,
        referred_user_id: &str,
        source_transaction_id: &str,
        level: u8,
        amount: Decimal,
        commission_rate: Decimal,
    ) -> Self {
        let now = now_timestamp();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            referred_user_id: referred_user_id.to_string(),
            source_transaction_id: Some(source_transaction_id.to_string()),
            level,
            amount,
            commission_type: CommissionType::for_level(level),
            commission_rate,
            status: CommissionStatus::Pending,
            approved_at: None,
            paid_at: None,
            cancelled_at: None,
            payout_transaction_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// 在内存中应用状态迁移(调用方负责校验起始状态)
    pub fn apply(&mut self, transition: &CommissionTransition, at: u64) {
        self.status = transition.target();
        self.updated_at = at;
        match transition {
            CommissionTransition::Approve => self.approved_at = Some(at),
            CommissionTransition::MarkPaid { payout_transaction_id } => {
                self.paid_at = Some(at);
                self.payout_transaction_id = Some(payout_transaction_id.clone());
            }
            CommissionTransition::Cancel => self.cancelled_at = Some(at),
        }
    }
}

/// 审批/发放流程中的一次状态迁移
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommissionTransition {
    Approve,
    MarkPaid { payout_transaction_id: String },
    Cancel,
}

impl CommissionTransition {
    pub fn target(&self) -> CommissionStatus {
        match self {
            CommissionTransition::Approve => CommissionStatus::Approved,
            CommissionTransition::MarkPaid { .. } => CommissionStatus::Paid,
            CommissionTransition::Cancel => CommissionStatus::Cancelled,
        }
    }

    /// 允许的起始状态
    pub fn allowed_from(&self) -> &'static [CommissionStatus] {
        match self {
            CommissionTransition::Approve => &[CommissionStatus::Pending],
            CommissionTransition::MarkPaid { .. } => &[CommissionStatus::Approved],
            CommissionTransition::Cancel => &[CommissionStatus::Pending, CommissionStatus::Approved],
        }
    }
}

/// 用户收益汇总
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CommissionSummary {
    #[schema(value_type = String)]
    pub total_earned: Decimal,
    #[schema(value_type = String)]
    pub pending: Decimal,
    #[schema(value_type = String)]
    pub approved: Decimal,
    #[schema(value_type = String)]
    pub paid: Decimal,
    #[schema(value_type = String)]
    pub cancelled: Decimal,
    pub direct_count: u64,
    pub indirect_count: u64,
}

impl CommissionSummary {
    pub fn from_commissions(commissions: &[Commission]) -> AppResult<Self> {
        let mut summary = CommissionSummary::default();
        for commission in commissions {
            let bucket = match commission.status {
                CommissionStatus::Pending => &mut summary.pending,
                CommissionStatus::Approved => &mut summary.approved,
                CommissionStatus::Paid => &mut summary.paid,
                CommissionStatus::Cancelled => &mut summary.cancelled,
            };
            *bucket = checked_sum(*bucket, commission.amount)?;
            if commission.status == CommissionStatus::Cancelled {
                continue;
            }

            summary.total_earned = checked_sum(summary.total_earned, commission.amount)?;
            match commission.commission_type {
                CommissionType::Direct => summary.direct_count += 1,
                CommissionType::Indirect => summary.indirect_count += 1,
            }
        }
        Ok(summary)
    }
}

fn checked_sum(total: Decimal, amount: Decimal) -> AppResult<Decimal> {
    total
        .checked_add(amount)
        .ok_or_else(|| AppError::InternalServerErrorWithContext("Commission summary overflowed.".to_string()))
}
