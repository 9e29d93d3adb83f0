use async_trait::async_trait;
use database::{
    commission::repository::DynCommissionRepository, now_timestamp, transaction::repository::DynTransactionRepository,
    Commission, CommissionStatus, CommissionSummary, CommissionTransition, TransactionStatus, TransactionType,
};
use std::sync::Arc;
use tracing::{info, warn};
use utils::{AppError, AppResult};

pub type DynCommissionWorkflow = Arc<dyn CommissionWorkflowTrait + Send + Sync>;

/// 佣金审批/发放流程，以及受益人视角的查询
#[async_trait]
pub trait CommissionWorkflowTrait {
    async fn approve(&self, id: &str) -> AppResult<Commission>;
    async fn mark_paid(&self, id: &str, payout_transaction_id: &str) -> AppResult<Commission>;
    async fn cancel(&self, id: &str) -> AppResult<Commission>;
    async fn list_commissions(&self, user_id: &str, status: Option<CommissionStatus>) -> AppResult<Vec<Commission>>;
    async fn summary(&self, user_id: &str) -> AppResult<CommissionSummary>;
}

#[derive(Clone)]
pub struct CommissionWorkflow {
    commissions: DynCommissionRepository,
    transactions: DynTransactionRepository,
}

impl CommissionWorkflow {
    pub fn new(commissions: DynCommissionRepository, transactions: DynTransactionRepository) -> Self {
        Self {
            commissions,
            transactions,
        }
    }

    async fn load(&self, id: &str) -> AppResult<Commission> {
        self.commissions
            .get_commission(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Commission {} not found.", id)))
    }

    fn ensure_allowed(commission: &Commission, transition: &CommissionTransition) -> AppResult<()> {
        if transition.allowed_from().contains(&commission.status) {
            Ok(())
        } else {
            Err(AppError::InvalidState(format!(
                "Commission {} is {}, cannot move to {}.",
                commission.id,
                commission.status.as_str(),
                transition.target().as_str()
            )))
        }
    }

    /// 条件更新: 状态守卫与写入在同一个原子操作中完成
    async fn transition(&self, commission: Commission, transition: CommissionTransition) -> AppResult<Commission> {
        Self::ensure_allowed(&commission, &transition)?;

        match self
            .commissions
            .apply_transition(&commission.id, &transition, now_timestamp())
            .await?
        {
            Some(updated) => {
                info!(
                    "📝 佣金 {} 状态变更: {} -> {}",
                    updated.id,
                    commission.status.as_str(),
                    updated.status.as_str()
                );
                Ok(updated)
            }
            None => {
                // 检查与写入之间被并发修改
                let current = self.load(&commission.id).await?;
                warn!(
                    "⚠️ 佣金 {} 已被并发修改为 {}",
                    current.id,
                    current.status.as_str()
                );
                Err(AppError::InvalidState(format!(
                    "Commission {} is {}, cannot move to {}.",
                    current.id,
                    current.status.as_str(),
                    transition.target().as_str()
                )))
            }
        }
    }
}

#[async_trait]
impl CommissionWorkflowTrait for CommissionWorkflow {
    async fn approve(&self, id: &str) -> AppResult<Commission> {
        let commission = self.load(id).await?;
        self.transition(commission, CommissionTransition::Approve).await
    }

    async fn mark_paid(&self, id: &str, payout_transaction_id: &str) -> AppResult<Commission> {
        let commission = self.load(id).await?;
        let transition = CommissionTransition::MarkPaid {
            payout_transaction_id: payout_transaction_id.to_string(),
        };
        Self::ensure_allowed(&commission, &transition)?;

        let payout = self
            .transactions
            .get_transaction(payout_transaction_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Transaction {} not found.", payout_transaction_id)))?;

        if payout.transaction_type != TransactionType::CommissionPayout {
            return Err(AppError::InvalidState(format!(
                "Transaction {} is a {}, not a commission payout.",
                payout.id,
                payout.transaction_type.as_str()
            )));
        }
        if payout.status != TransactionStatus::Completed {
            return Err(AppError::InvalidState(format!(
                "Payout transaction {} is {}, not completed.",
                payout.id,
                payout.status.as_str()
            )));
        }
        if payout.user_id != commission.user_id {
            return Err(AppError::InvalidState(format!(
                "Payout transaction {} does not belong to the earner of commission {}.",
                payout.id, commission.id
            )));
        }

        self.transition(commission, transition).await
    }

    async fn cancel(&self, id: &str) -> AppResult<Commission> {
        let commission = self.load(id).await?;
        self.transition(commission, CommissionTransition::Cancel).await
    }

    async fn list_commissions(&self, user_id: &str, status: Option<CommissionStatus>) -> AppResult<Vec<Commission>> {
        let commissions = self.commissions.list_commissions(user_id, status).await?;

        Ok(commissions)
    }

    async fn summary(&self, user_id: &str) -> AppResult<CommissionSummary> {
        let commissions = self.commissions.list_commissions(user_id, None).await?;

        CommissionSummary::from_commissions(&commissions)
    }
}
