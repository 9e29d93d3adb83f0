use crate::services::commission::commission_config::CommissionConfig;
use async_trait::async_trait;
use database::{
    commission::repository::DynCommissionRepository, transaction::repository::DynTransactionRepository,
    user::repository::DynUserRepository, Commission, CommissionInsert, Transaction,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};
use utils::{AppError, AppResult};
use utoipa::ToSchema;

pub type DynCommissionEngine = Arc<dyn CommissionEngineTrait + Send + Sync>;

#[async_trait]
pub trait CommissionEngineTrait {
    /// 交易完成后生成各层级的 pending 佣金(幂等)
    async fn on_transaction_completed(&self, transaction: &Transaction) -> AppResult<Vec<Commission>>;

    /// 对所有已完成的套餐购买重新执行一次引擎
    async fn backfill(&self) -> AppResult<BackfillReport>;
}

/// 补算结果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct BackfillReport {
    /// 扫描的已完成购买数
    pub scanned: u64,
    /// 本次补写了佣金的交易数
    pub credited_transactions: u64,
    pub created_commissions: u64,
    pub failed_transactions: Vec<String>,
}

pub struct CommissionEngine {
    users: DynUserRepository,
    transactions: DynTransactionRepository,
    commissions: DynCommissionRepository,
    config: CommissionConfig,
}

impl CommissionEngine {
    pub fn new(
        users: DynUserRepository,
        transactions: DynTransactionRepository,
        commissions: DynCommissionRepository,
        config: CommissionConfig,
    ) -> Self {
        Self {
            users,
            transactions,
            commissions,
            config,
        }
    }

    /// 沿推荐链向上计算每一层的佣金(只读，不落库)
    async fn plan(&self, transaction: &Transaction) -> AppResult<Vec<Commission>> {
        let Some(package) = transaction.package_type else {
            warn!("⚠️ 套餐购买 {} 缺少套餐类型，跳过佣金计算", transaction.id);
            return Ok(Vec::new());
        };

        // 链路读取失败直接返回错误，此时尚未写入任何数据
        let uppers = self
            .users
            .get_uppers(&transaction.user_id, self.config.max_levels as usize)
            .await?;

        let mut planned = Vec::with_capacity(uppers.len());
        for (index, upper) in uppers.iter().enumerate() {
            let level = (index + 1) as u8;
            let Some(rate) = self.config.rates.lookup(level, package) else {
                info!("🔚 第{}级 {} 套餐未配置费率，停止追溯", level, package);
                break;
            };

            let amount = transaction.amount.checked_mul(rate).ok_or_else(|| {
                AppError::InternalServerErrorWithContext(format!(
                    "Commission for transaction {} overflowed at level {}.",
                    transaction.id, level
                ))
            })?;
            let amount = self.config.rounding.apply(amount);
            planned.push(Commission::new_pending(
                &upper.id,
                &transaction.user_id,
                &transaction.id,
                level,
                amount,
                rate,
            ));
        }

        Ok(planned)
    }
}

#[async_trait]
impl CommissionEngineTrait for CommissionEngine {
    async fn on_transaction_completed(&self, transaction: &Transaction) -> AppResult<Vec<Commission>> {
        if !transaction.is_completed_purchase() {
            return Ok(Vec::new());
        }

        // 已入账的交易直接返回已有佣金，不再读取推荐链
        let existing = self.commissions.list_by_source_transaction(&transaction.id).await?;
        if !existing.is_empty() {
            info!("♻️ 交易 {} 已生成过佣金，直接返回", transaction.id);
            return Ok(existing);
        }

        let planned = self.plan(transaction).await?;

        match self.commissions.create_commissions(&transaction.id, planned).await? {
            CommissionInsert::Created(created) => {
                for commission in &created {
                    info!(
                        "💰 第{}级佣金: {} <- {} 金额 {} (费率 {})",
                        commission.level,
                        commission.user_id,
                        commission.referred_user_id,
                        commission.amount,
                        commission.commission_rate
                    );
                }
                Ok(created)
            }
            CommissionInsert::Existing(existing) => {
                info!("♻️ 交易 {} 已生成过佣金，直接返回", transaction.id);
                Ok(existing)
            }
        }
    }

    async fn backfill(&self) -> AppResult<BackfillReport> {
        let purchases = self.transactions.list_completed_purchases().await?;
        let mut report = BackfillReport {
            scanned: purchases.len() as u64,
            ..Default::default()
        };

        info!("🔄 开始补算佣金，共 {} 笔已完成购买", purchases.len());

        for transaction in &purchases {
            let existing = self.commissions.list_by_source_transaction(&transaction.id).await?;
            if !existing.is_empty() {
                continue;
            }

            match self.on_transaction_completed(transaction).await {
                Ok(created) if !created.is_empty() => {
                    report.credited_transactions += 1;
                    report.created_commissions += created.len() as u64;
                }
                Ok(_) => {}
                Err(e) => {
                    error!("❌ 交易 {} 佣金补算失败: {}", transaction.id, e);
                    report.failed_transactions.push(transaction.id.clone());
                }
            }
        }

        info!(
            "✅ 佣金补算完成: 补写 {} 笔交易 / {} 条佣金，失败 {} 笔",
            report.credited_transactions,
            report.created_commissions,
            report.failed_transactions.len()
        );
        Ok(report)
    }
}
