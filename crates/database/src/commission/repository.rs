use crate::{
    commission::model::{Commission, CommissionStatus, CommissionTransition},
    is_duplicate_key_error, storage_failure,
    transaction::model::{Transaction, TransactionStatus},
    Database,
};
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, Bson, Document},
    error::TRANSIENT_TRANSACTION_ERROR,
    options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument},
    ClientSession,
};
use std::sync::Arc;
use tracing::{info, warn};
use utils::{AppError, AppResult};

pub type DynCommissionRepository = Arc<dyn CommissionRepositoryTrait + Send + Sync>;

/// 一次批量写入的结果
#[derive(Debug, Clone)]
pub enum CommissionInsert {
    /// 本次新写入
    Created(Vec<Commission>),
    /// 此前已为该交易生成过佣金，返回已有记录
    Existing(Vec<Commission>),
}

impl CommissionInsert {
    pub fn into_inner(self) -> Vec<Commission> {
        match self {
            CommissionInsert::Created(commissions) | CommissionInsert::Existing(commissions) => commissions,
        }
    }
}

#[async_trait]
pub trait CommissionRepositoryTrait {
    // 为一笔已完成交易写入所有层级的佣金(同一事务内，幂等)
    async fn create_commissions(
        &self,
        source_transaction_id: &str,
        commissions: Vec<Commission>,
    ) -> AppResult<CommissionInsert>;

    async fn get_commission(&self, id: &str) -> AppResult<Option<Commission>>;

    // 某个受益人的佣金，可按状态过滤
    async fn list_commissions(
        &self,
        user_id: &str,
        status: Option<CommissionStatus>,
    ) -> AppResult<Vec<Commission>>;

    async fn list_by_source_transaction(&self, source_transaction_id: &str) -> AppResult<Vec<Commission>>;

    // 带状态守卫的条件更新，起始状态不符时返回 None
    async fn apply_transition(
        &self,
        id: &str,
        transition: &CommissionTransition,
        at: u64,
    ) -> AppResult<Option<Commission>>;
}

impl Database {
    async fn find_by_source_in_session(
        &self,
        session: &mut ClientSession,
        source_transaction_id: &str,
    ) -> AppResult<Vec<Commission>> {
        let options = FindOptions::builder().sort(doc! { "level": 1 }).build();
        let mut cursor = self
            .commissions
            .find_with_session(doc! { "source_transaction_id": source_transaction_id }, options, session)
            .await?;
        let commissions: Vec<Commission> = cursor.stream(session).try_collect().await?;

        Ok(commissions)
    }

    async fn create_commissions_in_session(
        &self,
        session: &mut ClientSession,
        source_transaction_id: &str,
        commissions: &[Commission],
    ) -> AppResult<CommissionInsert> {
        let source: Transaction = self
            .transactions
            .find_one_with_session(doc! { "_id": source_transaction_id }, None, session)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Transaction {} not found.", source_transaction_id)))?;

        if source.status != TransactionStatus::Completed {
            return Err(AppError::InvalidState(format!(
                "Transaction {} is {}, commissions require a completed transaction.",
                source.id,
                source.status.as_str()
            )));
        }

        let existing = self.find_by_source_in_session(session, source_transaction_id).await?;
        if !existing.is_empty() {
            return Ok(CommissionInsert::Existing(existing));
        }

        if commissions.is_empty() {
            return Ok(CommissionInsert::Created(Vec::new()));
        }

        self.commissions
            .insert_many_with_session(commissions, None, session)
            .await?;

        Ok(CommissionInsert::Created(commissions.to_vec()))
    }
}

#[async_trait]
impl CommissionRepositoryTrait for Database {
    async fn create_commissions(
        &self,
        source_transaction_id: &str,
        commissions: Vec<Commission>,
    ) -> AppResult<CommissionInsert> {
        let mut session = self.client.start_session(None).await?;
        session.start_transaction(None).await?;

        match self
            .create_commissions_in_session(&mut session, source_transaction_id, &commissions)
            .await
        {
            Ok(result) => {
                session
                    .commit_transaction()
                    .await
                    .map_err(|e| storage_failure("commit commissions", e))?;
                if let CommissionInsert::Created(created) = &result {
                    info!("💰 交易 {} 写入 {} 条佣金", source_transaction_id, created.len());
                }
                Ok(result)
            }
            Err(AppError::MongoError(e)) if is_duplicate_key_error(&e) || e.contains_label(TRANSIENT_TRANSACTION_ERROR) => {
                // 并发的另一次调用已经写入(唯一索引冲突或写冲突)
                session.abort_transaction().await.ok();
                let existing = self.list_by_source_transaction(source_transaction_id).await?;
                if existing.is_empty() {
                    return Err(storage_failure("insert commissions", e));
                }
                warn!("⚠️ 交易 {} 的佣金已被并发写入，返回已有记录", source_transaction_id);
                Ok(CommissionInsert::Existing(existing))
            }
            Err(e) => {
                session.abort_transaction().await.ok();
                Err(e)
            }
        }
    }

    async fn get_commission(&self, id: &str) -> AppResult<Option<Commission>> {
        let commission = self.commissions.find_one(doc! { "_id": id }, None).await?;

        Ok(commission)
    }

    async fn list_commissions(
        &self,
        user_id: &str,
        status: Option<CommissionStatus>,
    ) -> AppResult<Vec<Commission>> {
        let mut filter = doc! { "user_id": user_id };
        if let Some(status) = status {
            filter.insert("status", status.as_str());
        }

        let options = FindOptions::builder().sort(doc! { "created_at": -1 }).build();
        let cursor = self.commissions.find(filter, options).await?;
        let commissions: Vec<Commission> = cursor.try_collect().await?;

        Ok(commissions)
    }

    async fn list_by_source_transaction(&self, source_transaction_id: &str) -> AppResult<Vec<Commission>> {
        let options = FindOptions::builder().sort(doc! { "level": 1 }).build();
        let cursor = self
            .commissions
            .find(doc! { "source_transaction_id": source_transaction_id }, options)
            .await?;
        let commissions: Vec<Commission> = cursor.try_collect().await?;

        Ok(commissions)
    }

    async fn apply_transition(
        &self,
        id: &str,
        transition: &CommissionTransition,
        at: u64,
    ) -> AppResult<Option<Commission>> {
        let allowed: Vec<&str> = transition.allowed_from().iter().map(|s| s.as_str()).collect();
        let filter = doc! { "_id": id, "status": { "$in": allowed } };

        let at = at as i64;
        let mut set: Document = doc! {
            "status": transition.target().as_str(),
            "updated_at": at,
        };
        match transition {
            CommissionTransition::Approve => {
                set.insert("approved_at", at);
            }
            CommissionTransition::MarkPaid { payout_transaction_id } => {
                set.insert("paid_at", at);
                set.insert("payout_transaction_id", Bson::String(payout_transaction_id.clone()));
            }
            CommissionTransition::Cancel => {
                set.insert("cancelled_at", at);
            }
        }

        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        let commission = self
            .commissions
            .find_one_and_update(filter, doc! { "$set": set }, options)
            .await?;

        Ok(commission)
    }
}
