use crate::{
    now_timestamp, storage_failure,
    transaction::model::{GatewayCompletion, Transaction, TransactionStatus, TransactionType},
    Database,
};
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, to_bson, Document},
    options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument},
    ClientSession,
};
use std::sync::Arc;
use utils::{AppError, AppResult};

pub type DynTransactionRepository = Arc<dyn TransactionRepositoryTrait + Send + Sync>;

#[async_trait]
pub trait TransactionRepositoryTrait {
    // 创建一笔 pending 交易
    async fn create_transaction(&self, transaction: Transaction) -> AppResult<Transaction>;

    async fn get_transaction(&self, id: &str) -> AppResult<Option<Transaction>>;

    // pending -> completed，套餐购买时同时更新用户套餐(同一事务内)
    // 交易不存在或已不是 pending 时返回 None
    async fn complete_transaction(
        &self,
        id: &str,
        completion: GatewayCompletion,
    ) -> AppResult<Option<Transaction>>;

    // pending -> failed / cancelled
    async fn finalize_transaction(
        &self,
        id: &str,
        status: TransactionStatus,
        reason: Option<String>,
    ) -> AppResult<Option<Transaction>>;

    // 合并元数据(任何状态均可)
    async fn enrich_metadata(
        &self,
        id: &str,
        metadata: serde_json::Map<String, serde_json::Value>,
    ) -> AppResult<Option<Transaction>>;

    async fn list_transactions_by_user(&self, user_id: &str) -> AppResult<Vec<Transaction>>;

    // 所有已完成的套餐购买(用于佣金补算)
    async fn list_completed_purchases(&self) -> AppResult<Vec<Transaction>>;
}

impl Database {
    async fn complete_in_session(
        &self,
        session: &mut ClientSession,
        id: &str,
        completion: &GatewayCompletion,
    ) -> AppResult<Option<Transaction>> {
        let now = now_timestamp() as i64;
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        let filter = doc! { "_id": id, "status": TransactionStatus::Pending.as_str() };
        let update = doc! {
            "$set": {
                "status": TransactionStatus::Completed.as_str(),
                "gateway_payment_id": &completion.payment_id,
                "gateway_signature": &completion.signature,
                "completed_at": now,
                "updated_at": now,
            }
        };

        let Some(transaction) = self
            .transactions
            .find_one_and_update_with_session(filter, update, options, session)
            .await?
        else {
            return Ok(None);
        };

        if transaction.transaction_type == TransactionType::PackagePurchase {
            if let Some(package_type) = transaction.package_type {
                let update = doc! {
                    "$set": {
                        "package_type": package_type.as_str(),
                        "package_purchased_at": now,
                        "updated_at": now,
                    }
                };
                let result = self
                    .users
                    .update_one_with_session(doc! { "_id": &transaction.user_id }, update, None, session)
                    .await?;
                if result.matched_count == 0 {
                    return Err(AppError::NotFound(format!(
                        "Owner {} of transaction {} not found.",
                        transaction.user_id, transaction.id
                    )));
                }
            }
        }

        Ok(Some(transaction))
    }
}

#[async_trait]
impl TransactionRepositoryTrait for Database {
    async fn create_transaction(&self, transaction: Transaction) -> AppResult<Transaction> {
        self.transactions.insert_one(&transaction, None).await?;

        Ok(transaction)
    }

    async fn get_transaction(&self, id: &str) -> AppResult<Option<Transaction>> {
        let transaction = self.transactions.find_one(doc! { "_id": id }, None).await?;

        Ok(transaction)
    }

    async fn complete_transaction(
        &self,
        id: &str,
        completion: GatewayCompletion,
    ) -> AppResult<Option<Transaction>> {
        let mut session = self.client.start_session(None).await?;
        session.start_transaction(None).await?;

        match self.complete_in_session(&mut session, id, &completion).await {
            Ok(Some(transaction)) => {
                session
                    .commit_transaction()
                    .await
                    .map_err(|e| storage_failure("commit transaction completion", e))?;
                Ok(Some(transaction))
            }
            Ok(None) => {
                session.abort_transaction().await.ok();
                Ok(None)
            }
            Err(e) => {
                session.abort_transaction().await.ok();
                Err(e)
            }
        }
    }

    async fn finalize_transaction(
        &self,
        id: &str,
        status: TransactionStatus,
        reason: Option<String>,
    ) -> AppResult<Option<Transaction>> {
        if !matches!(status, TransactionStatus::Failed | TransactionStatus::Cancelled) {
            return Err(AppError::InvalidState(format!(
                "Transaction cannot be finalized as {}.",
                status.as_str()
            )));
        }

        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        let filter = doc! { "_id": id, "status": TransactionStatus::Pending.as_str() };
        let update = doc! {
            "$set": {
                "status": status.as_str(),
                "failure_reason": reason,
                "updated_at": now_timestamp() as i64,
            }
        };

        let transaction = self
            .transactions
            .find_one_and_update(filter, update, options)
            .await?;

        Ok(transaction)
    }

    async fn enrich_metadata(
        &self,
        id: &str,
        metadata: serde_json::Map<String, serde_json::Value>,
    ) -> AppResult<Option<Transaction>> {
        let mut set = Document::new();
        for (key, value) in metadata {
            set.insert(format!("metadata.{}", key), to_bson(&value)?);
        }
        set.insert("updated_at", now_timestamp() as i64);

        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        let transaction = self
            .transactions
            .find_one_and_update(doc! { "_id": id }, doc! { "$set": set }, options)
            .await?;

        Ok(transaction)
    }

    async fn list_transactions_by_user(&self, user_id: &str) -> AppResult<Vec<Transaction>> {
        let options = FindOptions::builder().sort(doc! { "created_at": -1 }).build();
        let cursor = self.transactions.find(doc! { "user_id": user_id }, options).await?;
        let transactions: Vec<Transaction> = cursor.try_collect().await?;

        Ok(transactions)
    }

    async fn list_completed_purchases(&self) -> AppResult<Vec<Transaction>> {
        let filter = doc! {
            "transaction_type": TransactionType::PackagePurchase.as_str(),
            "status": TransactionStatus::Completed.as_str(),
        };
        let options = FindOptions::builder().sort(doc! { "completed_at": 1 }).build();
        let cursor = self.transactions.find(filter, options).await?;
        let transactions: Vec<Transaction> = cursor.try_collect().await?;

        Ok(transactions)
    }
}
