//! 内存存储
//!
//! 与 MongoDB 实现提供同样的 Repository 接口。所有集合放在同一把锁之后，
//! 每个方法在一次加锁内完成读-判断-写，因此和 MongoDB 的条件更新/会话事务一样是原子的。

use crate::{
    commission::{
        model::{Commission, CommissionStatus, CommissionTransition},
        repository::{CommissionInsert, CommissionRepositoryTrait},
    },
    now_timestamp,
    transaction::{
        model::{GatewayCompletion, Transaction, TransactionStatus, TransactionType},
        repository::TransactionRepositoryTrait,
    },
    user::{model::User, repository::UserRepositoryTrait},
};
use async_trait::async_trait;
use std::{
    collections::{HashMap, HashSet},
    sync::atomic::{AtomicBool, Ordering},
};
use tokio::sync::Mutex;
use utils::{AppError, AppResult};

#[derive(Debug, Default)]
struct Collections {
    users: HashMap<String, User>,
    transactions: HashMap<String, Transaction>,
    commissions: Vec<Commission>,
}

#[derive(Debug, Default)]
pub struct MemoryDatabase {
    inner: Mutex<Collections>,
    // 模拟存储不可用(读取用户时失败)
    user_reads_fail: AtomicBool,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_user_reads_fail(&self, fail: bool) {
        self.user_reads_fail.store(fail, Ordering::SeqCst);
    }

    /// 直接写入一条用户记录(测试数据准备)
    pub async fn insert_user(&self, user: User) {
        self.inner.lock().await.users.insert(user.id.clone(), user);
    }

    pub async fn commission_count(&self) -> usize {
        self.inner.lock().await.commissions.len()
    }

    fn check_user_reads(&self) -> AppResult<()> {
        if self.user_reads_fail.load(Ordering::SeqCst) {
            return Err(AppError::StorageFailure("user store unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl UserRepositoryTrait for MemoryDatabase {
    async fn create_user(&self, user: User) -> AppResult<User> {
        let mut inner = self.inner.lock().await;

        if inner.users.values().any(|u| u.email == user.email) {
            return Err(AppError::Conflict(format!(
                "User with email: {} already exists.",
                user.email
            )));
        }
        if inner
            .users
            .values()
            .any(|u| u.referral_code == user.referral_code || u.id == user.id)
        {
            return Err(AppError::Conflict(format!(
                "User with email {} or referral code {} already exists.",
                user.email, user.referral_code
            )));
        }

        inner.users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: &str) -> AppResult<Option<User>> {
        self.check_user_reads()?;
        Ok(self.inner.lock().await.users.get(id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        self.check_user_reads()?;
        let email = email.trim().to_lowercase();
        let inner = self.inner.lock().await;
        Ok(inner.users.values().find(|u| u.email == email).cloned())
    }

    async fn get_user_by_referral_code(&self, code: &str) -> AppResult<Option<User>> {
        self.check_user_reads()?;
        let code = User::normalize_referral_code(code);
        let inner = self.inner.lock().await;
        Ok(inner.users.values().find(|u| u.referral_code == code).cloned())
    }

    async fn get_uppers(&self, id: &str, max_levels: usize) -> AppResult<Vec<User>> {
        self.check_user_reads()?;
        let inner = self.inner.lock().await;

        let mut current = inner
            .users
            .get(id)
            .ok_or_else(|| AppError::NotFound(format!("User {} not found.", id)))?;
        let mut visited = HashSet::from([id.to_string()]);
        let mut result = Vec::new();

        for _ in 0..max_levels {
            let Some(upper_id) = current.referred_by.as_ref() else {
                break;
            };
            if !visited.insert(upper_id.clone()) {
                break;
            }
            let Some(upper) = inner.users.get(upper_id) else {
                break;
            };
            result.push(upper.clone());
            current = upper;
        }

        Ok(result)
    }

    async fn get_lowers(&self, id: &str) -> AppResult<Vec<User>> {
        self.check_user_reads()?;
        let inner = self.inner.lock().await;
        let mut lowers: Vec<User> = inner
            .users
            .values()
            .filter(|u| u.referred_by.as_deref() == Some(id))
            .cloned()
            .collect();
        lowers.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(lowers)
    }

    async fn set_active(&self, id: &str, active: bool) -> AppResult<Option<User>> {
        let mut inner = self.inner.lock().await;
        Ok(inner.users.get_mut(id).map(|user| {
            user.is_active = active;
            user.updated_at = now_timestamp();
            user.clone()
        }))
    }
}

#[async_trait]
impl TransactionRepositoryTrait for MemoryDatabase {
    async fn create_transaction(&self, transaction: Transaction) -> AppResult<Transaction> {
        let mut inner = self.inner.lock().await;
        if inner.transactions.contains_key(&transaction.id) {
            return Err(AppError::Conflict(format!("Transaction {} already exists.", transaction.id)));
        }
        inner.transactions.insert(transaction.id.clone(), transaction.clone());
        Ok(transaction)
    }

    async fn get_transaction(&self, id: &str) -> AppResult<Option<Transaction>> {
        Ok(self.inner.lock().await.transactions.get(id).cloned())
    }

    async fn complete_transaction(
        &self,
        id: &str,
        completion: GatewayCompletion,
    ) -> AppResult<Option<Transaction>> {
        let mut inner = self.inner.lock().await;
        let now = now_timestamp();

        let Some(current) = inner.transactions.get(id) else {
            return Ok(None);
        };
        if current.status != TransactionStatus::Pending {
            return Ok(None);
        }

        // 先检查所有前置条件，保证要么全部写入要么什么都不写
        let package_owner = match (current.transaction_type, current.package_type) {
            (TransactionType::PackagePurchase, Some(package_type)) => {
                if !inner.users.contains_key(&current.user_id) {
                    return Err(AppError::NotFound(format!(
                        "Owner {} of transaction {} not found.",
                        current.user_id, current.id
                    )));
                }
                Some((current.user_id.clone(), package_type))
            }
            _ => None,
        };

        if let Some((user_id, package_type)) = package_owner {
            if let Some(user) = inner.users.get_mut(&user_id) {
                user.package_type = Some(package_type);
                user.package_purchased_at = Some(now);
                user.updated_at = now;
            }
        }

        let Some(transaction) = inner.transactions.get_mut(id) else {
            return Ok(None);
        };
        transaction.status = TransactionStatus::Completed;
        transaction.gateway_payment_id = Some(completion.payment_id);
        transaction.gateway_signature = completion.signature;
        transaction.completed_at = Some(now);
        transaction.updated_at = now;

        Ok(Some(transaction.clone()))
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

        let mut inner = self.inner.lock().await;
        Ok(inner
            .transactions
            .get_mut(id)
            .filter(|t| t.status == TransactionStatus::Pending)
            .map(|transaction| {
                transaction.status = status;
                transaction.failure_reason = reason;
                transaction.updated_at = now_timestamp();
                transaction.clone()
            }))
    }

    async fn enrich_metadata(
        &self,
        id: &str,
        metadata: serde_json::Map<String, serde_json::Value>,
    ) -> AppResult<Option<Transaction>> {
        let mut inner = self.inner.lock().await;
        Ok(inner.transactions.get_mut(id).map(|transaction| {
            if !transaction.metadata.is_object() {
                transaction.metadata = serde_json::Value::Object(serde_json::Map::new());
            }
            if let Some(existing) = transaction.metadata.as_object_mut() {
                existing.extend(metadata);
            }
            transaction.updated_at = now_timestamp();
            transaction.clone()
        }))
    }

    async fn list_transactions_by_user(&self, user_id: &str) -> AppResult<Vec<Transaction>> {
        let inner = self.inner.lock().await;
        let mut transactions: Vec<Transaction> = inner
            .transactions
            .values()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        transactions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(transactions)
    }

    async fn list_completed_purchases(&self) -> AppResult<Vec<Transaction>> {
        let inner = self.inner.lock().await;
        let mut transactions: Vec<Transaction> = inner
            .transactions
            .values()
            .filter(|t| t.is_completed_purchase())
            .cloned()
            .collect();
        transactions.sort_by_key(|t| t.completed_at);
        Ok(transactions)
    }
}

#[async_trait]
impl CommissionRepositoryTrait for MemoryDatabase {
    async fn create_commissions(
        &self,
        source_transaction_id: &str,
        commissions: Vec<Commission>,
    ) -> AppResult<CommissionInsert> {
        let mut inner = self.inner.lock().await;

        let source = inner
            .transactions
            .get(source_transaction_id)
            .ok_or_else(|| AppError::NotFound(format!("Transaction {} not found.", source_transaction_id)))?;
        if source.status != TransactionStatus::Completed {
            return Err(AppError::InvalidState(format!(
                "Transaction {} is {}, commissions require a completed transaction.",
                source.id,
                source.status.as_str()
            )));
        }

        let mut existing: Vec<Commission> = inner
            .commissions
            .iter()
            .filter(|c| c.source_transaction_id.as_deref() == Some(source_transaction_id))
            .cloned()
            .collect();
        if !existing.is_empty() {
            existing.sort_by_key(|c| c.level);
            return Ok(CommissionInsert::Existing(existing));
        }

        // 唯一键 (source_transaction_id, user_id, level)
        let mut keys = HashSet::new();
        for commission in &commissions {
            if !keys.insert((commission.user_id.as_str(), commission.level)) {
                return Err(AppError::Conflict(format!(
                    "Duplicate commission for user {} at level {}.",
                    commission.user_id, commission.level
                )));
            }
        }

        inner.commissions.extend(commissions.iter().cloned());
        Ok(CommissionInsert::Created(commissions))
    }

    async fn get_commission(&self, id: &str) -> AppResult<Option<Commission>> {
        let inner = self.inner.lock().await;
        Ok(inner.commissions.iter().find(|c| c.id == id).cloned())
    }

    async fn list_commissions(
        &self,
        user_id: &str,
        status: Option<CommissionStatus>,
    ) -> AppResult<Vec<Commission>> {
        let inner = self.inner.lock().await;
        let mut commissions: Vec<Commission> = inner
            .commissions
            .iter()
            .filter(|c| c.user_id == user_id && status.map_or(true, |s| c.status == s))
            .cloned()
            .collect();
        commissions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(commissions)
    }

    async fn list_by_source_transaction(&self, source_transaction_id: &str) -> AppResult<Vec<Commission>> {
        let inner = self.inner.lock().await;
        let mut commissions: Vec<Commission> = inner
            .commissions
            .iter()
            .filter(|c| c.source_transaction_id.as_deref() == Some(source_transaction_id))
            .cloned()
            .collect();
        commissions.sort_by_key(|c| c.level);
        Ok(commissions)
    }

    async fn apply_transition(
        &self,
        id: &str,
        transition: &CommissionTransition,
        at: u64,
    ) -> AppResult<Option<Commission>> {
        let mut inner = self.inner.lock().await;
        Ok(inner
            .commissions
            .iter_mut()
            .find(|c| c.id == id && transition.allowed_from().contains(&c.status))
            .map(|commission| {
                commission.apply(transition, at);
                commission.clone()
            }))
    }
}
