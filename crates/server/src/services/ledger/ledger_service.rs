use crate::services::{
    commission::DynCommissionEngine,
    ledger::catalog::{package_info, total_with_gst},
    payment::DynPaymentGateway,
};
use async_trait::async_trait;
use database::{
    transaction::repository::DynTransactionRepository, user::repository::DynUserRepository, Commission,
    GatewayCompletion, PackageType, Transaction, TransactionStatus, TransactionType,
};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{error, info, warn};
use utils::{AppError, AppResult};
use utoipa::ToSchema;

/// 单笔交易金额上限
pub const MAX_TRANSACTION_AMOUNT: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);

pub type DynLedgerService = Arc<dyn LedgerServiceTrait + Send + Sync>;

/// 完成一笔交易时提交的凭证
#[derive(Debug, Clone)]
pub enum PaymentProof {
    /// 支付网关回调(套餐购买)
    Gateway { payment_id: String, signature: String },
    /// 运营人员线下结算(佣金发放、退款)
    Operator { reference: String },
}

/// 开一笔 pending 交易所需的信息
#[derive(Debug, Clone)]
pub struct OpenTransaction {
    pub user_id: String,
    pub amount: Decimal,
    /// 为空时使用账本币种
    pub currency: Option<String>,
    pub transaction_type: TransactionType,
    pub package_type: Option<PackageType>,
    pub metadata: Value,
    pub description: Option<String>,
    pub gateway_order_id: Option<String>,
}

/// 交易完成的结果(含引擎生成的佣金)
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CompletionOutcome {
    pub transaction: Transaction,
    pub commissions: Vec<Commission>,
    /// 交易已完成但佣金计算失败时的错误信息，佣金等待补算
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commission_error: Option<String>,
}

impl CompletionOutcome {
    pub fn commissions_deferred(&self) -> bool {
        self.commission_error.is_some()
    }
}

/// 结账信息
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Checkout {
    pub transaction: Transaction,
    pub order_id: String,
    pub key_id: Option<String>,
    pub currency: String,
    #[schema(value_type = String)]
    pub base_amount: Decimal,
    #[schema(value_type = String)]
    pub gst_amount: Decimal,
    #[schema(value_type = String)]
    pub total_amount: Decimal,
}

#[async_trait]
pub trait LedgerServiceTrait {
    async fn open(&self, request: OpenTransaction) -> AppResult<Transaction>;
    /// pending -> completed，成功后触发佣金引擎
    async fn complete(&self, transaction_id: &str, proof: PaymentProof) -> AppResult<CompletionOutcome>;
    async fn fail(&self, transaction_id: &str, reason: &str) -> AppResult<Transaction>;
    async fn cancel(&self, transaction_id: &str) -> AppResult<Transaction>;
    async fn enrich_metadata(&self, transaction_id: &str, metadata: Map<String, Value>) -> AppResult<Transaction>;
    async fn get_transaction(&self, transaction_id: &str) -> AppResult<Transaction>;
    async fn list_transactions(&self, user_id: &str) -> AppResult<Vec<Transaction>>;
    /// 记录一笔待支付的套餐购买
    async fn record_purchase(&self, user_id: &str, package: PackageType, amount: Decimal) -> AppResult<Transaction>;
    /// 按套餐目录价格结账(附加 GST)
    async fn create_checkout(&self, user_id: &str, package: PackageType) -> AppResult<Checkout>;
    /// 登记并结算一笔佣金发放
    async fn record_payout(
        &self,
        user_id: &str,
        amount: Decimal,
        reference: &str,
        description: Option<String>,
    ) -> AppResult<Transaction>;
}

pub struct LedgerService {
    transactions: DynTransactionRepository,
    users: DynUserRepository,
    gateway: DynPaymentGateway,
    engine: DynCommissionEngine,
    currency: String,
    gst_rate: Decimal,
}

impl LedgerService {
    pub fn new(
        transactions: DynTransactionRepository,
        users: DynUserRepository,
        gateway: DynPaymentGateway,
        engine: DynCommissionEngine,
        currency: impl Into<String>,
        gst_rate: Decimal,
    ) -> Self {
        Self {
            transactions,
            users,
            gateway,
            engine,
            currency: currency.into(),
            gst_rate,
        }
    }

    async fn load(&self, transaction_id: &str) -> AppResult<Transaction> {
        self.transactions
            .get_transaction(transaction_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Transaction {} not found.", transaction_id)))
    }

    fn already_finalized(transaction: &Transaction) -> AppError {
        AppError::AlreadyFinalized(format!(
            "Transaction {} is already {}.",
            transaction.id,
            transaction.status.as_str()
        ))
    }

    /// 校验凭证，返回要写入的完成信息
    fn check_proof(&self, transaction: &Transaction, proof: PaymentProof) -> AppResult<GatewayCompletion> {
        match (transaction.transaction_type, proof) {
            (TransactionType::PackagePurchase, PaymentProof::Gateway { payment_id, signature }) => {
                let order_id = transaction.gateway_order_id.as_deref().ok_or_else(|| {
                    AppError::InvalidProof(format!("Transaction {} has no gateway order.", transaction.id))
                })?;
                if !self.gateway.verify(order_id, &payment_id, &signature) {
                    warn!("⚠️ 交易 {} 支付签名校验失败 (payment {})", transaction.id, payment_id);
                    return Err(AppError::InvalidProof("Payment signature verification failed.".to_string()));
                }
                Ok(GatewayCompletion {
                    payment_id,
                    signature: Some(signature),
                })
            }
            (TransactionType::PackagePurchase, PaymentProof::Operator { .. }) => Err(AppError::InvalidProof(
                "Package purchases can only be completed by the payment gateway.".to_string(),
            )),
            (TransactionType::CommissionPayout | TransactionType::Refund, PaymentProof::Operator { reference }) => {
                let reference = reference.trim().to_string();
                if reference.is_empty() {
                    return Err(AppError::InvalidProof("Settlement reference is required.".to_string()));
                }
                Ok(GatewayCompletion {
                    payment_id: reference,
                    signature: None,
                })
            }
            (TransactionType::CommissionPayout | TransactionType::Refund, PaymentProof::Gateway { .. }) => {
                Err(AppError::InvalidProof(format!(
                    "{} transactions are settled by an operator reference.",
                    transaction.transaction_type.as_str()
                )))
            }
        }
    }

    async fn finalize(
        &self,
        transaction_id: &str,
        status: TransactionStatus,
        reason: Option<String>,
    ) -> AppResult<Transaction> {
        let transaction = self.load(transaction_id).await?;
        if transaction.status != TransactionStatus::Pending {
            return Err(Self::already_finalized(&transaction));
        }

        match self
            .transactions
            .finalize_transaction(transaction_id, status, reason)
            .await?
        {
            Some(updated) => {
                info!("📝 交易 {} 状态变更: pending -> {}", updated.id, updated.status.as_str());
                Ok(updated)
            }
            None => {
                let current = self.load(transaction_id).await?;
                Err(Self::already_finalized(&current))
            }
        }
    }

    async fn open_purchase(
        &self,
        user_id: &str,
        package: PackageType,
        amount: Decimal,
        order_amount: Decimal,
        mut metadata: Map<String, Value>,
    ) -> AppResult<Transaction> {
        let order_id = self.gateway.create_order(order_amount, &self.currency).await?;
        metadata.insert("package_type".to_string(), json!(package.as_str()));

        self.open(OpenTransaction {
            user_id: user_id.to_string(),
            amount,
            currency: None,
            transaction_type: TransactionType::PackagePurchase,
            package_type: Some(package),
            metadata: Value::Object(metadata),
            description: Some(format!("{} package purchase", package)),
            gateway_order_id: Some(order_id),
        })
        .await
    }
}

#[async_trait]
impl LedgerServiceTrait for LedgerService {
    async fn open(&self, request: OpenTransaction) -> AppResult<Transaction> {
        if request.amount <= Decimal::ZERO {
            return Err(AppError::BadRequest(format!(
                "Transaction amount must be positive, got {}",
                request.amount
            )));
        }

        if request.amount > MAX_TRANSACTION_AMOUNT {
            return Err(AppError::BadRequest(format!(
                "Transaction amount {} exceeds the limit of {}",
                request.amount, MAX_TRANSACTION_AMOUNT
            )));
        }

        let currency = request.currency.unwrap_or_else(|| self.currency.clone());
        if !currency.eq_ignore_ascii_case(&self.currency) {
            return Err(AppError::BadRequest(format!(
                "Ledger only accepts {}, got {}",
                self.currency, currency
            )));
        }

        if request.transaction_type == TransactionType::PackagePurchase && request.package_type.is_none() {
            return Err(AppError::BadRequest("Package purchase requires a package type.".to_string()));
        }

        let metadata = match request.metadata {
            Value::Null => Value::Object(Map::new()),
            Value::Object(map) => Value::Object(map),
            _ => return Err(AppError::BadRequest("Transaction metadata must be an object.".to_string())),
        };

        if self.users.get_user(&request.user_id).await?.is_none() {
            return Err(AppError::NotFound(format!("User {} not found.", request.user_id)));
        }

        let mut transaction = Transaction::new_pending(
            &request.user_id,
            request.amount,
            &self.currency,
            request.transaction_type,
            request.package_type,
            metadata,
        );
        transaction.description = request.description;
        transaction.gateway_order_id = request.gateway_order_id;

        let transaction = self.transactions.create_transaction(transaction).await?;
        info!(
            "🧾 新交易 {} ({}) 用户 {} 金额 {} {}",
            transaction.id,
            transaction.transaction_type.as_str(),
            transaction.user_id,
            transaction.amount,
            transaction.currency
        );

        Ok(transaction)
    }

    async fn complete(&self, transaction_id: &str, proof: PaymentProof) -> AppResult<CompletionOutcome> {
        let transaction = self.load(transaction_id).await?;
        if transaction.status != TransactionStatus::Pending {
            return Err(Self::already_finalized(&transaction));
        }

        let completion = self.check_proof(&transaction, proof)?;

        let completed = match self.transactions.complete_transaction(transaction_id, completion).await? {
            Some(completed) => completed,
            None => {
                // 并发的另一次完成/失败请求先落库
                let current = self.load(transaction_id).await?;
                return Err(Self::already_finalized(&current));
            }
        };
        info!("✅ 交易 {} 已完成", completed.id);

        // 交易已落库为 completed，引擎失败只记录日志，由补算恢复
        let (commissions, commission_error) = match self.engine.on_transaction_completed(&completed).await {
            Ok(commissions) => (commissions, None),
            Err(e) => {
                error!("❌ 交易 {} 佣金计算失败，等待补算: {}", completed.id, e);
                (Vec::new(), Some(e.to_string()))
            }
        };

        Ok(CompletionOutcome {
            transaction: completed,
            commissions,
            commission_error,
        })
    }

    async fn fail(&self, transaction_id: &str, reason: &str) -> AppResult<Transaction> {
        let reason = reason.trim();
        let reason = (!reason.is_empty()).then(|| reason.to_string());
        self.finalize(transaction_id, TransactionStatus::Failed, reason).await
    }

    async fn cancel(&self, transaction_id: &str) -> AppResult<Transaction> {
        self.finalize(transaction_id, TransactionStatus::Cancelled, None).await
    }

    async fn enrich_metadata(&self, transaction_id: &str, metadata: Map<String, Value>) -> AppResult<Transaction> {
        self.transactions
            .enrich_metadata(transaction_id, metadata)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Transaction {} not found.", transaction_id)))
    }

    async fn get_transaction(&self, transaction_id: &str) -> AppResult<Transaction> {
        self.load(transaction_id).await
    }

    async fn list_transactions(&self, user_id: &str) -> AppResult<Vec<Transaction>> {
        let transactions = self.transactions.list_transactions_by_user(user_id).await?;

        Ok(transactions)
    }

    async fn record_purchase(&self, user_id: &str, package: PackageType, amount: Decimal) -> AppResult<Transaction> {
        self.open_purchase(user_id, package, amount, amount, Map::new()).await
    }

    async fn create_checkout(&self, user_id: &str, package: PackageType) -> AppResult<Checkout> {
        let info = package_info(package)
            .ok_or_else(|| AppError::BadRequest(format!("Package {} is not for sale.", package)))?;

        let base_amount = info.price;
        let total_amount = total_with_gst(base_amount, self.gst_rate);
        let gst_amount = total_amount - base_amount;

        let mut metadata = Map::new();
        metadata.insert("base_amount".to_string(), json!(base_amount.to_string()));
        metadata.insert("gst_rate".to_string(), json!(self.gst_rate.to_string()));
        metadata.insert("gst_amount".to_string(), json!(gst_amount.to_string()));
        metadata.insert("total_amount".to_string(), json!(total_amount.to_string()));

        let transaction = self
            .open_purchase(user_id, package, base_amount, total_amount, metadata)
            .await?;
        let order_id = transaction.gateway_order_id.clone().unwrap_or_default();

        Ok(Checkout {
            transaction,
            order_id,
            key_id: self.gateway.key_id(),
            currency: self.currency.clone(),
            base_amount,
            gst_amount,
            total_amount,
        })
    }

    async fn record_payout(
        &self,
        user_id: &str,
        amount: Decimal,
        reference: &str,
        description: Option<String>,
    ) -> AppResult<Transaction> {
        if reference.trim().is_empty() {
            return Err(AppError::BadRequest("Settlement reference is required.".to_string()));
        }

        let payout = self
            .open(OpenTransaction {
                user_id: user_id.to_string(),
                amount,
                currency: None,
                transaction_type: TransactionType::CommissionPayout,
                package_type: None,
                metadata: json!({ "reference": reference }),
                description,
                gateway_order_id: None,
            })
            .await?;

        let outcome = self
            .complete(
                &payout.id,
                PaymentProof::Operator {
                    reference: reference.to_string(),
                },
            )
            .await?;
        info!("💸 佣金发放 {} 已结算给用户 {}", outcome.transaction.id, user_id);

        Ok(outcome.transaction)
    }
}
