////////////////////////////////////////////////////////////////////////
//
// 1. 每个Domain(Entity)单独一个文件夹
// 2. 每个Domain由两部分组成:
//    - model: 定义Schema
//    - repository: 实际的数据库底层操作
//
//////////////////////////////////////////////////////////////////////

use mongodb::{
    bson::doc,
    error::{Error as MongoError, ErrorKind, WriteFailure},
    options::IndexOptions,
    Client, Collection, IndexModel,
};
use std::sync::Arc;
use tracing::info;
use utils::{AppConfig, AppError, AppResult};

pub mod commission;
pub mod transaction;
pub mod user;

#[cfg(any(test, feature = "memory"))]
pub mod memory;

#[cfg(test)]
mod mongo_tests;

#[derive(Clone, Debug)]
pub struct Database {
    pub client: Client,
    pub users: Collection<user::model::User>,
    pub transactions: Collection<transaction::model::Transaction>,
    pub commissions: Collection<commission::model::Commission>,
}

impl Database {
    pub async fn new(config: Arc<AppConfig>) -> AppResult<Self> {
        let client = Client::with_uri_str(&config.mongo_uri).await?;
        let db: mongodb::Database = client.database(&config.mongo_db);

        let users = db.collection("User");
        let transactions = db.collection("Transaction");
        let commissions = db.collection("Commission");

        info!("🧱 database({:#}) connected.", &config.mongo_db);

        Ok(Database {
            client,
            users,
            transactions,
            commissions,
        })
    }

    /// 初始化索引(唯一约束是引用完整性与幂等性的最后防线)
    pub async fn init_indexes(&self) -> AppResult<()> {
        info!("🔧 初始化数据库索引...");

        let unique = || IndexOptions::builder().unique(true).build();

        self.users
            .create_indexes(
                vec![
                    IndexModel::builder().keys(doc! { "email": 1 }).options(unique()).build(),
                    IndexModel::builder()
                        .keys(doc! { "referral_code": 1 })
                        .options(unique())
                        .build(),
                    IndexModel::builder().keys(doc! { "referred_by": 1 }).build(),
                ],
                None,
            )
            .await?;

        self.transactions
            .create_indexes(
                vec![
                    IndexModel::builder()
                        .keys(doc! { "user_id": 1, "created_at": -1 })
                        .build(),
                    IndexModel::builder()
                        .keys(doc! { "transaction_type": 1, "status": 1 })
                        .build(),
                ],
                None,
            )
            .await?;

        self.commissions
            .create_indexes(
                vec![
                    // 同一笔交易、同一受益人、同一层级只允许一条佣金
                    IndexModel::builder()
                        .keys(doc! { "source_transaction_id": 1, "user_id": 1, "level": 1 })
                        .options(unique())
                        .build(),
                    IndexModel::builder()
                        .keys(doc! { "user_id": 1, "status": 1, "created_at": -1 })
                        .build(),
                ],
                None,
            )
            .await?;

        info!("✅ 数据库索引初始化完成");
        Ok(())
    }
}

/// 当前时间戳(秒)
pub fn now_timestamp() -> u64 {
    chrono::Utc::now().timestamp() as u64
}

/// 判断是否为唯一索引冲突(E11000)
pub(crate) fn is_duplicate_key_error(err: &MongoError) -> bool {
    const DUPLICATE_KEY: i32 = 11000;

    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_error)) => write_error.code == DUPLICATE_KEY,
        ErrorKind::BulkWrite(failure) => failure
            .write_errors
            .as_ref()
            .map(|errors| errors.iter().any(|e| e.code == DUPLICATE_KEY))
            .unwrap_or(false),
        ErrorKind::Command(command_error) => command_error.code == DUPLICATE_KEY,
        _ => false,
    }
}

/// 事务提交/中止失败统一映射为存储故障
pub(crate) fn storage_failure(context: &str, err: MongoError) -> AppError {
    AppError::StorageFailure(format!("{}: {}", context, err))
}

pub use commission::{
    model::{Commission, CommissionStatus, CommissionSummary, CommissionTransition, CommissionType},
    repository::CommissionInsert,
};
pub use transaction::model::{GatewayCompletion, Transaction, TransactionStatus, TransactionType};
pub use user::model::{NewUser, PackageType, User};
