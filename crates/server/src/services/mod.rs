////////////////////////////////////////////////////////////////////////
//
// 1. 每个业务领域单独一个文件夹
// 2. 每个领域服务由两部分组成:
//    - XxxServiceTrait: 对外暴露的能力(Dyn 类型供 Controller 使用)
//    - XxxService: 基于 Repository 的具体实现
//
//////////////////////////////////////////////////////////////////////

pub mod commission;
pub mod ledger;
pub mod payment;
pub mod referral;
pub mod user;


use crate::auth::{AuthConfig, CredentialHasher, JwtManager};
use commission::{
    CommissionConfig, CommissionEngine, CommissionWorkflow, DynCommissionEngine, DynCommissionWorkflow,
};
use database::{
    commission::repository::{CommissionRepositoryTrait, DynCommissionRepository},
    transaction::repository::{DynTransactionRepository, TransactionRepositoryTrait},
    user::repository::{DynUserRepository, UserRepositoryTrait},
    Database,
};
use ledger::{DynLedgerService, LedgerService};
use payment::{DynPaymentGateway, HmacPaymentGateway};
use referral::{DynReferralResolver, ReferralResolver};
use std::sync::Arc;
use tracing::info;
use user::{DynUserService, UserService};
use utils::AppConfig;

#[derive(Clone)]
pub struct Services {
    pub user: DynUserService,
    pub referral: DynReferralResolver,
    pub ledger: DynLedgerService,
    pub engine: DynCommissionEngine,
    pub commission: DynCommissionWorkflow,
    pub gateway: DynPaymentGateway,
    pub jwt: Arc<JwtManager>,
    pub config: Arc<AppConfig>,
}

impl Services {
    /// 基于 MongoDB 构建所有服务
    pub fn new(db: Database, config: Arc<AppConfig>) -> anyhow::Result<Self> {
        Self::from_store(Arc::new(db), config)
    }

    /// 基于任意实现了全部 Repository 的存储构建服务
    pub fn from_store<S>(store: Arc<S>, config: Arc<AppConfig>) -> anyhow::Result<Self>
    where
        S: UserRepositoryTrait + TransactionRepositoryTrait + CommissionRepositoryTrait + Send + Sync + 'static,
    {
        let gateway = Arc::new(HmacPaymentGateway::from_config(&config)) as DynPaymentGateway;
        Self::from_parts(store, config, CredentialHasher::default(), gateway)
    }

    pub fn from_parts<S>(
        store: Arc<S>,
        config: Arc<AppConfig>,
        hasher: CredentialHasher,
        gateway: DynPaymentGateway,
    ) -> anyhow::Result<Self>
    where
        S: UserRepositoryTrait + TransactionRepositoryTrait + CommissionRepositoryTrait + Send + Sync + 'static,
    {
        let users: DynUserRepository = store.clone();
        let transactions: DynTransactionRepository = store.clone();
        let commissions: DynCommissionRepository = store;

        let commission_config = CommissionConfig::from_app_config(&config)?;
        info!("🧮 commission config: {:?}", commission_config);

        let jwt = Arc::new(JwtManager::new(AuthConfig::from(config.as_ref())));

        let referral = Arc::new(ReferralResolver::new(users.clone())) as DynReferralResolver;
        let user = Arc::new(UserService::new(
            users.clone(),
            referral.clone(),
            hasher,
            jwt.clone(),
            config.superuser_email_list(),
            config.max_commission_levels as usize,
        )) as DynUserService;

        let engine = Arc::new(CommissionEngine::new(
            users.clone(),
            transactions.clone(),
            commissions.clone(),
            commission_config,
        )) as DynCommissionEngine;

        let ledger = Arc::new(LedgerService::new(
            transactions.clone(),
            users,
            gateway.clone(),
            engine.clone(),
            config.currency.clone(),
            config.gst_rate,
        )) as DynLedgerService;

        let commission = Arc::new(CommissionWorkflow::new(commissions, transactions)) as DynCommissionWorkflow;

        info!("🧠 services initialized");

        Ok(Self {
            user,
            referral,
            ledger,
            engine,
            commission,
            gateway,
            jwt,
            config,
        })
    }
}
