use async_trait::async_trait;
use database::user::repository::DynUserRepository;
use std::sync::Arc;
use tracing::{info, warn};
use utils::AppResult;

pub type DynReferralResolver = Arc<dyn ReferralResolverTrait + Send + Sync>;

#[async_trait]
pub trait ReferralResolverTrait {
    /// 将注册时填写的推荐码解析为推荐人ID
    ///
    /// 未填写或推荐码无效时返回 None，注册不会因此失败。只读，不修改任何数据。
    async fn resolve(&self, code: Option<&str>) -> AppResult<Option<String>>;
}

#[derive(Clone)]
pub struct ReferralResolver {
    users: DynUserRepository,
}

impl ReferralResolver {
    pub fn new(users: DynUserRepository) -> Self {
        Self { users }
    }
}

#[async_trait]
impl ReferralResolverTrait for ReferralResolver {
    async fn resolve(&self, code: Option<&str>) -> AppResult<Option<String>> {
        let Some(code) = code.map(str::trim).filter(|c| !c.is_empty()) else {
            return Ok(None);
        };

        match self.users.get_user_by_referral_code(code).await? {
            Some(referrer) => {
                info!("🔗 推荐码 {} 解析为推荐人 {}", code, referrer.id);
                Ok(Some(referrer.id))
            }
            None => {
                warn!("⚠️ 推荐码 {} 无效，按无推荐人注册", code);
                Ok(None)
            }
        }
    }
}
