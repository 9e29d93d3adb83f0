use crate::{
    auth::{CredentialHasher, JwtManager},
    services::referral::DynReferralResolver,
};
use async_trait::async_trait;
use database::{user::repository::DynUserRepository, NewUser, User};
use std::sync::Arc;
use tracing::{info, warn};
use utils::{AppError, AppResult};

pub type DynUserService = Arc<dyn UserServiceTrait + Send + Sync>;

// 推荐码冲突时重新生成的最大次数
const MAX_REFERRAL_CODE_ATTEMPTS: usize = 5;

/// 注册输入
#[derive(Debug, Clone)]
pub struct SignupInput {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub referral_code: Option<String>,
}

/// 登录结果
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub access_token: String,
    /// 过期时间(秒)
    pub expires_in: u64,
    pub user: User,
}

#[async_trait]
pub trait UserServiceTrait {
    async fn signup(&self, input: SignupInput) -> AppResult<User>;
    async fn login(&self, email: &str, password: &str) -> AppResult<LoginOutcome>;
    async fn get_user(&self, id: &str) -> AppResult<User>;
    /// 我直接推荐的用户
    async fn get_lowers(&self, id: &str) -> AppResult<Vec<User>>;
    /// 我的上级链路(最多 max_levels 级)
    async fn get_uppers(&self, id: &str) -> AppResult<Vec<User>>;
    /// 启用/停用用户
    async fn set_active(&self, id: &str, active: bool) -> AppResult<User>;
}

pub struct UserService {
    repository: DynUserRepository,
    resolver: DynReferralResolver,
    hasher: CredentialHasher,
    jwt: Arc<JwtManager>,
    superuser_emails: Vec<String>,
    upline_levels: usize,
}

impl UserService {
    pub fn new(
        repository: DynUserRepository,
        resolver: DynReferralResolver,
        hasher: CredentialHasher,
        jwt: Arc<JwtManager>,
        superuser_emails: Vec<String>,
        upline_levels: usize,
    ) -> Self {
        Self {
            repository,
            resolver,
            hasher,
            jwt,
            superuser_emails,
            upline_levels,
        }
    }

    async fn email_taken(&self, email: &str) -> AppResult<bool> {
        Ok(self.repository.get_user_by_email(email).await?.is_some())
    }
}

#[async_trait]
impl UserServiceTrait for UserService {
    async fn signup(&self, input: SignupInput) -> AppResult<User> {
        let email = input.email.trim().to_lowercase();
        if self.email_taken(&email).await? {
            return Err(AppError::Conflict(format!("User with email: {} already exists.", email)));
        }

        // 推荐关系在新用户存在之前确定，因此不可能推荐自己
        let referred_by = self.resolver.resolve(input.referral_code.as_deref()).await?;

        let new_user = NewUser {
            email: email.clone(),
            hashed_password: self.hasher.hash(&input.password),
            full_name: input.full_name.trim().to_string(),
            phone: input.phone.map(|p| p.trim().to_string()).filter(|p| !p.is_empty()),
            referred_by,
        };
        let is_superuser = self.superuser_emails.contains(&email);

        for attempt in 1..=MAX_REFERRAL_CODE_ATTEMPTS {
            let mut user = User::from_signup(new_user.clone(), User::generate_referral_code());
            user.is_superuser = is_superuser;

            match self.repository.create_user(user).await {
                Ok(user) => {
                    info!(
                        "👤 新用户注册: {} 推荐码 {} 推荐人 {:?}",
                        user.email, user.referral_code, user.referred_by
                    );
                    return Ok(user);
                }
                Err(AppError::Conflict(message)) => {
                    if self.email_taken(&email).await? {
                        return Err(AppError::Conflict(message));
                    }
                    warn!("⚠️ 推荐码冲突，重新生成 (第{}次)", attempt);
                }
                Err(e) => return Err(e),
            }
        }

        Err(AppError::Conflict("Could not issue a unique referral code, please retry.".to_string()))
    }

    async fn login(&self, email: &str, password: &str) -> AppResult<LoginOutcome> {
        let invalid = || AppError::Unauthorized("Incorrect email or password".to_string());

        let user = self.repository.get_user_by_email(email).await?.ok_or_else(invalid)?;
        if !self.hasher.verify(password, &user.hashed_password) {
            warn!("⚠️ 用户 {} 密码错误", user.email);
            return Err(invalid());
        }
        if !user.is_active {
            return Err(AppError::Forbidden("Inactive user".to_string()));
        }

        let access_token = self.jwt.generate_token(&user)?;
        info!("🔑 用户登录: {}", user.email);

        Ok(LoginOutcome {
            access_token,
            expires_in: self.jwt.expires_in(),
            user,
        })
    }

    async fn get_user(&self, id: &str) -> AppResult<User> {
        self.repository
            .get_user(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found.", id)))
    }

    async fn get_lowers(&self, id: &str) -> AppResult<Vec<User>> {
        let lowers = self.repository.get_lowers(id).await?;

        Ok(lowers)
    }

    async fn get_uppers(&self, id: &str) -> AppResult<Vec<User>> {
        let uppers = self.repository.get_uppers(id, self.upline_levels).await?;

        Ok(uppers)
    }

    async fn set_active(&self, id: &str, active: bool) -> AppResult<User> {
        let user = self
            .repository
            .set_active(id, active)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found.", id)))?;
        info!("🛠️ 用户 {} 已{}", user.email, if active { "启用" } else { "停用" });

        Ok(user)
    }
}
