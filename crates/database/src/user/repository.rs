use crate::{is_duplicate_key_error, now_timestamp, user::model::User, Database};
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::doc,
    options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument},
};
use std::{collections::HashSet, sync::Arc};
use tracing::warn;
use utils::{AppError, AppResult};

pub type DynUserRepository = Arc<dyn UserRepositoryTrait + Send + Sync>;

// 主要用于Service中，表示提供了该Trait功能
#[async_trait]
pub trait UserRepositoryTrait {
    // 创建用户(推荐关系与推荐码随用户一次性写入)
    async fn create_user(&self, user: User) -> AppResult<User>;

    async fn get_user(&self, id: &str) -> AppResult<Option<User>>;

    async fn get_user_by_email(&self, email: &str) -> AppResult<Option<User>>;

    async fn get_user_by_referral_code(&self, code: &str) -> AppResult<Option<User>>;

    // 获取某个用户的上级、上上级...(最多 max_levels 级，按层级顺序)
    async fn get_uppers(&self, id: &str, max_levels: usize) -> AppResult<Vec<User>>;

    // 获取某个用户的所有直接下级
    async fn get_lowers(&self, id: &str) -> AppResult<Vec<User>>;

    // 启用/停用用户(不做物理删除)
    async fn set_active(&self, id: &str, active: bool) -> AppResult<Option<User>>;
}

#[async_trait]
impl UserRepositoryTrait for Database {
    async fn create_user(&self, user: User) -> AppResult<User> {
        let existing_user = self.users.find_one(doc! { "email": &user.email }, None).await?;

        if existing_user.is_some() {
            return Err(AppError::Conflict(format!(
                "User with email: {} already exists.",
                user.email
            )));
        }

        match self.users.insert_one(&user, None).await {
            Ok(_) => Ok(user),
            Err(e) if is_duplicate_key_error(&e) => Err(AppError::Conflict(format!(
                "User with email {} or referral code {} already exists.",
                user.email, user.referral_code
            ))),
            Err(e) => Err(e.into()),
        }
    }

    async fn get_user(&self, id: &str) -> AppResult<Option<User>> {
        let user = self.users.find_one(doc! { "_id": id }, None).await?;

        Ok(user)
    }

    async fn get_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let filter = doc! { "email": email.trim().to_lowercase() };
        let user = self.users.find_one(filter, None).await?;

        Ok(user)
    }

    async fn get_user_by_referral_code(&self, code: &str) -> AppResult<Option<User>> {
        let filter = doc! { "referral_code": User::normalize_referral_code(code) };
        let user = self.users.find_one(filter, None).await?;

        Ok(user)
    }

    async fn get_uppers(&self, id: &str, max_levels: usize) -> AppResult<Vec<User>> {
        let mut result = Vec::new();
        let mut visited = HashSet::from([id.to_string()]);

        let mut current = match self.get_user(id).await? {
            Some(user) => user,
            None => return Err(AppError::NotFound(format!("User {} not found.", id))),
        };

        for _ in 0..max_levels {
            let Some(upper_id) = current.referred_by.clone() else {
                break;
            };

            // 正常数据不会出现环，出现时截断
            if !visited.insert(upper_id.clone()) {
                warn!("⚠️ 推荐链出现环: {} -> {}", current.id, upper_id);
                break;
            }

            match self.get_user(&upper_id).await? {
                Some(upper) => {
                    result.push(upper.clone());
                    current = upper;
                }
                None => {
                    warn!("⚠️ 推荐人 {} 不存在(用户 {})", upper_id, current.id);
                    break;
                }
            }
        }

        Ok(result)
    }

    async fn get_lowers(&self, id: &str) -> AppResult<Vec<User>> {
        let options = FindOptions::builder().sort(doc! { "created_at": -1 }).build();
        let cursor = self.users.find(doc! { "referred_by": id }, options).await?;
        let lowers: Vec<User> = cursor.try_collect().await?;

        Ok(lowers)
    }

    async fn set_active(&self, id: &str, active: bool) -> AppResult<Option<User>> {
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        let update = doc! {
            "$set": {
                "is_active": active,
                "updated_at": now_timestamp() as i64,
            }
        };

        let user = self
            .users
            .find_one_and_update(doc! { "_id": id }, update, options)
            .await?;

        Ok(user)
    }
}
