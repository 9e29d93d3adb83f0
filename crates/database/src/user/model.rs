use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use utoipa::ToSchema;
use validator::Validate;

use crate::now_timestamp;

/// 课程套餐等级
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PackageType {
    Silver,
    Gold,
    Platinum,
}

impl PackageType {
    pub const ALL: [PackageType; 3] = [PackageType::Silver, PackageType::Gold, PackageType::Platinum];

    pub fn as_str(&self) -> &'static str {
        match self {
            PackageType::Silver => "silver",
            PackageType::Gold => "gold",
            PackageType::Platinum => "platinum",
        }
    }
}

impl fmt::Display for PackageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PackageType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "silver" => Ok(PackageType::Silver),
            "gold" => Ok(PackageType::Gold),
            "platinum" => Ok(PackageType::Platinum),
            other => Err(format!("unknown package type: {}", other)),
        }
    }
}

/// 用户模型
///
/// `referred_by` 只在创建时写入一次，此后不再修改，推荐关系因此始终是一片森林。
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    /// 登录邮箱(唯一)
    #[validate(email)]
    pub email: String,
    pub hashed_password: String,
    pub full_name: String,
    pub phone: Option<String>,
    /// 软删除标志
    pub is_active: bool,
    pub is_verified: bool,
    /// 运营人员
    pub is_superuser: bool,
    /// 对外分享的推荐码(唯一，签发后不可变)
    pub referral_code: String,
    /// 推荐人ID
    pub referred_by: Option<String>,
    pub package_type: Option<PackageType>,
    pub package_purchased_at: Option<u64>,
    pub created_at: u64,
    pub updated_at: u64,
}

/// 注册时的用户输入(推荐关系已由解析器确定)
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub hashed_password: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub referred_by: Option<String>,
}

impl User {
    /// 推荐码必须在推荐关系确定之后生成
    pub fn from_signup(new_user: NewUser, referral_code: String) -> Self {
        let now = now_timestamp();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            email: new_user.email.trim().to_lowercase(),
            hashed_password: new_user.hashed_password,
            full_name: new_user.full_name,
            phone: new_user.phone,
            is_active: true,
            is_verified: true,
            is_superuser: false,
            referral_code,
            referred_by: new_user.referred_by,
            package_type: None,
            package_purchased_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// 8位大写推荐码
    pub fn generate_referral_code() -> String {
        uuid::Uuid::new_v4().simple().to_string()[..8].to_uppercase()
    }

    /// 推荐码统一按大写比较
    pub fn normalize_referral_code(code: &str) -> String {
        code.trim().to_uppercase()
    }
}
