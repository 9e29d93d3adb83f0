use database::{PackageType, User};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// 对外返回的用户信息(不含密码哈希)
#[derive(Clone, Serialize, Deserialize, Debug, ToSchema)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub is_active: bool,
    pub is_verified: bool,
    pub is_superuser: bool,
    pub referral_code: String,
    pub referred_by: Option<String>,
    pub package_type: Option<PackageType>,
    pub package_purchased_at: Option<u64>,
    pub created_at: u64,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            full_name: user.full_name,
            phone: user.phone,
            is_active: user.is_active,
            is_verified: user.is_verified,
            is_superuser: user.is_superuser,
            referral_code: user.referral_code,
            referred_by: user.referred_by,
            package_type: user.package_type,
            package_purchased_at: user.package_purchased_at,
            created_at: user.created_at,
        }
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, Validate, Default, ToSchema)]
pub struct SetActiveDto {
    pub is_active: bool,
}
