use crate::dtos::user_dto::UserResponse;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// 注册请求
#[derive(Clone, Serialize, Deserialize, Debug, Validate, Default, ToSchema)]
pub struct SignupDto {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 128))]
    pub full_name: String,
    #[validate(length(max = 32))]
    pub phone: Option<String>,
    #[validate(length(min = 6, max = 128))]
    pub password: String,
    /// 推荐人的推荐码(可选，无效时忽略)
    pub referral_code: Option<String>,
}

#[derive(Clone, Serialize, Deserialize, Debug, Validate, Default, ToSchema)]
pub struct LoginDto {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Clone, Serialize, Deserialize, Debug, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    /// 有效期(秒)
    pub expires_in: u64,
    pub user: UserResponse,
}
