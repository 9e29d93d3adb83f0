pub mod admin_dto;
pub mod auth_dto;
pub mod commission_dto;
pub mod package_dto;
pub mod payment_dto;
pub mod user_dto;
