use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

pub type AppResult<T> = Result<T, AppError>;

/// 统一错误类型
///
/// 前五个变体对应账本核心的错误分类，其余变体服务于 HTTP 层。
#[derive(Error, Debug)]
pub enum AppError {
    /// 引用的实体不存在
    #[error("{0}")]
    NotFound(String),

    /// 非法的状态迁移
    #[error("{0}")]
    InvalidState(String),

    /// 重复的完成(或失败)请求
    #[error("{0}")]
    AlreadyFinalized(String),

    /// 支付凭证校验失败
    #[error("{0}")]
    InvalidProof(String),

    /// 原子操作无法提交
    #[error("storage failure: {0}")]
    StorageFailure(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error(transparent)]
    ValidationError(#[from] validator::ValidationErrors),

    #[error(transparent)]
    MongoError(#[from] mongodb::error::Error),

    #[error(transparent)]
    BsonSerError(#[from] mongodb::bson::ser::Error),

    #[error(transparent)]
    BsonDeError(#[from] mongodb::bson::de::Error),

    #[error("{0}")]
    InternalServerErrorWithContext(String),

    #[error(transparent)]
    AnyhowError(#[from] anyhow::Error),
}

impl AppError {
    /// 错误码(用于响应体)
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::InvalidState(_) => "INVALID_STATE",
            AppError::AlreadyFinalized(_) => "ALREADY_FINALIZED",
            AppError::InvalidProof(_) => "INVALID_PROOF",
            AppError::StorageFailure(_) | AppError::MongoError(_) => "STORAGE_FAILURE",
            AppError::BadRequest(_) | AppError::ValidationError(_) => "BAD_REQUEST",
            AppError::Conflict(_) => "CONFLICT",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::BsonSerError(_)
            | AppError::BsonDeError(_)
            | AppError::InternalServerErrorWithContext(_)
            | AppError::AnyhowError(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidState(_) | AppError::AlreadyFinalized(_) | AppError::Conflict(_) => {
                StatusCode::CONFLICT
            }
            AppError::InvalidProof(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::ValidationError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::StorageFailure(_) | AppError::MongoError(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::BsonSerError(_)
            | AppError::BsonDeError(_)
            | AppError::InternalServerErrorWithContext(_)
            | AppError::AnyhowError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("🔴 {}", self);
        }

        let body = Json(json!({
            "error": {
                "code": self.code(),
                "message": self.to_string(),
                "timestamp": chrono::Utc::now().timestamp()
            }
        }));

        (status, body).into_response()
    }
}
