use axum::Json;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// 业务错误码，保持与前端约定一致
pub mod error_codes {
    pub const VALIDATION_ERROR: i32 = 1000;
    pub const CONFLICT: i32 = 1001;
    pub const AUTH_FAILED: i32 = 1002;
    pub const PERMISSION_DENIED: i32 = 1003;
    pub const NOT_FOUND: i32 = 1004;
    pub const INTERNAL_ERROR: i32 = 5000;
}

/// 所有领域操作的错误类型。调用方对变体做穷尽匹配，
/// 不再依赖字符串错误码分发。
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AppError {
    /// 输入校验失败，携带字段级信息
    #[error("参数无效: {field}: {message}")]
    Validation { field: &'static str, message: String },
    /// 未认证（无 token 或 token 无效/过期）
    #[error("未授权访问")]
    Unauthenticated,
    /// 已认证但无权操作该资源
    #[error("没有权限")]
    Forbidden,
    /// 引用的实体不存在
    #[error("资源不存在")]
    NotFound,
    /// 唯一资源冲突（重复好友请求、账号已存在等）
    #[error("{0}")]
    Conflict(String),
    /// 存储或签名等意外失败。细节只进日志，不回传调用方。
    #[error("内部服务器错误")]
    Internal,
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        AppError::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        AppError::Conflict(message.into())
    }

    /// 记录意外错误的细节并降级为 Internal
    pub fn internal(err: impl std::fmt::Display) -> Self {
        tracing::error!("Internal error: {}", err);
        AppError::Internal
    }

    fn code(&self) -> i32 {
        match self {
            AppError::Validation { .. } => error_codes::VALIDATION_ERROR,
            AppError::Unauthenticated => error_codes::AUTH_FAILED,
            AppError::Forbidden => error_codes::PERMISSION_DENIED,
            AppError::NotFound => error_codes::NOT_FOUND,
            AppError::Conflict(_) => error_codes::CONFLICT,
            AppError::Internal => error_codes::INTERNAL_ERROR,
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    code: i32,
    error_message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<&'static str>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let field = match &self {
            AppError::Validation { field, .. } => Some(*field),
            _ => None,
        };

        let body = Json(ErrorResponse {
            code: self.code(),
            error_message: self.to_string(),
            field,
        });

        (self.status(), body).into_response()
    }
}
