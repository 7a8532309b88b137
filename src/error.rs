use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use log::error;
use thiserror::Error;

use crate::api::ApiResponse;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum ApiError {
    /// 守卫拒绝，对外不区分具体原因
    #[error("未授权，请重新登录")]
    Unauthorized,

    #[error("邮箱或密码错误")]
    InvalidCredentials,

    #[error("{0}")]
    Validation(String),

    #[error("该邮箱已被注册")]
    EmailTaken,

    #[error("服务器内部错误")]
    Internal(String),
}

impl ApiError {
    pub fn internal(detail: impl Into<String>) -> Self {
        let detail = detail.into();
        error!("内部错误: {}", detail);
        ApiError::Internal(detail)
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized | ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::EmailTaken => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ApiResponse::failure(self.to_string()))
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::EmailTaken => ApiError::EmailTaken,
            StoreError::Database(e) => ApiError::internal(format!("数据库错误: {}", e)),
        }
    }
}

impl From<actix_web::error::BlockingError> for ApiError {
    fn from(e: actix_web::error::BlockingError) -> Self {
        ApiError::internal(format!("阻塞任务执行失败: {}", e))
    }
}
