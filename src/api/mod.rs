use actix_web::web;
use serde::Serialize;

use crate::auth::AuthMiddleware;
use crate::error::ApiError;

mod auth;

// 统一响应结构体
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub message: String,
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }
}

/// 注册路由。/api/auth 下是公开接口，其余 /api 路由都经过守卫
pub fn configure(cfg: &mut web::ServiceConfig, guard: AuthMiddleware) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| {
        ApiError::Validation(format!("请求体格式错误: {}", err)).into()
    }))
    .service(
        web::scope("/api/auth")
            .route("/register", web::post().to(auth::register))
            .route("/login", web::post().to(auth::login)),
    )
    .service(
        web::scope("/api")
            .wrap(guard)
            .route("/me", web::get().to(auth::me)),
    );
}
