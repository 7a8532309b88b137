use actix_web::{web, HttpResponse};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationErrors};

use super::ApiResponse;
use crate::auth::{hash_password, verify_password, AuthUser};
use crate::error::ApiError;
use crate::store::{normalize_email, CredentialRecord, NewCredential};
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "邮箱格式不正确"))]
    pub email: String,
    #[validate(length(min = 6, max = 128, message = "密码长度需在 6 到 128 个字符之间"))]
    pub password: String,
    #[validate(length(max = 64, message = "昵称不能超过 64 个字符"))]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "请提供邮箱"))]
    pub email: String,
    #[validate(length(min = 1, message = "请提供密码"))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthPayload {
    pub token: String,
    pub user: AuthUser,
}

fn validation_message(errors: &ValidationErrors) -> String {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));
    fields
        .into_iter()
        .flat_map(|(_, errs)| errs.iter())
        .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
        .collect::<Vec<_>>()
        .join("; ")
}

fn issue_payload(state: &AppState, record: CredentialRecord) -> Result<AuthPayload, ApiError> {
    let token = state
        .issuer
        .issue(&record.id)
        .map_err(|e| ApiError::internal(format!("生成 token 失败: {}", e)))?;
    Ok(AuthPayload {
        token,
        user: record.into_auth_user(),
    })
}

pub async fn register(
    state: web::Data<AppState>,
    body: web::Json<RegisterRequest>,
) -> Result<HttpResponse, ApiError> {
    info!("开始处理注册请求");
    let body = body.into_inner();
    if let Err(e) = body.validate() {
        let message = validation_message(&e);
        warn!("注册参数校验失败: {}", message);
        return Err(ApiError::Validation(message));
    }

    let RegisterRequest {
        email,
        password,
        name,
    } = body;
    let email = normalize_email(&email);

    if state.store.find_by_email(&email).await?.is_some() {
        warn!("邮箱 {} 已被注册", email);
        return Err(ApiError::EmailTaken);
    }

    let cost = state.bcrypt_cost;
    let password_hash = web::block(move || hash_password(&password, cost)).await??;

    let name = name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());
    let record = state
        .store
        .create(NewCredential {
            email,
            password_hash,
            name,
        })
        .await?;

    info!("用户 {} 注册成功", record.id);
    let payload = issue_payload(&state, record)?;
    Ok(HttpResponse::Created().json(ApiResponse::success("注册成功", payload)))
}

pub async fn login(
    state: web::Data<AppState>,
    body: web::Json<LoginRequest>,
) -> Result<HttpResponse, ApiError> {
    info!("开始处理登录请求");
    let body = body.into_inner();
    if let Err(e) = body.validate() {
        return Err(ApiError::Validation(validation_message(&e)));
    }

    let email = normalize_email(&body.email);
    debug!("尝试登录用户: {}", email);

    // 邮箱不存在和密码错误对外返回同一条消息
    let record = match state.store.find_by_email(&email).await? {
        Some(record) => record,
        None => {
            warn!("用户 {} 不存在", email);
            return Err(ApiError::InvalidCredentials);
        }
    };

    let password = body.password;
    let password_hash = record.password_hash.clone();
    let matched = web::block(move || verify_password(&password, &password_hash)).await??;
    if !matched {
        warn!("用户 {} 密码错误", email);
        return Err(ApiError::InvalidCredentials);
    }

    info!("用户 {} 登录成功", record.id);
    let payload = issue_payload(&state, record)?;
    Ok(HttpResponse::Ok().json(ApiResponse::success("登录成功", payload)))
}

pub async fn me(user: AuthUser) -> HttpResponse {
    debug!("返回当前用户 {}", user.id);
    HttpResponse::Ok().json(ApiResponse::success("ok", user))
}
