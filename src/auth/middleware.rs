use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{self, HeaderValue},
    Error, HttpMessage, ResponseError,
};
use futures::future::{ready, LocalBoxFuture, Ready};
use log::{debug, warn};
use std::fmt;
use std::sync::Arc;

use crate::auth::jwt::{TokenVerifier, VerifyError};
use crate::auth::types::{AuthUser, UserId};
use crate::config::AppConfig;
use crate::error::ApiError;
use crate::store::CredentialStore;

const BEARER_PREFIX: &str = "Bearer ";

/// 拒绝原因，只写日志，不返回给客户端
#[derive(Debug)]
pub enum Rejection {
    MissingHeader,
    BadScheme,
    EmptyToken,
    Verify(VerifyError),
    UnknownUser(UserId),
    Lookup(String),
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::MissingHeader => f.write_str("缺少 Authorization 头"),
            Rejection::BadScheme => f.write_str("Authorization 头不是 Bearer 格式"),
            Rejection::EmptyToken => f.write_str("Bearer 后没有 token"),
            Rejection::Verify(e) => write!(f, "token 验证失败: {}", e),
            Rejection::UnknownUser(id) => write!(f, "用户 {} 不存在", id),
            Rejection::Lookup(e) => write!(f, "查询用户失败: {}", e),
        }
    }
}

fn extract_bearer(header: Option<&HeaderValue>) -> Result<&str, Rejection> {
    let value = header.ok_or(Rejection::MissingHeader)?;
    let value = value.to_str().map_err(|_| Rejection::BadScheme)?;
    if !value.starts_with(BEARER_PREFIX) {
        return Err(Rejection::BadScheme);
    }
    value
        .split_whitespace()
        .nth(1)
        .ok_or(Rejection::EmptyToken)
}

/// 守卫的完整判定流程：取头 → 拆 token → 验签 → (可选)回查用户
pub async fn authenticate(
    header: Option<&HeaderValue>,
    verifier: &TokenVerifier,
    store: Option<&dyn CredentialStore>,
) -> Result<AuthUser, Rejection> {
    let token = extract_bearer(header)?;
    let claims = verifier.verify(token).map_err(Rejection::Verify)?;

    let Some(store) = store else {
        return Ok(AuthUser::from_claims(claims));
    };

    let id = claims.user.id;
    match store.find_by_id(&id).await {
        Ok(Some(record)) => Ok(record.into_auth_user()),
        Ok(None) => Err(Rejection::UnknownUser(id)),
        Err(e) => Err(Rejection::Lookup(e.to_string())),
    }
}

#[derive(Clone)]
pub struct AuthMiddleware {
    verifier: Arc<TokenVerifier>,
    store: Option<Arc<dyn CredentialStore>>,
}

impl AuthMiddleware {
    pub fn new(verifier: TokenVerifier) -> Self {
        Self {
            verifier: Arc::new(verifier),
            store: None,
        }
    }

    /// 验签通过后再按 id 回查用户，已删除的账号会被拒绝
    pub fn with_identity_resolution(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn from_config(config: &AppConfig, store: Arc<dyn CredentialStore>) -> Self {
        let guard = Self::new(TokenVerifier::new(config));
        if config.resolve_identity {
            guard.with_identity_resolution(store)
        } else {
            guard
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = AuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service: Arc::new(service),
            verifier: self.verifier.clone(),
            store: self.store.clone(),
        }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: Arc<S>,
    verifier: Arc<TokenVerifier>,
    store: Option<Arc<dyn CredentialStore>>,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let verifier = self.verifier.clone();
        let store = self.store.clone();
        let service = self.service.clone();

        Box::pin(async move {
            let outcome = authenticate(
                req.headers().get(header::AUTHORIZATION),
                &verifier,
                store.as_deref(),
            )
            .await;

            match outcome {
                Ok(user) => {
                    debug!("用户 {} 认证成功", user.id);
                    req.extensions_mut().insert(user);
                    let res = service.call(req).await?;
                    Ok(res.map_into_left_body())
                }
                Err(rejection) => {
                    warn!("拒绝请求 {} {}: {}", req.method(), req.path(), rejection);
                    let response = ApiError::Unauthorized.error_response();
                    Ok(req.into_response(response).map_into_right_body())
                }
            }
        })
    }
}
