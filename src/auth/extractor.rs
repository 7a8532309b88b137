use actix_web::{dev::Payload, FromRequest, HttpMessage, HttpRequest};
use futures::future::{ready, Ready};
use log::error;

use crate::auth::types::AuthUser;
use crate::error::ApiError;

impl FromRequest for AuthUser {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        // 没经过守卫的路由拿不到用户，按未授权处理
        let user = req.extensions().get::<AuthUser>().cloned();
        ready(user.ok_or_else(|| {
            error!("路由 {} 未挂载认证守卫", req.path());
            ApiError::Unauthorized
        }))
    }
}
