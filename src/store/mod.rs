use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::auth::{AuthUser, UserId};

mod postgres;

pub use postgres::PostgresCredentialStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error("邮箱已存在")]
    EmailTaken,
}

/// 持久化的凭证记录，不实现 Serialize，密码哈希不会被序列化出去
#[derive(Debug, Clone, PartialEq)]
pub struct CredentialRecord {
    pub id: UserId,
    pub email: String,
    pub password_hash: String,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl CredentialRecord {
    /// 去掉密码哈希，只保留可以挂到请求上的字段
    pub fn into_auth_user(self) -> AuthUser {
        AuthUser {
            id: self.id,
            email: Some(self.email),
            name: self.name,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewCredential {
    pub email: String,
    pub password_hash: String,
    pub name: Option<String>,
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// 按 id 查找用户
    async fn find_by_id(&self, id: &UserId) -> Result<Option<CredentialRecord>, StoreError>;

    /// 按邮箱查找用户
    async fn find_by_email(&self, email: &str) -> Result<Option<CredentialRecord>, StoreError>;

    /// 注册新用户，邮箱冲突返回 `StoreError::EmailTaken`
    async fn create(&self, credential: NewCredential) -> Result<CredentialRecord, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_user_drops_password_hash() {
        let record = CredentialRecord {
            id: UserId::Numeric(3),
            email: "a@b.com".into(),
            password_hash: "$2b$04$secret".into(),
            name: Some("Ann".into()),
            created_at: Utc::now(),
        };

        let user = record.into_auth_user();
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret"));
        assert_eq!(user.email.as_deref(), Some("a@b.com"));
        assert_eq!(user.name.as_deref(), Some("Ann"));
    }

    #[test]
    fn emails_are_normalized() {
        assert_eq!(normalize_email("  Foo@Example.COM "), "foo@example.com");
    }
}
