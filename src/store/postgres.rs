use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use sqlx::PgPool;

use super::{normalize_email, CredentialRecord, CredentialStore, NewCredential, StoreError};
use crate::auth::UserId;

const UNIQUE_VIOLATION: &str = "23505";

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    email: String,
    password_hash: String,
    name: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for CredentialRecord {
    fn from(row: UserRow) -> Self {
        Self {
            id: UserId::Numeric(row.id),
            email: row.email,
            password_hash: row.password_hash,
            name: row.name,
            created_at: row.created_at,
        }
    }
}

pub struct PostgresCredentialStore {
    pool: PgPool,
}

impl PostgresCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for PostgresCredentialStore {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<CredentialRecord>, StoreError> {
        // users.id 是整数，无法映射为整数的 id 不可能命中
        let Some(key) = id.as_i64() else {
            debug!("用户 id {} 不是整数，视为不存在", id);
            return Ok(None);
        };

        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, email, password_hash, name, created_at FROM users WHERE id = $1",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(CredentialRecord::from))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<CredentialRecord>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, email, password_hash, name, created_at FROM users WHERE email = $1",
        )
        .bind(normalize_email(email))
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(CredentialRecord::from))
    }

    async fn create(&self, credential: NewCredential) -> Result<CredentialRecord, StoreError> {
        let email = normalize_email(&credential.email);
        let result = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (email, password_hash, name)
            VALUES ($1, $2, $3)
            RETURNING id, email, password_hash, name, created_at
            "#,
        )
        .bind(&email)
        .bind(&credential.password_hash)
        .bind(&credential.name)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(row) => {
                info!("创建用户成功: {} (id {})", email, row.id);
                Ok(row.into())
            }
            Err(sqlx::Error::Database(db_err)) if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) => {
                warn!("邮箱 {} 已被注册", email);
                Err(StoreError::EmailTaken)
            }
            Err(e) => Err(e.into()),
        }
    }
}
