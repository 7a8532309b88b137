use log::{error, info};
use sqlx::PgPool;

use crate::store::StoreError;

pub struct DbInitializer {
    pool: PgPool,
}

impl DbInitializer {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 初始化用户表
    pub async fn init_user_tables(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id BIGSERIAL PRIMARY KEY,
                email VARCHAR UNIQUE NOT NULL,
                password_hash VARCHAR NOT NULL,
                name VARCHAR,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// 启动时建表，已存在则跳过
pub async fn initialize_db(pool: PgPool) -> Result<(), StoreError> {
    info!("开始初始化数据库...");
    let initializer = DbInitializer::new(pool);

    initializer.init_user_tables().await.map_err(|e| {
        error!("用户表初始化失败: {:?}", e);
        e
    })?;

    info!("数据库初始化完成");
    Ok(())
}
