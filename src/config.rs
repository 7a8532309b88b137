use chrono::Duration;
use log::LevelFilter;
use std::path::PathBuf;
use thiserror::Error;

const DEFAULT_TTL_SECS: i64 = 7 * 24 * 60 * 60;
const MAX_TTL_SECS: i64 = 10 * 365 * 24 * 60 * 60;
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("缺少必需的配置项: {0}")]
    Missing(&'static str),

    #[error("配置项 {key} 无效: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// 进程级配置，启动时构造一次，之后只读
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub jwt_secret: String,
    pub token_ttl: Duration,
    pub database_url: String,
    pub bind_addr: String,
    /// 守卫在验签之后是否回查用户表
    pub resolve_identity: bool,
    pub bcrypt_cost: u32,
    pub log_file: Option<PathBuf>,
    pub log_level: LevelFilter,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        // 密钥原样保留，首尾空白也参与签名
        let jwt_secret = lookup("JWT_SECRET")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("JWT_SECRET"))?;
        let database_url = get("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let ttl_secs = match get("JWT_TTL_SECS") {
            Some(raw) => match raw.parse::<i64>() {
                Ok(secs) if secs > 0 && secs <= MAX_TTL_SECS => secs,
                _ => {
                    return Err(ConfigError::Invalid {
                        key: "JWT_TTL_SECS",
                        reason: format!("取值范围 1..={}，实际为 {}", MAX_TTL_SECS, raw),
                    })
                }
            },
            None => DEFAULT_TTL_SECS,
        };

        let resolve_identity = match get("AUTH_RESOLVE_IDENTITY") {
            Some(raw) => parse_bool(&raw).ok_or_else(|| ConfigError::Invalid {
                key: "AUTH_RESOLVE_IDENTITY",
                reason: format!("需要布尔值，实际为 {}", raw),
            })?,
            None => false,
        };

        let bcrypt_cost = match get("BCRYPT_COST") {
            Some(raw) => match raw.parse::<u32>() {
                Ok(cost) if (4..=31).contains(&cost) => cost,
                _ => {
                    return Err(ConfigError::Invalid {
                        key: "BCRYPT_COST",
                        reason: format!("取值范围 4..=31，实际为 {}", raw),
                    })
                }
            },
            None => bcrypt::DEFAULT_COST,
        };

        let log_level = match get("LOG_LEVEL") {
            Some(raw) => raw.parse::<LevelFilter>().map_err(|_| ConfigError::Invalid {
                key: "LOG_LEVEL",
                reason: format!("未知日志级别 {}", raw),
            })?,
            None => LevelFilter::Info,
        };

        Ok(Self {
            jwt_secret,
            token_ttl: Duration::seconds(ttl_secs),
            database_url,
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            resolve_identity,
            bcrypt_cost,
            log_file: get("LOG_FILE").map(PathBuf::from),
            log_level,
        })
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
