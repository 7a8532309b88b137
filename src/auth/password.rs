use bcrypt::{hash, verify};
use log::{debug, error, warn};

use crate::error::ApiError;

pub fn hash_password(password: &str, cost: u32) -> Result<String, ApiError> {
    debug!("加密密码");
    hash(password.as_bytes(), cost).map_err(|e| ApiError::internal(format!("密码加密失败: {}", e)))
}

/// 哈希本身无法解析时视为内部错误，而不是密码不匹配
pub fn verify_password(password: &str, password_hash: &str) -> Result<bool, ApiError> {
    debug!("验证密码");
    match verify(password, password_hash) {
        Ok(true) => Ok(true),
        Ok(false) => {
            warn!("密码验证失败");
            Ok(false)
        }
        Err(e) => {
            error!("密码验证过程出错: {}", e);
            Err(ApiError::internal(format!("密码验证失败: {}", e)))
        }
    }
}
