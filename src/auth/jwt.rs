use crate::auth::types::{ClaimUser, Claims, UserId};
use crate::config::AppConfig;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use log::{debug, error, info};
use std::fmt;

/// 验证失败的内部原因，只用于服务端日志
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyError {
    Expired,
    BadSignature,
    Malformed,
    /// 签名有效但载荷缺少合法的 user.id
    BadPayload,
}

impl fmt::Display for VerifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            VerifyError::Expired => "token 已过期",
            VerifyError::BadSignature => "签名无效",
            VerifyError::Malformed => "token 格式错误",
            VerifyError::BadPayload => "载荷缺少有效的 user.id",
        };
        f.write_str(reason)
    }
}

impl From<&jsonwebtoken::errors::Error> for VerifyError {
    fn from(e: &jsonwebtoken::errors::Error) -> Self {
        match e.kind() {
            ErrorKind::ExpiredSignature => VerifyError::Expired,
            ErrorKind::InvalidSignature => VerifyError::BadSignature,
            ErrorKind::Json(_) => VerifyError::BadPayload,
            _ => VerifyError::Malformed,
        }
    }
}

fn validation() -> Validation {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation
}

/// 验签并检查过期时间。预期内的失败以 `Err` 返回，不会 panic
pub fn verify_token(token: &str, key: &DecodingKey) -> Result<Claims, VerifyError> {
    decode::<Claims>(token, key, &validation())
        .map(|data| data.claims)
        .map_err(|e| {
            debug!("token 解码失败: {}", e);
            VerifyError::from(&e)
        })
}

/// 签发方，持有签名密钥和有效期
#[derive(Clone)]
pub struct TokenIssuer {
    key: EncodingKey,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(config: &AppConfig) -> Self {
        Self::from_secret(&config.jwt_secret, config.token_ttl)
    }

    pub fn from_secret(secret: &str, ttl: Duration) -> Self {
        Self {
            key: EncodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    pub fn issue(&self, user_id: &UserId) -> Result<String, jsonwebtoken::errors::Error> {
        self.issue_at(user_id, Utc::now())
    }

    /// 以指定时间作为签发时间，过期时间为 `issued_at + ttl`
    pub fn issue_at(
        &self,
        user_id: &UserId,
        issued_at: DateTime<Utc>,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        debug!("为用户 {} 生成 JWT token", user_id);
        let expires_at = match issued_at.checked_add_signed(self.ttl) {
            Some(expires_at) => expires_at,
            None => {
                error!("为用户 {} 计算过期时间溢出 (ttl {})", user_id, self.ttl);
                return Err(ErrorKind::InvalidToken.into());
            }
        };
        let claims = Claims {
            user: ClaimUser {
                id: user_id.clone(),
            },
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        };

        match encode(&Header::new(Algorithm::HS256), &claims, &self.key) {
            Ok(token) => {
                info!("成功为用户 {} 生成 token", user_id);
                Ok(token)
            }
            Err(e) => {
                error!("为用户 {} 生成 token 失败: {}", user_id, e);
                Err(e)
            }
        }
    }
}

/// 验证方，与签发方共用同一密钥
#[derive(Clone)]
pub struct TokenVerifier {
    key: DecodingKey,
}

impl TokenVerifier {
    pub fn new(config: &AppConfig) -> Self {
        Self::from_secret(&config.jwt_secret)
    }

    pub fn from_secret(secret: &str) -> Self {
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    pub fn verify(&self, token: &str) -> Result<Claims, VerifyError> {
        verify_token(token, &self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const SECRET: &str = "test_secret_key_for_testing_purposes_only";

    fn issuer() -> TokenIssuer {
        TokenIssuer::from_secret(SECRET, Duration::days(7))
    }

    // 改写签名段的首字符
    fn tamper_signature(token: &str) -> String {
        let sig_start = token.rfind('.').unwrap() + 1;
        let mut bytes = token.as_bytes().to_vec();
        bytes[sig_start] = if bytes[sig_start] == b'A' { b'B' } else { b'A' };
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn sign_then_verify_immediately() {
        let token = issuer().issue(&UserId::Numeric(42)).unwrap();
        let claims = TokenVerifier::from_secret(SECRET).verify(&token).unwrap();

        assert_eq!(claims.user.id, UserId::Numeric(42));
        assert_eq!(claims.exp - claims.iat, Duration::days(7).num_seconds());
    }

    #[test]
    fn token_has_three_segments() {
        let token = issuer().issue(&UserId::from("abc")).unwrap();
        assert_eq!(token.split('.').count(), 3);
    }

    #[test]
    fn wrong_secret_is_bad_signature() {
        let token = TokenIssuer::from_secret("secret-A", Duration::days(7))
            .issue(&UserId::Numeric(1))
            .unwrap();
        let result = TokenVerifier::from_secret("secret-B").verify(&token);
        assert_eq!(result, Err(VerifyError::BadSignature));
    }

    #[test]
    fn expired_after_eight_days() {
        let issued_at = Utc::now() - Duration::days(8);
        let token = issuer().issue_at(&UserId::Numeric(42), issued_at).unwrap();
        let result = TokenVerifier::from_secret(SECRET).verify(&token);
        assert_eq!(result, Err(VerifyError::Expired));
    }

    #[test]
    fn tampered_signature_is_rejected() {
        let token = issuer().issue(&UserId::Numeric(42)).unwrap();
        let tampered = tamper_signature(&token);
        assert_ne!(token, tampered);
        assert!(TokenVerifier::from_secret(SECRET).verify(&tampered).is_err());
    }

    #[test]
    fn garbage_is_malformed() {
        let verifier = TokenVerifier::from_secret(SECRET);
        assert_eq!(verifier.verify("not-a-token"), Err(VerifyError::Malformed));
        assert_eq!(verifier.verify(""), Err(VerifyError::Malformed));
    }

    #[test]
    fn signed_payload_without_user_id_is_rejected() {
        let now = Utc::now().timestamp();
        let payload = serde_json::json!({ "user": { "name": "x" }, "iat": now, "exp": now + 60 });
        let token = encode(
            &Header::new(Algorithm::HS256),
            &payload,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        let result = TokenVerifier::from_secret(SECRET).verify(&token);
        assert_eq!(result, Err(VerifyError::BadPayload));
    }

    #[test]
    fn signed_payload_with_object_id_is_rejected() {
        let now = Utc::now().timestamp();
        let payload =
            serde_json::json!({ "user": { "id": { "nested": 1 } }, "iat": now, "exp": now + 60 });
        let token = encode(
            &Header::new(Algorithm::HS256),
            &payload,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        let result = TokenVerifier::from_secret(SECRET).verify(&token);
        assert_eq!(result, Err(VerifyError::BadPayload));
    }

    #[test]
    fn foreign_numeric_ids_are_accepted() {
        let now = Utc::now().timestamp();
        let key = EncodingKey::from_secret(SECRET.as_bytes());
        for id in [serde_json::json!(4.5), serde_json::json!(42.0), serde_json::json!(u64::MAX)] {
            let payload = serde_json::json!({ "user": { "id": id }, "iat": now, "exp": now + 60 });
            let token = encode(&Header::new(Algorithm::HS256), &payload, &key).unwrap();

            let claims = TokenVerifier::from_secret(SECRET).verify(&token).unwrap();
            assert_eq!(serde_json::to_value(&claims.user.id).unwrap(), id);
        }
    }

    #[test]
    fn overflowing_expiry_is_an_error() {
        let issuer = TokenIssuer::from_secret(SECRET, Duration::days(100_000_000));
        assert!(issuer.issue(&UserId::Numeric(1)).is_err());
    }

    #[test]
    fn verification_is_repeatable() {
        let token = issuer().issue(&UserId::Numeric(5)).unwrap();
        let verifier = TokenVerifier::from_secret(SECRET);
        assert_eq!(verifier.verify(&token), verifier.verify(&token));
    }

    proptest! {
        #[test]
        fn numeric_ids_survive_signing(id in any::<i64>()) {
            let token = issuer().issue(&UserId::Numeric(id)).unwrap();
            let claims = TokenVerifier::from_secret(SECRET).verify(&token).unwrap();
            prop_assert_eq!(claims.user.id, UserId::Numeric(id));
        }

        #[test]
        fn string_ids_survive_signing(id in "\\PC{0,32}") {
            let token = issuer().issue(&UserId::Text(id.clone())).unwrap();
            let claims = TokenVerifier::from_secret(SECRET).verify(&token).unwrap();
            prop_assert_eq!(claims.user.id, UserId::Text(id));
        }
    }
}
