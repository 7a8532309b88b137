use serde::{Deserialize, Serialize};
use serde_json::Number;
use std::fmt;

/// 用户标识，只接受字符串或数字，其它形态在反序列化阶段即失败
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserId {
    Numeric(i64),
    /// 超出 i64 的整数或浮点数，按原样保留
    Number(Number),
    Text(String),
}

impl UserId {
    /// 映射到整数主键；`42.0` 视同 `42`，无法表示为 i64 的返回 `None`
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            UserId::Numeric(n) => Some(*n),
            UserId::Number(n) => n.as_i64().or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64)
                    .map(|f| f as i64)
            }),
            UserId::Text(s) => s.parse().ok(),
        }
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserId::Numeric(n) => write!(f, "{}", n),
            UserId::Number(n) => write!(f, "{}", n),
            UserId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        UserId::Numeric(id)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        UserId::Text(id.to_string())
    }
}

impl From<String> for UserId {
    fn from(id: String) -> Self {
        UserId::Text(id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimUser {
    pub id: UserId,
}

/// token 载荷: `{ user: { id }, iat, exp }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub user: ClaimUser,
    pub iat: i64, // issued at
    pub exp: i64, // expiration time
}

/// 守卫写入请求扩展的当前用户，下游处理器只信任它
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthUser {
    pub id: UserId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl AuthUser {
    pub fn from_claims(claims: Claims) -> Self {
        Self {
            id: claims.user.id,
            email: None,
            name: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_string_and_number_ids() {
        let n: UserId = serde_json::from_value(json!(42)).unwrap();
        assert_eq!(n, UserId::Numeric(42));

        let s: UserId = serde_json::from_value(json!("u-42")).unwrap();
        assert_eq!(s, UserId::Text("u-42".into()));

        // 数字形式的字符串仍是字符串
        let s: UserId = serde_json::from_value(json!("42")).unwrap();
        assert_eq!(s, UserId::Text("42".into()));
    }

    #[test]
    fn accepts_floats_and_wide_integers() {
        for raw in [json!(4.5), json!(42.0), json!(u64::MAX)] {
            let id: UserId = serde_json::from_value(raw.clone()).unwrap();
            assert!(matches!(id, UserId::Number(_)), "{}", raw);
            assert_eq!(serde_json::to_value(&id).unwrap(), raw);
        }
    }

    #[test]
    fn maps_to_integer_key() {
        let id = |raw| serde_json::from_value::<UserId>(raw).unwrap();
        assert_eq!(id(json!(42)).as_i64(), Some(42));
        assert_eq!(id(json!(42.0)).as_i64(), Some(42));
        assert_eq!(id(json!(4.5)).as_i64(), None);
        assert_eq!(id(json!(u64::MAX)).as_i64(), None);
        assert_eq!(id(json!("17")).as_i64(), Some(17));
        assert_eq!(id(json!("u-17")).as_i64(), None);
    }

    #[test]
    fn rejects_other_shapes() {
        for bad in [json!(null), json!(true), json!({"id": 1}), json!([1])] {
            assert!(serde_json::from_value::<UserId>(bad.clone()).is_err(), "{}", bad);
        }
    }

    #[test]
    fn claims_require_user_id() {
        let missing = json!({ "user": {}, "iat": 0, "exp": 1 });
        assert!(serde_json::from_value::<Claims>(missing).is_err());

        let no_user = json!({ "iat": 0, "exp": 1 });
        assert!(serde_json::from_value::<Claims>(no_user).is_err());
    }

    #[test]
    fn serializes_ids_in_their_original_form() {
        assert_eq!(serde_json::to_value(UserId::Numeric(7)).unwrap(), json!(7));
        assert_eq!(serde_json::to_value(UserId::from("a")).unwrap(), json!("a"));
    }
}
