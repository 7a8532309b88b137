mod extractor;
mod jwt;
mod middleware;
mod password;
mod types;

pub use jwt::{TokenIssuer, TokenVerifier, VerifyError};
pub use middleware::AuthMiddleware;
pub use password::{hash_password, verify_password};
pub use types::{AuthUser, ClaimUser, Claims, UserId};
