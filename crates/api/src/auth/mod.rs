//! Authentication module for LearnHub

#[cfg(test)]
mod edge_case_tests;
pub mod middleware;
pub mod password;
pub mod sessions;
pub mod tokens;

pub use middleware::{authorize, require_admin, require_auth};
pub use password::{hash_password, verify_password};
pub use sessions::{RedisSessionStore, SessionStore, SessionStoreError};
pub use tokens::{
    ActivationClaims, ActivationToken, PendingRegistration, TokenCodec, TokenError, TokenKind,
    ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE,
};
