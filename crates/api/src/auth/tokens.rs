//! Signed token codec for activation and session tokens.
//!
//! Two token families, each with its own secret: activation tokens carry a
//! pending registration plus a 4-digit code and live for five minutes;
//! session tokens carry nothing but the user id and come in an access/refresh
//! pair with independent expiries. Cookie construction lives here too so the
//! cookie lifetime always mirrors the token it carries.

use axum_extra::extract::cookie::{Cookie, SameSite};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::Rng;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::config::Config;

pub const ACCESS_TOKEN_COOKIE: &str = "access_token";
pub const REFRESH_TOKEN_COOKIE: &str = "refresh_token";

/// Activation tokens are short-lived by contract.
const ACTIVATION_TOKEN_TTL: Duration = Duration::minutes(5);

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// Signature and expiry failures are deliberately indistinguishable.
    #[error("token is invalid or expired")]
    InvalidOrExpired,
    #[error("token signing failed: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Registration data held only inside an activation token; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRegistration {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ActivationClaims {
    pub user: PendingRegistration,
    pub activation_code: String,
    pub exp: i64,
}

impl ActivationClaims {
    /// Constant-time comparison of the embedded code against the
    /// client-supplied one.
    pub fn code_matches(&self, supplied: &str) -> bool {
        self.activation_code
            .as_bytes()
            .ct_eq(supplied.as_bytes())
            .into()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct SessionClaims {
    sub: Uuid,
    exp: i64,
}

/// A freshly minted activation token and its out-of-band code.
#[derive(Debug)]
pub struct ActivationToken {
    pub token: String,
    pub activation_code: String,
}

/// Creates and verifies all signed tokens. Secrets and expiries come from
/// [`Config`] at construction; nothing here reads the environment.
#[derive(Clone)]
pub struct TokenCodec {
    activation_secret: String,
    access_secret: String,
    refresh_secret: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
    secure_cookies: bool,
}

impl TokenCodec {
    pub fn from_config(config: &Config) -> Self {
        Self {
            activation_secret: config.activation_secret.clone(),
            access_secret: config.access_token_secret.clone(),
            refresh_secret: config.refresh_token_secret.clone(),
            access_ttl: Duration::minutes(config.access_token_expire_minutes),
            refresh_ttl: Duration::days(config.refresh_token_expire_days),
            secure_cookies: config.environment.is_production(),
        }
    }

    /// Sign a pending registration together with a fresh 4-digit code.
    ///
    /// The token goes back to the client; the plaintext code is delivered
    /// out-of-band and must be echoed on redemption.
    pub fn sign_activation(
        &self,
        user: &PendingRegistration,
    ) -> Result<ActivationToken, TokenError> {
        let activation_code = rand::rng().random_range(1000..10000u32).to_string();
        let claims = ActivationClaims {
            user: user.clone(),
            activation_code: activation_code.clone(),
            exp: expires_in(ACTIVATION_TOKEN_TTL),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.activation_secret.as_bytes()),
        )?;
        Ok(ActivationToken {
            token,
            activation_code,
        })
    }

    pub fn verify_activation(&self, token: &str) -> Result<ActivationClaims, TokenError> {
        decode::<ActivationClaims>(
            token,
            &DecodingKey::from_secret(self.activation_secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|_| TokenError::InvalidOrExpired)
    }

    /// Sign a session token of the given kind. The payload is the user id
    /// alone.
    pub fn sign_session(&self, user_id: Uuid, kind: TokenKind) -> Result<String, TokenError> {
        let claims = SessionClaims {
            sub: user_id,
            exp: expires_in(self.ttl(kind)),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret(kind).as_bytes()),
        )?;
        Ok(token)
    }

    pub fn verify_session(&self, token: &str, kind: TokenKind) -> Result<Uuid, TokenError> {
        decode::<SessionClaims>(
            token,
            &DecodingKey::from_secret(self.secret(kind).as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims.sub)
        .map_err(|_| TokenError::InvalidOrExpired)
    }

    pub fn access_cookie(&self, token: String) -> Cookie<'static> {
        self.session_cookie(ACCESS_TOKEN_COOKIE, token, self.access_ttl)
    }

    pub fn refresh_cookie(&self, token: String) -> Cookie<'static> {
        self.session_cookie(REFRESH_TOKEN_COOKIE, token, self.refresh_ttl)
    }

    /// An already-expired cookie; setting it clears the client copy.
    pub fn expired_cookie(name: &'static str) -> Cookie<'static> {
        Cookie::build((name, ""))
            .http_only(true)
            .same_site(SameSite::Lax)
            .path("/")
            .max_age(Duration::ZERO)
            .build()
    }

    fn session_cookie(
        &self,
        name: &'static str,
        token: String,
        max_age: Duration,
    ) -> Cookie<'static> {
        Cookie::build((name, token))
            .http_only(true)
            .same_site(SameSite::Lax)
            .path("/")
            .max_age(max_age)
            .secure(self.secure_cookies)
            .build()
    }

    fn secret(&self, kind: TokenKind) -> &str {
        match kind {
            TokenKind::Access => &self.access_secret,
            TokenKind::Refresh => &self.refresh_secret,
        }
    }

    fn ttl(&self, kind: TokenKind) -> Duration {
        match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        }
    }
}

fn expires_in(ttl: Duration) -> i64 {
    (OffsetDateTime::now_utc() + ttl).unix_timestamp()
}
