//! Environment-sourced configuration.
//!
//! Everything the server needs is read once at startup and injected
//! explicitly; core logic never reaches back into the environment.

use std::env;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),
    #[error("invalid value for environment variable {0}")]
    InvalidVar(&'static str),
}

/// Deployment environment. Controls the `Secure` cookie attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn is_production(self) -> bool {
        matches!(self, Environment::Production)
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_address: String,
    pub database_url: String,
    pub redis_url: String,
    /// Comma-separated CORS origin allowlist.
    pub allowed_origins: String,
    pub environment: Environment,

    /// Secret for activation tokens. Independent of the session secrets.
    pub activation_secret: String,
    pub access_token_secret: String,
    pub refresh_token_secret: String,
    pub access_token_expire_minutes: i64,
    pub refresh_token_expire_days: i64,

    pub resend_api_key: String,
    pub mail_from: String,

    pub cloudinary_cloud_name: String,
    pub cloudinary_api_key: String,
    pub cloudinary_api_secret: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            bind_address: optional("BIND_ADDRESS", "0.0.0.0:8000"),
            database_url: required("DATABASE_URL")?,
            redis_url: required("REDIS_URL")?,
            allowed_origins: optional("ALLOWED_ORIGINS", "http://localhost:3000"),
            environment: environment()?,
            activation_secret: required("ACTIVATION_SECRET")?,
            access_token_secret: required("ACCESS_TOKEN_SECRET")?,
            refresh_token_secret: required("REFRESH_TOKEN_SECRET")?,
            access_token_expire_minutes: parse_i64("ACCESS_TOKEN_EXPIRE_MINUTES", 5)?,
            refresh_token_expire_days: parse_i64("REFRESH_TOKEN_EXPIRE_DAYS", 7)?,
            resend_api_key: optional("RESEND_API_KEY", ""),
            mail_from: optional("MAIL_FROM", "LearnHub <no-reply@learnhub.dev>"),
            cloudinary_cloud_name: optional("CLOUDINARY_CLOUD_NAME", ""),
            cloudinary_api_key: optional("CLOUDINARY_API_KEY", ""),
            cloudinary_api_secret: optional("CLOUDINARY_API_SECRET", ""),
        })
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::MissingVar(name))
}

fn optional(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parse_i64(name: &'static str, default: i64) -> Result<i64, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidVar(name)),
        Err(_) => Ok(default),
    }
}

fn environment() -> Result<Environment, ConfigError> {
    match optional("ENVIRONMENT", "development").as_str() {
        "development" => Ok(Environment::Development),
        "production" => Ok(Environment::Production),
        _ => Err(ConfigError::InvalidVar("ENVIRONMENT")),
    }
}
