//! Account records and the user directory.
//!
//! The directory owns uniqueness, the minimum password length, and password
//! hashing. Everything outside this module sees either a full [`User`] row or
//! the [`PublicUser`] snapshot that the session cache and API responses use.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::password;
use crate::error::{ApiError, ApiResult};

/// Enforced at the storage boundary.
const MIN_PASSWORD_LEN: usize = 6;

/// Closed role set; the directory rejects anything else at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseRef {
    pub course_id: String,
}

/// Full account row. Only the directory reads or writes these; the session
/// core works on [`PublicUser`] snapshots.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    /// Absent for social-auth accounts.
    pub password_hash: Option<String>,
    pub avatar_public_id: Option<String>,
    pub avatar_url: Option<String>,
    pub role: Role,
    pub is_verified: bool,
    pub courses: Vec<CourseRef>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl User {
    pub fn to_public(&self) -> PublicUser {
        PublicUser {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            avatar_public_id: self.avatar_public_id.clone(),
            avatar_url: self.avatar_url.clone(),
            role: self.role,
            is_verified: self.is_verified,
            courses: self.courses.clone(),
        }
    }

    /// Validate and hash a replacement password.
    pub fn set_password(&mut self, plaintext: &str) -> ApiResult<()> {
        self.password_hash = Some(hash_new_password(plaintext)?);
        Ok(())
    }
}

/// The snapshot stored in the session cache and returned by the API. Never
/// carries the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub avatar_public_id: Option<String>,
    pub avatar_url: Option<String>,
    pub role: Role,
    pub is_verified: bool,
    pub courses: Vec<CourseRef>,
}

/// Fields for a new account. `password: None` marks a social-auth account.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: Option<String>,
    pub avatar_url: Option<String>,
    pub role: Role,
    pub is_verified: bool,
}

/// Persistent account storage.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_by_email(&self, email: &str) -> ApiResult<Option<User>>;

    async fn find_by_id(&self, id: Uuid) -> ApiResult<Option<User>>;

    /// Hashes the password (when present) before persisting. Duplicate
    /// emails surface as a validation failure.
    async fn create(&self, new: NewUser) -> ApiResult<User>;

    async fn save(&self, user: &User) -> ApiResult<()>;

    async fn list(&self) -> ApiResult<Vec<User>>;
}

/// Compare a candidate password against an account's stored hash.
///
/// Accounts without a hash (social-auth) never match.
pub fn verify_password(user: &User, candidate: &str) -> bool {
    match &user.password_hash {
        Some(hash) => password::verify_password(hash, candidate),
        None => false,
    }
}

pub(crate) fn hash_new_password(plaintext: &str) -> ApiResult<String> {
    if plaintext.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    password::hash_password(plaintext)
        .map_err(|e| ApiError::Internal(format!("password hashing failed: {e}")))
}

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    email: String,
    password_hash: Option<String>,
    avatar_public_id: Option<String>,
    avatar_url: Option<String>,
    role: String,
    is_verified: bool,
    courses: serde_json::Value,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl UserRow {
    fn into_user(self) -> ApiResult<User> {
        let role = self
            .role
            .parse::<Role>()
            .map_err(|_| ApiError::Internal(format!("unknown role '{}' in directory", self.role)))?;
        let courses = serde_json::from_value(self.courses)
            .map_err(|e| ApiError::Internal(format!("malformed courses column: {e}")))?;
        Ok(User {
            id: self.id,
            name: self.name,
            email: self.email,
            password_hash: self.password_hash,
            avatar_public_id: self.avatar_public_id,
            avatar_url: self.avatar_url,
            role,
            is_verified: self.is_verified,
            courses,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const USER_COLUMNS: &str = "id, name, email, password_hash, avatar_public_id, avatar_url, \
     role, is_verified, courses, created_at, updated_at";

/// PostgreSQL-backed directory.
#[derive(Clone)]
pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn find_by_email(&self, email: &str) -> ApiResult<Option<User>> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
                .bind(email)
                .fetch_optional(&self.pool)
                .await?;
        row.map(UserRow::into_user).transpose()
    }

    async fn find_by_id(&self, id: Uuid) -> ApiResult<Option<User>> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        row.map(UserRow::into_user).transpose()
    }

    async fn create(&self, new: NewUser) -> ApiResult<User> {
        let password_hash = match &new.password {
            Some(plaintext) => Some(hash_new_password(plaintext)?),
            None => None,
        };

        let now = OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            name: new.name,
            email: new.email,
            password_hash,
            avatar_public_id: None,
            avatar_url: new.avatar_url,
            role: new.role,
            is_verified: new.is_verified,
            courses: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        // The unique index on email is the last word; a duplicate surfaces
        // as a 400 through the error mapping.
        sqlx::query(
            r#"
            INSERT INTO users (
                id, name, email, password_hash, avatar_public_id, avatar_url,
                role, is_verified, courses, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.avatar_public_id)
        .bind(&user.avatar_url)
        .bind(user.role.as_str())
        .bind(user.is_verified)
        .bind(serde_json::to_value(&user.courses).unwrap_or_else(|_| serde_json::json!([])))
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(user)
    }

    async fn save(&self, user: &User) -> ApiResult<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET name = $2,
                email = $3,
                password_hash = $4,
                avatar_public_id = $5,
                avatar_url = $6,
                role = $7,
                is_verified = $8,
                courses = $9,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.avatar_public_id)
        .bind(&user.avatar_url)
        .bind(user.role.as_str())
        .bind(user.is_verified)
        .bind(serde_json::to_value(&user.courses).unwrap_or_else(|_| serde_json::json!([])))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list(&self) -> ApiResult<Vec<User>> {
        let rows: Vec<UserRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(UserRow::into_user).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parses_closed_set_only() {
        assert_eq!("user".parse::<Role>(), Ok(Role::User));
        assert_eq!("admin".parse::<Role>(), Ok(Role::Admin));
        assert!("superuser".parse::<Role>().is_err());
        assert!("".parse::<Role>().is_err());
    }

    #[test]
    fn snapshot_never_carries_the_hash() {
        let mut user = crate::testing::user_fixture("ada@example.com");
        user.set_password("pw123456").unwrap();

        let serialized = serde_json::to_string(&user.to_public()).unwrap();
        assert!(!serialized.contains("password"));
    }

    #[test]
    fn short_password_rejected_at_the_boundary() {
        let err = hash_new_password("pw123").unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn social_accounts_never_match_a_password() {
        let user = crate::testing::user_fixture("ada@example.com");
        assert!(user.password_hash.is_none());
        assert!(!verify_password(&user, "anything"));
    }
}
