//! Server-side session cache.
//!
//! One Redis key per logged-in user, holding the serialized snapshot written
//! at issuance. The cache is the authority for liveness: an id without a key
//! is logged out no matter how fresh its tokens are. Keys carry no TTL of
//! their own; expiry is delegated to token validity.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use uuid::Uuid;

use crate::users::PublicUser;

#[derive(Debug, thiserror::Error)]
pub enum SessionStoreError {
    #[error("redis command failed: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("snapshot serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Key-value session storage, keyed by user id.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Unconditional overwrite.
    async fn put(&self, user_id: Uuid, snapshot: &PublicUser) -> Result<(), SessionStoreError>;

    async fn get(&self, user_id: Uuid) -> Result<Option<PublicUser>, SessionStoreError>;

    /// Idempotent; deleting an absent key is not an error.
    async fn delete(&self, user_id: Uuid) -> Result<(), SessionStoreError>;
}

/// Production store over a shared Redis connection manager.
#[derive(Clone)]
pub struct RedisSessionStore {
    conn: ConnectionManager,
}

impl RedisSessionStore {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn put(&self, user_id: Uuid, snapshot: &PublicUser) -> Result<(), SessionStoreError> {
        let payload = serde_json::to_string(snapshot)?;
        let mut conn = self.conn.clone();
        let _: () = conn.set(user_id.to_string(), payload).await?;
        Ok(())
    }

    async fn get(&self, user_id: Uuid) -> Result<Option<PublicUser>, SessionStoreError> {
        let mut conn = self.conn.clone();
        let payload: Option<String> = conn.get(user_id.to_string()).await?;
        match payload {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn delete(&self, user_id: Uuid) -> Result<(), SessionStoreError> {
        let mut conn = self.conn.clone();
        let _: () = conn.del(user_id.to_string()).await?;
        Ok(())
    }
}
