//! Application state

use std::sync::Arc;

use redis::aio::ConnectionManager;
use sqlx::PgPool;

use crate::auth::{RedisSessionStore, SessionStore, TokenCodec};
use crate::config::Config;
use crate::email::{Mailer, ResendMailer};
use crate::media::{CloudinaryImageStore, ImageStore};
use crate::users::{PgUserDirectory, UserDirectory};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub tokens: TokenCodec,
    pub users: Arc<dyn UserDirectory>,
    pub sessions: Arc<dyn SessionStore>,
    pub mailer: Arc<dyn Mailer>,
    pub images: Arc<dyn ImageStore>,
}

impl AppState {
    pub fn new(pool: PgPool, redis: ConnectionManager, config: Config) -> Self {
        let mailer = ResendMailer::from_config(&config);
        if mailer.is_enabled() {
            tracing::info!("Mail dispatch enabled");
        } else {
            tracing::warn!("Mail dispatch not configured (missing RESEND_API_KEY) - registration will fail");
        }

        let images = CloudinaryImageStore::from_config(&config);
        if images.is_enabled() {
            tracing::info!("Avatar storage enabled");
        } else {
            tracing::warn!("Avatar storage not configured (missing CLOUDINARY_* variables)");
        }

        Self::with_collaborators(
            config,
            Arc::new(PgUserDirectory::new(pool)),
            Arc::new(RedisSessionStore::new(redis)),
            Arc::new(mailer),
            Arc::new(images),
        )
    }

    /// Assemble state from explicit collaborators. Production wiring goes
    /// through [`AppState::new`]; tests inject in-memory stand-ins here.
    pub fn with_collaborators(
        config: Config,
        users: Arc<dyn UserDirectory>,
        sessions: Arc<dyn SessionStore>,
        mailer: Arc<dyn Mailer>,
        images: Arc<dyn ImageStore>,
    ) -> Self {
        let tokens = TokenCodec::from_config(&config);
        Self {
            config,
            tokens,
            users,
            sessions,
            mailer,
            images,
        }
    }
}
