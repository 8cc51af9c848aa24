//! In-memory collaborator stand-ins and state builders for tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::sessions::{SessionStore, SessionStoreError};
use crate::config::{Config, Environment};
use crate::email::{MailError, Mailer};
use crate::error::{ApiError, ApiResult};
use crate::media::{ImageError, ImageStore, UploadedImage};
use crate::state::AppState;
use crate::users::{hash_new_password, NewUser, PublicUser, Role, User, UserDirectory};

pub(crate) fn test_config() -> Config {
    Config {
        bind_address: "127.0.0.1:0".to_string(),
        database_url: "postgres://unused".to_string(),
        redis_url: "redis://unused".to_string(),
        allowed_origins: "http://localhost:3000".to_string(),
        environment: Environment::Development,
        activation_secret: "activation-secret-for-tests".to_string(),
        access_token_secret: "access-secret-for-tests".to_string(),
        refresh_token_secret: "refresh-secret-for-tests".to_string(),
        access_token_expire_minutes: 5,
        refresh_token_expire_days: 7,
        resend_api_key: "test-key".to_string(),
        mail_from: "LearnHub <no-reply@learnhub.dev>".to_string(),
        cloudinary_cloud_name: String::new(),
        cloudinary_api_key: String::new(),
        cloudinary_api_secret: String::new(),
    }
}

/// A passwordless account with fresh timestamps.
pub(crate) fn user_fixture(email: &str) -> User {
    let now = OffsetDateTime::now_utc();
    User {
        id: Uuid::new_v4(),
        name: "Ada".to_string(),
        email: email.to_string(),
        password_hash: None,
        avatar_public_id: None,
        avatar_url: None,
        role: Role::User,
        is_verified: false,
        courses: Vec::new(),
        created_at: now,
        updated_at: now,
    }
}

#[derive(Default)]
pub(crate) struct MemoryUserDirectory {
    users: Mutex<Vec<User>>,
}

impl MemoryUserDirectory {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&self, user: User) {
        self.users.lock().unwrap().push(user);
    }

    pub(crate) fn len(&self) -> usize {
        self.users.lock().unwrap().len()
    }
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn find_by_email(&self, email: &str) -> ApiResult<Option<User>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> ApiResult<Option<User>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.id == id)
            .cloned())
    }

    async fn create(&self, new: NewUser) -> ApiResult<User> {
        let password_hash = match &new.password {
            Some(plaintext) => Some(hash_new_password(plaintext)?),
            None => None,
        };

        let mut users = self.users.lock().unwrap();
        // Same observable behavior as the unique index in Postgres.
        if users.iter().any(|u| u.email == new.email) {
            return Err(ApiError::Validation(
                "Duplicate value entered for a unique field".to_string(),
            ));
        }

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
        users.push(user.clone());
        Ok(user)
    }

    async fn save(&self, user: &User) -> ApiResult<()> {
        let mut users = self.users.lock().unwrap();
        if let Some(slot) = users.iter_mut().find(|u| u.id == user.id) {
            *slot = user.clone();
        }
        Ok(())
    }

    async fn list(&self) -> ApiResult<Vec<User>> {
        Ok(self.users.lock().unwrap().clone())
    }
}

#[derive(Default)]
pub(crate) struct MemorySessionStore {
    sessions: Mutex<std::collections::HashMap<Uuid, PublicUser>>,
}

impl MemorySessionStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn put(&self, user_id: Uuid, snapshot: &PublicUser) -> Result<(), SessionStoreError> {
        self.sessions
            .lock()
            .unwrap()
            .insert(user_id, snapshot.clone());
        Ok(())
    }

    async fn get(&self, user_id: Uuid) -> Result<Option<PublicUser>, SessionStoreError> {
        Ok(self.sessions.lock().unwrap().get(&user_id).cloned())
    }

    async fn delete(&self, user_id: Uuid) -> Result<(), SessionStoreError> {
        self.sessions.lock().unwrap().remove(&user_id);
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub(crate) struct SentMail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[derive(Default)]
pub(crate) struct RecordingMailer {
    pub sent: Mutex<Vec<SentMail>>,
    fail: AtomicBool,
}

impl RecordingMailer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn fail_next(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), MailError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(MailError::Rejected(500));
        }
        self.sent.lock().unwrap().push(SentMail {
            to: to.to_string(),
            subject: subject.to_string(),
            html: html.to_string(),
        });
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct NullImageStore {
    pub deleted: Mutex<Vec<String>>,
}

impl NullImageStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ImageStore for NullImageStore {
    async fn upload(&self, _data: &str, folder: &str) -> Result<UploadedImage, ImageError> {
        Ok(UploadedImage {
            public_id: format!("{folder}/test-image"),
            url: format!("https://images.test/{folder}/test-image.png"),
        })
    }

    async fn delete(&self, public_id: &str) -> Result<(), ImageError> {
        self.deleted.lock().unwrap().push(public_id.to_string());
        Ok(())
    }
}

/// Fully faked application state plus handles to the fakes for assertions.
pub(crate) struct TestContext {
    pub state: AppState,
    pub directory: Arc<MemoryUserDirectory>,
    pub sessions: Arc<MemorySessionStore>,
    pub mailer: Arc<RecordingMailer>,
    pub images: Arc<NullImageStore>,
}

pub(crate) fn context() -> TestContext {
    let directory = Arc::new(MemoryUserDirectory::new());
    let sessions = Arc::new(MemorySessionStore::new());
    let mailer = Arc::new(RecordingMailer::new());
    let images = Arc::new(NullImageStore::new());

    let state = AppState::with_collaborators(
        test_config(),
        directory.clone(),
        sessions.clone(),
        mailer.clone(),
        images.clone(),
    );

    TestContext {
        state,
        directory,
        sessions,
        mailer,
        images,
    }
}
