//! Profile, password, and avatar mutation handlers.
//!
//! Every successful mutation rewrites the session snapshot so the gate never
//! serves a value older than the last directory write.

use axum::extract::{Extension, State};
use axum::Json;
use serde::Deserialize;

use crate::auth::sessions::SessionStore as _;
use crate::error::{ApiError, ApiResult};
use crate::media::ImageStore as _;
use crate::routes::auth::UserResponse;
use crate::state::AppState;
use crate::users::{PublicUser, User, UserDirectory as _};

const AVATAR_FOLDER: &str = "avatars";

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub email: Option<String>,
}

pub async fn update_profile(
    State(state): State<AppState>,
    Extension(identity): Extension<PublicUser>,
    Json(req): Json<UpdateProfileRequest>,
) -> ApiResult<Json<UserResponse>> {
    let mut user = load_account(&state, &identity).await?;

    if let Some(email) = req.email {
        if email != user.email {
            if state.users.find_by_email(&email).await?.is_some() {
                return Err(ApiError::Validation("Email already exists".to_string()));
            }
            user.email = email;
        }
    }

    if let Some(name) = req.name {
        if !name.is_empty() {
            user.name = name;
        }
    }

    save_and_refresh(&state, &user).await
}

#[derive(Debug, Deserialize)]
pub struct UpdatePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

pub async fn update_password(
    State(state): State<AppState>,
    Extension(identity): Extension<PublicUser>,
    Json(req): Json<UpdatePasswordRequest>,
) -> ApiResult<Json<UserResponse>> {
    if req.old_password.is_empty() || req.new_password.is_empty() {
        return Err(ApiError::Validation(
            "Please provide old and new password".to_string(),
        ));
    }

    let mut user = load_account(&state, &identity).await?;

    // Social-auth accounts have no password to change.
    if user.password_hash.is_none() {
        return Err(ApiError::Validation(
            "This account has no password set".to_string(),
        ));
    }

    if !crate::users::verify_password(&user, &req.old_password) {
        return Err(ApiError::Validation("Invalid password".to_string()));
    }

    user.set_password(&req.new_password)?;

    tracing::info!(user_id = %user.id, "password updated");
    save_and_refresh(&state, &user).await
}

#[derive(Debug, Deserialize)]
pub struct UpdateAvatarRequest {
    pub avatar: String,
}

pub async fn update_avatar(
    State(state): State<AppState>,
    Extension(identity): Extension<PublicUser>,
    Json(req): Json<UpdateAvatarRequest>,
) -> ApiResult<Json<UserResponse>> {
    if req.avatar.is_empty() {
        return Err(ApiError::Validation("Please provide an image".to_string()));
    }

    let mut user = load_account(&state, &identity).await?;

    // Social-auth avatars carry a URL but no public id; only delete what we
    // uploaded ourselves.
    if let Some(public_id) = &user.avatar_public_id {
        state
            .images
            .delete(public_id)
            .await
            .map_err(|e| ApiError::Dependency(e.to_string()))?;
    }

    let uploaded = state
        .images
        .upload(&req.avatar, AVATAR_FOLDER)
        .await
        .map_err(|e| ApiError::Dependency(e.to_string()))?;

    user.avatar_public_id = Some(uploaded.public_id);
    user.avatar_url = Some(uploaded.url);

    save_and_refresh(&state, &user).await
}

async fn load_account(state: &AppState, identity: &PublicUser) -> ApiResult<User> {
    state
        .users
        .find_by_id(identity.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
}

/// Persist the account, then overwrite the session snapshot with the new
/// state.
async fn save_and_refresh(state: &AppState, user: &User) -> ApiResult<Json<UserResponse>> {
    state.users.save(user).await?;

    let snapshot = user.to_public();
    state.sessions.put(user.id, &snapshot).await?;

    Ok(Json(UserResponse {
        success: true,
        user: snapshot,
    }))
}
