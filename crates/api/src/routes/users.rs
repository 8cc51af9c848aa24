//! Admin-only account listing.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::error::ApiResult;
use crate::state::AppState;
use crate::users::{PublicUser, User, UserDirectory as _};

#[derive(Debug, Serialize)]
pub struct UserListResponse {
    pub success: bool,
    pub users: Vec<PublicUser>,
}

pub async fn list_users(State(state): State<AppState>) -> ApiResult<Json<UserListResponse>> {
    let users = state.users.list().await?;

    Ok(Json(UserListResponse {
        success: true,
        users: users.iter().map(User::to_public).collect(),
    }))
}
