//! Route wiring.

pub mod auth;
pub mod profile;
pub mod users;

use axum::http::Uri;
use axum::http::StatusCode;
use axum::middleware;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::json;

use crate::auth::{require_admin, require_auth};
use crate::error::ApiError;
use crate::state::AppState;

pub fn create_router(state: AppState) -> Router {
    let public = Router::new()
        .route("/health", get(health))
        .route("/register", post(auth::register))
        .route("/activate-user", post(auth::activate_user))
        .route("/login", post(auth::login))
        .route("/refresh-token", get(auth::refresh_token))
        .route("/social-auth", post(auth::social_auth));

    let protected = Router::new()
        .route("/logout", get(auth::logout))
        .route("/me", get(auth::me))
        .route("/update-profile", post(profile::update_profile))
        .route("/update-password", put(profile::update_password))
        .route("/update-avatar", put(profile::update_avatar))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    // Outermost layer runs first: authentication, then the role check.
    let admin = Router::new()
        .route("/users", get(users::list_users))
        .route_layer(middleware::from_fn(require_admin))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .nest("/api/v1", public.merge(protected).merge(admin))
        .fallback(fallback)
        .with_state(state)
}

async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({ "success": true, "message": "API is working" })),
    )
}

async fn fallback(uri: Uri) -> ApiError {
    ApiError::NotFound(format!("{uri} not found"))
}
