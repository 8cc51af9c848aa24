//! Registration, activation, and session lifecycle handlers.

use axum::extract::{Extension, State};
use axum::Json;
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};

use crate::auth::sessions::SessionStore as _;
use crate::auth::tokens::{
    PendingRegistration, TokenKind, ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE,
};
use crate::auth::TokenCodec;
use crate::email::{activation_email, Mailer as _};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::users::{NewUser, PublicUser, Role, User, UserDirectory as _};

/// Both login failure paths produce this exact message; which check failed
/// is never observable.
const INVALID_CREDENTIALS: &str = "Invalid email or password";

const REFRESH_FAILED: &str = "Could not refresh token";

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub success: bool,
    pub message: String,
    pub activation_token: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub success: bool,
    pub user: PublicUser,
    pub access_token: String,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub success: bool,
    pub user: PublicUser,
}

/// Begin the activation flow: mint a token + code pair and mail the code.
///
/// No account row exists until redemption; the pending registration lives
/// only inside the signed token.
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<Json<RegisterResponse>> {
    if req.name.is_empty() || req.email.is_empty() || req.password.is_empty() {
        return Err(ApiError::Validation(
            "Please provide name, email and password".to_string(),
        ));
    }

    if state.users.find_by_email(&req.email).await?.is_some() {
        return Err(ApiError::Validation("Email already exists".to_string()));
    }

    let pending = PendingRegistration {
        name: req.name,
        email: req.email,
        password: req.password,
    };
    let activation = state.tokens.sign_activation(&pending)?;

    // Dispatch failure aborts the registration; the token is never returned.
    let html = activation_email(&pending.name, &activation.activation_code);
    state
        .mailer
        .send(&pending.email, "Activate your account", &html)
        .await
        .map_err(|e| ApiError::Dependency(e.to_string()))?;

    tracing::info!(email = %pending.email, "activation mail dispatched");

    Ok(Json(RegisterResponse {
        success: true,
        message: format!("Please check your email {} to activate your account", pending.email),
        activation_token: activation.token,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ActivateRequest {
    pub activation_token: String,
    pub activation_code: String,
}

/// Redeem an activation token. Guards run in order: token validity, code
/// equality, email still unclaimed. Any failure aborts with no side effects.
pub async fn activate_user(
    State(state): State<AppState>,
    Json(req): Json<ActivateRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let claims = state
        .tokens
        .verify_activation(&req.activation_token)
        .map_err(|_| ApiError::Validation("Activation token is invalid or expired".to_string()))?;

    if !claims.code_matches(&req.activation_code) {
        return Err(ApiError::Validation(
            "Activation code does not match".to_string(),
        ));
    }

    // Re-checked at redemption time: two activation flows for the same email
    // may interleave.
    if state.users.find_by_email(&claims.user.email).await?.is_some() {
        return Err(ApiError::Validation("Email already exists".to_string()));
    }

    let user = state
        .users
        .create(NewUser {
            name: claims.user.name,
            email: claims.user.email,
            password: Some(claims.user.password),
            avatar_url: None,
            role: Role::User,
            is_verified: true,
        })
        .await?;

    tracing::info!(user_id = %user.id, email = %user.email, "account activated");

    Ok(Json(MessageResponse {
        success: true,
        message: "Account activated successfully".to_string(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> ApiResult<(CookieJar, Json<AuthResponse>)> {
    if req.email.is_empty() || req.password.is_empty() {
        return Err(ApiError::Validation(
            "Please provide email and password".to_string(),
        ));
    }

    let user = state
        .users
        .find_by_email(&req.email)
        .await?
        .ok_or_else(|| ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()))?;

    if !crate::users::verify_password(&user, &req.password) {
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    }

    tracing::info!(user_id = %user.id, "login successful");
    send_token(&state, &user, jar).await
}

#[derive(Debug, Deserialize)]
pub struct SocialAuthRequest {
    pub name: String,
    pub email: String,
    pub avatar: Option<String>,
}

/// Passwordless session issuance for provider-verified identities. Creates
/// the account on first sight; no credential check either way.
pub async fn social_auth(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<SocialAuthRequest>,
) -> ApiResult<(CookieJar, Json<AuthResponse>)> {
    let user = match state.users.find_by_email(&req.email).await? {
        Some(user) => user,
        None => {
            let created = state
                .users
                .create(NewUser {
                    name: req.name,
                    email: req.email,
                    password: None,
                    avatar_url: req.avatar,
                    role: Role::User,
                    is_verified: false,
                })
                .await?;
            tracing::info!(user_id = %created.id, "social-auth account created");
            created
        }
    };

    send_token(&state, &user, jar).await
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub success: bool,
    pub message: String,
    pub access_token: String,
}

/// Rotate the token pair.
///
/// Liveness comes from the session cache: a cryptographically valid refresh
/// token whose cache entry is gone (logout, eviction) cannot be redeemed.
/// The superseded refresh token is not revoked, only outlived.
pub async fn refresh_token(
    State(state): State<AppState>,
    jar: CookieJar,
) -> ApiResult<(CookieJar, Json<RefreshResponse>)> {
    let cookie = jar
        .get(REFRESH_TOKEN_COOKIE)
        .ok_or_else(|| ApiError::Unauthorized(REFRESH_FAILED.to_string()))?;

    let user_id = state
        .tokens
        .verify_session(cookie.value(), TokenKind::Refresh)
        .map_err(|_| ApiError::Unauthorized(REFRESH_FAILED.to_string()))?;

    if state.sessions.get(user_id).await?.is_none() {
        return Err(ApiError::Unauthorized(REFRESH_FAILED.to_string()));
    }

    let access_token = state.tokens.sign_session(user_id, TokenKind::Access)?;
    let refresh_token = state.tokens.sign_session(user_id, TokenKind::Refresh)?;

    let jar = jar
        .add(state.tokens.access_cookie(access_token.clone()))
        .add(state.tokens.refresh_cookie(refresh_token));

    Ok((
        jar,
        Json(RefreshResponse {
            success: true,
            message: "Access token updated successfully".to_string(),
            access_token,
        }),
    ))
}

pub async fn logout(
    State(state): State<AppState>,
    Extension(user): Extension<PublicUser>,
    jar: CookieJar,
) -> ApiResult<(CookieJar, Json<MessageResponse>)> {
    state.sessions.delete(user.id).await?;

    let jar = jar
        .add(TokenCodec::expired_cookie(ACCESS_TOKEN_COOKIE))
        .add(TokenCodec::expired_cookie(REFRESH_TOKEN_COOKIE));

    tracing::info!(user_id = %user.id, "logged out");

    Ok((
        jar,
        Json(MessageResponse {
            success: true,
            message: "Logged out successfully".to_string(),
        }),
    ))
}

/// Serve the identity the gate attached: the cached snapshot, not a fresh
/// directory read.
pub async fn me(Extension(user): Extension<PublicUser>) -> Json<UserResponse> {
    Json(UserResponse {
        success: true,
        user,
    })
}

/// Sign a fresh token pair, persist the snapshot, and set both cookies.
async fn send_token(
    state: &AppState,
    user: &User,
    jar: CookieJar,
) -> ApiResult<(CookieJar, Json<AuthResponse>)> {
    let snapshot = user.to_public();

    let access_token = state.tokens.sign_session(user.id, TokenKind::Access)?;
    let refresh_token = state.tokens.sign_session(user.id, TokenKind::Refresh)?;

    state.sessions.put(user.id, &snapshot).await?;

    let jar = jar
        .add(state.tokens.access_cookie(access_token.clone()))
        .add(state.tokens.refresh_cookie(refresh_token));

    Ok((
        jar,
        Json(AuthResponse {
            success: true,
            user: snapshot,
            access_token,
        }),
    ))
}
