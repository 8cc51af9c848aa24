//! Authentication middleware for Axum.
//!
//! `require_auth` resolves the access-token cookie against the session
//! cache and attaches the cached snapshot to the request; `require_admin`
//! layers a role check on top of it. Liveness is decided by cache presence,
//! never by token expiry alone.

use axum::extract::{Request, State};
use axum::http::header::COOKIE;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::auth::sessions::SessionStore as _;
use crate::auth::tokens::{TokenKind, ACCESS_TOKEN_COOKIE};
use crate::error::ApiError;
use crate::state::AppState;
use crate::users::{PublicUser, Role};

/// Pull a named cookie out of the request headers.
fn extract_cookie(request: &Request, name: &str) -> Option<String> {
    request
        .headers()
        .get(COOKIE)
        .and_then(|h| h.to_str().ok())
        .and_then(|cookies| {
            for cookie in cookies.split(';') {
                let cookie = cookie.trim();
                if let Some(value) = cookie.strip_prefix(&format!("{name}=")) {
                    return Some(value.to_string());
                }
            }
            None
        })
}

fn unauthenticated() -> ApiError {
    ApiError::Unauthorized("Please log in to access this resource".to_string())
}

/// Middleware that requires a live session.
///
/// Missing cookie, bad or expired token, and absent cache entry are distinct
/// conditions internally but collapse into the same 401 for the client.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();

    // Read the cookie before awaiting: holding `&Request` across the await
    // would make this future non-Send (the request body is not `Sync`).
    let token = extract_cookie(&request, ACCESS_TOKEN_COOKIE);

    match authenticate(&state, token).await {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(err) => {
            tracing::warn!(path = %path, error = %err, "authentication failed");
            err.into_response()
        }
    }
}

async fn authenticate(state: &AppState, token: Option<String>) -> Result<PublicUser, ApiError> {
    let token = token.ok_or_else(unauthenticated)?;

    let user_id = state
        .tokens
        .verify_session(&token, TokenKind::Access)
        .map_err(|_| unauthenticated())?;

    // A valid token without a cache entry is a logged-out session.
    let snapshot = state.sessions.get(user_id).await?;
    snapshot.ok_or_else(unauthenticated)
}

/// Pure role predicate; no side effects.
pub fn authorize(role: Role, allowed: &[Role]) -> bool {
    allowed.contains(&role)
}

/// Middleware that requires the admin role. Must be layered after
/// [`require_auth`] so the identity extension is present.
pub async fn require_admin(request: Request, next: Next) -> Response {
    match request.extensions().get::<PublicUser>() {
        Some(user) if authorize(user.role, &[Role::Admin]) => next.run(request).await,
        Some(user) => {
            tracing::warn!(user_id = %user.id, role = %user.role, "role not allowed");
            ApiError::Forbidden(format!("Role '{}' is not allowed to access this resource", user.role))
                .into_response()
        }
        None => unauthenticated().into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn authorize_accepts_exactly_the_allowed_roles() {
        assert!(authorize(Role::Admin, &[Role::Admin]));
        assert!(authorize(Role::User, &[Role::User, Role::Admin]));
        assert!(!authorize(Role::User, &[Role::Admin]));
        assert!(!authorize(Role::Admin, &[]));
    }

    #[test]
    fn cookie_extraction_handles_multiple_cookies() {
        let request = Request::builder()
            .header(COOKIE, "refresh_token=abc; access_token=xyz; theme=dark")
            .body(Body::empty())
            .unwrap();

        assert_eq!(
            extract_cookie(&request, ACCESS_TOKEN_COOKIE),
            Some("xyz".to_string())
        );
        assert_eq!(extract_cookie(&request, "theme"), Some("dark".to_string()));
        assert_eq!(extract_cookie(&request, "missing"), None);
    }

    #[test]
    fn cookie_extraction_without_header() {
        let request = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(extract_cookie(&request, ACCESS_TOKEN_COOKIE), None);
    }
}
