//! HTTP routes for account sessions
//!
//! - POST   /users          - Sign up and start a session
//! - POST   /users/sign_in  - Sign in and start a session
//! - DELETE /users/sign_out - End the current session
//!
//! Starting a session sets the session cookie and issues the CSRF token as
//! both a readable cookie and an `X-CSRF-Token` response header.

use bson::oid::ObjectId;
use bytes::Bytes;
use http_body_util::Full;
use hyper::header::SET_COOKIE;
use hyper::{HeaderMap, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use crate::auth::{hash_password, read_cookie, verify_password, SESSION_COOKIE};
use crate::db::schemas::{normalize_email, validate_credentials, UserDoc};
use crate::routes::response::{from_error, message_response, parse_body, respond};
use crate::server::AppState;
use crate::types::{FactbookError, Result};

/// Sign-up and sign-in credentials, wrapped as `{"user": {...}}`
#[derive(Debug, Default, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// POST /users
///
/// Like sign-in, a session cookie presented with the request is revoked
/// once the new account exists.
pub async fn sign_up(state: &AppState, headers: &HeaderMap, body: &Bytes) -> Response<Full<Bytes>> {
    respond(register(state, headers, body).await)
}

async fn register(
    state: &AppState,
    headers: &HeaderMap,
    body: &Bytes,
) -> Result<Response<Full<Bytes>>> {
    let creds: Credentials = parse_body(body, "user")?;

    let errors = validate_credentials(&creds.email, &creds.password);
    if !errors.is_empty() {
        return Err(FactbookError::Validation(errors));
    }

    let password_hash = hash_password(&creds.password)?;
    let user = state
        .store
        .insert_user(UserDoc::new(&creds.email, password_hash))
        .await?;
    let user_id = user
        ._id
        .ok_or_else(|| FactbookError::Internal("User has no id".into()))?;

    revoke_presented(state, headers);
    info!(user_id = %user_id, email = %user.email, "User signed up");
    Ok(start_session(
        state,
        user_id,
        &user.email,
        "Signed up successfully.",
    ))
}

/// POST /users/sign_in
///
/// Unknown e-mail and wrong password produce the same response. A session
/// cookie presented with the request is revoked before the new one is set.
pub async fn sign_in(state: &AppState, headers: &HeaderMap, body: &Bytes) -> Response<Full<Bytes>> {
    let creds: Credentials = match parse_body(body, "user") {
        Ok(c) => c,
        Err(e) => return from_error(&e),
    };

    let email = normalize_email(&creds.email);
    let user = match state.store.find_user_by_email(&email).await {
        Ok(user) => user,
        Err(e) => return from_error(&e),
    };

    let authenticated = match &user {
        Some(user) => match verify_password(&creds.password, &user.password_hash) {
            Ok(valid) => valid,
            Err(e) => {
                warn!("Password verification error: {}", e);
                false
            }
        },
        None => false,
    };

    let user = match user {
        Some(user) if authenticated => user,
        _ => {
            warn!(email = %email, "Sign-in failed");
            return message_response(StatusCode::UNAUTHORIZED, "Authentication failed.");
        }
    };

    let Some(user_id) = user._id else {
        return from_error(&FactbookError::Internal("User has no id".into()));
    };

    revoke_presented(state, headers);
    info!(user_id = %user_id, email = %user.email, "User signed in");
    start_session(state, user_id, &user.email, "You are logged in.")
}

/// DELETE /users/sign_out
///
/// `token` is the raw session cookie, present only when it resolved to a
/// live session.
pub fn sign_out(state: &AppState, token: Option<&str>) -> Response<Full<Bytes>> {
    let revoked = token.is_some_and(|t| state.sessions.revoke(t));
    if !revoked {
        return message_response(StatusCode::UNAUTHORIZED, "Hmm nothing happened.");
    }

    info!("User signed out");
    let mut response = message_response(StatusCode::OK, "You are logged out.");
    for cookie in state.cookies.clear_all() {
        if let Ok(value) = cookie.parse() {
            response.headers_mut().append(SET_COOKIE, value);
        }
    }
    response
}

/// Drop the session whose cookie came with the request, if any
fn revoke_presented(state: &AppState, headers: &HeaderMap) {
    if let Some(previous) = read_cookie(headers, SESSION_COOKIE) {
        state.sessions.revoke(previous);
    }
}

/// Create a session and return a 201 carrying its cookies
fn start_session(
    state: &AppState,
    user_id: ObjectId,
    email: &str,
    message: &str,
) -> Response<Full<Bytes>> {
    let (token, session) = state.sessions.create(user_id, email);

    Response::builder()
        .status(StatusCode::CREATED)
        .header("Content-Type", "application/json")
        .header("Cache-Control", "no-store")
        .header(SET_COOKIE, state.cookies.session(&token))
        .header(SET_COOKIE, state.cookies.csrf(&session.csrf_token))
        .header("X-CSRF-Token", session.csrf_token.as_str())
        .body(Full::new(Bytes::from(json!({ "message": message }).to_string())))
        .unwrap_or_else(|e| {
            from_error(&FactbookError::Internal(format!("Failed to build response: {}", e)))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Args;
    use crate::db::MemoryStore;
    use std::sync::Arc;

    fn state() -> AppState {
        AppState::new(Args::for_tests(), Arc::new(MemoryStore::new()))
    }

    fn creds(email: &str, password: &str) -> Bytes {
        Bytes::from(json!({ "user": { "email": email, "password": password } }).to_string())
    }

    fn set_cookies(response: &Response<Full<Bytes>>) -> Vec<String> {
        response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_sign_up_sets_session_and_csrf() {
        let state = state();
        let response = sign_up(&state, &HeaderMap::new(), &creds("ada@example.com", "secret123")).await;

        assert_eq!(response.status(), StatusCode::CREATED);
        let cookies = set_cookies(&response);
        assert_eq!(cookies.len(), 2);
        assert!(cookies[0].starts_with("_factbook_session="));
        assert!(cookies[1].starts_with("CSRF-TOKEN="));
        assert!(response.headers().contains_key("x-csrf-token"));
        assert_eq!(state.sessions.len(), 1);
    }

    #[tokio::test]
    async fn test_sign_up_validation() {
        let state = state();
        let response = sign_up(&state, &HeaderMap::new(), &creds("not-an-email", "123")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(state.sessions.is_empty());
    }

    #[tokio::test]
    async fn test_sign_in_wrong_password() {
        let state = state();
        sign_up(&state, &HeaderMap::new(), &creds("ada@example.com", "secret123")).await;

        let headers = HeaderMap::new();
        let wrong = sign_in(&state, &headers, &creds("ada@example.com", "nope-nope")).await;
        assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);

        let unknown = sign_in(&state, &headers, &creds("bob@example.com", "secret123")).await;
        assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);

        let ok = sign_in(&state, &headers, &creds("ADA@example.com", "secret123")).await;
        assert_eq!(ok.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn test_sign_up_revokes_presented_session() {
        let state = state();
        let (old_token, _) = state.sessions.create(ObjectId::new(), "old@example.com");

        let mut headers = HeaderMap::new();
        headers.insert(
            "cookie",
            format!("{}={}", SESSION_COOKIE, old_token).parse().unwrap(),
        );
        let response = sign_up(&state, &headers, &creds("new@example.com", "secret123")).await;

        assert_eq!(response.status(), StatusCode::CREATED);
        assert!(state.sessions.resolve(&old_token).is_none());
        assert_eq!(state.sessions.len(), 1);
    }

    #[test]
    fn test_sign_out_without_session() {
        let state = state();
        assert_eq!(sign_out(&state, None).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            sign_out(&state, Some("stale-token")).status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn test_sign_out_clears_cookies() {
        let state = state();
        let (token, _) = state.sessions.create(ObjectId::new(), "ada@example.com");

        let response = sign_out(&state, Some(&token));
        assert_eq!(response.status(), StatusCode::OK);
        assert!(set_cookies(&response).iter().all(|c| c.contains("Max-Age=0")));
        assert!(state.sessions.resolve(&token).is_none());
    }
}
