//! Opaque session identifiers carried in the `session_id` cookie.

use std::convert::Infallible;

use axum::Json;
use axum::extract::FromRequestParts;
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::request::Parts;
use axum::response::{AppendHeaders, IntoResponse};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use super::errors::ApiError;

pub const COOKIE_NAME: &str = "session_id";
const SESSION_MAX_AGE_SECS: u64 = 60 * 60 * 24 * 365;

/// The caller's session cookie, if any. Never rejects.
pub struct SessionCookie(pub Option<String>);

impl<S: Send + Sync> FromRequestParts<S> for SessionCookie {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find_map(|header| parse_cookie(header, COOKIE_NAME))
            .map(str::to_string);
        Ok(Self(value))
    }
}

/// A session cookie that must be present; rejects with 401 otherwise.
pub struct RequiredSession(pub String);

impl<S: Send + Sync> FromRequestParts<S> for RequiredSession {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Ok(SessionCookie(value)) = SessionCookie::from_request_parts(parts, state).await;
        value.map(Self).ok_or(ApiError::Unauthenticated)
    }
}

/// Finds `name` in a `Cookie` header. Empty values count as absent.
fn parse_cookie<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header
        .split(';')
        .filter_map(|part| part.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty())
}

/// `Set-Cookie` value for a session. `Secure` is added in release builds.
pub fn session_cookie(id: &str) -> String {
    let secure = if cfg!(debug_assertions) { "" } else { "; Secure" };
    format!(
        "{COOKIE_NAME}={id}; Path=/; HttpOnly; SameSite=Lax; Max-Age={SESSION_MAX_AGE_SECS}{secure}"
    )
}

/// `POST /session`: returns the caller's session, issuing one when missing.
pub async fn create_session(SessionCookie(existing): SessionCookie) -> impl IntoResponse {
    match existing {
        Some(id) => (AppendHeaders(None), Json(json!({ "sessionId": id }))),
        None => {
            let id = Uuid::new_v4().to_string();
            info!("new session issued");
            let cookie = session_cookie(&id);
            (
                AppendHeaders(Some((SET_COOKIE, cookie))),
                Json(json!({ "sessionId": id })),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_cookie_finds_session_anywhere() {
        assert_eq!(parse_cookie("session_id=abc; theme=dark", COOKIE_NAME), Some("abc"));
        assert_eq!(parse_cookie("theme=dark;session_id=abc", COOKIE_NAME), Some("abc"));
        assert_eq!(parse_cookie("theme=dark", COOKIE_NAME), None);
    }

    #[test]
    fn parse_cookie_requires_exact_name_and_value() {
        assert_eq!(parse_cookie("old_session_id=abc", COOKIE_NAME), None);
        assert_eq!(parse_cookie("session_id_v2=abc", COOKIE_NAME), None);
        assert_eq!(parse_cookie("session_id=", COOKIE_NAME), None);
        assert_eq!(parse_cookie("session_id", COOKIE_NAME), None);
    }

    #[test]
    fn cookie_attributes() {
        let cookie = session_cookie("abc");
        assert!(cookie.starts_with("session_id=abc; Path=/; HttpOnly; SameSite=Lax; Max-Age=31536000"));
    }
}
