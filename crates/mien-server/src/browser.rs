//! Session-cookie plumbing and redirect helpers for the participant flow.
//!
//! The browser carries only an opaque token; all session state lives
//! server-side in the store. One cookie with three attributes does not
//! justify a cookie crate.

use axum::{
  http::{HeaderMap, StatusCode, header},
  response::{IntoResponse, Response},
};
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "mien_session";

/// Extract the session token from the `Cookie` header, if present and
/// well-formed. A tampered or stale value simply reads as "no session".
pub fn session_token(headers: &HeaderMap) -> Option<Uuid> {
  let raw = headers.get(header::COOKIE)?.to_str().ok()?;
  raw.split(';').find_map(|pair| {
    let (name, value) = pair.trim().split_once('=')?;
    if name != SESSION_COOKIE {
      return None;
    }
    Uuid::parse_str(value.trim()).ok()
  })
}

pub fn session_cookie(token: Uuid) -> String {
  format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax")
}

/// An expired cookie — the browser drops the token immediately.
pub fn expired_session_cookie() -> String {
  format!("{SESSION_COOKIE}=; Path=/; HttpOnly; Max-Age=0")
}

/// Redirect-after-POST (and the stale-session fallback).
pub fn see_other(location: &str) -> Response {
  (StatusCode::SEE_OTHER, [(header::LOCATION, location.to_string())])
    .into_response()
}

pub fn see_other_with_cookie(location: &str, cookie: String) -> Response {
  (
    StatusCode::SEE_OTHER,
    [
      (header::LOCATION, location.to_string()),
      (header::SET_COOKIE, cookie),
    ],
  )
    .into_response()
}
