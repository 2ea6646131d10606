//! Custom Axum extractors.
//!
//! Currently a single extractor: [`BasicAuth`], which decodes the
//! `Authorization: Basic` header for the protected (PUT/DELETE) routes.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

/// Credentials presented via HTTP Basic authentication.
///
/// Extraction itself never rejects: a missing or malformed header yields
/// empty credentials, which the auth gate refuses, so the 401 mapping
/// stays in one place (the handler's gate check).
#[derive(Debug, Clone, Default)]
pub struct BasicAuth {
    /// Presented username (empty when the header is absent or malformed).
    pub username: String,
    /// Presented password (empty when the header is absent or malformed).
    pub password: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for BasicAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let credentials = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(decode_basic)
            .unwrap_or_default();

        Ok(credentials)
    }
}

/// Decodes `Basic <base64(user:pass)>`; `None` on any malformation.
fn decode_basic(header: &str) -> Option<BasicAuth> {
    let (scheme, payload) = header.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }

    let decoded = BASE64.decode(payload.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;

    Some(BasicAuth {
        username: username.to_string(),
        password: password.to_string(),
    })
}
