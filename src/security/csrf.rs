//! Double-submit-cookie CSRF guard.
//!
//! A random token is issued in a non-HTTP-only cookie; state-changing
//! requests must echo it in the `X-Csrf-Token` header. The two values
//! are compared in constant time over their SHA-256 digests.
//!
//! Requests authenticated via `X-Api-Key` / `Authorization: Bearer`
//! bypass the check: the credential is not cookie-borne, so there is no
//! ambient authority for a cross-site request to ride on.

use axum::{
    extract::{Request, State},
    http::{HeaderValue, Method, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use subtle::ConstantTimeEq;

use crate::config::CsrfConfig;

pub const CSRF_COOKIE: &str = "praxis_csrf";
pub const CSRF_HEADER: &str = "x-csrf-token";

/// Generate a random CSRF token (64 character hex string).
#[must_use]
pub fn generate_token() -> String {
    use rand::Rng;

    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();

    bytes.iter().fold(String::with_capacity(64), |mut acc, b| {
        use std::fmt::Write;
        let _ = write!(acc, "{b:02x}");
        acc
    })
}

/// Constant-time comparison over hashed values so the comparison cost
/// never depends on how many leading characters match.
#[must_use]
pub fn tokens_match(a: &str, b: &str) -> bool {
    let digest_a = Sha256::digest(a.as_bytes());
    let digest_b = Sha256::digest(b.as_bytes());

    digest_a.as_slice().ct_eq(digest_b.as_slice()).into()
}

/// Extract a named cookie from a `Cookie` request header value.
#[must_use]
pub fn cookie_value(cookie_header: &str, name: &str) -> Option<String> {
    cookie_header.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == name).then(|| value.to_string())
    })
}

fn request_cookie(request: &Request, name: &str) -> Option<String> {
    request
        .headers()
        .get(header::COOKIE)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| cookie_value(h, name))
}

fn is_safe_method(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

fn has_api_key_auth(request: &Request) -> bool {
    request.headers().contains_key("X-Api-Key")
        || request.headers().contains_key(header::AUTHORIZATION)
}

pub async fn csrf_middleware(
    State(config): State<Arc<CsrfConfig>>,
    request: Request,
    next: Next,
) -> Response {
    if has_api_key_auth(&request) {
        return next.run(request).await;
    }

    if is_safe_method(request.method()) {
        let needs_cookie = request_cookie(&request, CSRF_COOKIE).is_none();
        let mut response = next.run(request).await;

        if needs_cookie {
            let token = generate_token();
            // Deliberately not HttpOnly: the SPA must read it back into
            // the request header.
            let cookie = format!("{CSRF_COOKIE}={token}; Path=/; SameSite=Lax");
            if let Ok(value) = HeaderValue::from_str(&cookie) {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
        }

        return response;
    }

    // Nested routers see the prefix-stripped path; the exempt list is
    // written against the original request URI, so check both.
    let stripped = request.uri().path().to_string();
    let original = request
        .extensions()
        .get::<axum::extract::OriginalUri>()
        .map(|uri| uri.0.path().to_string());
    let path = original.unwrap_or_else(|| stripped.clone());

    if config.exempt_path_prefixes.iter().any(|prefix| {
        path.starts_with(prefix.as_str())
            || prefix
                .strip_prefix("/api")
                .is_some_and(|p| stripped.starts_with(p))
    }) {
        return next.run(request).await;
    }

    let cookie_token = request_cookie(&request, CSRF_COOKIE);
    let header_token = request
        .headers()
        .get(CSRF_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(str::to_string);

    match (cookie_token, header_token) {
        (Some(cookie), Some(header)) if tokens_match(&cookie, &header) => {
            next.run(request).await
        }
        _ => {
            tracing::warn!("Rejected request to {path}: CSRF token missing or mismatched");
            (StatusCode::FORBIDDEN, "CSRF token missing or invalid").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_tokens_are_unique_hex() {
        let a = generate_token();
        let b = generate_token();

        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_tokens_match() {
        let token = generate_token();
        assert!(tokens_match(&token, &token));
        assert!(!tokens_match(&token, &generate_token()));
        assert!(!tokens_match(&token, ""));
    }

    #[test]
    fn test_cookie_value_parsing() {
        let header = "sid=abc123; praxis_csrf=deadbeef; theme=dark";

        assert_eq!(
            cookie_value(header, "praxis_csrf").as_deref(),
            Some("deadbeef")
        );
        assert_eq!(cookie_value(header, "sid").as_deref(), Some("abc123"));
        assert_eq!(cookie_value(header, "missing"), None);
    }
}
