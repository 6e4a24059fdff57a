//! Security response headers.
//!
//! Every page and API response carries a fixed header table; static assets
//! and image endpoints are skipped by a path filter. HSTS is attached only
//! in production so local plain-HTTP development keeps working.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header::HeaderValue, HeaderMap, Request},
    middleware::Next,
    response::Response,
};

use crate::config::schema::HeadersConfig;

const CONTENT_SECURITY_POLICY: &str = "default-src 'self'; script-src 'self' 'unsafe-inline'; \
     style-src 'self' 'unsafe-inline' https://fonts.googleapis.com; \
     img-src 'self' data: https:; font-src 'self' data: https://fonts.gstatic.com; \
     connect-src 'self'; frame-ancestors 'none'; base-uri 'self'; form-action 'self'";

const PERMISSIONS_POLICY: &str =
    "camera=(), microphone=(), geolocation=(), payment=(self), usb=()";

const STRICT_TRANSPORT_SECURITY: &str = "max-age=31536000; includeSubDomains";

/// Set the fixed security header table on a response.
///
/// Stateless and infallible; existing values are overwritten.
pub fn apply_security_headers(headers: &mut HeaderMap, production: bool) {
    headers.insert("x-content-type-options", HeaderValue::from_static("nosniff"));
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert("x-xss-protection", HeaderValue::from_static("1; mode=block"));
    headers.insert(
        "referrer-policy",
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    headers.insert("x-dns-prefetch-control", HeaderValue::from_static("on"));
    headers.insert(
        "content-security-policy",
        HeaderValue::from_static(CONTENT_SECURITY_POLICY),
    );
    headers.insert(
        "permissions-policy",
        HeaderValue::from_static(PERMISSIONS_POLICY),
    );

    if production {
        headers.insert(
            "strict-transport-security",
            HeaderValue::from_static(STRICT_TRANSPORT_SECURITY),
        );
    }
}

/// Does this path serve static content the header table should skip?
fn is_exempt_path(path: &str, skip_prefixes: &[String]) -> bool {
    skip_prefixes.iter().any(|prefix| path.starts_with(prefix.as_str()))
        || path.ends_with("favicon.ico")
}

/// Middleware attaching security headers to every matched response.
pub async fn security_headers_middleware(
    State(config): State<Arc<HeadersConfig>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let exempt = is_exempt_path(request.uri().path(), &config.skip_prefixes);
    let mut response = next.run(request).await;

    if config.enabled && !exempt {
        apply_security_headers(response.headers_mut(), config.production);
    }

    response
}
