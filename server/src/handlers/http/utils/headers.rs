use anyhow::{Result, anyhow};
use hyper::header::{self, HeaderMap, HeaderValue};
use std::time::SystemTime;
use thiserror::Error;
use tracing::{debug, warn};

/// A `Cookie` header was present but could not be read as text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unreadable cookie header")]
pub struct CookieHeaderError;

/// Extract a header value as a string
pub fn get_header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers.get(name).and_then(|v| v.to_str().ok()).map(|s| {
        debug!("Retrieved header: {}", name);
        s.to_string()
    })
}

/// Check if a header exists and matches a value
pub fn header_matches(headers: &HeaderMap, name: &str, value: &str) -> bool {
    get_header_value(headers, name)
        .map(|v| v.eq_ignore_ascii_case(value))
        .unwrap_or(false)
}

/// Extract cookie value by name.
///
/// `Ok(None)` means the cookie is absent. Every `Cookie` header is searched,
/// since HTTP/2 clients may split them.
pub fn read_cookie(
    headers: &HeaderMap,
    cookie_name: &str,
) -> std::result::Result<Option<String>, CookieHeaderError> {
    for value in headers.get_all(header::COOKIE) {
        let cookies = value.to_str().map_err(|_| {
            warn!("Cookie header is not visible ASCII");
            CookieHeaderError
        })?;

        let found = cookies.split(';').find_map(|cookie| {
            let (name, value) = cookie.trim().split_once('=')?;
            (name.trim() == cookie_name).then(|| value.trim().to_string())
        });

        if let Some(value) = found {
            debug!("Cookie found: {}", cookie_name);
            return Ok(Some(value));
        }
    }

    debug!("Cookie not found: {}", cookie_name);
    Ok(None)
}

/// Build a `Set-Cookie` value.
pub fn set_cookie(
    name: &str,
    value: &str,
    expires: Option<SystemTime>,
    path: Option<&str>,
    http_only: bool,
    secure: bool,
) -> Result<HeaderValue> {
    let mut cookie = format!("{}={}", name, value);

    if let Some(at) = expires {
        cookie.push_str(&format!("; Expires={}", httpdate::fmt_http_date(at)));
    }

    if let Some(p) = path {
        cookie.push_str(&format!("; Path={}", p));
    }

    if http_only {
        cookie.push_str("; HttpOnly");
    }

    if secure {
        cookie.push_str("; Secure");
    }

    cookie.push_str("; SameSite=Strict");

    debug!("Setting cookie: {}", name);

    HeaderValue::from_str(&cookie).map_err(|e| {
        warn!("Failed to create cookie header for {}: {}", name, e);
        anyhow!("Invalid cookie value: {}", e)
    })
}
