use anyhow::{Context, Result};
use hyper::header::{HeaderMap, HeaderValue};

use crate::auth::error::AuthError;
use crate::auth::session::IssuedSession;
use crate::handlers::http::utils::headers::{get_header_value, read_cookie, set_cookie};

/// HttpOnly cookie carrying the container token.
pub const SESSION_COOKIE: &str = "token";

/// Script-readable cookie the client echoes back in [`XSRF_HEADER`].
pub const XSRF_COOKIE: &str = "XSRF-TOKEN";

pub const XSRF_HEADER: &str = "x-xsrf-token";

pub fn read_session_cookie(headers: &HeaderMap) -> Result<String, AuthError> {
    match read_cookie(headers, SESSION_COOKIE) {
        Ok(Some(token)) => Ok(token),
        Ok(None) => Err(AuthError::Unauthorized),
        Err(_) => Err(AuthError::Malformed),
    }
}

pub fn read_xsrf_header(headers: &HeaderMap) -> Option<String> {
    get_header_value(headers, XSRF_HEADER)
}

/// `Set-Cookie` values for a freshly issued session: the container token
/// first, then the XSRF token.
pub fn session_cookies(issued: &IssuedSession, secure: bool) -> Result<[HeaderValue; 2]> {
    let token = set_cookie(
        SESSION_COOKIE,
        &issued.outer_token,
        Some(issued.expires_at),
        Some("/"),
        true,
        secure,
    )
    .context("Failed to build session cookie")?;

    let xsrf = set_cookie(
        XSRF_COOKIE,
        &issued.xsrf_token,
        Some(issued.xsrf_expires_at),
        Some("/"),
        false,
        secure,
    )
    .context("Failed to build XSRF cookie")?;

    Ok([token, xsrf])
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::header;
    use std::time::{Duration, UNIX_EPOCH};

    fn issued() -> IssuedSession {
        IssuedSession {
            outer_token: "aaa.bbb.ccc".into(),
            xsrf_token: "tag:1700000000000".into(),
            expires_at: UNIX_EPOCH + Duration::from_secs(1_700_000_300),
            xsrf_expires_at: UNIX_EPOCH + Duration::from_secs(1_700_086_340),
        }
    }

    #[test]
    fn missing_session_cookie_is_unauthorized() {
        assert_eq!(
            read_session_cookie(&HeaderMap::new()).unwrap_err(),
            AuthError::Unauthorized
        );
    }

    #[test]
    fn unreadable_cookie_header_is_malformed() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_bytes(b"token=\xc3\xa9").unwrap());
        assert_eq!(read_session_cookie(&headers).unwrap_err(), AuthError::Malformed);
    }

    #[test]
    fn session_cookie_is_http_only_and_xsrf_is_not() {
        let [token, xsrf] = session_cookies(&issued(), false).unwrap();
        let token = token.to_str().unwrap();
        let xsrf = xsrf.to_str().unwrap();

        assert!(token.starts_with("token=aaa.bbb.ccc;"));
        assert!(token.contains("HttpOnly"));
        assert!(token.contains(&httpdate::fmt_http_date(issued().expires_at)));

        assert!(xsrf.starts_with("XSRF-TOKEN=tag:1700000000000;"));
        assert!(!xsrf.contains("HttpOnly"));
        assert!(xsrf.contains(&httpdate::fmt_http_date(issued().xsrf_expires_at)));
    }

    #[test]
    fn secure_flag_follows_transport() {
        let [token, xsrf] = session_cookies(&issued(), true).unwrap();
        assert!(token.to_str().unwrap().contains("; Secure"));
        assert!(xsrf.to_str().unwrap().contains("; Secure"));
    }

    #[test]
    fn xsrf_header_is_read_case_insensitively() {
        let mut headers = HeaderMap::new();
        headers.insert("X-XSRF-TOKEN", HeaderValue::from_static("abc:1"));
        assert_eq!(read_xsrf_header(&headers).as_deref(), Some("abc:1"));
    }
}
