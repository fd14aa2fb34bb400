use std::convert::Infallible;
use std::time::SystemTime;

use anyhow::{Context, Result};
use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use hyper::{Request, Response, StatusCode, header};
use serde::Serialize;
use tracing::{info, warn};

use crate::AppState;
use crate::auth::{IssuedSession, unix_secs};
use crate::auth::cookies::session_cookies;
use crate::handlers::http::utils::{self, full};

/// Body of a successful login or refresh. The tokens themselves only travel
/// in cookies.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub status: &'static str,
    /// Session expiry, Unix seconds.
    pub expires_at: u64,
    /// XSRF cookie expiry, Unix seconds.
    pub xsrf_expires_at: u64,
}

/// Login handler
pub async fn handle_login<B>(
    req: Request<B>,
    state: AppState,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    info!("Processing login request");

    let now = SystemTime::now();
    match state.sessions.issue(now) {
        Ok(issued) => deliver_issued_session(&req, &issued),
        Err(e) => {
            warn!("Login failed: {}", e.to_code());
            utils::deliver_auth_error(&e)
        }
    }
}

/// 200 with both session cookies set. Shared by login and refresh.
pub fn deliver_issued_session<B>(
    req: &Request<B>,
    issued: &IssuedSession,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    let [token_cookie, xsrf_cookie] = session_cookies(issued, utils::is_https(req))?;

    let body = SessionResponse {
        status: "success",
        expires_at: unix_secs(issued.expires_at),
        xsrf_expires_at: unix_secs(issued.xsrf_expires_at),
    };
    let json = serde_json::to_string(&body).context("Failed to serialize response")?;

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::CACHE_CONTROL, "no-store")
        .header(header::SET_COOKIE, token_cookie)
        .header(header::SET_COOKIE, xsrf_cookie)
        .body(full(json))
        .context("Failed to build response")?;

    Ok(response)
}
