use std::convert::Infallible;
use std::time::SystemTime;

use anyhow::Result;
use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use hyper::{Request, Response};
use tracing::{info, warn};

use crate::AppState;
use crate::auth::cookies::read_session_cookie;
use crate::handlers::http::auth::login::deliver_issued_session;
use crate::handlers::http::utils;

/// Re-issue the session cookies when the current session is inside its
/// refresh window. Only the `token` cookie is required.
pub async fn handle_refresh<B>(
    req: Request<B>,
    state: AppState,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    info!("Processing refresh request");

    let now = SystemTime::now();
    let refreshed = read_session_cookie(req.headers())
        .and_then(|outer_token| state.sessions.refresh(&outer_token, now));

    match refreshed {
        Ok(issued) => deliver_issued_session(&req, &issued),
        Err(e) => {
            warn!("Refresh rejected: {}", e.to_code());
            utils::deliver_auth_error(&e)
        }
    }
}
