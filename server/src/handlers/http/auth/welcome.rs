use std::convert::Infallible;

use anyhow::Result;
use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use hyper::{Request, Response};
use tracing::info;

use crate::AppState;
use crate::auth::VerifiedSession;
use crate::handlers::http::utils;

/// Protected check endpoint. The router has already verified both tokens and
/// the XSRF header by the time this runs.
pub async fn handle_auth_test<B>(
    _req: Request<B>,
    _state: AppState,
    session: VerifiedSession,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    info!("Authenticated request for {}", session.claims.username);
    utils::deliver_text(format!("Welcome {}!", session.claims.username))
}
