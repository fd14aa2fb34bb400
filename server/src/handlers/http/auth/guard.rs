use std::time::SystemTime;

use hyper::Request;

use crate::AppState;
use crate::auth::cookies::{read_session_cookie, read_xsrf_header};
use crate::auth::{AuthError, VerifiedSession};

/// Full authenticated-request check: `token` cookie, both signatures and
/// expiries, then the `X-XSRF-TOKEN` header against the identity token.
pub fn authenticate_request<B>(
    req: &Request<B>,
    state: &AppState,
) -> Result<VerifiedSession, AuthError> {
    let now = SystemTime::now();
    let outer_token = read_session_cookie(req.headers())?;
    let xsrf = read_xsrf_header(req.headers());

    state
        .sessions
        .authenticate(&outer_token, xsrf.as_deref(), now)
}
