//! Stateless dual-token sessions.
//!
//! An identity token (username + expiry) is signed with one secret and then
//! wrapped, as an opaque string, in a container token signed with a second
//! secret. Only the container travels in the `token` cookie. The XSRF token is
//! derived from the exact identity token string, so it is worthless without
//! the matching, unexpired session.

use std::time::{SystemTime, UNIX_EPOCH};

pub mod cookies;
pub mod error;
pub mod session;
pub mod token;
pub mod xsrf;

pub use error::AuthError;
pub use session::{IssuedSession, SessionManager, VerifiedSession};

pub(crate) fn unix_secs(t: SystemTime) -> u64 {
    t.duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}

pub(crate) fn unix_millis(t: SystemTime) -> u64 {
    t.duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
