use hyper::StatusCode;
use thiserror::Error;

/// Every way a session operation can fail.
///
/// Each variant maps to exactly one HTTP outcome; the message is what the
/// client sees, so none of them carry token or key material.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Cookie absent, signature mismatch, or token expired.
    #[error("Authentication required")]
    Unauthorized,

    /// Structurally broken token or unreadable cookie header.
    #[error("Malformed session token")]
    Malformed,

    /// XSRF header missing or not bound to the presented session.
    #[error("{0}")]
    Forbidden(&'static str),

    /// Signing failed, or the expiry is out of range, while issuing a session.
    #[error("An internal error occurred")]
    Signing,

    /// Refresh attempted before the trailing refresh window opened.
    #[error("Session is not yet eligible for refresh")]
    TooEarly,
}

pub const MISSING_XSRF: &str = "Missing XSRF";
pub const INVALID_XSRF: &str = "Invalid XSRF";

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Malformed => StatusCode::BAD_REQUEST,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Signing => StatusCode::INTERNAL_SERVER_ERROR,
            Self::TooEarly => StatusCode::BAD_REQUEST,
        }
    }

    pub fn to_code(&self) -> &'static str {
        match self {
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Malformed => "MALFORMED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::Signing => "INTERNAL_ERROR",
            Self::TooEarly => "TOO_EARLY",
        }
    }
}
