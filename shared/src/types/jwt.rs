use serde::{Deserialize, Serialize};

/// Claims that carry an absolute expiry.
///
/// The token codec checks `expires_at()` against the request clock after the
/// signature has verified, so every claim kind it parses implements this.
pub trait ExpiringClaims {
    /// Expiry as a Unix timestamp in seconds.
    fn expires_at(&self) -> u64;
}

/// Inner (identity) token claims.
///
/// Signed with the identity secret. The signed string is never handed to the
/// client directly: it travels inside [`ContainerClaims`] and is the value the
/// XSRF token is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityClaims {
    /// The authenticated principal.
    pub username: String,

    /// Standard JWT expiry (Unix timestamp, seconds).
    pub exp: u64,
}

/// Outer (container) token claims — the value of the `token` cookie.
///
/// `contained_token` is the signed identity token, kept as an opaque string
/// until the container signature has been verified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerClaims {
    #[serde(rename = "jwt")]
    pub contained_token: String,

    /// Same expiry as the contained identity token.
    pub exp: u64,
}

impl ExpiringClaims for IdentityClaims {
    fn expires_at(&self) -> u64 {
        self.exp
    }
}

impl ExpiringClaims for ContainerClaims {
    fn expires_at(&self) -> u64 {
        self.exp
    }
}
