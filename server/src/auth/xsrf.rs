use std::time::{Duration, SystemTime};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::digest::InvalidLength;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::debug;

use crate::auth::unix_millis;

type HmacSha256 = Hmac<Sha256>;

/// Fixed validity window of an XSRF token, independent of the session.
pub const XSRF_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

/// How far in the future an issue time may lie before it is rejected.
const MAX_CLOCK_SKEW_MS: u64 = 60 * 1000;

/// Generates and validates XSRF tokens of the form
/// `base64url(HMAC-SHA256(key, "user:action:issued_ms")):issued_ms`.
#[derive(Clone)]
pub struct XsrfGuard {
    mac: HmacSha256,
}

impl XsrfGuard {
    pub fn new(key: &[u8]) -> Result<Self, InvalidLength> {
        Ok(Self {
            mac: HmacSha256::new_from_slice(key)?,
        })
    }

    pub fn generate(&self, user: &str, action: &str, now: SystemTime) -> String {
        let issued_ms = unix_millis(now);
        let tag = self.keyed(user, action, issued_ms).finalize().into_bytes();
        format!("{}:{}", URL_SAFE_NO_PAD.encode(tag), issued_ms)
    }

    pub fn validate(&self, token: &str, user: &str, action: &str, now: SystemTime) -> bool {
        let Some((encoded_tag, issued)) = token.rsplit_once(':') else {
            debug!("XSRF token has no issue time");
            return false;
        };
        let Ok(issued_ms) = issued.parse::<u64>() else {
            debug!("XSRF token issue time is not a number");
            return false;
        };

        let now_ms = unix_millis(now);
        if now_ms.saturating_sub(issued_ms) >= XSRF_TIMEOUT.as_millis() as u64 {
            debug!("XSRF token expired");
            return false;
        }
        if issued_ms > now_ms.saturating_add(MAX_CLOCK_SKEW_MS) {
            debug!("XSRF token issued in the future");
            return false;
        }

        let Ok(tag) = URL_SAFE_NO_PAD.decode(encoded_tag) else {
            debug!("XSRF token tag is not base64url");
            return false;
        };

        // verify_slice compares in constant time.
        self.keyed(user, action, issued_ms).verify_slice(&tag).is_ok()
    }

    fn keyed(&self, user: &str, action: &str, issued_ms: u64) -> HmacSha256 {
        let mut mac = self.mac.clone();
        mac.update(format!("{}:{}:{}", escape(user), escape(action), issued_ms).as_bytes());
        mac
    }
}

/// Double every `:` so that ("a:b", "c") and ("a", "b:c") sign differently.
fn escape(field: &str) -> String {
    field.replace(':', "::")
}
