use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::{debug, error, info};

use shared::types::{AuthConfig, ConfigError, ContainerClaims, IdentityClaims, ResolvedSecrets};

use crate::auth::error::{AuthError, INVALID_XSRF, MISSING_XSRF};
use crate::auth::token::ClaimsCodec;
use crate::auth::unix_secs;
use crate::auth::xsrf::{XSRF_TIMEOUT, XsrfGuard};

/// The XSRF cookie lapses this long before the XSRF token itself would.
const XSRF_COOKIE_MARGIN: Duration = Duration::from_secs(60);

/// 9999-12-31T23:59:59Z, the last instant a cookie `Expires` date can carry.
const MAX_EXPIRY_SECS: u64 = 253_402_300_799;

/// Output of a successful login or refresh.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    /// Signed container token — the `token` cookie value.
    pub outer_token: String,
    pub xsrf_token: String,
    /// Shared expiry of both signed tokens.
    pub expires_at: SystemTime,
    pub xsrf_expires_at: SystemTime,
}

/// A session whose container and identity tokens both verified.
#[derive(Debug, Clone)]
pub struct VerifiedSession {
    pub claims: IdentityClaims,
    /// The exact identity token string the XSRF token is bound to.
    pub inner_token: String,
}

/// Issues, verifies and refreshes sessions.
///
/// Built once at startup and shared read-only by every request. All
/// operations take the request's single clock reading as `now`.
pub struct SessionManager {
    identity: ClaimsCodec,
    container: ClaimsCodec,
    xsrf: XsrfGuard,
    xsrf_action_id: String,
    username: String,
    expiration: Duration,
    refresh_threshold: Duration,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager").finish_non_exhaustive()
    }
}

impl SessionManager {
    /// Build from config, applying the secret env overrides of the running
    /// process.
    pub fn from_config(auth: &AuthConfig) -> Result<Self, ConfigError> {
        Self::from_secrets(auth, &auth.resolve_secrets())
    }

    pub fn from_secrets(auth: &AuthConfig, secrets: &ResolvedSecrets) -> Result<Self, ConfigError> {
        let missing = |name: &str| ConfigError::InvalidConfig(format!("{} is not set", name));

        let identity_secret = secrets
            .identity
            .as_deref()
            .ok_or_else(|| missing("identity_secret"))?;
        let container_secret = secrets
            .container
            .as_deref()
            .ok_or_else(|| missing("container_secret"))?;
        let xsrf_secret = secrets
            .xsrf
            .as_deref()
            .ok_or_else(|| missing("xsrf_secret"))?;

        let xsrf = XsrfGuard::new(xsrf_secret.as_bytes())
            .map_err(|e| ConfigError::InvalidConfig(format!("xsrf_secret: {}", e)))?;

        Ok(Self {
            identity: ClaimsCodec::new(identity_secret.as_bytes()),
            container: ClaimsCodec::new(container_secret.as_bytes()),
            xsrf,
            xsrf_action_id: auth.xsrf_action_id.clone(),
            username: auth.username.clone(),
            expiration: Duration::from_secs(auth.session_expiration_secs()),
            refresh_threshold: Duration::from_secs(auth.session_refresh_threshold_secs()),
        })
    }

    /// Sign a fresh identity/container pair and derive its XSRF token.
    ///
    /// Fails with `Signing` when the expiry would overflow or fall past the
    /// latest date a cookie can express.
    pub fn issue(&self, now: SystemTime) -> Result<IssuedSession, AuthError> {
        let exp = unix_secs(now)
            .checked_add(self.expiration.as_secs())
            .filter(|exp| *exp <= MAX_EXPIRY_SECS)
            .ok_or_else(|| {
                error!("Session expiry out of range for {}s lifetime", self.expiration.as_secs());
                AuthError::Signing
            })?;

        let inner_token = self.identity.sign(&IdentityClaims {
            username: self.username.clone(),
            exp,
        })?;

        let outer_token = self.container.sign(&ContainerClaims {
            contained_token: inner_token.clone(),
            exp,
        })?;

        let xsrf_token = self.xsrf.generate(&inner_token, &self.xsrf_action_id, now);

        info!("Issued session for {} expiring at {}", self.username, exp);

        Ok(IssuedSession {
            outer_token,
            xsrf_token,
            expires_at: UNIX_EPOCH + Duration::from_secs(exp),
            xsrf_expires_at: now + XSRF_TIMEOUT - XSRF_COOKIE_MARGIN,
        })
    }

    /// Unwrap the container, then the identity token it carries.
    ///
    /// The contained string is only parsed after the container signature
    /// has been accepted.
    pub fn verify(&self, outer_token: &str, now: SystemTime) -> Result<VerifiedSession, AuthError> {
        let now_secs = unix_secs(now);

        let container: ContainerClaims = self.container.parse(outer_token, now_secs)?;
        let claims: IdentityClaims = self.identity.parse(&container.contained_token, now_secs)?;

        debug!("Session verified for {}", claims.username);

        Ok(VerifiedSession {
            claims,
            inner_token: container.contained_token,
        })
    }

    pub fn check_xsrf(
        &self,
        session: &VerifiedSession,
        xsrf_header: Option<&str>,
        now: SystemTime,
    ) -> Result<(), AuthError> {
        let token = xsrf_header
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::Forbidden(MISSING_XSRF))?;

        if !self
            .xsrf
            .validate(token, &session.inner_token, &self.xsrf_action_id, now)
        {
            return Err(AuthError::Forbidden(INVALID_XSRF));
        }

        Ok(())
    }

    /// Full check for protected requests: verify, then XSRF.
    pub fn authenticate(
        &self,
        outer_token: &str,
        xsrf_header: Option<&str>,
        now: SystemTime,
    ) -> Result<VerifiedSession, AuthError> {
        let session = self.verify(outer_token, now)?;
        self.check_xsrf(&session, xsrf_header, now)?;
        Ok(session)
    }

    /// Re-issue only inside the trailing threshold window before expiry.
    ///
    /// No XSRF check: the refresh endpoint hands out a new XSRF token.
    pub fn refresh(&self, outer_token: &str, now: SystemTime) -> Result<IssuedSession, AuthError> {
        let session = self.verify(outer_token, now)?;

        let remaining = session.claims.exp.saturating_sub(unix_secs(now));
        if remaining > self.refresh_threshold.as_secs() {
            debug!(
                "Refresh refused: {}s remaining, threshold {}s",
                remaining,
                self.refresh_threshold.as_secs()
            );
            return Err(AuthError::TooEarly);
        }

        self.issue(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_auth_config() -> AuthConfig {
        AuthConfig {
            identity_secret: Some("identity-secret-identity-secret-01".into()),
            container_secret: Some("container-secret-container-secret".into()),
            xsrf_secret: Some("xsrf-secret-xsrf-secret-xsrf-secret".into()),
            xsrf_action_id: "global".into(),
            username: "foo".into(),
            session_expiration_minutes: 5,
            session_refresh_threshold_minutes: 1,
        }
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn manager_for(cfg: &AuthConfig) -> SessionManager {
        SessionManager::from_secrets(cfg, &cfg.resolve_secrets_with(no_env)).unwrap()
    }

    fn manager() -> SessionManager {
        manager_for(&test_auth_config())
    }

    fn t0() -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(1_700_000_000)
    }

    fn mins(m: u64) -> Duration {
        Duration::from_secs(m * 60)
    }

    #[test]
    fn issue_then_verify_returns_username() {
        let m = manager();
        let issued = m.issue(t0()).unwrap();
        let session = m.verify(&issued.outer_token, t0()).unwrap();
        assert_eq!(session.claims.username, "foo");
        assert_eq!(session.claims.exp, 1_700_000_000 + 300);
    }

    #[test]
    fn issue_sets_expiry_times() {
        let issued = manager().issue(t0()).unwrap();
        assert_eq!(issued.expires_at, t0() + mins(5));
        assert_eq!(issued.xsrf_expires_at, t0() + XSRF_TIMEOUT - mins(1));
    }

    #[test]
    fn authenticate_accepts_issued_xsrf() {
        let m = manager();
        let issued = m.issue(t0()).unwrap();
        let session = m
            .authenticate(&issued.outer_token, Some(&issued.xsrf_token), t0() + mins(2))
            .unwrap();
        assert_eq!(session.claims.username, "foo");
    }

    #[test]
    fn missing_xsrf_is_forbidden() {
        let m = manager();
        let issued = m.issue(t0()).unwrap();
        assert_eq!(
            m.authenticate(&issued.outer_token, None, t0()).unwrap_err(),
            AuthError::Forbidden(MISSING_XSRF)
        );
        assert_eq!(
            m.authenticate(&issued.outer_token, Some(""), t0()).unwrap_err(),
            AuthError::Forbidden(MISSING_XSRF)
        );
    }

    #[test]
    fn xsrf_from_another_session_is_invalid() {
        let m = manager();
        let first = m.issue(t0()).unwrap();
        let second = m.issue(t0() + Duration::from_secs(10)).unwrap();
        assert_eq!(
            m.authenticate(&second.outer_token, Some(&first.xsrf_token), t0() + Duration::from_secs(10))
                .unwrap_err(),
            AuthError::Forbidden(INVALID_XSRF)
        );
    }

    #[test]
    fn expired_session_is_unauthorized() {
        let m = manager();
        let issued = m.issue(t0()).unwrap();
        assert!(m.verify(&issued.outer_token, t0() + mins(5)).is_ok());
        assert_eq!(
            m.verify(&issued.outer_token, t0() + mins(5) + Duration::from_secs(1))
                .unwrap_err(),
            AuthError::Unauthorized
        );
    }

    #[test]
    fn outer_and_inner_keys_are_not_interchangeable() {
        let m = manager();
        let issued = m.issue(t0()).unwrap();
        let inner = m.verify(&issued.outer_token, t0()).unwrap().inner_token;
        // Presenting the identity token where the container belongs.
        assert_eq!(m.verify(&inner, t0()).unwrap_err(), AuthError::Unauthorized);
    }

    #[test]
    fn container_wrapping_foreign_inner_is_unauthorized() {
        let m = manager();
        let foreign = ClaimsCodec::new(b"some-other-identity-secret-value!")
            .sign(&IdentityClaims {
                username: "mallory".into(),
                exp: 1_700_000_300,
            })
            .unwrap();
        let outer = m
            .container
            .sign(&ContainerClaims {
                contained_token: foreign,
                exp: 1_700_000_300,
            })
            .unwrap();
        assert_eq!(m.verify(&outer, t0()).unwrap_err(), AuthError::Unauthorized);
    }

    #[test]
    fn refresh_too_early_is_rejected() {
        let m = manager();
        let issued = m.issue(t0()).unwrap();
        assert_eq!(
            m.refresh(&issued.outer_token, t0() + mins(3)).unwrap_err(),
            AuthError::TooEarly
        );
    }

    #[test]
    fn refresh_inside_threshold_issues_new_token() {
        let m = manager();
        let issued = m.issue(t0()).unwrap();
        let now = t0() + mins(4);
        let refreshed = m.refresh(&issued.outer_token, now).unwrap();
        assert_ne!(refreshed.outer_token, issued.outer_token);
        assert_eq!(refreshed.expires_at, now + mins(5));

        let session = m
            .authenticate(&refreshed.outer_token, Some(&refreshed.xsrf_token), now)
            .unwrap();
        assert_eq!(session.claims.username, "foo");
    }

    #[test]
    fn refresh_of_expired_session_is_unauthorized() {
        let m = manager();
        let issued = m.issue(t0()).unwrap();
        assert_eq!(
            m.refresh(&issued.outer_token, t0() + mins(6)).unwrap_err(),
            AuthError::Unauthorized
        );
    }

    #[test]
    fn refresh_of_malformed_token_is_malformed() {
        assert_eq!(
            manager().refresh("garbage", t0()).unwrap_err(),
            AuthError::Malformed
        );
    }

    #[test]
    fn missing_secret_fails_construction() {
        let mut cfg = test_auth_config();
        cfg.xsrf_secret = None;
        let err = SessionManager::from_secrets(&cfg, &cfg.resolve_secrets_with(no_env)).unwrap_err();
        assert!(err.to_string().contains("xsrf_secret"));
    }

    #[test]
    fn env_secret_is_used_for_construction() {
        let mut cfg = test_auth_config();
        cfg.xsrf_secret = None;
        let secrets = cfg.resolve_secrets_with(|key| {
            (key == "XSRF_SECRET").then(|| "xsrf-from-env-xsrf-from-env-0123".to_string())
        });
        let m = SessionManager::from_secrets(&cfg, &secrets).unwrap();
        let issued = m.issue(t0()).unwrap();
        assert!(m.authenticate(&issued.outer_token, Some(&issued.xsrf_token), t0()).is_ok());
    }

    #[test]
    fn expiry_past_year_9999_fails_without_panicking() {
        let mut cfg = test_auth_config();
        cfg.session_expiration_minutes = 6_000_000_000;
        assert_eq!(manager_for(&cfg).issue(t0()).unwrap_err(), AuthError::Signing);
    }

    #[test]
    fn overflowing_expiry_fails_without_panicking() {
        let mut cfg = test_auth_config();
        cfg.session_expiration_minutes = u64::MAX;
        assert_eq!(manager_for(&cfg).issue(t0()).unwrap_err(), AuthError::Signing);
    }

    #[test]
    fn one_year_expiry_is_issued() {
        let mut cfg = test_auth_config();
        cfg.session_expiration_minutes = 365 * 24 * 60;
        let issued = manager_for(&cfg).issue(t0()).unwrap();
        assert_eq!(issued.expires_at, t0() + mins(365 * 24 * 60));
    }
}
