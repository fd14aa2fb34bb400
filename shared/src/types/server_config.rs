use serde::Deserialize;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

// ---------------------------------------------------------------------------
// Config structs
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Deserialize, Clone)]
pub struct AuthConfig {
    /// HMAC key for the inner (identity) token.
    ///
    /// Prefer the `IDENTITY_TOKEN_SECRET` environment variable; this field is
    /// the fallback. Rotating any of the three secrets invalidates every
    /// outstanding session signed with it.
    pub identity_secret: Option<String>,

    /// HMAC key for the outer (container) token. Env: `CONTAINER_TOKEN_SECRET`.
    pub container_secret: Option<String>,

    /// Key for XSRF token derivation. Env: `XSRF_SECRET`.
    pub xsrf_secret: Option<String>,

    /// Fixed action identifier mixed into every XSRF token.
    #[serde(default = "default_xsrf_action_id")]
    pub xsrf_action_id: String,

    /// Principal written into the identity token at login.
    #[serde(default = "default_username")]
    pub username: String,

    #[serde(default = "default_session_expiration")]
    pub session_expiration_minutes: u64,

    /// Trailing window before expiry during which refresh is honoured.
    #[serde(default = "default_session_refresh_threshold")]
    pub session_refresh_threshold_minutes: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    pub auth: AuthConfig,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    /// Full bind address, e.g. `"127.0.0.1:8080"`
    pub fn addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

/// The three keys after environment overrides have been applied.
#[derive(Clone, PartialEq, Eq)]
pub struct ResolvedSecrets {
    pub identity: Option<String>,
    pub container: Option<String>,
    pub xsrf: Option<String>,
}

impl std::fmt::Debug for ResolvedSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedSecrets").finish_non_exhaustive()
    }
}

impl AuthConfig {
    /// Saturates rather than overflowing; validation bounds the real value.
    pub fn session_expiration_secs(&self) -> u64 {
        self.session_expiration_minutes.saturating_mul(60)
    }

    pub fn session_refresh_threshold_secs(&self) -> u64 {
        self.session_refresh_threshold_minutes.saturating_mul(60)
    }

    /// Resolve secrets against the process environment.
    pub fn resolve_secrets(&self) -> ResolvedSecrets {
        self.resolve_secrets_with(|key| std::env::var(key).ok())
    }

    /// Resolve secrets against an arbitrary variable lookup.
    pub fn resolve_secrets_with<F>(&self, env: F) -> ResolvedSecrets
    where
        F: Fn(&str) -> Option<String>,
    {
        ResolvedSecrets {
            identity: resolve_secret(env(IDENTITY_SECRET_ENV), &self.identity_secret),
            container: resolve_secret(env(CONTAINER_SECRET_ENV), &self.container_secret),
            xsrf: resolve_secret(env(XSRF_SECRET_ENV), &self.xsrf_secret),
        }
    }
}

pub const IDENTITY_SECRET_ENV: &str = "IDENTITY_TOKEN_SECRET";
pub const CONTAINER_SECRET_ENV: &str = "CONTAINER_TOKEN_SECRET";
pub const XSRF_SECRET_ENV: &str = "XSRF_SECRET";

/// Env var wins over the config field; empty values count as unset.
fn resolve_secret(from_env: Option<String>, field: &Option<String>) -> Option<String> {
    from_env
        .filter(|s| !s.is_empty())
        .or_else(|| field.clone())
        .filter(|s| !s.is_empty())
}

// Secrets are redacted so `debug!("Config: {:?}", config)` is safe.
impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |s: &Option<String>| s.as_ref().map(|_| "<redacted>");
        f.debug_struct("AuthConfig")
            .field("identity_secret", &redact(&self.identity_secret))
            .field("container_secret", &redact(&self.container_secret))
            .field("xsrf_secret", &redact(&self.xsrf_secret))
            .field("xsrf_action_id", &self.xsrf_action_id)
            .field("username", &self.username)
            .field("session_expiration_minutes", &self.session_expiration_minutes)
            .field(
                "session_refresh_threshold_minutes",
                &self.session_refresh_threshold_minutes,
            )
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Serde defaults
// ---------------------------------------------------------------------------

pub fn default_bind() -> String {
    "127.0.0.1".to_string()
}

pub fn default_port() -> u16 {
    8080
}

pub fn default_xsrf_action_id() -> String {
    "global".to_string()
}

pub fn default_username() -> String {
    "foo".to_string()
}

pub fn default_session_expiration() -> u64 {
    5
}

pub fn default_session_refresh_threshold() -> u64 {
    1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_defaults_apply_when_fields_missing() {
        let cfg: AuthConfig = toml::from_str("").unwrap();
        assert_eq!(cfg.xsrf_action_id, "global");
        assert_eq!(cfg.username, "foo");
        assert_eq!(cfg.session_expiration_minutes, 5);
        assert_eq!(cfg.session_refresh_threshold_minutes, 1);
        assert!(cfg.identity_secret.is_none());
    }

    #[test]
    fn minutes_convert_to_seconds() {
        let cfg: AuthConfig = toml::from_str(
            "session_expiration_minutes = 10\nsession_refresh_threshold_minutes = 2",
        )
        .unwrap();
        assert_eq!(cfg.session_expiration_secs(), 600);
        assert_eq!(cfg.session_refresh_threshold_secs(), 120);
    }

    #[test]
    fn server_addr_joins_bind_and_port() {
        let cfg = ServerConfig {
            bind: "0.0.0.0".into(),
            port: 9000,
        };
        assert_eq!(cfg.addr(), "0.0.0.0:9000");
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn empty_field_secret_is_unset() {
        assert_eq!(resolve_secret(None, &Some(String::new())), None);
        assert_eq!(resolve_secret(None, &Some("abc".into())), Some("abc".into()));
        assert_eq!(resolve_secret(Some(String::new()), &Some("abc".into())), Some("abc".into()));
    }

    #[test]
    fn env_overrides_config_field() {
        let cfg: AuthConfig = toml::from_str(
            r#"
identity_secret = "from-file-identity"
xsrf_secret = "from-file-xsrf"
"#,
        )
        .unwrap();

        let secrets = cfg.resolve_secrets_with(|key| {
            (key == XSRF_SECRET_ENV).then(|| "from-env-xsrf".to_string())
        });
        assert_eq!(secrets.identity.as_deref(), Some("from-file-identity"));
        assert_eq!(secrets.container, None);
        assert_eq!(secrets.xsrf.as_deref(), Some("from-env-xsrf"));

        let secrets = cfg.resolve_secrets_with(no_env);
        assert_eq!(secrets.xsrf.as_deref(), Some("from-file-xsrf"));
    }

    #[test]
    fn huge_durations_saturate_instead_of_overflowing() {
        let cfg: AuthConfig = toml::from_str(&format!(
            "session_expiration_minutes = {}\nsession_refresh_threshold_minutes = {}",
            i64::MAX,
            i64::MAX
        ))
        .unwrap();
        assert_eq!(cfg.session_expiration_secs(), u64::MAX);
        assert_eq!(cfg.session_refresh_threshold_secs(), u64::MAX);
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let cfg: AuthConfig = toml::from_str(r#"identity_secret = "super-secret-value""#).unwrap();
        let out = format!("{:?}", cfg);
        assert!(!out.contains("super-secret-value"));
        assert!(out.contains("<redacted>"));
    }
}
