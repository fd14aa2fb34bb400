use std::fs;
use std::path::Path;
use tracing::{debug, error, info};

use crate::types::server_config::{
    AppConfig, AuthConfig, CONTAINER_SECRET_ENV, ConfigError, IDENTITY_SECRET_ENV,
    ResolvedSecrets, XSRF_SECRET_ENV,
};

/// Minimum length for every signing / derivation secret.
pub const MIN_SECRET_LEN: usize = 32;

/// Upper bound for session lifetime and refresh window: one year.
pub const MAX_SESSION_MINUTES: u64 = 365 * 24 * 60;

pub fn load_config(path: impl AsRef<Path>) -> Result<AppConfig, ConfigError> {
    load_config_with(path, |key| std::env::var(key).ok())
}

/// `load_config` with an explicit environment lookup for the secret
/// overrides.
pub fn load_config_with<F>(path: impl AsRef<Path>, env: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let path = path.as_ref();
    info!("Loading configuration from: {}", path.display());

    let contents = fs::read_to_string(path)?;
    debug!("Processing file: {}", path.display());

    if contents.trim().is_empty() {
        error!("Configuration file is empty");
        return Err(ConfigError::InvalidConfig("empty file".into()));
    }

    let config: AppConfig = toml::from_str(&contents)?;

    info!("Configuration loaded successfully");
    debug!("Config: {:?}", config);

    validate_config_with(&config, env)?;

    info!("Config validated");

    Ok(config)
}

pub fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    validate_config_with(config, |key| std::env::var(key).ok())
}

pub fn validate_config_with<F>(config: &AppConfig, env: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if config.server.port == 0 {
        return Err(ConfigError::InvalidConfig("port must be greater than 0".into()));
    }

    validate_auth(&config.auth, &config.auth.resolve_secrets_with(env))
}

fn validate_auth(auth: &AuthConfig, secrets: &ResolvedSecrets) -> Result<(), ConfigError> {
    if auth.session_expiration_minutes == 0 {
        return Err(ConfigError::InvalidConfig(
            "session_expiration_minutes must be greater than 0".into(),
        ));
    }

    if auth.session_expiration_minutes > MAX_SESSION_MINUTES {
        return Err(ConfigError::InvalidConfig(format!(
            "session_expiration_minutes must be at most {}",
            MAX_SESSION_MINUTES
        )));
    }

    if auth.session_refresh_threshold_minutes >= auth.session_expiration_minutes {
        return Err(ConfigError::InvalidConfig(
            "session_refresh_threshold_minutes must be less than session_expiration_minutes"
                .into(),
        ));
    }

    if auth.xsrf_action_id.is_empty() {
        return Err(ConfigError::InvalidConfig(
            "xsrf_action_id cannot be empty".into(),
        ));
    }

    if auth.username.is_empty() {
        return Err(ConfigError::InvalidConfig("username cannot be empty".into()));
    }

    let identity = require_secret("identity_secret", IDENTITY_SECRET_ENV, &secrets.identity)?;
    let container = require_secret("container_secret", CONTAINER_SECRET_ENV, &secrets.container)?;
    let xsrf = require_secret("xsrf_secret", XSRF_SECRET_ENV, &secrets.xsrf)?;

    // Keys must be pairwise distinct.
    if identity == container || identity == xsrf || container == xsrf {
        return Err(ConfigError::InvalidConfig(
            "identity, container and xsrf secrets must all be distinct".into(),
        ));
    }

    Ok(())
}

fn require_secret<'a>(
    field: &str,
    env_key: &str,
    value: &'a Option<String>,
) -> Result<&'a str, ConfigError> {
    match value {
        None => Err(ConfigError::InvalidConfig(format!(
            "{} must be set via the {} env var or auth.{} config field",
            field, env_key, field
        ))),
        Some(secret) if secret.len() < MIN_SECRET_LEN => Err(ConfigError::InvalidConfig(format!(
            "{} must be at least {} characters long",
            field, MIN_SECRET_LEN
        ))),
        Some(secret) => Ok(secret.as_str()),
    }
}
