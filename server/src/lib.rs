pub mod auth;
pub mod handlers;

use std::sync::Arc;

use shared::types::{AppConfig, ConfigError, ResolvedSecrets};

use crate::auth::SessionManager;

/// Per-process state handed to every request.
///
/// Everything behind the `Arc`s is immutable after startup, so cloning per
/// connection and per request needs no locking.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub sessions: Arc<SessionManager>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Result<Self, ConfigError> {
        let secrets = config.auth.resolve_secrets();
        Self::with_secrets(config, &secrets)
    }

    /// Build with already-resolved secrets instead of reading the environment.
    pub fn with_secrets(config: AppConfig, secrets: &ResolvedSecrets) -> Result<Self, ConfigError> {
        let sessions = SessionManager::from_secrets(&config.auth, secrets)?;
        Ok(Self {
            config: Arc::new(config),
            sessions: Arc::new(sessions),
        })
    }
}
