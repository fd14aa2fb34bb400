pub mod json_error;
pub mod jwt;
pub mod server_config;

pub use self::json_error::ErrorResponse;
pub use self::jwt::{ContainerClaims, ExpiringClaims, IdentityClaims};
pub use self::server_config::{
    AppConfig, AuthConfig, CONTAINER_SECRET_ENV, ConfigError, IDENTITY_SECRET_ENV, ResolvedSecrets,
    ServerConfig, XSRF_SECRET_ENV,
};
