pub mod config;

pub use self::config::{
    MAX_SESSION_MINUTES, MIN_SECRET_LEN, load_config, load_config_with, validate_config,
    validate_config_with,
};
