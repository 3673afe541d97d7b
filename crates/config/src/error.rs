use thiserror::Error;

/// Configuration-layer failures (§7 "Usage"/"BadConfig": bad flags or
/// config/file errors; abort before spawning workers, no side effects).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io { path: String, source: std::io::Error },

    #[error("failed to parse config file {path} as TOML: {source}")]
    Toml { path: String, source: toml::de::Error },

    #[error("invalid configuration: {0:?}")]
    Validation(Vec<String>),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
