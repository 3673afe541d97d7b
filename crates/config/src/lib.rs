//! Configuration loading, merging, and validation (§6, ambient stack):
//! a TOML file merged with `PGCOPYDB_*` environment overrides, validated
//! into a [`ValidatedConfig`] ready to hand to `scheduler::RunConfig`.
//! Grounded on the teacher's `cli::env::EnvManager` and
//! `engine-config::settings::validator::SettingsValidator` /
//! `ValidatedSettings` pair.

pub mod env;
pub mod error;
pub mod file;
pub mod validated;
pub mod validator;

pub use env::EnvOverrides;
pub use error::{ConfigError, Result};
pub use file::RawConfig;
pub use validated::ValidatedConfig;
pub use validator::ConfigValidator;

use std::path::Path;

/// Loads `path` (if it exists), merges `PGCOPYDB_*` environment overrides
/// on top, and validates the result. A missing config file is treated as
/// "no file overrides" rather than an error, since the CLI's own flags can
/// supply everything.
pub fn load_and_validate(path: Option<&Path>) -> Result<ValidatedConfig> {
    let raw = match path {
        Some(path) if path.exists() => file::load_file(path)?,
        _ => RawConfig::default(),
    };
    let merged = EnvOverrides::from_process_env().apply(raw);
    ConfigValidator::new(merged).validate()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_path_and_missing_conninfo_env_fails_validation() {
        let err = load_and_validate(None).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }
}
