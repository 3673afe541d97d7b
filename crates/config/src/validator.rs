//! Validates a merged [`RawConfig`] into a [`ValidatedConfig`] (§6), the
//! same validate-then-build shape as the teacher's
//! `SettingsValidator`/`ValidatedSettings` pair: collect every problem
//! before failing, rather than bailing on the first one.

use crate::error::{ConfigError, Result};
use crate::file::RawConfig;
use crate::validated::ValidatedConfig;
use model::{MigrationOptions, RestoreOptions};
use pgconn::ObjectFilter;
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::info;

pub struct ConfigValidator {
    raw: RawConfig,
}

impl ConfigValidator {
    pub fn new(raw: RawConfig) -> Self {
        Self { raw }
    }

    pub fn validate(self) -> Result<ValidatedConfig> {
        let mut errors = Vec::new();
        let raw = &self.raw;

        let source_conninfo = raw.source_conninfo.clone().unwrap_or_else(|| {
            errors.push("source_conninfo is required".to_string());
            String::new()
        });
        let target_conninfo = raw.target_conninfo.clone().unwrap_or_else(|| {
            errors.push("target_conninfo is required".to_string());
            String::new()
        });
        let run_dir = raw.run_dir.clone().unwrap_or_else(|| "./pgcopydb".to_string());

        let defaults = MigrationOptions::default();
        let table_jobs = raw.table_jobs.unwrap_or(defaults.table_jobs);
        let index_jobs = raw.index_jobs.unwrap_or(defaults.index_jobs);
        let vacuum_jobs = raw.vacuum_jobs.unwrap_or(defaults.vacuum_jobs);
        let l_object_jobs = raw.l_object_jobs.unwrap_or(defaults.l_object_jobs);
        let restore_jobs = raw.restore_jobs.unwrap_or(defaults.restore_jobs);

        for (name, value) in [
            ("table_jobs", table_jobs),
            ("index_jobs", index_jobs),
            ("vacuum_jobs", vacuum_jobs),
            ("l_object_jobs", l_object_jobs),
            ("restore_jobs", restore_jobs),
        ] {
            if value == 0 {
                errors.push(format!("{name} must be at least 1"));
            }
        }

        let consistent = raw.consistent.unwrap_or(false);
        let not_consistent = raw.not_consistent.unwrap_or(false);
        if consistent && not_consistent {
            errors.push("consistent and not_consistent are mutually exclusive".to_string());
        }

        let resume = raw.resume.unwrap_or(false);
        let restart = raw.restart.unwrap_or(false);
        if resume && restart {
            errors.push("resume and restart are mutually exclusive".to_string());
        }

        let split_tables_larger_than = raw.split_tables_larger_than.unwrap_or(defaults.split_tables_larger_than);
        if split_tables_larger_than < 0 {
            errors.push("split_tables_larger_than must not be negative".to_string());
        }

        if !errors.is_empty() {
            return Err(ConfigError::Validation(errors));
        }

        let options = MigrationOptions {
            table_jobs,
            index_jobs,
            vacuum_jobs,
            l_object_jobs,
            restore_jobs,
            split_tables_larger_than,
            split_tables_larger_than_pretty: pretty_bytes(split_tables_larger_than),
            consistent,
            not_consistent,
            resume,
            restart,
            fail_fast: raw.fail_fast.unwrap_or(defaults.fail_fast),
            skip_large_objects: raw.skip_large_objects.unwrap_or(defaults.skip_large_objects),
            restore_options: RestoreOptions {
                drop_if_exists: raw.restore_drop_if_exists.unwrap_or_default(),
                jobs: restore_jobs,
            },
        };

        let filter = ObjectFilter {
            include: raw.include.iter().cloned().collect::<HashSet<_>>(),
            exclude: raw.exclude.iter().cloned().collect::<HashSet<_>>(),
        };

        let validated = ValidatedConfig {
            source_conninfo,
            target_conninfo,
            run_dir: PathBuf::from(run_dir),
            options,
            filter,
        };
        log_validated(&validated);
        Ok(validated)
    }
}

fn pretty_bytes(bytes: i64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    if bytes <= 0 {
        return "0 B".to_string();
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}

fn log_validated(config: &ValidatedConfig) {
    info!(
        table_jobs = config.options.table_jobs,
        index_jobs = config.options.index_jobs,
        vacuum_jobs = config.options.vacuum_jobs,
        split_tables_larger_than = %config.options.split_tables_larger_than_pretty,
        resume = config.options.resume,
        fail_fast = config.options.fail_fast,
        "validated migration configuration"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_with_conninfos() -> RawConfig {
        RawConfig {
            source_conninfo: Some("postgres://localhost/src".to_string()),
            target_conninfo: Some("postgres://localhost/dst".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn missing_conninfos_are_reported_together() {
        let err = ConfigValidator::new(RawConfig::default()).validate().unwrap_err();
        let ConfigError::Validation(messages) = err else { panic!("expected Validation") };
        assert!(messages.iter().any(|m| m.contains("source_conninfo")));
        assert!(messages.iter().any(|m| m.contains("target_conninfo")));
    }

    #[test]
    fn zero_job_counts_are_rejected() {
        let raw = RawConfig {
            table_jobs: Some(0),
            ..raw_with_conninfos()
        };
        let err = ConfigValidator::new(raw).validate().unwrap_err();
        let ConfigError::Validation(messages) = err else { panic!("expected Validation") };
        assert!(messages.iter().any(|m| m.contains("table_jobs")));
    }

    #[test]
    fn consistent_and_not_consistent_conflict() {
        let raw = RawConfig {
            consistent: Some(true),
            not_consistent: Some(true),
            ..raw_with_conninfos()
        };
        let err = ConfigValidator::new(raw).validate().unwrap_err();
        let ConfigError::Validation(messages) = err else { panic!("expected Validation") };
        assert!(messages.iter().any(|m| m.contains("mutually exclusive")));
    }

    #[test]
    fn defaults_fill_in_unset_fields() {
        let validated = ConfigValidator::new(raw_with_conninfos()).validate().unwrap();
        assert_eq!(validated.options.table_jobs, 4);
        assert_eq!(validated.options.index_jobs, 2);
        assert_eq!(validated.run_dir, PathBuf::from("./pgcopydb"));
    }

    #[test]
    fn split_threshold_is_rendered_human_readable() {
        let raw = RawConfig {
            split_tables_larger_than: Some(1024 * 1024 * 1024),
            ..raw_with_conninfos()
        };
        let validated = ConfigValidator::new(raw).validate().unwrap();
        assert_eq!(validated.options.split_tables_larger_than_pretty, "1.0 GiB");
    }
}
