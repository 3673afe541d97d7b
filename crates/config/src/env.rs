//! Environment-variable overrides (§6), grounded on the teacher's
//! `cli::env::EnvManager` approach of loading the system environment into a
//! lookup map before merging it into the rest of config resolution.
//! Recognized variables are named `PGCOPYDB_*`.

use crate::file::RawConfig;
use std::collections::HashMap;

/// Snapshot of the process environment, filtered to `PGCOPYDB_*` keys.
#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    vars: HashMap<String, String>,
}

impl EnvOverrides {
    pub fn from_process_env() -> Self {
        let vars = std::env::vars().filter(|(k, _)| k.starts_with("PGCOPYDB_")).collect();
        Self { vars }
    }

    #[cfg(test)]
    fn from_map(vars: HashMap<String, String>) -> Self {
        Self { vars }
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(|v| v.parse().ok())
    }

    fn get_usize(&self, key: &str) -> Option<usize> {
        self.get(key).and_then(|v| v.parse().ok())
    }

    fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(|v| v.parse().ok())
    }

    /// Applies every recognized `PGCOPYDB_*` variable on top of `raw`,
    /// environment taking precedence over the file (the common layering
    /// order: defaults < file < environment < explicit CLI flags).
    pub fn apply(&self, mut raw: RawConfig) -> RawConfig {
        if let Some(v) = self.get("PGCOPYDB_SOURCE_PGURI") {
            raw.source_conninfo = Some(v.to_string());
        }
        if let Some(v) = self.get("PGCOPYDB_TARGET_PGURI") {
            raw.target_conninfo = Some(v.to_string());
        }
        if let Some(v) = self.get("PGCOPYDB_RUN_DIR") {
            raw.run_dir = Some(v.to_string());
        }
        if let Some(v) = self.get_usize("PGCOPYDB_TABLE_JOBS") {
            raw.table_jobs = Some(v);
        }
        if let Some(v) = self.get_usize("PGCOPYDB_INDEX_JOBS") {
            raw.index_jobs = Some(v);
        }
        if let Some(v) = self.get_usize("PGCOPYDB_VACUUM_JOBS") {
            raw.vacuum_jobs = Some(v);
        }
        if let Some(v) = self.get_usize("PGCOPYDB_LARGE_OBJECTS_JOBS") {
            raw.l_object_jobs = Some(v);
        }
        if let Some(v) = self.get_usize("PGCOPYDB_RESTORE_JOBS") {
            raw.restore_jobs = Some(v);
        }
        if let Some(v) = self.get_i64("PGCOPYDB_SPLIT_TABLES_LARGER_THAN") {
            raw.split_tables_larger_than = Some(v);
        }
        if let Some(v) = self.get_bool("PGCOPYDB_CONSISTENT") {
            raw.consistent = Some(v);
        }
        if let Some(v) = self.get_bool("PGCOPYDB_RESUME") {
            raw.resume = Some(v);
        }
        if let Some(v) = self.get_bool("PGCOPYDB_RESTART") {
            raw.restart = Some(v);
        }
        if let Some(v) = self.get_bool("PGCOPYDB_FAIL_FAST") {
            raw.fail_fast = Some(v);
        }
        if let Some(v) = self.get_bool("PGCOPYDB_SKIP_LARGE_OBJECTS") {
            raw.skip_large_objects = Some(v);
        }
        raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_overrides_win_over_the_file() {
        let raw = RawConfig {
            table_jobs: Some(4),
            ..Default::default()
        };
        let env = EnvOverrides::from_map(HashMap::from([("PGCOPYDB_TABLE_JOBS".to_string(), "16".to_string())]));
        let merged = env.apply(raw);
        assert_eq!(merged.table_jobs, Some(16));
    }

    #[test]
    fn unset_variables_leave_the_file_value_untouched() {
        let raw = RawConfig {
            index_jobs: Some(2),
            ..Default::default()
        };
        let env = EnvOverrides::from_map(HashMap::new());
        let merged = env.apply(raw);
        assert_eq!(merged.index_jobs, Some(2));
    }
}
