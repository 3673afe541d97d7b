//! Configuration knobs (§6) shared between the `config` crate (which loads
//! and validates them) and every crate that reads them.

use serde::{Deserialize, Serialize};

/// Parallelism and behavioral knobs for one migration run.
///
/// Defaults mirror pgcopydb's own documented defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationOptions {
    pub table_jobs: usize,
    pub index_jobs: usize,
    pub vacuum_jobs: usize,
    pub l_object_jobs: usize,
    pub restore_jobs: usize,
    /// Bytes. Tables above this threshold are partitioned (0 = never split).
    pub split_tables_larger_than: i64,
    pub split_tables_larger_than_pretty: String,
    /// Reuse one exported source snapshot for all workers.
    pub consistent: bool,
    /// Each worker opens its own private short-lived transaction.
    pub not_consistent: bool,
    /// Treat existing done-files/summary rows as authoritative; add
    /// `IF NOT EXISTS` to DDL.
    pub resume: bool,
    /// Wipe the run directory before starting.
    pub restart: bool,
    /// Abort the whole run on first worker failure.
    pub fail_fast: bool,
    pub skip_large_objects: bool,
    pub restore_options: RestoreOptions,
}

impl Default for MigrationOptions {
    fn default() -> Self {
        Self {
            table_jobs: 4,
            index_jobs: 2,
            vacuum_jobs: 1,
            l_object_jobs: 2,
            restore_jobs: 1,
            split_tables_larger_than: 0,
            split_tables_larger_than_pretty: "0 B".to_string(),
            consistent: false,
            not_consistent: false,
            resume: false,
            restart: false,
            fail_fast: false,
            skip_large_objects: false,
            restore_options: RestoreOptions::default(),
        }
    }
}

impl MigrationOptions {
    pub fn splits_tables(&self) -> bool {
        self.split_tables_larger_than > 0
    }
}

/// Options forwarded to the Stage E post-data restore.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoreOptions {
    pub drop_if_exists: bool,
    pub jobs: usize,
}

impl Default for RestoreOptions {
    fn default() -> Self {
        Self {
            drop_if_exists: false,
            jobs: 1,
        }
    }
}
