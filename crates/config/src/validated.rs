use model::MigrationOptions;
use pgconn::ObjectFilter;
use std::path::PathBuf;

/// The fully resolved, validated configuration for one run, handed
/// straight to `scheduler::RunConfig`. Immutable once built, matching the
/// teacher's `ValidatedSettings` shape.
#[derive(Debug, Clone)]
pub struct ValidatedConfig {
    pub source_conninfo: String,
    pub target_conninfo: String,
    pub run_dir: PathBuf,
    pub options: MigrationOptions,
    pub filter: ObjectFilter,
}
