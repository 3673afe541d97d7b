//! Top-level CLI error taxonomy (§7), grounded on the teacher's layered
//! `CliError` wrapping every downstream crate's own error type so
//! [`crate::error::CliError::exit_code`] is the single place that maps a
//! failure onto the §6 exit-code taxonomy.

use model::ExitCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("migration run failed: {0}")]
    Migration(#[from] scheduler::MigrationError),

    #[error("comparison failed: {0}")]
    Comparator(#[from] comparator::ComparatorError),

    #[error("transform failed: {0}")]
    Transform(#[from] transform::TransformError),

    #[error("catalog error: {0}")]
    Catalog(#[from] catalog::CatalogError),

    #[error("connector error: {0}")]
    Connector(#[from] pgconn::ConnectorError),

    #[error("planner error: {0}")]
    Planner(#[from] planner::PlannerError),

    #[error("failed to write {path}: {source}")]
    WriteReport { path: String, source: std::io::Error },

    #[error("schema comparison found divergences")]
    SchemaMismatch,
}

impl CliError {
    pub fn exit_code(&self) -> ExitCode {
        match self {
            CliError::Config(_) => ExitCode::BadConfig,
            CliError::Migration(e) => e.exit_code(),
            CliError::SchemaMismatch => ExitCode::InternalError,
            CliError::Comparator(_) | CliError::Planner(_) => ExitCode::InternalError,
            CliError::Connector(_) => ExitCode::Source,
            CliError::Transform(_) => ExitCode::InternalError,
            CliError::Catalog(_) => ExitCode::InternalError,
            CliError::WriteReport { .. } => ExitCode::InternalError,
        }
    }
}

pub type Result<T> = std::result::Result<T, CliError>;
