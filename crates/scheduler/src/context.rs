//! Shared, cheaply-cloneable state handed to every Stage C/D worker task.

use crate::metrics::Metrics;
use crate::retry::RetryPolicy;
use catalog::CatalogStore;
use concurrency::CancelFlags;
use model::MigrationOptions;
use pgconn::ObjectFilter;
use std::path::PathBuf;

/// Everything one scheduler run needs that isn't discovered mid-flight.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub run_dir: PathBuf,
    pub source_conninfo: String,
    pub target_conninfo: String,
    pub options: MigrationOptions,
    pub filter: ObjectFilter,
}

/// Per-worker handle onto the catalog, connection strings and shared
/// primitives. Each worker opens its own Postgres connections on top of
/// this (§9 "a private database connection"); the Catalog Store connection
/// pool is the one thing workers actually share (§4.1).
#[derive(Clone)]
pub struct WorkerContext {
    pub store: CatalogStore,
    pub source_conninfo: String,
    pub target_conninfo: String,
    pub snapshot_id: Option<String>,
    pub cancel: CancelFlags,
    pub metrics: Metrics,
    pub retry: RetryPolicy,
    pub resume: bool,
}
