use thiserror::Error;

/// Connection-scoped failures (§7 "Connect"): unreachable host, auth
/// failure, or a dropped connection driver task.
#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("failed to connect to postgres: {0}")]
    Connect(#[from] tokio_postgres::Error),

    #[error("connection driver task failed: {0}")]
    DriverTask(String),

    #[error("tls setup failed: {0}")]
    Tls(String),
}

/// Failures from an already-established connection doing real work (§7
/// "Worker-local" and "SchemaFetch" categories).
#[derive(Debug, Error)]
pub enum DbError {
    #[error("postgres error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("external process {0} exited with status {1}: {2}")]
    ProcessFailed(String, i32, String),

    #[error("external process {0} could not be spawned: {1}")]
    ProcessSpawn(String, std::io::Error),

    #[error("unexpected data shape: {0}")]
    Unexpected(String),
}
