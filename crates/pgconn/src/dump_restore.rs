//! `pg_dump`/`pg_restore` invocation (§4.3): thin wrappers that shell out to
//! the vendor tools and capture their output into the logging layer. This
//! wraps, but does not reimplement, the vendor tool (§1 Non-goals).

use crate::error::DbError;
use model::RestoreOptions;
use tokio::process::Command;
use tracing::{debug, warn};

async fn run(mut cmd: Command, name: &'static str) -> Result<(), DbError> {
    debug!(?cmd, "spawning external process");
    let output = cmd
        .output()
        .await
        .map_err(|e| DbError::ProcessSpawn(name.to_string(), e))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        return Err(DbError::ProcessFailed(
            name.to_string(),
            output.status.code().unwrap_or(-1),
            stderr,
        ));
    }
    if !output.stderr.is_empty() {
        warn!(stderr = %String::from_utf8_lossy(&output.stderr), "{name} wrote to stderr");
    }
    Ok(())
}

/// Dumps the source schema into `out_dir` in directory format.
pub async fn dump_schema(conninfo: &str, out_dir: &std::path::Path) -> Result<(), DbError> {
    let mut cmd = Command::new("pg_dump");
    cmd.args([
        "--schema-only",
        "--format=directory",
        "--file",
    ])
    .arg(out_dir)
    .arg(conninfo);
    run(cmd, "pg_dump").await
}

/// Restores the pre-data section (tables, no indexes/constraints yet) onto
/// the target.
pub async fn restore_pre_data(
    conninfo: &str,
    dump_dir: &std::path::Path,
    restore_options: &RestoreOptions,
) -> Result<(), DbError> {
    let mut cmd = Command::new("pg_restore");
    cmd.arg("--section=pre-data")
        .arg(format!("--jobs={}", restore_options.jobs))
        .arg("--dbname")
        .arg(conninfo);
    if restore_options.drop_if_exists {
        cmd.arg("--clean").arg("--if-exists");
    }
    cmd.arg(dump_dir);
    run(cmd, "pg_restore").await
}

/// Restores the post-data section (indexes/constraints not already built by
/// the scheduler), filtering out objects the catalog already finished
/// (§4.3 Stage E) by restore-list label.
pub async fn restore_post_data(
    conninfo: &str,
    dump_dir: &std::path::Path,
    skip_labels: &[String],
    restore_options: &RestoreOptions,
) -> Result<(), DbError> {
    let mut cmd = Command::new("pg_restore");
    cmd.arg("--section=post-data")
        .arg(format!("--jobs={}", restore_options.jobs))
        .arg("--dbname")
        .arg(conninfo);
    for label in skip_labels {
        cmd.arg("--exclude-object").arg(label);
    }
    cmd.arg(dump_dir);
    run(cmd, "pg_restore").await
}
