//! Human/machine-readable output helpers, grounded on the teacher's
//! `cli::output::{write_report, print_report}` pair: the same JSON payload
//! either goes to a file or to stdout, never both re-serialized twice.

use crate::error::{CliError, Result};
use serde::Serialize;
use std::path::Path;

fn to_json_pretty<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).expect("report types are always serializable")
}

pub async fn write_report<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    let json = to_json_pretty(value);
    tokio::fs::write(path, json).await.map_err(|source| CliError::WriteReport {
        path: path.display().to_string(),
        source,
    })
}

pub fn print_report<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", to_json_pretty(value));
    Ok(())
}
