//! Storage for the comparator's data-comparison results (§4.5 supplemental):
//! mirrors the `summary`-shaped rows so a subsequent rerun can report only
//! the tables that still mismatch.

use crate::error::Result;
use crate::store::CatalogStore;
use rusqlite::params;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonResult {
    pub qualified_name: String,
    pub matched: bool,
    pub source_checksum: Option<String>,
    pub target_checksum: Option<String>,
    pub source_rows: Option<i64>,
    pub target_rows: Option<i64>,
    pub checked_epoch: i64,
}

impl CatalogStore {
    /// Drops every cached checksum; called at the start of each comparator
    /// run (§4.5 "The driver invalidates cached checksums at the start of
    /// each run").
    pub async fn invalidate_comparison_cache(&self) -> Result<()> {
        self.write(|conn| {
            conn.execute("DELETE FROM comparison_result", [])?;
            Ok(())
        })
        .await
    }

    pub async fn record_comparison(&self, result: ComparisonResult) -> Result<()> {
        self.write(move |conn| {
            conn.execute(
                "INSERT INTO comparison_result (qualified_name, matched, source_checksum, target_checksum, source_rows, target_rows, checked_epoch)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(qualified_name) DO UPDATE SET
                    matched = excluded.matched,
                    source_checksum = excluded.source_checksum,
                    target_checksum = excluded.target_checksum,
                    source_rows = excluded.source_rows,
                    target_rows = excluded.target_rows,
                    checked_epoch = excluded.checked_epoch",
                params![
                    result.qualified_name,
                    result.matched as i64,
                    result.source_checksum,
                    result.target_checksum,
                    result.source_rows,
                    result.target_rows,
                    result.checked_epoch,
                ],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn list_mismatches(&self) -> Result<Vec<ComparisonResult>> {
        self.read(|conn| {
            let mut stmt = conn.prepare(
                "SELECT qualified_name, matched, source_checksum, target_checksum, source_rows, target_rows, checked_epoch
                 FROM comparison_result WHERE matched = 0",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok(ComparisonResult {
                    qualified_name: row.get(0)?,
                    matched: row.get::<_, i64>(1)? != 0,
                    source_checksum: row.get(2)?,
                    target_checksum: row.get(3)?,
                    source_rows: row.get(4)?,
                    target_rows: row.get(5)?,
                    checked_epoch: row.get(6)?,
                })
            })?;
            rows.collect()
        })
        .await
    }
}
