//! `COPY` streaming (§4.3 copy worker step 3): `COPY (SELECT ...) TO STDOUT`
//! on the source piped directly into `COPY ... FROM STDIN` on the target,
//! without buffering a whole table in memory.

use crate::error::DbError;
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt, pin_mut};
use model::SourceTable;
use tokio_postgres::Client;

/// Builds the source-side `COPY (SELECT ...) TO STDOUT` statement. `predicate`
/// is the empty string for a single-part table (§3 `TablePartition`).
pub fn copy_out_statement(table: &SourceTable, predicate: &str) -> String {
    let qname = table.qualified_name();
    if predicate.is_empty() {
        format!("COPY (SELECT * FROM {qname}) TO STDOUT")
    } else {
        format!("COPY (SELECT * FROM {qname} WHERE {predicate}) TO STDOUT")
    }
}

pub fn copy_in_statement(table: &SourceTable) -> String {
    format!("COPY {} FROM STDIN", table.qualified_name())
}

/// Streams one partition's rows from `source` into `target`, returning the
/// number of bytes transferred.
pub async fn copy_partition(
    source: &Client,
    target: &Client,
    table: &SourceTable,
    predicate: &str,
) -> Result<u64, DbError> {
    let out_sql = copy_out_statement(table, predicate);
    let in_sql = copy_in_statement(table);

    let out_stream = source.copy_out(&out_sql).await?;
    pin_mut!(out_stream);

    let sink = target.copy_in(&in_sql).await?;
    pin_mut!(sink);

    let mut total_bytes: u64 = 0;
    while let Some(chunk) = out_stream.next().await {
        let chunk: Bytes = chunk?;
        total_bytes += chunk.len() as u64;
        sink.send(chunk).await?;
    }
    sink.close().await?;

    Ok(total_bytes)
}

pub async fn truncate_table(target: &Client, table: &SourceTable) -> Result<(), DbError> {
    target
        .batch_execute(&format!("TRUNCATE TABLE {}", table.qualified_name()))
        .await?;
    Ok(())
}
