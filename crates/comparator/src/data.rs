//! Data comparison (§4.5/§4.7): a pool of `tableJobs` workers drains a
//! table queue; for each table the same row-count + content-checksum
//! query runs concurrently against source and target, each inside its own
//! read-only transaction, and the two results are compared once both
//! complete. Results are written to the Catalog Store's
//! `comparison_result` table; a mismatch is logged but never aborts the
//! pool. The driver invalidates cached checksums at the start of each run.

use crate::error::Result;
use catalog::{CatalogStore, ComparisonResult};
use concurrency::{CancelFlags, NamedQueue, ReceivedMessage};
use model::SourceTable;
use std::sync::Arc;
use tokio_postgres::Client;
use tracing::warn;

/// Order-independent checksum: summing a truncated hash of every row's
/// text representation is insensitive to physical storage order, which
/// `COPY`-restored tables are not guaranteed to preserve. A representative
/// query, not a literal reproduction of any particular vendor tool's own
/// comparison SQL (§1 Non-goals).
fn checksum_query(qualified_name: &str) -> String {
    format!(
        "SELECT count(*)::bigint AS row_count, \
         coalesce(sum(('x' || substr(md5(t::text), 1, 16))::bit(64)::bigint), 0) AS checksum \
         FROM {qualified_name} t"
    )
}

async fn fetch_row_count_and_checksum(client: &Client, qualified_name: &str) -> Result<(i64, String)> {
    client.batch_execute("BEGIN TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY;").await.map_err(pgconn::DbError::from)?;
    let row = client.query_one(&checksum_query(qualified_name), &[]).await.map_err(pgconn::DbError::from)?;
    let row_count: i64 = row.get("row_count");
    let checksum: i64 = row.get("checksum");
    client.batch_execute("COMMIT;").await.map_err(pgconn::DbError::from)?;
    Ok((row_count, checksum.to_string()))
}

fn now_epoch() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

async fn compare_one_table(source: &Client, target: &Client, table: &SourceTable, store: &CatalogStore) -> Result<ComparisonResult> {
    let qualified_name = table.qualified_name();
    let ((source_rows, source_checksum), (target_rows, target_checksum)) = tokio::try_join!(
        fetch_row_count_and_checksum(source, &qualified_name),
        fetch_row_count_and_checksum(target, &qualified_name),
    )?;

    let matched = source_rows == target_rows && source_checksum == target_checksum;
    let result = ComparisonResult {
        qualified_name: qualified_name.clone(),
        matched,
        source_checksum: Some(source_checksum),
        target_checksum: Some(target_checksum),
        source_rows: Some(source_rows),
        target_rows: Some(target_rows),
        checked_epoch: now_epoch(),
    };

    if !matched {
        warn!(%qualified_name, source_rows, target_rows, "data comparison mismatch");
    }

    store.record_comparison(result.clone()).await?;
    Ok(result)
}

/// Runs the data-comparison pool to completion: invalidates any cached
/// results, enqueues every table, spawns `table_jobs` workers, and waits
/// for all of them to drain the queue.
pub async fn compare_data(
    source: Arc<Client>,
    target: Arc<Client>,
    tables: Vec<SourceTable>,
    store: CatalogStore,
    table_jobs: usize,
    cancel: CancelFlags,
) -> Result<Vec<ComparisonResult>> {
    store.invalidate_comparison_cache().await?;

    let (queue, rx) = NamedQueue::<SourceTable>::create("compare-data", tables.len().max(1));
    for table in tables {
        queue.send(table).await.map_err(|_| crate::error::ComparatorError::QueueClosed)?;
    }
    let worker_count = table_jobs.max(1);
    for _ in 0..worker_count {
        let _ = queue.send_stop().await;
    }

    let rx = Arc::new(tokio::sync::Mutex::new(rx));
    let mut handles = Vec::with_capacity(worker_count);
    for _ in 0..worker_count {
        let rx = rx.clone();
        let source = source.clone();
        let target = target.clone();
        let store = store.clone();
        let cancel = cancel.clone();
        handles.push(tokio::spawn(async move {
            let mut results = Vec::new();
            loop {
                let next = { rx.lock().await.receive(&cancel).await };
                match next {
                    ReceivedMessage::Item(table) => {
                        results.push(compare_one_table(&source, &target, &table, &store).await?);
                    }
                    ReceivedMessage::Stop | ReceivedMessage::Closed | ReceivedMessage::Cancelled => break,
                }
            }
            Ok::<Vec<ComparisonResult>, crate::error::ComparatorError>(results)
        }));
    }

    let mut all_results = Vec::new();
    for handle in handles {
        all_results.extend(handle.await??);
    }
    Ok(all_results)
}
