//! Stage C copy worker loop (§4.3): claim a part, truncate once per table on
//! the first part, stream rows, and on the last part promote the table to
//! "indexes eligible".

use crate::context::WorkerContext;
use crate::error::{MigrationError, Result};
use crate::queues::{recv_shared, IndexWork, SharedReceiver};
use catalog::Claim;
use concurrency::{NamedQueue, NamedSemaphore, PidLiveness};
use concurrency::queue::ReceivedMessage;
use model::{ObjectId, PartId, SourceTable, TimingLabel};
use pgconn::PgConnection;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

fn now_epoch() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Spawns `table_jobs` copy workers sharing one queue, returning their
/// join handles so the supervisor can `try_join!` the pool.
#[allow(clippy::too_many_arguments)]
pub fn spawn_pool(
    table_jobs: usize,
    ctx: WorkerContext,
    rx: SharedReceiver<PartId>,
    tables: Arc<HashMap<u32, SourceTable>>,
    index_tx: NamedQueue<IndexWork>,
    vacuum_tx: NamedQueue<ObjectId>,
    table_copy_sem: NamedSemaphore,
) -> Vec<tokio::task::JoinHandle<Result<()>>> {
    (0..table_jobs.max(1))
        .map(|id| {
            let ctx = ctx.clone();
            let rx = rx.clone();
            let tables = tables.clone();
            let index_tx = index_tx.clone();
            let vacuum_tx = vacuum_tx.clone();
            let table_copy_sem = table_copy_sem.clone();
            tokio::spawn(async move { worker_loop(id, ctx, rx, tables, index_tx, vacuum_tx, table_copy_sem).await })
        })
        .collect()
}

#[allow(clippy::too_many_arguments)]
async fn worker_loop(
    worker_id: usize,
    ctx: WorkerContext,
    rx: SharedReceiver<PartId>,
    tables: Arc<HashMap<u32, SourceTable>>,
    index_tx: NamedQueue<IndexWork>,
    vacuum_tx: NamedQueue<ObjectId>,
    table_copy_sem: NamedSemaphore,
) -> Result<()> {
    let source = PgConnection::connect(&ctx.source_conninfo).await?;
    let target = PgConnection::connect(&ctx.target_conninfo).await?;
    if let Some(snapshot) = &ctx.snapshot_id {
        source.set_snapshot(snapshot).await.map_err(pgconn::DbError::from)?;
    }

    loop {
        match recv_shared(&rx, &ctx.cancel).await {
            ReceivedMessage::Item(part) => {
                let Some(table) = tables.get(&part.table_oid.0) else {
                    warn!(worker = worker_id, table_oid = part.table_oid.0, "copy worker saw an unknown table oid");
                    continue;
                };
                copy_one_part(&ctx, source.client(), target.client(), part, table, &index_tx, &vacuum_tx, &table_copy_sem)
                    .await?;
            }
            ReceivedMessage::Stop | ReceivedMessage::Closed | ReceivedMessage::Cancelled => break,
        }
    }

    source.close().await;
    target.close().await;
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn copy_one_part(
    ctx: &WorkerContext,
    source: &tokio_postgres::Client,
    target: &tokio_postgres::Client,
    part: PartId,
    table: &SourceTable,
    index_tx: &NamedQueue<IndexWork>,
    vacuum_tx: &NamedQueue<ObjectId>,
    table_copy_sem: &NamedSemaphore,
) -> Result<()> {
    let pid = PidLiveness::current_pid();
    let start = now_epoch();

    match ctx.store.claim_part(part.table_oid, part.part_num, pid, start).await? {
        Claim::HeldByOther => return Ok(()),
        Claim::Acquired => {}
    }

    let plan = ctx.store.list_table_partitions(part.table_oid).await?;
    let this_part = plan.iter().find(|p| p.part_num == part.part_num).cloned().unwrap_or(model::TablePartition {
        table_oid: part.table_oid,
        part_num: 0,
        part_count: 1,
        predicate: String::new(),
    });

    if this_part.part_count > 1 && part.part_num == 0 {
        let _permit = table_copy_sem.acquire().await;
        if !ctx.store.is_truncate_done(part.table_oid).await? {
            let claim_truncate = ctx.store.claim_truncate(part.table_oid, pid, start).await?;
            if claim_truncate {
                pgconn::copy::truncate_table(target, table).await?;
                ctx.store.finalize_truncate(part.table_oid, now_epoch()).await?;
            }
        }
    } else if this_part.part_count > 1 {
        while !ctx.store.is_truncate_done(part.table_oid).await? {
            if ctx.cancel.is_stop_fast_requested() {
                return Ok(());
            }
            tokio::time::sleep(std::time::Duration::from_millis(25)).await;
        }
    }

    let op_start = Instant::now();
    let bytes = ctx
        .retry
        .run(
            || pgconn::copy_partition(source, target, table, &this_part.predicate),
            crate::retry::classify_db_error,
        )
        .await
        .map_err(|e| {
            ctx.metrics.increment_failures(1);
            MigrationError::from(e.into_inner())
        })?;

    ctx.metrics.increment_bytes(bytes);
    ctx.metrics.increment_batches(1);
    let duration_ms = op_start.elapsed().as_millis() as i64;
    let done = now_epoch();
    ctx.store.finalize_part(part.table_oid, part.part_num, done, duration_ms, bytes as i64, "COPY").await?;
    ctx.store.timing_increment(TimingLabel::CopyData, 1, bytes as i64, duration_ms).await?;

    let parts_done = ctx.store.count_parts_done(part.table_oid).await?;
    if parts_done as u32 >= this_part.part_count && ctx.store.claim_table_parts_done(part.table_oid, pid).await? {
        info!(table = %table.qualified_name(), "all parts copied, enqueuing indexes and vacuum");
        for index_oid in &table.indexes {
            index_tx.send(IndexWork::Index(*index_oid)).await.map_err(|_| {
                MigrationError::QueueClosed("index queue".to_string())
            })?;
        }
        if table.indexes.is_empty() {
            // No index worker will ever run for this table, so nothing would
            // otherwise win the indexes-done election (§3 invariant 3) and
            // the vacuum worker's gate would spin forever. Claim it here.
            ctx.store.claim_table_indexes_done(part.table_oid, pid).await?;
        }
        vacuum_tx
            .send(part.table_oid)
            .await
            .map_err(|_| MigrationError::QueueClosed("vacuum queue".to_string()))?;
    }

    Ok(())
}
