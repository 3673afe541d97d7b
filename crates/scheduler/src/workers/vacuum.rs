//! Stage C vacuum worker loop (§4.3): a table is enqueued as soon as its
//! copy parts finish, but `VACUUM ANALYZE` only runs once the table's
//! indexes-done election has been won by someone — i.e. once the index
//! phase has handed off to the constraint phase (§3 invariants 2 and 3:
//! index start <= constraint start <= vacuum start). The enqueue happens
//! early; the gate below is what actually enforces the ordering.

use crate::context::WorkerContext;
use crate::error::{MigrationError, Result};
use crate::queues::{recv_shared, SharedReceiver};
use catalog::Claim;
use concurrency::queue::ReceivedMessage;
use concurrency::PidLiveness;
use model::{ObjectId, TimingLabel};
use pgconn::PgConnection;
use std::time::{Duration, Instant};

fn now_epoch() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

pub fn spawn_pool(
    vacuum_jobs: usize,
    ctx: WorkerContext,
    rx: SharedReceiver<ObjectId>,
) -> Vec<tokio::task::JoinHandle<Result<()>>> {
    (0..vacuum_jobs.max(1))
        .map(|_| {
            let ctx = ctx.clone();
            let rx = rx.clone();
            tokio::spawn(async move { worker_loop(ctx, rx).await })
        })
        .collect()
}

async fn worker_loop(ctx: WorkerContext, rx: SharedReceiver<ObjectId>) -> Result<()> {
    let target = PgConnection::connect(&ctx.target_conninfo).await?;

    loop {
        match recv_shared(&rx, &ctx.cancel).await {
            ReceivedMessage::Item(table_oid) => vacuum_one(&ctx, target.client(), table_oid).await?,
            ReceivedMessage::Stop | ReceivedMessage::Closed | ReceivedMessage::Cancelled => break,
        }
    }

    target.close().await;
    Ok(())
}

async fn vacuum_one(ctx: &WorkerContext, target: &tokio_postgres::Client, table_oid: ObjectId) -> Result<()> {
    let pid = PidLiveness::current_pid();
    let now = now_epoch();

    if let Claim::HeldByOther = ctx.store.claim_vacuum(table_oid, pid, now).await? {
        return Ok(());
    }

    while !ctx.store.table_indexes_done(table_oid).await? {
        if ctx.cancel.is_stop_fast_requested() {
            return Ok(());
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }

    let table = ctx.store.lookup_table(table_oid).await?;
    let start = Instant::now();
    let sql = format!("VACUUM ANALYZE {}", table.qualified_name());
    ctx.retry
        .run(|| target.batch_execute(&sql), crate::retry::classify_pg_error)
        .await
        .map_err(|e| {
            ctx.metrics.increment_failures(1);
            MigrationError::from(pgconn::DbError::from(e.into_inner()))
        })?;

    let duration_ms = start.elapsed().as_millis() as i64;
    ctx.store.finalize_vacuum(table_oid, now_epoch(), duration_ms).await?;
    ctx.store.timing_increment(TimingLabel::Vacuum, 1, 0, duration_ms).await?;
    Ok(())
}
