//! Stage C (§4.3 "one large-objects worker"): streams every large object
//! from source to target. Skipped entirely when `skipLargeObjects` is set.

use crate::context::WorkerContext;
use crate::error::Result;
use model::TimingLabel;
use pgconn::PgConnection;

pub async fn run(ctx: WorkerContext, skip: bool) -> Result<()> {
    if skip {
        return Ok(());
    }

    let source = PgConnection::connect(&ctx.source_conninfo).await?;
    let target = PgConnection::connect(&ctx.target_conninfo).await?;
    if let Some(snapshot) = &ctx.snapshot_id {
        source.set_snapshot(snapshot).await.map_err(pgconn::DbError::from)?;
    }

    let now = chrono::Utc::now().timestamp_millis();
    ctx.store.timing_start(TimingLabel::LargeObjects, "source", now).await?;

    let (objects, bytes) = pgconn::large_objects::copy_large_objects(source.client(), target.client()).await?;

    ctx.store.timing_increment(TimingLabel::LargeObjects, objects as i64, bytes as i64, 0).await?;
    ctx.store.timing_stop(TimingLabel::LargeObjects, chrono::Utc::now().timestamp_millis()).await?;
    ctx.metrics.increment_bytes(bytes);

    source.close().await;
    target.close().await;
    Ok(())
}
