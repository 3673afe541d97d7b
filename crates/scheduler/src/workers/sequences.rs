//! Stage D (§4.3): a single worker resets every sequence's value on the
//! target. Runs concurrently with Stage C since `COPY` never advances a
//! sequence.

use crate::context::WorkerContext;
use crate::error::Result;
use model::{Sequence, TimingLabel};
use pgconn::PgConnection;

pub async fn run(ctx: WorkerContext, sequences: Vec<Sequence>) -> Result<()> {
    if sequences.is_empty() {
        return Ok(());
    }

    let target = PgConnection::connect(&ctx.target_conninfo).await?;
    ctx.store.timing_start(TimingLabel::SetSequences, "target", chrono_now()).await?;

    let reset = pgconn::sequences::reset_sequences(target.client(), &sequences).await?;

    ctx.store.timing_increment(TimingLabel::SetSequences, reset as i64, 0, 0).await?;
    ctx.store.timing_stop(TimingLabel::SetSequences, chrono_now()).await?;
    target.close().await;
    Ok(())
}

fn chrono_now() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
