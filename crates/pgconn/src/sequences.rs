//! Sequence reset (§4.3 Stage D): runs concurrently with Stage C's copy
//! workers because `COPY` never draws a sequence's next value.

use crate::error::DbError;
use model::Sequence;
use tokio_postgres::Client;

/// Sets `seq`'s current value on `target` to match what was observed on the
/// source, preserving `is_called` so a subsequent `nextval()` on the target
/// continues exactly where the source left off.
pub async fn reset_sequence(target: &Client, seq: &Sequence) -> Result<(), DbError> {
    target
        .execute(
            "SELECT setval($1, $2, $3)",
            &[&seq.qualified_name(), &seq.last_value, &seq.is_called],
        )
        .await?;
    Ok(())
}

/// Resets every sequence in `sequences` against `target`, returning the
/// count successfully reset. Used by the single sequences worker (§4.3
/// Stage C).
pub async fn reset_sequences(target: &Client, sequences: &[Sequence]) -> Result<usize, DbError> {
    let mut done = 0;
    for seq in sequences {
        reset_sequence(target, seq).await?;
        done += 1;
    }
    Ok(done)
}
