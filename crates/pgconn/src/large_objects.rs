//! Large-object copy (§4.3 Stage C "one large-objects worker"): streams
//! every `pg_largeobject` blob from source to target via the large-object
//! API, skipped entirely when `skipLargeObjects` is set (§6).

use crate::error::DbError;
use tokio_postgres::Client;
use tokio_postgres::types::Oid;

const LO_CHUNK_SIZE: i32 = 1 << 20;

/// Copies every large object present on `source` into `target`, creating
/// target-side objects with matching oids when possible. Returns the number
/// of objects copied and the total bytes streamed.
pub async fn copy_large_objects(source: &Client, target: &Client) -> Result<(u64, u64), DbError> {
    let oids: Vec<Oid> = source
        .query("SELECT oid FROM pg_catalog.pg_largeobject_metadata ORDER BY oid", &[])
        .await?
        .iter()
        .map(|row| row.get::<_, Oid>(0))
        .collect();

    let mut objects_copied = 0u64;
    let mut bytes_copied = 0u64;

    for oid in oids {
        let bytes = copy_one_large_object(source, target, oid).await?;
        bytes_copied += bytes;
        objects_copied += 1;
    }

    Ok((objects_copied, bytes_copied))
}

async fn copy_one_large_object(source: &Client, target: &Client, oid: Oid) -> Result<u64, DbError> {
    source.batch_execute("BEGIN").await?;
    target.batch_execute("BEGIN").await?;

    let result = copy_one_large_object_inner(source, target, oid).await;

    source.batch_execute("COMMIT").await?;
    target.batch_execute("COMMIT").await?;
    result
}

async fn copy_one_large_object_inner(source: &Client, target: &Client, oid: Oid) -> Result<u64, DbError> {
    target
        .execute(
            "SELECT lo_create($1)",
            &[&(oid as i32)],
        )
        .await?;

    let source_fd: i32 = source
        .query_one("SELECT lo_open($1, x'40000'::int)", &[&(oid as i32)])
        .await?
        .get(0);
    let target_fd: i32 = target
        .query_one("SELECT lo_open($1, x'20000'::int)", &[&(oid as i32)])
        .await?
        .get(0);

    let mut total = 0u64;
    loop {
        let chunk: Vec<u8> = source
            .query_one("SELECT loread($1, $2)", &[&source_fd, &LO_CHUNK_SIZE])
            .await?
            .get(0);
        if chunk.is_empty() {
            break;
        }
        total += chunk.len() as u64;
        target.execute("SELECT lowrite($1, $2)", &[&target_fd, &chunk]).await?;
        if (chunk.len() as i32) < LO_CHUNK_SIZE {
            break;
        }
    }

    source.execute("SELECT lo_close($1)", &[&source_fd]).await?;
    target.execute("SELECT lo_close($1)", &[&target_fd]).await?;

    Ok(total)
}
