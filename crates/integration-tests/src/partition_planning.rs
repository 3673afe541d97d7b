//! Stage B planning round-tripped through the Catalog Store: what
//! `planner::plan_partitions` computes must survive an
//! `upsert_table_partitions`/`list_table_partitions` trip unchanged, since
//! the scheduler reads partitions back from the store rather than keeping
//! the planner's in-memory `Vec` around.

use catalog::{CatalogStore, Role};
use model::{Attribute, ObjectId, SourceTable};
use planner::plan_partitions;

fn table(oid: u32, bytes: i64, rows: i64, part_key: Option<&str>) -> SourceTable {
    SourceTable {
        oid: ObjectId(oid),
        namespace: "public".to_string(),
        relname: "events".to_string(),
        restore_list_label: "TABLE public events".to_string(),
        estimated_bytes: bytes,
        estimated_rows: rows,
        part_key: part_key.map(str::to_string),
        attributes: vec![Attribute { name: "id".to_string(), ordinal: 0 }],
        indexes: Vec::new(),
        exclude_data: false,
    }
}

#[tokio::test]
async fn a_large_tables_plan_survives_a_round_trip_through_the_store() {
    let store = CatalogStore::open_in_memory(Role::Source).unwrap();
    let big = table(1, 10 * 1024 * 1024, 1_000_000, Some("id"));
    let small = table(2, 100, 10, Some("id"));

    let planned = plan_partitions(&[big.clone(), small.clone()], 1024 * 1024);
    assert!(planned.iter().filter(|p| p.table_oid == ObjectId(1)).count() > 1, "the big table should split into several parts");
    assert_eq!(planned.iter().filter(|p| p.table_oid == ObjectId(2)).count(), 1, "the small table stays single-part");

    store.upsert_table_partitions(planned.clone()).await.unwrap();

    let reloaded_big = store.list_table_partitions(ObjectId(1)).await.unwrap();
    let reloaded_small = store.list_table_partitions(ObjectId(2)).await.unwrap();

    assert_eq!(reloaded_big.len() + reloaded_small.len(), planned.len());
    for (before, after) in planned.iter().filter(|p| p.table_oid == ObjectId(1)).zip(reloaded_big.iter()) {
        assert_eq!(before, after);
    }
    assert_eq!(reloaded_small[0].predicate, "");

    // The last part's predicate carries no upper bound, matching the
    // "never drop rows beyond the estimate" rule.
    let last = reloaded_big.last().unwrap();
    assert!(!last.predicate.contains("AND"));
}

#[tokio::test]
async fn replanning_replaces_rather_than_appends() {
    let store = CatalogStore::open_in_memory(Role::Source).unwrap();
    let t = table(1, 10 * 1024 * 1024, 1_000_000, Some("id"));

    let first_pass = plan_partitions(&[t.clone()], 1024 * 1024);
    store.upsert_table_partitions(first_pass.clone()).await.unwrap();
    assert_eq!(store.list_table_partitions(ObjectId(1)).await.unwrap().len(), first_pass.len());

    // A rerun with a coarser threshold produces fewer parts; the store must
    // reflect the new plan exactly, not the union of both.
    let second_pass = plan_partitions(&[t], 8 * 1024 * 1024);
    store.upsert_table_partitions(second_pass.clone()).await.unwrap();
    let reloaded = store.list_table_partitions(ObjectId(1)).await.unwrap();
    assert_eq!(reloaded.len(), second_pass.len());
}
