//! Property 7 ("schema comparison is symmetric under no-op") and scenario
//! S6 ("divergent index definitions"): two Catalog Stores populated
//! directly (standing in for two independently fetched schemas) are run
//! through `comparator::compare_schemas`.

use catalog::{CatalogStore, Role};
use comparator::schema::{SchemaMismatch, compare_schemas};
use model::{Attribute, Index, ObjectId, SourceTable};

fn widgets(oid: u32) -> SourceTable {
    SourceTable {
        oid: ObjectId(oid),
        namespace: "public".to_string(),
        relname: "widgets".to_string(),
        restore_list_label: "TABLE public widgets".to_string(),
        estimated_bytes: 4096,
        estimated_rows: 10,
        part_key: None,
        attributes: vec![Attribute { name: "id".to_string(), ordinal: 0 }, Attribute { name: "name".to_string(), ordinal: 1 }],
        indexes: Vec::new(),
        exclude_data: false,
    }
}

fn pk_index(table_oid: u32, definition: &str) -> Index {
    Index {
        oid: ObjectId(900 + table_oid),
        namespace: "public".to_string(),
        name: "widgets_pkey".to_string(),
        table_oid: ObjectId(table_oid),
        definition: definition.to_string(),
        is_primary: true,
        is_unique: true,
        constraint_oid: Some(ObjectId(800 + table_oid)),
        constraint_name: Some("widgets_pkey".to_string()),
        constraint_definition: Some("PRIMARY KEY (id)".to_string()),
    }
}

#[tokio::test]
async fn identical_schemas_report_no_mismatches() {
    let source = CatalogStore::open_in_memory(Role::Source).unwrap();
    let target = CatalogStore::open_in_memory(Role::Source).unwrap();

    source.upsert_tables(vec![widgets(1)], false).await.unwrap();
    target.upsert_tables(vec![widgets(2)], false).await.unwrap();
    source.upsert_indexes(vec![pk_index(1, "CREATE UNIQUE INDEX widgets_pkey ON widgets (id)")], false).await.unwrap();
    target.upsert_indexes(vec![pk_index(2, "CREATE UNIQUE INDEX widgets_pkey ON widgets (id)")], false).await.unwrap();

    let report = compare_schemas(&source, &target).await.unwrap();
    assert!(!report.has_mismatches());

    // Running it again against the same two stores (a no-op rerun) must
    // produce the identical empty report.
    let rerun = compare_schemas(&source, &target).await.unwrap();
    assert_eq!(report.mismatches, rerun.mismatches);
}

#[tokio::test]
async fn a_non_unique_target_index_is_reported_as_divergent() {
    let source = CatalogStore::open_in_memory(Role::Source).unwrap();
    let target = CatalogStore::open_in_memory(Role::Source).unwrap();

    source.upsert_tables(vec![widgets(1)], false).await.unwrap();
    target.upsert_tables(vec![widgets(2)], false).await.unwrap();

    let mut drifted = pk_index(2, "CREATE INDEX widgets_pkey ON widgets (id)");
    drifted.is_unique = false;
    source.upsert_indexes(vec![pk_index(1, "CREATE UNIQUE INDEX widgets_pkey ON widgets (id)")], false).await.unwrap();
    target.upsert_indexes(vec![drifted], false).await.unwrap();

    let report = compare_schemas(&source, &target).await.unwrap();
    assert!(report.has_mismatches());
    assert!(matches!(&report.mismatches[0], SchemaMismatch::IndexDivergence { qualified_name, .. } if qualified_name.contains("widgets")));
}

#[tokio::test]
async fn a_table_missing_on_the_target_is_the_first_reported_mismatch() {
    let source = CatalogStore::open_in_memory(Role::Source).unwrap();
    let target = CatalogStore::open_in_memory(Role::Source).unwrap();

    source.upsert_tables(vec![widgets(1)], false).await.unwrap();
    target.upsert_tables(vec![], false).await.unwrap();

    let report = compare_schemas(&source, &target).await.unwrap();
    assert_eq!(report.mismatches.len(), 1);
    assert!(matches!(&report.mismatches[0], SchemaMismatch::MissingTable { qualified_name } if qualified_name.contains("widgets")));
}
