//! Stage A — schema fetch (§4.3): enumerate tables/indexes/sequences from
//! the source, honoring inclusion/exclusion filters, and persist the
//! inventory (plus the filtered-objects complement) to the source Catalog
//! Store.

use crate::error::Result;
use catalog::CatalogStore;
use model::{FilteredItem, Index, ObjectId, Sequence, SourceTable};
use pgconn::ObjectFilter;
use std::collections::HashSet;
use tokio_postgres::Client;
use tracing::info;

/// What Stage A produced, for the scheduler to act on immediately (e.g.
/// deciding which tables are partitionable) without a re-read of the
/// catalog it just wrote.
#[derive(Debug, Clone)]
pub struct SchemaFetchOutcome {
    pub tables: Vec<SourceTable>,
    pub indexes: Vec<Index>,
    pub sequences: Vec<Sequence>,
    pub filtered: Vec<FilteredItem>,
}

/// Runs Stage A against an already-open source connection, filters the
/// enumerated objects, attaches each table's indexes, and writes everything
/// to `store` in one shot (§3 "Source inventory is created once after
/// schema fetch and never mutated thereafter").
pub async fn fetch_schema(
    source: &Client,
    store: &CatalogStore,
    filter: &ObjectFilter,
    reset: bool,
) -> Result<SchemaFetchOutcome> {
    info!("fetching source schema");

    let (mut tables, mut table_filtered) = pgconn::fetch_tables(source, filter).await?;
    let included_oids: HashSet<u32> = tables.iter().map(|t| t.oid.0).collect();

    let indexes = pgconn::fetch_indexes(source, &included_oids).await?;
    attach_indexes(&mut tables, &indexes);

    let (sequences, seq_filtered) = pgconn::fetch_sequences(source, filter).await?;

    let mut filtered = Vec::new();
    filtered.append(&mut table_filtered);
    filtered.extend(seq_filtered);

    store.upsert_tables(tables.clone(), reset).await?;
    store.upsert_indexes(indexes.clone(), reset).await?;
    store.upsert_sequences(sequences.clone(), reset).await?;
    store.upsert_filtered_items(filtered.clone()).await?;

    info!(
        tables = tables.len(),
        indexes = indexes.len(),
        sequences = sequences.len(),
        filtered = filtered.len(),
        "schema fetch complete"
    );

    Ok(SchemaFetchOutcome {
        tables,
        indexes,
        sequences,
        filtered,
    })
}

fn attach_indexes(tables: &mut [SourceTable], indexes: &[Index]) {
    for table in tables.iter_mut() {
        table.indexes = indexes
            .iter()
            .filter(|i| i.table_oid == table.oid)
            .map(|i| i.oid)
            .collect::<Vec<ObjectId>>();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::Attribute;

    fn table(oid: u32) -> SourceTable {
        SourceTable {
            oid: ObjectId(oid),
            namespace: "public".into(),
            relname: format!("t{oid}"),
            restore_list_label: format!("TABLE public t{oid}"),
            estimated_bytes: 0,
            estimated_rows: 0,
            part_key: None,
            attributes: vec![Attribute { name: "id".into(), ordinal: 1 }],
            indexes: Vec::new(),
            exclude_data: false,
        }
    }

    fn index(oid: u32, table_oid: u32) -> Index {
        Index {
            oid: ObjectId(oid),
            namespace: "public".into(),
            name: format!("idx{oid}"),
            table_oid: ObjectId(table_oid),
            definition: "CREATE INDEX".into(),
            is_primary: false,
            is_unique: false,
            constraint_oid: None,
            constraint_name: None,
            constraint_definition: None,
        }
    }

    #[test]
    fn attach_indexes_groups_by_table_oid() {
        let mut tables = vec![table(1), table(2)];
        let indexes = vec![index(10, 1), index(11, 1), index(12, 2)];
        attach_indexes(&mut tables, &indexes);
        assert_eq!(tables[0].indexes, vec![ObjectId(10), ObjectId(11)]);
        assert_eq!(tables[1].indexes, vec![ObjectId(12)]);
    }
}
