//! Catalog enumeration (§4.3 Stage A). These are representative queries
//! against `pg_catalog`/`information_schema`, not a literal reproduction of
//! any particular vendor tool's catalog SQL (§1 Non-goals).

use crate::error::DbError;
use model::{Attribute, FilteredItem, FilteredKind, Index, ObjectId, Sequence, SourceTable};
use std::collections::HashSet;
use tokio_postgres::Client;

/// Name-based inclusion/exclusion filter applied while enumerating objects.
#[derive(Debug, Clone, Default)]
pub struct ObjectFilter {
    /// If non-empty, only qualified names in this set are included.
    pub include: HashSet<String>,
    /// Qualified names excluded regardless of `include`.
    pub exclude: HashSet<String>,
}

impl ObjectFilter {
    pub fn allows(&self, qualified_name: &str) -> bool {
        if self.exclude.contains(qualified_name) {
            return false;
        }
        self.include.is_empty() || self.include.contains(qualified_name)
    }
}

const FETCH_TABLES_SQL: &str = r#"
SELECT
    c.oid,
    n.nspname AS namespace,
    c.relname,
    pg_catalog.pg_relation_size(c.oid) AS estimated_bytes,
    COALESCE(s.n_live_tup, 0) AS estimated_rows
FROM pg_catalog.pg_class c
JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
LEFT JOIN pg_catalog.pg_stat_user_tables s ON s.relid = c.oid
WHERE c.relkind = 'r'
  AND n.nspname NOT IN ('pg_catalog', 'information_schema')
ORDER BY c.oid
"#;

const FETCH_COLUMNS_SQL: &str = r#"
SELECT attname, attnum
FROM pg_catalog.pg_attribute
WHERE attrelid = $1 AND attnum > 0 AND NOT attisdropped
ORDER BY attnum
"#;

/// A unique, single-column, integer (or bigint) index usable to partition a
/// table's rows (§4.3 Stage B `partKey`).
const FETCH_PART_KEY_SQL: &str = r#"
SELECT a.attname
FROM pg_catalog.pg_index i
JOIN pg_catalog.pg_attribute a ON a.attrelid = i.indrelid AND a.attnum = i.indkey[0]
JOIN pg_catalog.pg_type t ON t.oid = a.atttypid
WHERE i.indrelid = $1
  AND i.indisunique
  AND array_length(i.indkey, 1) = 1
  AND t.typname IN ('int2', 'int4', 'int8')
ORDER BY i.indisprimary DESC
LIMIT 1
"#;

const FETCH_INDEXES_SQL: &str = r#"
SELECT
    ic.oid,
    n.nspname AS namespace,
    ic.relname AS index_name,
    i.indrelid AS table_oid,
    pg_catalog.pg_get_indexdef(ic.oid) AS definition,
    i.indisprimary,
    i.indisunique,
    con.oid AS constraint_oid,
    con.conname,
    pg_catalog.pg_get_constraintdef(con.oid) AS constraint_definition
FROM pg_catalog.pg_index i
JOIN pg_catalog.pg_class ic ON ic.oid = i.indexrelid
JOIN pg_catalog.pg_class tc ON tc.oid = i.indrelid
JOIN pg_catalog.pg_namespace n ON n.oid = ic.relnamespace
LEFT JOIN pg_catalog.pg_constraint con ON con.conindid = ic.oid
WHERE n.nspname NOT IN ('pg_catalog', 'information_schema')
ORDER BY ic.oid
"#;

const FETCH_SEQUENCES_SQL: &str = r#"
SELECT
    c.oid,
    n.nspname AS namespace,
    c.relname,
    pg_sequence_last_value(c.oid::regclass) AS last_value
FROM pg_catalog.pg_class c
JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
WHERE c.relkind = 'S'
  AND n.nspname NOT IN ('pg_catalog', 'information_schema')
ORDER BY c.oid
"#;

/// Enumerates tables honoring `filter`, returning both the included tables
/// and the complement as [`FilteredItem`]s for Stage E to skip during
/// post-data restore.
pub async fn fetch_tables(
    client: &Client,
    filter: &ObjectFilter,
) -> Result<(Vec<SourceTable>, Vec<FilteredItem>), DbError> {
    let rows = client.query(FETCH_TABLES_SQL, &[]).await?;
    let mut included = Vec::new();
    let mut filtered = Vec::new();

    for row in rows {
        let oid: u32 = row.get("oid");
        let namespace: String = row.get("namespace");
        let relname: String = row.get("relname");
        let qualified = format!("{namespace}.{relname}");
        let restore_list_label = format!("TABLE DATA {namespace} {relname}");

        if !filter.allows(&qualified) {
            filtered.push(FilteredItem {
                oid: ObjectId(oid),
                restore_list_label,
                kind: FilteredKind::Table,
            });
            continue;
        }

        let estimated_bytes: i64 = row.get("estimated_bytes");
        let estimated_rows: i64 = row.get("estimated_rows");

        let attr_rows = client.query(FETCH_COLUMNS_SQL, &[&oid]).await?;
        let attributes = attr_rows
            .iter()
            .map(|r| Attribute {
                name: r.get::<_, String>("attname"),
                ordinal: r.get::<_, i16>("attnum") as i32,
            })
            .collect();

        let part_key = client
            .query_opt(FETCH_PART_KEY_SQL, &[&oid])
            .await?
            .map(|r| r.get::<_, String>("attname"));

        included.push(SourceTable {
            oid: ObjectId(oid),
            namespace,
            relname,
            restore_list_label,
            estimated_bytes,
            estimated_rows,
            part_key,
            attributes,
            indexes: Vec::new(),
            exclude_data: false,
        });
    }

    Ok((included, filtered))
}

/// Enumerates indexes (and the constraints that reuse them) for the tables
/// already accepted by the filter.
pub async fn fetch_indexes(
    client: &Client,
    included_table_oids: &HashSet<u32>,
) -> Result<Vec<Index>, DbError> {
    let rows = client.query(FETCH_INDEXES_SQL, &[]).await?;
    let mut indexes = Vec::new();
    for row in rows {
        let table_oid: u32 = row.get("table_oid");
        if !included_table_oids.contains(&table_oid) {
            continue;
        }
        indexes.push(Index {
            oid: ObjectId(row.get("oid")),
            namespace: row.get("namespace"),
            name: row.get("index_name"),
            table_oid: ObjectId(table_oid),
            definition: row.get("definition"),
            is_primary: row.get("indisprimary"),
            is_unique: row.get("indisunique"),
            constraint_oid: row.get::<_, Option<u32>>("constraint_oid").map(ObjectId),
            constraint_name: row.get("conname"),
            constraint_definition: row.get("constraint_definition"),
        });
    }
    Ok(indexes)
}

pub async fn fetch_sequences(
    client: &Client,
    filter: &ObjectFilter,
) -> Result<(Vec<Sequence>, Vec<FilteredItem>), DbError> {
    let rows = client.query(FETCH_SEQUENCES_SQL, &[]).await?;
    let mut included = Vec::new();
    let mut filtered = Vec::new();
    for row in rows {
        let oid: u32 = row.get("oid");
        let namespace: String = row.get("namespace");
        let relname: String = row.get("relname");
        let qualified = format!("{namespace}.{relname}");
        if !filter.allows(&qualified) {
            filtered.push(FilteredItem {
                oid: ObjectId(oid),
                restore_list_label: format!("SEQUENCE {namespace} {relname}"),
                kind: FilteredKind::Sequence,
            });
            continue;
        }
        let last_value: Option<i64> = row.get("last_value");
        included.push(Sequence {
            oid: ObjectId(oid),
            namespace,
            relname,
            last_value: last_value.unwrap_or(0),
            is_called: last_value.is_some(),
        });
    }
    Ok((included, filtered))
}
