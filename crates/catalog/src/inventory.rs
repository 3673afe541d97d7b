//! Inventory upsert, iteration and lookup-by-id (§4.1).
//!
//! Iterators are forward-only, finite and non-restartable: every listing
//! method below returns a `Vec<T>` snapshot collected under one read
//! transaction rather than a live `rusqlite::Statement`, so there is no
//! cursor to leak across an `.await` point and nothing to "finalize" by
//! hand — the snapshot is already closed by the time it reaches the caller.

use crate::error::{CatalogError, Result};
use crate::store::CatalogStore;
use model::{Attribute, FilteredItem, FilteredKind, Index, ObjectId, Sequence, SourceTable, TablePartition};
use rusqlite::{OptionalExtension, params};

impl CatalogStore {
    /// Replaces the full table inventory. Fails with
    /// [`CatalogError::InvariantViolation`] if the table already holds rows
    /// and `reset` is false.
    pub async fn upsert_tables(&self, tables: Vec<SourceTable>, reset: bool) -> Result<()> {
        self.write(move |conn| {
            let existing: i64 = conn.query_row("SELECT COUNT(*) FROM tables", [], |r| r.get(0))?;
            if existing > 0 && !reset {
                return Err(rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CONSTRAINT),
                    Some("tables inventory already populated; pass reset=true".to_string()),
                ));
            }
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM tables", [])?;
            for t in &tables {
                let attrs = serde_json::to_string(&t.attributes)
                    .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
                let idxs = serde_json::to_string(&t.indexes)
                    .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
                tx.execute(
                    "INSERT INTO tables (oid, namespace, relname, restore_list_label, estimated_bytes, estimated_rows, part_key, exclude_data, attributes_json, index_oids_json)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                    params![
                        t.oid.0,
                        t.namespace,
                        t.relname,
                        t.restore_list_label,
                        t.estimated_bytes,
                        t.estimated_rows,
                        t.part_key,
                        t.exclude_data as i64,
                        attrs,
                        idxs,
                    ],
                )?;
            }
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(|e| invariant_or(e, "tables"))
    }

    pub async fn upsert_indexes(&self, indexes: Vec<Index>, reset: bool) -> Result<()> {
        self.write(move |conn| {
            let existing: i64 = conn.query_row("SELECT COUNT(*) FROM indexes", [], |r| r.get(0))?;
            if existing > 0 && !reset {
                return Err(rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CONSTRAINT),
                    Some("indexes inventory already populated; pass reset=true".to_string()),
                ));
            }
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM indexes", [])?;
            for i in &indexes {
                tx.execute(
                    "INSERT INTO indexes (oid, namespace, name, table_oid, definition, is_primary, is_unique, constraint_oid, constraint_name, constraint_definition)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                    params![
                        i.oid.0,
                        i.namespace,
                        i.name,
                        i.table_oid.0,
                        i.definition,
                        i.is_primary as i64,
                        i.is_unique as i64,
                        i.constraint_oid.map(|o| o.0),
                        i.constraint_name,
                        i.constraint_definition,
                    ],
                )?;
            }
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(|e| invariant_or(e, "indexes"))
    }

    pub async fn upsert_sequences(&self, sequences: Vec<Sequence>, reset: bool) -> Result<()> {
        self.write(move |conn| {
            let existing: i64 =
                conn.query_row("SELECT COUNT(*) FROM sequences", [], |r| r.get(0))?;
            if existing > 0 && !reset {
                return Err(rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CONSTRAINT),
                    Some("sequences inventory already populated; pass reset=true".to_string()),
                ));
            }
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM sequences", [])?;
            for s in &sequences {
                tx.execute(
                    "INSERT INTO sequences (oid, namespace, relname, last_value, is_called) VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![s.oid.0, s.namespace, s.relname, s.last_value, s.is_called as i64],
                )?;
            }
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(|e| invariant_or(e, "sequences"))
    }

    /// Persists Stage B's partition plan: one `(tableoid, partnum, predicate)`
    /// tuple per part (§4.3 Stage B).
    pub async fn upsert_table_partitions(&self, partitions: Vec<TablePartition>) -> Result<()> {
        self.write(move |conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM table_partitions", [])?;
            for p in &partitions {
                tx.execute(
                    "INSERT INTO table_partitions (table_oid, part_num, part_count, predicate) VALUES (?1, ?2, ?3, ?4)",
                    params![p.table_oid.0, p.part_num, p.part_count, p.predicate],
                )?;
            }
            tx.commit()?;
            Ok(())
        })
        .await
    }

    pub async fn list_table_partitions(&self, table_oid: ObjectId) -> Result<Vec<TablePartition>> {
        self.read(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT table_oid, part_num, part_count, predicate FROM table_partitions WHERE table_oid = ?1 ORDER BY part_num",
            )?;
            let rows = stmt.query_map(params![table_oid.0], row_to_partition)?;
            rows.collect()
        })
        .await
    }

    pub async fn list_all_partitions(&self) -> Result<Vec<TablePartition>> {
        self.read(|conn| {
            let mut stmt = conn.prepare(
                "SELECT table_oid, part_num, part_count, predicate FROM table_partitions ORDER BY table_oid, part_num",
            )?;
            let rows = stmt.query_map([], row_to_partition)?;
            rows.collect()
        })
        .await
    }

    pub async fn upsert_filtered_items(&self, items: Vec<FilteredItem>) -> Result<()> {
        self.write(move |conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM filtered_items", [])?;
            for item in &items {
                tx.execute(
                    "INSERT INTO filtered_items (oid, restore_list_label, kind) VALUES (?1, ?2, ?3)",
                    params![item.oid.0, item.restore_list_label, kind_str(item.kind)],
                )?;
            }
            tx.commit()?;
            Ok(())
        })
        .await
    }

    pub async fn list_tables(&self) -> Result<Vec<SourceTable>> {
        self.read(|conn| {
            let mut stmt = conn.prepare(
                "SELECT oid, namespace, relname, restore_list_label, estimated_bytes, estimated_rows, part_key, exclude_data, attributes_json, index_oids_json FROM tables ORDER BY oid",
            )?;
            let rows = stmt.query_map([], row_to_table)?;
            rows.collect()
        })
        .await
    }

    pub async fn list_indexes(&self) -> Result<Vec<Index>> {
        self.read(|conn| {
            let mut stmt = conn.prepare(
                "SELECT oid, namespace, name, table_oid, definition, is_primary, is_unique, constraint_oid, constraint_name, constraint_definition FROM indexes ORDER BY oid",
            )?;
            let rows = stmt.query_map([], row_to_index)?;
            rows.collect()
        })
        .await
    }

    pub async fn indexes_of_table(&self, table_oid: ObjectId) -> Result<Vec<Index>> {
        self.read(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT oid, namespace, name, table_oid, definition, is_primary, is_unique, constraint_oid, constraint_name, constraint_definition FROM indexes WHERE table_oid = ?1 ORDER BY oid",
            )?;
            let rows = stmt.query_map(params![table_oid.0], row_to_index)?;
            rows.collect()
        })
        .await
    }

    pub async fn list_sequences(&self) -> Result<Vec<Sequence>> {
        self.read(|conn| {
            let mut stmt = conn.prepare(
                "SELECT oid, namespace, relname, last_value, is_called FROM sequences ORDER BY oid",
            )?;
            let rows = stmt.query_map([], row_to_sequence)?;
            rows.collect()
        })
        .await
    }

    /// Zero-row result returns a sentinel table with id 0; never fails.
    pub async fn lookup_table(&self, oid: ObjectId) -> Result<SourceTable> {
        self.read(move |conn| {
            conn.query_row(
                "SELECT oid, namespace, relname, restore_list_label, estimated_bytes, estimated_rows, part_key, exclude_data, attributes_json, index_oids_json FROM tables WHERE oid = ?1",
                params![oid.0],
                row_to_table,
            )
            .optional()
            .map(|opt| opt.unwrap_or_else(sentinel_table))
        })
        .await
    }

    pub async fn lookup_index(&self, oid: ObjectId) -> Result<Index> {
        self.read(move |conn| {
            conn.query_row(
                "SELECT oid, namespace, name, table_oid, definition, is_primary, is_unique, constraint_oid, constraint_name, constraint_definition FROM indexes WHERE oid = ?1",
                params![oid.0],
                row_to_index,
            )
            .optional()
            .map(|opt| opt.unwrap_or_else(sentinel_index))
        })
        .await
    }

    pub async fn lookup_sequence(&self, oid: ObjectId) -> Result<Sequence> {
        self.read(move |conn| {
            conn.query_row(
                "SELECT oid, namespace, relname, last_value, is_called FROM sequences WHERE oid = ?1",
                params![oid.0],
                row_to_sequence,
            )
            .optional()
            .map(|opt| opt.unwrap_or_else(sentinel_sequence))
        })
        .await
    }
}

fn invariant_or(err: CatalogError, what: &str) -> CatalogError {
    match &err {
        CatalogError::Sqlite(rusqlite::Error::SqliteFailure(e, Some(msg)))
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            CatalogError::InvariantViolation(format!("{what}: {msg}"))
        }
        _ => err,
    }
}

fn kind_str(kind: FilteredKind) -> &'static str {
    match kind {
        FilteredKind::Table => "table",
        FilteredKind::Index => "index",
        FilteredKind::Constraint => "constraint",
        FilteredKind::Sequence => "sequence",
        FilteredKind::Unknown => "unknown",
    }
}

fn sentinel_table() -> SourceTable {
    SourceTable {
        oid: ObjectId::NONE,
        namespace: String::new(),
        relname: String::new(),
        restore_list_label: String::new(),
        estimated_bytes: 0,
        estimated_rows: 0,
        part_key: None,
        attributes: Vec::new(),
        indexes: Vec::new(),
        exclude_data: false,
    }
}

fn sentinel_index() -> Index {
    Index {
        oid: ObjectId::NONE,
        namespace: String::new(),
        name: String::new(),
        table_oid: ObjectId::NONE,
        definition: String::new(),
        is_primary: false,
        is_unique: false,
        constraint_oid: None,
        constraint_name: None,
        constraint_definition: None,
    }
}

fn sentinel_sequence() -> Sequence {
    Sequence {
        oid: ObjectId::NONE,
        namespace: String::new(),
        relname: String::new(),
        last_value: 0,
        is_called: false,
    }
}

fn row_to_table(row: &rusqlite::Row) -> rusqlite::Result<SourceTable> {
    let attrs_json: String = row.get(8)?;
    let idx_json: String = row.get(9)?;
    let attributes: Vec<Attribute> =
        serde_json::from_str(&attrs_json).map_err(|e| rusqlite::Error::FromSqlConversionFailure(8, rusqlite::types::Type::Text, Box::new(e)))?;
    let indexes: Vec<ObjectId> =
        serde_json::from_str(&idx_json).map_err(|e| rusqlite::Error::FromSqlConversionFailure(9, rusqlite::types::Type::Text, Box::new(e)))?;
    Ok(SourceTable {
        oid: ObjectId(row.get::<_, u32>(0)?),
        namespace: row.get(1)?,
        relname: row.get(2)?,
        restore_list_label: row.get(3)?,
        estimated_bytes: row.get(4)?,
        estimated_rows: row.get(5)?,
        part_key: row.get(6)?,
        exclude_data: row.get::<_, i64>(7)? != 0,
        attributes,
        indexes,
    })
}

fn row_to_index(row: &rusqlite::Row) -> rusqlite::Result<Index> {
    Ok(Index {
        oid: ObjectId(row.get::<_, u32>(0)?),
        namespace: row.get(1)?,
        name: row.get(2)?,
        table_oid: ObjectId(row.get::<_, u32>(3)?),
        definition: row.get(4)?,
        is_primary: row.get::<_, i64>(5)? != 0,
        is_unique: row.get::<_, i64>(6)? != 0,
        constraint_oid: row.get::<_, Option<u32>>(7)?.map(ObjectId),
        constraint_name: row.get(8)?,
        constraint_definition: row.get(9)?,
    })
}

fn row_to_partition(row: &rusqlite::Row) -> rusqlite::Result<TablePartition> {
    Ok(TablePartition {
        table_oid: ObjectId(row.get::<_, u32>(0)?),
        part_num: row.get(1)?,
        part_count: row.get(2)?,
        predicate: row.get(3)?,
    })
}

fn row_to_sequence(row: &rusqlite::Row) -> rusqlite::Result<Sequence> {
    Ok(Sequence {
        oid: ObjectId(row.get::<_, u32>(0)?),
        namespace: row.get(1)?,
        relname: row.get(2)?,
        last_value: row.get(3)?,
        is_called: row.get::<_, i64>(4)? != 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Role;

    fn table(oid: u32) -> SourceTable {
        SourceTable {
            oid: ObjectId(oid),
            namespace: "public".into(),
            relname: format!("t{oid}"),
            restore_list_label: format!("TABLE public t{oid}"),
            estimated_bytes: 100,
            estimated_rows: 10,
            part_key: None,
            attributes: vec![Attribute {
                name: "id".into(),
                ordinal: 1,
            }],
            indexes: vec![],
            exclude_data: false,
        }
    }

    #[tokio::test]
    async fn upsert_then_lookup_round_trips() {
        let store = CatalogStore::open_in_memory(Role::Source).unwrap();
        store.upsert_tables(vec![table(1), table(2)], false).await.unwrap();

        let all = store.list_tables().await.unwrap();
        assert_eq!(all.len(), 2);

        let found = store.lookup_table(ObjectId(1)).await.unwrap();
        assert_eq!(found.relname, "t1");

        let missing = store.lookup_table(ObjectId(999)).await.unwrap();
        assert!(missing.oid.is_none());
    }

    #[tokio::test]
    async fn second_upsert_without_reset_is_an_invariant_violation() {
        let store = CatalogStore::open_in_memory(Role::Source).unwrap();
        store.upsert_tables(vec![table(1)], false).await.unwrap();
        let err = store.upsert_tables(vec![table(2)], false).await.unwrap_err();
        assert!(matches!(err, CatalogError::InvariantViolation(_)));
    }

    #[tokio::test]
    async fn reset_allows_replacing_a_populated_inventory() {
        let store = CatalogStore::open_in_memory(Role::Source).unwrap();
        store.upsert_tables(vec![table(1)], false).await.unwrap();
        store.upsert_tables(vec![table(2)], true).await.unwrap();
        let all = store.list_tables().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].oid, ObjectId(2));
    }
}
