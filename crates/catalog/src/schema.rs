//! Schema versioning via `rusqlite_migration`, so re-opening an existing
//! catalog file is idempotent — required for `--resume` (§6).

use rusqlite_migration::{M, Migrations};
use std::sync::LazyLock;

pub static MIGRATIONS: LazyLock<Migrations<'static>> = LazyLock::new(|| {
    Migrations::new(vec![M::up(
        r#"
        CREATE TABLE tables (
            oid INTEGER PRIMARY KEY,
            namespace TEXT NOT NULL,
            relname TEXT NOT NULL,
            restore_list_label TEXT NOT NULL,
            estimated_bytes INTEGER NOT NULL,
            estimated_rows INTEGER NOT NULL,
            part_key TEXT,
            exclude_data INTEGER NOT NULL DEFAULT 0,
            attributes_json TEXT NOT NULL,
            index_oids_json TEXT NOT NULL
        );

        CREATE TABLE table_partitions (
            table_oid INTEGER NOT NULL,
            part_num INTEGER NOT NULL,
            part_count INTEGER NOT NULL,
            predicate TEXT NOT NULL,
            PRIMARY KEY (table_oid, part_num)
        );

        CREATE TABLE indexes (
            oid INTEGER PRIMARY KEY,
            namespace TEXT NOT NULL,
            name TEXT NOT NULL,
            table_oid INTEGER NOT NULL,
            definition TEXT NOT NULL,
            is_primary INTEGER NOT NULL,
            is_unique INTEGER NOT NULL,
            constraint_oid INTEGER,
            constraint_name TEXT,
            constraint_definition TEXT
        );

        CREATE INDEX indexes_by_table ON indexes(table_oid);

        CREATE TABLE sequences (
            oid INTEGER PRIMARY KEY,
            namespace TEXT NOT NULL,
            relname TEXT NOT NULL,
            last_value INTEGER NOT NULL,
            is_called INTEGER NOT NULL
        );

        CREATE TABLE filtered_items (
            oid INTEGER NOT NULL,
            restore_list_label TEXT NOT NULL,
            kind TEXT NOT NULL,
            PRIMARY KEY (oid, kind)
        );

        CREATE TABLE summary (
            key TEXT PRIMARY KEY,
            kind TEXT NOT NULL,
            table_oid INTEGER,
            part_num INTEGER,
            index_oid INTEGER,
            con_oid INTEGER,
            pid INTEGER NOT NULL,
            start_epoch INTEGER NOT NULL,
            done_epoch INTEGER NOT NULL DEFAULT 0,
            duration_ms INTEGER NOT NULL DEFAULT 0,
            bytes INTEGER NOT NULL DEFAULT 0,
            command TEXT NOT NULL DEFAULT ''
        );

        CREATE TABLE s_table_parts_done (
            table_oid INTEGER PRIMARY KEY,
            pid INTEGER NOT NULL
        );

        CREATE TABLE s_table_indexes_done (
            table_oid INTEGER PRIMARY KEY,
            pid INTEGER NOT NULL
        );

        CREATE TABLE truncate_done (
            table_oid INTEGER PRIMARY KEY,
            pid INTEGER NOT NULL,
            done_epoch INTEGER NOT NULL
        );

        CREATE TABLE vacuum_summary (
            table_oid INTEGER PRIMARY KEY,
            pid INTEGER NOT NULL,
            start_epoch INTEGER NOT NULL,
            done_epoch INTEGER NOT NULL DEFAULT 0,
            duration_ms INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE timings (
            label TEXT PRIMARY KEY,
            conn TEXT NOT NULL DEFAULT '',
            start_epoch INTEGER NOT NULL DEFAULT 0,
            done_epoch INTEGER NOT NULL DEFAULT 0,
            duration_ms INTEGER NOT NULL DEFAULT 0,
            duration_pretty TEXT NOT NULL DEFAULT '',
            count INTEGER NOT NULL DEFAULT 0,
            bytes INTEGER NOT NULL DEFAULT 0,
            bytes_pretty TEXT NOT NULL DEFAULT ''
        );

        CREATE TABLE comparison_result (
            qualified_name TEXT PRIMARY KEY,
            matched INTEGER NOT NULL,
            source_checksum TEXT,
            target_checksum TEXT,
            source_rows INTEGER,
            target_rows INTEGER,
            checked_epoch INTEGER NOT NULL
        );
        "#,
    )])
});
