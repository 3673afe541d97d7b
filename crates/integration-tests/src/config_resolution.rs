//! End-to-end config resolution: file on disk, overridden by environment,
//! then validated into a [`config::ValidatedConfig`] (§6 layering order).

use config::{ConfigValidator, EnvOverrides, file};
use std::sync::Mutex;

// `std::env::set_var` mutates process-global state; serialize the two tests
// in this module so they can't interleave their environment mutations.
static ENV_LOCK: Mutex<()> = Mutex::new(());

#[test]
fn a_config_file_overridden_by_the_environment_validates_successfully() {
    let _guard = ENV_LOCK.lock().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pgcopydb.toml");
    std::fs::write(
        &path,
        r#"
        source_conninfo = "postgres://localhost/src"
        target_conninfo = "postgres://localhost/dst"
        table_jobs = 4
        index_jobs = 2
        "#,
    )
    .unwrap();

    unsafe {
        std::env::set_var("PGCOPYDB_TABLE_JOBS", "16");
    }

    let raw = file::load_file(&path).unwrap();
    let merged = EnvOverrides::from_process_env().apply(raw);
    let validated = ConfigValidator::new(merged).validate().unwrap();

    assert_eq!(validated.source_conninfo, "postgres://localhost/src");
    assert_eq!(validated.options.table_jobs, 16, "the environment variable must win over the file");
    assert_eq!(validated.options.index_jobs, 2, "a field the environment doesn't touch keeps the file's value");

    unsafe {
        std::env::remove_var("PGCOPYDB_TABLE_JOBS");
    }
}

#[test]
fn a_config_missing_both_conninfos_fails_validation_with_both_messages() {
    let _guard = ENV_LOCK.lock().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pgcopydb.toml");
    std::fs::write(&path, "table_jobs = 8\n").unwrap();

    let raw = file::load_file(&path).unwrap();
    let merged = EnvOverrides::from_process_env().apply(raw);
    let err = ConfigValidator::new(merged).validate().unwrap_err();

    let config::ConfigError::Validation(messages) = err else { panic!("expected a Validation error") };
    assert!(messages.iter().any(|m| m.contains("source_conninfo")));
    assert!(messages.iter().any(|m| m.contains("target_conninfo")));
}
