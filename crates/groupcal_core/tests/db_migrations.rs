use groupcal_core::db::migrations::latest_version;
use groupcal_core::db::{open_db, open_db_in_memory, open_db_with_options, DbError, DbOptions};
use groupcal_core::repo::{ensure_schema_ready, RepoError};
use rusqlite::Connection;
use std::time::Duration;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "groups");
    assert_table_exists(&conn, "memberships");
    assert_table_exists(&conn, "tasks");
    assert_table_exists(&conn, "reactions");
    assert_table_exists(&conn, "task_templates");
    ensure_schema_ready(&conn).unwrap();
}

#[test]
fn opened_connections_enforce_foreign_keys() {
    let conn = open_db_in_memory().unwrap();
    let enabled: i64 = conn
        .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(enabled, 1);
}

#[test]
fn file_databases_use_wal_journal() {
    let dir = tempfile::tempdir().unwrap();
    let conn = open_db(dir.path().join("groupcal.db")).unwrap();
    let mode: String = conn
        .query_row("PRAGMA journal_mode;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(mode.to_lowercase(), "wal");
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("groupcal.db");

    let conn_first = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_first), latest_version());
    drop(conn_first);

    let options = DbOptions {
        busy_timeout: Duration::from_millis(100),
    };
    let conn_second = open_db_with_options(&path, &options).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    assert_table_exists(&conn_second, "tasks");
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn unmigrated_connection_is_rejected_by_schema_check() {
    let conn = Connection::open_in_memory().unwrap();
    let err = ensure_schema_ready(&conn).unwrap_err();
    match err {
        RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        } => {
            assert_eq!(expected_version, latest_version());
            assert_eq!(actual_version, 0);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn schedule_columns_reject_both_and_neither_representation() {
    let conn = open_db_in_memory().unwrap();
    conn.execute(
        "INSERT INTO groups (group_id, name) VALUES ('g1', 'Club');",
        [],
    )
    .unwrap();

    let both = conn.execute(
        "INSERT INTO tasks (task_id, group_id, title, date, time_span_begin)
         VALUES ('t1', 'g1', 'x', '2026-01-10', '2026-01-10T09:00:00');",
        [],
    );
    assert!(both.is_err());

    let neither = conn.execute(
        "INSERT INTO tasks (task_id, group_id, title) VALUES ('t2', 'g1', 'x');",
        [],
    );
    assert!(neither.is_err());
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
