use project_core::db::migrations::{latest_version, schema_version};
use project_core::db::{open_db, open_db_in_memory, DbError};
use project_core::{FeatureTypeRepository, SqliteFeatureTypeRepository};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn).unwrap(), latest_version());
    for table in [
        "projects",
        "roles",
        "role_user",
        "feature_types",
        "features",
        "events",
    ] {
        assert_table_exists(&conn, table);
    }
}

#[test]
fn migrations_seed_default_project_and_feature_types() {
    let conn = open_db_in_memory().unwrap();

    let default_name: String = conn
        .query_row("SELECT name FROM projects WHERE id = 'default';", [], |row| {
            row.get(0)
        })
        .unwrap();
    assert_eq!(default_name, "Default");

    let types = SqliteFeatureTypeRepository::try_new(&conn)
        .unwrap()
        .get_all()
        .unwrap();
    let lifetimes: Vec<(String, Option<u32>)> = types
        .into_iter()
        .map(|kind| (kind.id, kind.lifetime_days))
        .collect();
    assert_eq!(
        lifetimes,
        vec![
            ("experiment".to_string(), Some(40)),
            ("kill-switch".to_string(), None),
            ("operational".to_string(), Some(7)),
            ("permission".to_string(), None),
            ("release".to_string(), Some(40)),
        ]
    );
}

#[test]
fn reopening_file_database_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("projects.db");

    let first = open_db(&path).unwrap();
    assert_eq!(schema_version(&first).unwrap(), latest_version());
    drop(first);

    let second = open_db(&path).unwrap();
    assert_eq!(schema_version(&second).unwrap(), latest_version());
    let defaults: i64 = second
        .query_row("SELECT COUNT(*) FROM projects WHERE id = 'default';", [], |row| {
            row.get(0)
        })
        .unwrap();
    assert_eq!(defaults, 1);
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    match open_db(&path).unwrap_err() {
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
fn events_table_is_append_only() {
    let conn = open_db_in_memory().unwrap();
    conn.execute(
        "INSERT INTO events (type, created_by, data)
         VALUES ('project-deleted', 'x', '{\"id\":\"a\"}');",
        [],
    )
    .unwrap();

    assert!(conn
        .execute("UPDATE events SET created_by = 'y';", [])
        .is_err());
    assert!(conn.execute("DELETE FROM events;", []).is_err());
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
