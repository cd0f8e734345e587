mod common;

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use common::{sqlite_adapter, table_exists, write_migration};
use oxide_dal_migrate::loader::create_migration_file;
use oxide_dal_migrate::prelude::*;
use tempfile::TempDir;

const USERS: &str = "-- migrate:up\n\
                     create table users (id integer primary key, email text not null);\n\
                     insert into users (email) values ('a@example.com;b');\n\
                     \n\
                     -- migrate:down\n\
                     drop table users;\n";

const POSTS: &str = "-- migrate:transaction none\n\
                     -- migrate:up\n\
                     create table posts (id integer primary key, title text);\n\
                     -- migrate:down\n\
                     drop table posts;\n";

#[test]
fn test_load_dir_orders_and_filters() {
    let dir = TempDir::new().unwrap();
    write_migration(dir.path(), "20240102000000_create_posts.sql", POSTS);
    write_migration(dir.path(), "20240101000000_create_users.sql", USERS);
    write_migration(dir.path(), "README.md", "not a migration");

    let migrations = load_dir(dir.path()).unwrap();
    let ids: Vec<_> = migrations.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["20240101000000", "20240102000000"]);
    assert_eq!(migrations[0].name, "create_users");
    assert_eq!(migrations[0].transaction, TransactionMode::Auto);
    assert_eq!(migrations[1].transaction, TransactionMode::None);
    assert_eq!(migrations[0].checksum.len(), 64);
}

#[test]
fn test_load_dir_errors() {
    let dir = TempDir::new().unwrap();
    assert!(matches!(
        load_dir(&dir.path().join("missing")),
        Err(MigrateError::MigrationsDirNotFound(_))
    ));

    write_migration(dir.path(), "create_users.sql", USERS);
    assert!(matches!(
        load_dir(dir.path()),
        Err(MigrateError::InvalidFilename(_))
    ));

    let dir = TempDir::new().unwrap();
    write_migration(dir.path(), "20240101000000_create_users.sql", USERS);
    write_migration(dir.path(), "20240101000000_create_posts.sql", POSTS);
    assert!(matches!(
        load_dir(dir.path()),
        Err(MigrateError::DuplicateId(id)) if id == "20240101000000"
    ));

    let dir = TempDir::new().unwrap();
    write_migration(dir.path(), "20240101000000_empty.sql", "select 1;\n");
    assert!(matches!(
        load_dir(dir.path()),
        Err(MigrateError::Parse { .. })
    ));
}

#[tokio::test]
async fn test_sql_files_apply_and_revert() {
    let dir = TempDir::new().unwrap();
    write_migration(dir.path(), "20240101000000_create_users.sql", USERS);
    write_migration(dir.path(), "20240102000000_create_posts.sql", POSTS);

    let adapter = sqlite_adapter().await;
    let migrator = Migrator::new(Arc::clone(&adapter), load_dir(dir.path()).unwrap()).unwrap();

    let report = migrator.up(UpOptions::default()).await.unwrap();
    assert_eq!(report.migrations[0].statements.len(), 3);
    assert!(table_exists(&adapter, "users").await);
    assert!(table_exists(&adapter, "posts").await);

    let report = migrator
        .down(DownOptions {
            step: Some(2),
            ..DownOptions::default()
        })
        .await
        .unwrap();
    assert_eq!(report.migrations.len(), 2);
    assert!(!table_exists(&adapter, "users").await);
    assert!(!table_exists(&adapter, "posts").await);
}

#[tokio::test]
async fn test_edited_file_is_drift() {
    let dir = TempDir::new().unwrap();
    write_migration(dir.path(), "20240101000000_create_users.sql", USERS);

    let adapter = sqlite_adapter().await;
    Migrator::new(Arc::clone(&adapter), load_dir(dir.path()).unwrap())
        .unwrap()
        .up(UpOptions::default())
        .await
        .unwrap();

    write_migration(
        dir.path(),
        "20240101000000_create_users.sql",
        &USERS.replace("email text", "email varchar(320)"),
    );
    let migrator = Migrator::new(Arc::clone(&adapter), load_dir(dir.path()).unwrap()).unwrap();
    assert!(matches!(
        migrator.up(UpOptions::default()).await,
        Err(MigrateError::Drift { .. })
    ));
    let statuses = migrator.status().await.unwrap();
    assert_eq!(statuses[0].state, MigrationState::Drifted);
}

#[tokio::test]
async fn test_create_migration_file() {
    let dir = TempDir::new().unwrap();
    let migrations_dir = dir.path().join("migrations");
    let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();

    let path = create_migration_file(&migrations_dir, "add_tags", now).unwrap();
    assert_eq!(
        path.file_name().and_then(|n| n.to_str()),
        Some("20240301123000_add_tags.sql")
    );
    assert!(matches!(
        create_migration_file(&migrations_dir, "add_tags", now),
        Err(MigrateError::MigrationExists(_))
    ));
    assert!(create_migration_file(&migrations_dir, "add tags", now).is_err());

    let migrations = load_dir(&migrations_dir).unwrap();
    assert_eq!(migrations.len(), 1);

    let adapter = sqlite_adapter().await;
    let report = Migrator::new(adapter, migrations)
        .unwrap()
        .up(UpOptions::default())
        .await
        .unwrap();
    assert_eq!(report.migrations[0].statements.len(), 1);
}
