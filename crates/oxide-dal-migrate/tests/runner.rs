mod common;

use std::sync::Arc;

use async_trait::async_trait;
use common::{create_table, creates, sqlite_adapter, table_exists, RecordingClient};
use oxide_dal_adapter::Adapter;
use oxide_dal_core::schema::MigrationOp;
use oxide_dal_core::{Aggregate, Dialect, Query, SqlValue};
use oxide_dal_migrate::prelude::*;

const A: &str = "20240101000000";
const B: &str = "20240102000000";
const C: &str = "20240103000000";

fn ids(statuses: &[oxide_dal_migrate::MigrationStatus]) -> Vec<(&str, MigrationState)> {
    statuses.iter().map(|s| (s.id.as_str(), s.state)).collect()
}

#[tokio::test]
async fn test_up_then_down_one_step() {
    let adapter = sqlite_adapter().await;
    let migrator = Migrator::new(
        Arc::clone(&adapter),
        vec![creates(B, "posts"), creates(A, "users")],
    )
    .unwrap();

    let report = migrator.up(UpOptions::default()).await.unwrap();
    assert_eq!(report.ids().collect::<Vec<_>>(), vec![A, B]);
    assert_eq!(report.batch, Some(1));
    assert!(table_exists(&adapter, "users").await);
    assert!(table_exists(&adapter, "posts").await);

    let report = migrator
        .down(DownOptions {
            step: Some(1),
            ..DownOptions::default()
        })
        .await
        .unwrap();
    assert_eq!(report.ids().collect::<Vec<_>>(), vec![B]);
    assert!(table_exists(&adapter, "users").await);
    assert!(!table_exists(&adapter, "posts").await);

    let statuses = migrator.status().await.unwrap();
    assert_eq!(
        ids(&statuses),
        vec![(A, MigrationState::Applied), (B, MigrationState::Pending)]
    );
    assert_eq!(statuses[0].batch, Some(1));
    assert!(statuses[0].applied_at.is_some());
    assert!(statuses[1].applied_at.is_none());
}

#[tokio::test]
async fn test_up_is_idempotent() {
    let adapter = sqlite_adapter().await;
    let migrator = Migrator::new(adapter, vec![creates(A, "users")]).unwrap();

    migrator.up(UpOptions::default()).await.unwrap();
    let report = migrator.up(UpOptions::default()).await.unwrap();
    assert!(report.is_empty());
    assert_eq!(report.batch, Some(2));
}

#[tokio::test]
async fn test_drift_is_detected_before_anything_runs() {
    let adapter = sqlite_adapter().await;
    Migrator::new(Arc::clone(&adapter), vec![creates(A, "users")])
        .unwrap()
        .up(UpOptions::default())
        .await
        .unwrap();

    // Same id, different content.
    let edited = MigrationDescriptor::reversible(A, "create_users", vec![create_table("people")])
        .unwrap();
    let migrator = Migrator::new(Arc::clone(&adapter), vec![edited, creates(B, "posts")]).unwrap();

    let err = migrator.up(UpOptions::default()).await.unwrap_err();
    match err {
        MigrateError::Drift {
            id,
            recorded,
            current,
        } => {
            assert_eq!(id, A);
            assert_ne!(recorded, current);
        }
        other => panic!("expected drift, got {other:?}"),
    }
    assert!(!table_exists(&adapter, "posts").await);
    assert!(!table_exists(&adapter, "people").await);

    assert!(matches!(
        migrator.down(DownOptions::default()).await,
        Err(MigrateError::Drift { .. })
    ));
    assert!(table_exists(&adapter, "users").await);

    let statuses = migrator.status().await.unwrap();
    assert_eq!(
        ids(&statuses),
        vec![(A, MigrationState::Drifted), (B, MigrationState::Pending)]
    );
}

#[tokio::test]
async fn test_failed_migration_rolls_back_only_itself() {
    let adapter = sqlite_adapter().await;
    let broken = MigrationDescriptor::from_operations(
        B,
        "broken",
        vec![create_table("posts"), MigrationOp::raw("insert into nowhere values (1)")],
        vec![MigrationOp::drop_table("posts")],
    )
    .unwrap();
    let migrator = Migrator::new(
        Arc::clone(&adapter),
        vec![creates(A, "users"), broken, creates(C, "tags")],
    )
    .unwrap();

    let err = migrator.up(UpOptions::default()).await.unwrap_err();
    assert!(matches!(err, MigrateError::Adapter(_)));

    assert!(table_exists(&adapter, "users").await);
    assert!(!table_exists(&adapter, "posts").await);
    assert!(!table_exists(&adapter, "tags").await);
    assert_eq!(adapter.open_transactions(), 0);

    let statuses = migrator.status().await.unwrap();
    assert_eq!(
        ids(&statuses),
        vec![
            (A, MigrationState::Applied),
            (B, MigrationState::Pending),
            (C, MigrationState::Pending),
        ]
    );
}

#[tokio::test]
async fn test_up_to_and_step() {
    let adapter = sqlite_adapter().await;
    let migrator = Migrator::new(
        Arc::clone(&adapter),
        vec![creates(A, "users"), creates(B, "posts"), creates(C, "tags")],
    )
    .unwrap();

    let report = migrator
        .up(UpOptions {
            to: Some(B.to_string()),
            ..UpOptions::default()
        })
        .await
        .unwrap();
    assert_eq!(report.ids().collect::<Vec<_>>(), vec![A, B]);
    assert!(!table_exists(&adapter, "tags").await);

    let err = migrator
        .up(UpOptions {
            to: Some("20991231235959".to_string()),
            ..UpOptions::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, MigrateError::UnknownMigration(id) if id == "20991231235959"));

    let report = migrator
        .up(UpOptions {
            step: Some(5),
            ..UpOptions::default()
        })
        .await
        .unwrap();
    assert_eq!(report.ids().collect::<Vec<_>>(), vec![C]);
    assert_eq!(report.batch, Some(2));
}

#[tokio::test]
async fn test_down_defaults_to_latest_batch() {
    let adapter = sqlite_adapter().await;
    let migrator = Migrator::new(
        Arc::clone(&adapter),
        vec![creates(A, "users"), creates(B, "posts"), creates(C, "tags")],
    )
    .unwrap();

    migrator
        .up(UpOptions {
            step: Some(1),
            ..UpOptions::default()
        })
        .await
        .unwrap();
    let report = migrator.up(UpOptions::default()).await.unwrap();
    assert_eq!(report.batch, Some(2));

    let report = migrator.down(DownOptions::default()).await.unwrap();
    assert_eq!(report.ids().collect::<Vec<_>>(), vec![C, B]);
    assert!(table_exists(&adapter, "users").await);
    assert!(!table_exists(&adapter, "posts").await);

    let report = migrator.down(DownOptions::default()).await.unwrap();
    assert_eq!(report.ids().collect::<Vec<_>>(), vec![A]);

    let report = migrator.down(DownOptions::default()).await.unwrap();
    assert!(report.is_empty());
}

#[tokio::test]
async fn test_down_to_reverts_everything_from_target() {
    let adapter = sqlite_adapter().await;
    let migrator = Migrator::new(
        Arc::clone(&adapter),
        vec![creates(A, "users"), creates(B, "posts"), creates(C, "tags")],
    )
    .unwrap();
    migrator.up(UpOptions::default()).await.unwrap();

    let report = migrator
        .down(DownOptions {
            to: Some(B.to_string()),
            ..DownOptions::default()
        })
        .await
        .unwrap();
    assert_eq!(report.ids().collect::<Vec<_>>(), vec![C, B]);
    assert!(table_exists(&adapter, "users").await);
    assert!(!table_exists(&adapter, "tags").await);
}

#[tokio::test]
async fn test_missing_definition() {
    let adapter = sqlite_adapter().await;
    Migrator::new(
        Arc::clone(&adapter),
        vec![creates(A, "users"), creates(B, "posts")],
    )
    .unwrap()
    .up(UpOptions::default())
    .await
    .unwrap();

    let migrator = Migrator::new(Arc::clone(&adapter), vec![creates(A, "users")]).unwrap();
    let statuses = migrator.status().await.unwrap();
    assert_eq!(
        ids(&statuses),
        vec![(A, MigrationState::Applied), (B, MigrationState::Missing)]
    );
    assert_eq!(statuses[1].name, "create_posts");

    let err = migrator.down(DownOptions::default()).await.unwrap_err();
    assert!(matches!(err, MigrateError::MissingDefinition(id) if id == B));
    assert!(table_exists(&adapter, "posts").await);
}

#[tokio::test]
async fn test_custom_journal_table() {
    let adapter = sqlite_adapter().await;
    let migrator = Migrator::new(Arc::clone(&adapter), vec![creates(A, "users")])
        .unwrap()
        .with_config(MigratorConfig::default().table("schema_history"));

    migrator.up(UpOptions::default()).await.unwrap();
    assert!(table_exists(&adapter, "schema_history").await);
    assert!(!table_exists(&adapter, "oxide_migrations").await);
}

#[tokio::test]
async fn test_journal_lookup_uses_configured_schema() {
    let client = RecordingClient::new();
    let adapter = Arc::new(Adapter::new(client.clone(), Dialect::postgres()));
    let migrator = Migrator::new(adapter, vec![creates(A, "users")])
        .unwrap()
        .with_config(MigratorConfig::default().schema("ops"));

    migrator.status().await.unwrap();

    let statements = client.statements();
    let lookup = statements
        .iter()
        .find(|s| s.starts_with("select count(*)"))
        .unwrap();
    assert!(lookup.ends_with("where table_name = $1 and table_schema = $2"));
}

#[tokio::test]
async fn test_dry_run_on_sqlite_changes_nothing() {
    let adapter = sqlite_adapter().await;
    let migrator = Migrator::new(Arc::clone(&adapter), vec![creates(A, "users")]).unwrap();

    let report = migrator
        .up(UpOptions {
            dry_run: true,
            ..UpOptions::default()
        })
        .await
        .unwrap();
    assert!(report.dry_run);
    let statements: Vec<&str> = report.migrations[0]
        .statements
        .iter()
        .map(|s| s.text.as_str())
        .collect();
    assert_eq!(statements.len(), 2);
    assert!(statements[0].starts_with("create table \"users\""));
    assert!(statements[1].starts_with("insert into \"oxide_migrations\""));

    assert!(!table_exists(&adapter, "users").await);
    assert!(!table_exists(&adapter, "oxide_migrations").await);
}

#[tokio::test]
async fn test_dry_run_is_bracketed_by_the_lock() {
    let client = RecordingClient::new();
    let adapter = Arc::new(Adapter::new(client.clone(), Dialect::postgres()));
    let migrator = Migrator::new(adapter, vec![creates(A, "users")]).unwrap();

    let report = migrator
        .up(UpOptions {
            dry_run: true,
            ..UpOptions::default()
        })
        .await
        .unwrap();
    assert_eq!(report.ids().collect::<Vec<_>>(), vec![A]);

    let statements = client.statements();
    assert!(statements[0].starts_with("select pg_advisory_lock("));
    assert!(statements.last().unwrap().starts_with("select pg_advisory_unlock("));
    assert!(!statements.iter().any(|s| s.starts_with("create table")));
    assert!(!statements.iter().any(|s| s.starts_with("insert")));
    assert_eq!(client.acquired(), 1);
    assert_eq!(client.released(), 1);
}

#[tokio::test]
async fn test_lock_released_when_migration_fails() {
    let client = RecordingClient::new();
    client.fail_on("create table widgets");
    let adapter = Arc::new(Adapter::new(client.clone(), Dialect::postgres()));
    let widgets = MigrationDescriptor::from_operations(
        A,
        "widgets",
        vec![MigrationOp::raw("create table widgets (id integer)")],
        vec![MigrationOp::raw("drop table widgets")],
    )
    .unwrap();
    let migrator = Migrator::new(Arc::clone(&adapter), vec![widgets]).unwrap();

    assert!(migrator.up(UpOptions::default()).await.is_err());

    let statements = client.statements();
    assert!(statements.iter().any(|s| s == "begin"));
    assert!(statements.iter().any(|s| s == "rollback"));
    assert!(!statements.iter().any(|s| s.starts_with("insert")));
    assert!(statements.last().unwrap().starts_with("select pg_advisory_unlock("));
    assert_eq!(client.acquired(), 2);
    assert_eq!(client.released(), 2);
    assert_eq!(adapter.open_transactions(), 0);
}

#[tokio::test]
async fn test_required_transaction_fails_fast_without_transactional_ddl() {
    let client = RecordingClient::new();
    let adapter = Arc::new(Adapter::new(client.clone(), Dialect::mysql()));
    let first = MigrationDescriptor::from_operations(
        A,
        "gadgets",
        vec![MigrationOp::raw("create table gadgets (id integer)")],
        Vec::new(),
    )
    .unwrap();
    let second = MigrationDescriptor::from_operations(
        B,
        "widgets",
        vec![MigrationOp::raw("create table widgets (id integer)")],
        Vec::new(),
    )
    .unwrap()
    .transaction(TransactionMode::Required);
    let migrator = Migrator::new(adapter, vec![first, second]).unwrap();

    let err = migrator.up(UpOptions::default()).await.unwrap_err();
    assert!(matches!(err, MigrateError::TransactionRequired(id) if id == B));

    let statements = client.statements();
    assert!(!statements.iter().any(|s| s.contains("gadgets")));
    assert!(!statements.iter().any(|s| s.contains("widgets")));
    assert_eq!(statements[0], "select get_lock('oxide_migrations', -1)");
    assert_eq!(
        statements.last().map(String::as_str),
        Some("select release_lock('oxide_migrations')")
    );
}

#[tokio::test]
async fn test_transaction_none_runs_without_begin() {
    let client = RecordingClient::new();
    let adapter = Arc::new(Adapter::new(client.clone(), Dialect::postgres()));
    let concurrent = MigrationDescriptor::from_operations(
        A,
        "index_users",
        vec![MigrationOp::raw("create index concurrently users_email on users (email)")],
        Vec::new(),
    )
    .unwrap()
    .transaction(TransactionMode::None);
    let migrator = Migrator::new(adapter, vec![concurrent]).unwrap();

    migrator.up(UpOptions::default()).await.unwrap();

    let statements = client.statements();
    assert!(!statements.iter().any(|s| s == "begin"));
    assert!(statements
        .iter()
        .any(|s| s.starts_with("create index concurrently")));
    assert!(statements
        .iter()
        .any(|s| s.starts_with("insert into \"oxide_migrations\"")));
}

/// Creates a table and seeds it through the query API.
struct SeedCountries;

#[async_trait]
impl MigrationHandler for SeedCountries {
    async fn up(&self, ctx: &mut MigrationContext<'_>) -> Result<()> {
        ctx.create_table(
            oxide_dal_core::schema::CreateTableBuilder::new()
                .name("countries")
                .column(oxide_dal_core::schema::integer("id").primary_key().build())
                .column(oxide_dal_core::schema::text("label").build())
                .build(),
        )
        .await?;
        for (id, label) in [(1, "Belgium"), (2, "Japan")] {
            ctx.execute(&Query::insert(
                "countries",
                [
                    ("id", SqlValue::Int(id)),
                    ("label", SqlValue::Text(label.to_string())),
                ],
            )
            .into())
            .await?;
        }
        Ok(())
    }

    async fn down(&self, ctx: &mut MigrationContext<'_>) -> Result<()> {
        ctx.drop_table("countries").await
    }
}

#[tokio::test]
async fn test_custom_handler() {
    let adapter = sqlite_adapter().await;
    let seed = MigrationDescriptor::new(A, "seed_countries", "v1", SeedCountries);
    let migrator = Migrator::new(Arc::clone(&adapter), vec![seed]).unwrap();

    let report = migrator
        .up(UpOptions {
            dry_run: true,
            ..UpOptions::default()
        })
        .await
        .unwrap();
    assert_eq!(report.migrations[0].statements.len(), 4);
    assert!(!table_exists(&adapter, "countries").await);

    let report = migrator.up(UpOptions::default()).await.unwrap();
    assert_eq!(report.migrations[0].statements.len(), 4);
    let outcome = adapter
        .execute(&Query::Count(Aggregate::from("countries")), None)
        .await
        .unwrap();
    assert_eq!(outcome.count, Some(2));

    migrator.down(DownOptions::default()).await.unwrap();
    assert!(!table_exists(&adapter, "countries").await);
}
