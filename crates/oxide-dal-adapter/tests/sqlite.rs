mod common;

use oxide_dal_adapter::Adapter;
use oxide_dal_core::schema::{integer, text, CreateTableBuilder, MigrationOp};
use oxide_dal_core::{
    Aggregate, Dialect, Predicate, Query, Returning, Select, SortDirection, SqlValue, TableRef,
    TransactionOptions,
};

async fn adapter_with_users() -> Adapter {
    let adapter = Adapter::new(common::sqlite_client().await, Dialect::sqlite());
    let create: MigrationOp = CreateTableBuilder::new()
        .name("users")
        .column(integer("id").primary_key().autoincrement().build())
        .column(text("name").not_null().build())
        .column(integer("age").build())
        .build()
        .into();
    adapter.migrate(&create, None).await.unwrap();
    adapter
}

fn insert_user(name: &'static str, age: i64) -> Query {
    let row = [("name", SqlValue::Text(name.to_string())), ("age", SqlValue::Int(age))];
    Query::insert("users", row)
        .primary_key(&["id"])
        .returning(Returning::All)
        .into()
}

#[tokio::test]
async fn test_insert_returning_and_select() {
    let adapter = adapter_with_users().await;

    let first = adapter.execute(&insert_user("ann", 31), None).await.unwrap();
    assert_eq!(first.insert_id, Some(SqlValue::Int(1)));
    assert_eq!(first.rows_affected, 1);
    let record = &first.records()[0];
    assert_eq!(record.get("name"), Some(&SqlValue::Text("ann".into())));

    adapter.execute(&insert_user("bob", 17), None).await.unwrap();

    let adults = Select::from("users")
        .columns(&["name"])
        .filter(Predicate::gte("age", 18_i64))
        .order_by("name", SortDirection::Asc);
    let outcome = adapter.execute(&adults.into(), None).await.unwrap();
    let names: Vec<_> = outcome
        .records()
        .iter()
        .filter_map(|r| r.get("name").cloned())
        .collect();
    assert_eq!(names, vec![SqlValue::Text("ann".into())]);

    let count = adapter
        .execute(&Query::Count(Aggregate::from("users")), None)
        .await
        .unwrap();
    assert_eq!(count.count, Some(2));
}

#[tokio::test]
async fn test_eq_null_matches_missing_values() {
    let adapter = adapter_with_users().await;
    adapter
        .execute(&Query::insert("users", [("name", "ghost")]).into(), None)
        .await
        .unwrap();
    adapter.execute(&insert_user("ann", 31), None).await.unwrap();

    let missing_age = Select::from("users").filter(Predicate::eq("age", SqlValue::Null));
    let outcome = adapter.execute(&missing_age.into(), None).await.unwrap();
    assert_eq!(outcome.records().len(), 1);
    assert_eq!(
        outcome.records()[0].get("name"),
        Some(&SqlValue::Text("ghost".into()))
    );
}

#[tokio::test]
async fn test_rollback_discards_changes() {
    let adapter = adapter_with_users().await;

    let tx = adapter
        .begin_transaction(TransactionOptions::default())
        .await
        .unwrap();
    adapter
        .execute(&insert_user("ann", 31), Some(tx))
        .await
        .unwrap();
    adapter.create_savepoint(tx, "before_bob").await.unwrap();
    adapter
        .execute(&insert_user("bob", 17), Some(tx))
        .await
        .unwrap();
    adapter.rollback_to_savepoint(tx, "before_bob").await.unwrap();

    let inside = adapter
        .execute(&Query::Count(Aggregate::from("users")), Some(tx))
        .await
        .unwrap();
    assert_eq!(inside.count, Some(1));

    adapter.rollback_transaction(tx).await.unwrap();

    let after = adapter
        .execute(&Query::Count(Aggregate::from("users")), None)
        .await
        .unwrap();
    assert_eq!(after.count, Some(0));
}

#[tokio::test]
async fn test_update_and_delete_report_affected_rows() {
    let adapter = adapter_with_users().await;
    adapter.execute(&insert_user("ann", 31), None).await.unwrap();
    adapter.execute(&insert_user("bob", 17), None).await.unwrap();

    let update = Query::update("users", [("age", 18_i64)], Some(Predicate::lt("age", 18_i64)));
    let outcome = adapter.execute(&update, None).await.unwrap();
    assert_eq!(outcome.rows_affected, 1);

    let delete = Query::delete("users", None);
    let outcome = adapter.execute(&delete, None).await.unwrap();
    assert_eq!(outcome.rows_affected, 2);
}

#[tokio::test]
async fn test_table_exists() {
    let adapter = adapter_with_users().await;
    assert!(adapter
        .table_exists(&TableRef::new("users"), None)
        .await
        .unwrap());
    assert!(!adapter
        .table_exists(&TableRef::new("missing"), None)
        .await
        .unwrap());

    adapter
        .migrate(&MigrationOp::drop_table("users"), None)
        .await
        .unwrap();
    assert!(!adapter
        .table_exists(&TableRef::new("users"), None)
        .await
        .unwrap());
}
