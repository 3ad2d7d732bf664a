//! Integration tests for the table gateway against in-memory SQLite.

#![allow(missing_docs)]

mod common;

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use common::{Recorder, assert_sql_contains, sqlite};
use serde_json::json;
use tessera_orm::{Error, FieldSpec, FieldType, Record, Table, Value, record};
use tessera_sql::{Connection, DataType};

async fn column_names(conn: &Arc<dyn Connection>, table: &str) -> Vec<String> {
    conn.table_info(table.to_string())
        .await
        .unwrap()
        .into_iter()
        .map(|column| column.name)
        .collect()
}

#[tokio::test]
async fn insert_creates_table() {
    let conn = sqlite();
    let table = Table::new(Arc::clone(&conn), "test");

    let stored = table.insert(&record! { "test" => 1 }).await.unwrap();

    assert_eq!(stored, record! { "id" => 1, "test" => 1.0 });
    assert_eq!(column_names(&conn, "test").await, ["id", "test"]);
}

#[tokio::test]
async fn insert_alters_table_and_like_matches() {
    let conn = sqlite();
    let table = Table::new(Arc::clone(&conn), "test");

    table.insert(&record! { "test" => 1 }).await.unwrap();
    let stored = table.insert(&record! { "field" => "success", "test" => 2 }).await.unwrap();

    assert_eq!(stored, record! { "id" => 2, "field" => "success", "test" => 2.0 });
    assert_eq!(column_names(&conn, "test").await, ["id", "test", "field"]);

    let found = table.find(&record! { "field" => "%ess" }).await.unwrap();
    assert_eq!(found, vec![stored]);
}

#[tokio::test]
async fn alter_preserves_existing_rows() {
    let conn = sqlite();
    let table = Table::new(Arc::clone(&conn), "test");

    for n in 1..=3 {
        table.insert(&record! { "test" => n }).await.unwrap();
    }
    table.insert(&record! { "test" => 4, "label" => "new" }).await.unwrap();

    let all = table.find(&Record::new()).await.unwrap();
    assert_eq!(all.len(), 4);
    assert_eq!(all[0], record! { "id" => 1, "test" => 1.0 });
    assert_eq!(all[2], record! { "id" => 3, "test" => 3.0 });
    assert_eq!(all[3].get("label"), Some(&Value::from("new")));
}

#[tokio::test]
async fn booleans_are_stored_as_tagged_integers() {
    let conn = sqlite();
    let table = Table::new(Arc::clone(&conn), "flags");

    let stored = table.insert(&record! { "success" => true }).await.unwrap();
    assert_eq!(stored.get("success"), Some(&Value::Boolean(true)));
    table.insert(&record! { "success" => false }).await.unwrap();

    let rows = conn
        .query(r#"SELECT "success::boolean" FROM "flags" ORDER BY "id""#.to_string(), vec![])
        .await
        .unwrap();
    assert_eq!(rows[0].get("success::boolean"), Some(&DataType::Int64(Some(1))));
    assert_eq!(rows[1].get("success::boolean"), Some(&DataType::Int64(Some(0))));

    let failures = table.find(&record! { "success" => false }).await.unwrap();
    assert_eq!(failures, vec![record! { "id" => 2, "success" => false }]);
}

#[tokio::test]
async fn dates_objects_and_arrays_round_trip() {
    let conn = sqlite();
    let table = Table::new(Arc::clone(&conn), "things");
    let at = Utc.timestamp_millis_opt(1_672_531_200_123).unwrap();

    let stored = table
        .insert(&record! {
            "at" => at,
            "meta" => json!({ "hola": "mundo", "n": 2 }),
            "tags" => json!(["list", "two", "three"]),
        })
        .await
        .unwrap();

    assert_eq!(stored.get("at"), Some(&Value::Date(at)));
    assert_eq!(stored.get("meta"), Some(&Value::from(json!({ "hola": "mundo", "n": 2 }))));
    assert_eq!(stored.get("tags"), Some(&Value::from(json!(["list", "two", "three"]))));
    assert_eq!(column_names(&conn, "things").await, ["id", "at::date", "meta::object", "tags::array"]);

    let rows = conn.query(r#"SELECT * FROM "things""#.to_string(), vec![]).await.unwrap();
    assert_eq!(rows[0].get("at::date"), Some(&DataType::Int64(Some(1_672_531_200_123))));

    let found = table.find(&record! { "at" => at }).await.unwrap();
    assert_eq!(found, vec![stored]);
}

#[tokio::test]
async fn missing_json_values_decode_empty() {
    let conn = sqlite();
    let table = Table::new(Arc::clone(&conn), "things");

    table.insert(&record! { "meta" => json!({ "a": 1 }), "tags" => json!([1]) }).await.unwrap();
    let stored = table.insert(&record! { "name" => "bare" }).await.unwrap();

    assert_eq!(stored.get("meta"), Some(&Value::Object(serde_json::Map::new())));
    assert_eq!(stored.get("tags"), Some(&Value::Array(vec![])));
}

#[tokio::test]
async fn null_filter_matches_missing_values() {
    let conn = sqlite();
    let table = Table::new(Arc::clone(&conn), "test");

    table.insert(&record! { "test" => 1 }).await.unwrap();
    table.insert(&record! { "test" => 2, "field" => "x" }).await.unwrap();

    let found = table.find(&record! { "field" => Value::Null }).await.unwrap();
    assert_eq!(found, vec![record! { "id" => 1, "test" => 1.0 }]);
}

#[tokio::test]
async fn find_by_id() {
    let conn = sqlite();
    let table = Table::new(Arc::clone(&conn), "test");
    let stored = table.insert(&record! { "test" => 1 }).await.unwrap();

    assert_eq!(table.find_by_id(1).await.unwrap(), Some(stored.clone()));
    assert_eq!(table.find_by_id("1").await.unwrap(), Some(stored));
    assert_eq!(table.find_by_id(2).await.unwrap(), None);
    assert_eq!(table.find_by_id("one").await.unwrap(), None);
}

#[tokio::test]
async fn non_numeric_identifier_issues_no_query() {
    let recorder = Recorder::new();
    let table = Table::new(Arc::new(recorder.clone()), "test");

    assert_eq!(table.find_by_id("abc").await.unwrap(), None);
    assert!(recorder.statements().is_empty());
}

#[tokio::test]
async fn find_on_missing_table_is_empty() {
    let recorder = Recorder::new();
    let table = Table::new(Arc::new(recorder.clone()), "nothing");

    assert!(table.find(&record! { "test" => 1 }).await.unwrap().is_empty());
    assert_eq!(table.find_by_id(1).await.unwrap(), None);
    assert!(recorder.ddl().is_empty());
    assert!(recorder.selects().is_empty());
}

#[tokio::test]
async fn update_returns_changed_row() {
    let conn = sqlite();
    let table = Table::new(Arc::clone(&conn), "test");
    table.insert(&record! { "test" => 1, "field" => "before" }).await.unwrap();

    let updated = table.update(1, &record! { "field" => "after", "done" => true }).await.unwrap();
    assert_eq!(
        updated,
        Some(record! { "id" => 1, "test" => 1.0, "field" => "after", "done" => true })
    );

    assert_eq!(table.update(9, &record! { "field" => "x" }).await.unwrap(), None);
    assert_eq!(table.update("nope", &record! { "field" => "x" }).await.unwrap(), None);
}

#[tokio::test]
async fn empty_update_returns_current_row() {
    let recorder = Recorder::new();
    let table = Table::new(Arc::new(recorder.clone()), "test");
    let stored = table.insert(&record! { "test" => 1 }).await.unwrap();

    recorder.clear();
    assert_eq!(table.update(1, &Record::new()).await.unwrap(), Some(stored));
    assert!(recorder.statements().iter().all(|sql| !sql.starts_with("UPDATE")));
}

#[tokio::test]
async fn ensure_is_idempotent() {
    let recorder = Recorder::new();
    let table = Table::with_fields(
        Arc::new(recorder.clone()),
        "declared",
        [FieldSpec::new("name", FieldType::String), FieldSpec::new("done", FieldType::Boolean)],
    );

    table.schema().await.unwrap();
    let ddl = recorder.ddl();
    assert_eq!(ddl.len(), 1);
    assert_sql_contains(&ddl[0], &["CREATE TABLE declared", "name TEXT", "done::boolean INTEGER"]);

    recorder.clear();
    table.schema().await.unwrap();
    table.insert(&record! { "name" => "a" }).await.unwrap();
    assert!(recorder.ddl().is_empty());
    assert!(recorder.statements().iter().all(|sql| !sql.contains("pragma_table_info")));
}

#[tokio::test]
async fn declared_required_fields_decode_null() {
    let conn = sqlite();
    let table = Table::with_fields(
        Arc::clone(&conn),
        "declared",
        [FieldSpec::new("name", FieldType::String), FieldSpec::new("note", FieldType::String).optional()],
    );

    let stored = table.insert(&Record::new()).await.unwrap();
    assert_eq!(stored, record! { "id" => 1, "name" => Value::Null });
}

#[tokio::test]
async fn undeclared_record_value_is_unsupported() {
    let conn = sqlite();
    let table = Table::new(Arc::clone(&conn), "test");

    let err = table.insert(&record! { "nested" => Record::with_id(1) }).await.unwrap_err();
    assert!(matches!(err, Error::UnsupportedType { .. }));
}

#[tokio::test]
async fn untagged_legacy_columns_are_read() {
    let conn = sqlite();
    conn.exec(
        r#"CREATE TABLE legacy (id INTEGER PRIMARY KEY AUTOINCREMENT, owner INTEGER, score REAL, label TEXT)"#
            .to_string(),
        vec![],
    )
    .await
    .unwrap();
    conn.exec("INSERT INTO legacy (owner, score, label) VALUES (5, 1.5, 'x')".to_string(), vec![])
        .await
        .unwrap();

    let table = Table::new(Arc::clone(&conn), "legacy");
    let rows = table.find(&Record::new()).await.unwrap();
    assert_eq!(
        rows,
        vec![record! { "id" => 1, "owner" => Record::with_id(5), "score" => 1.5, "label" => "x" }]
    );
}

#[tokio::test]
async fn engine_failures_carry_sql() {
    let conn = sqlite();
    conn.exec(r#"CREATE TABLE strict (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT NOT NULL)"#.to_string(), vec![])
        .await
        .unwrap();

    let table = Table::new(Arc::clone(&conn), "strict");
    let err = table.insert(&record! { "name" => Value::Null }).await.unwrap_err();
    let Error::Statement { sql, params, .. } = err else {
        panic!("expected a statement error, got {err:?}");
    };
    assert_sql_contains(&sql, &["INSERT INTO strict (name) VALUES (?) RETURNING *"]);
    assert_eq!(params, vec![DataType::Str(None)]);
}

#[tokio::test]
async fn mismatched_value_is_rejected_before_writing() {
    let conn = sqlite();
    let table = Table::new(Arc::clone(&conn), "things");
    let at = Utc.timestamp_millis_opt(1_672_531_200_123).unwrap();
    table.insert(&record! { "at" => at }).await.unwrap();

    let err = table.insert(&record! { "at" => "x" }).await.unwrap_err();
    assert!(matches!(err, Error::InvalidValue { ref field, expected: "date", .. } if field == "at"));

    // the table stays readable
    assert_eq!(table.find(&Record::new()).await.unwrap(), vec![record! { "id" => 1, "at" => at }]);
}

#[tokio::test]
async fn columns_follow_record_order() {
    let conn = sqlite();
    let table = Table::new(Arc::clone(&conn), "ordered");

    table.insert(&record! { "test" => 1, "field" => "x", "active" => true }).await.unwrap();
    assert_eq!(column_names(&conn, "ordered").await, ["id", "test", "field", "active::boolean"]);
}

#[tokio::test]
async fn empty_record_creates_identifier_only_table() {
    let conn = sqlite();
    let table = Table::new(Arc::clone(&conn), "bare");

    let stored = table.insert(&Record::new()).await.unwrap();
    assert_eq!(stored, Record::with_id(1));
    assert_eq!(column_names(&conn, "bare").await, ["id"]);
}

#[tokio::test]
async fn find_does_not_create_schemaless_table() {
    let conn = sqlite();
    let table = Table::new(Arc::clone(&conn), "absent");

    assert!(table.find(&Record::new()).await.unwrap().is_empty());
    assert!(column_names(&conn, "absent").await.is_empty());
}

#[tokio::test]
async fn raw_sql_rows_are_decoded() {
    let conn = sqlite();
    let table = Table::new(Arc::clone(&conn), "flags");
    table.insert(&record! { "success" => true }).await.unwrap();
    table.insert(&record! { "success" => false }).await.unwrap();

    let rows = table
        .sql(r#"SELECT * FROM "flags" WHERE "success::boolean" = ?"#, vec![DataType::Int64(Some(1))])
        .await
        .unwrap();
    assert_eq!(rows, vec![record! { "id" => 1, "success" => true }]);

    let err = table.sql("SELECT * FROM nowhere", vec![]).await.unwrap_err();
    assert!(matches!(err, Error::Statement { ref sql, .. } if sql == "SELECT * FROM nowhere"));
}

#[tokio::test]
async fn invalidate_rereads_external_columns() {
    let conn = sqlite();
    let table = Table::new(Arc::clone(&conn), "test");
    table.insert(&record! { "test" => 1 }).await.unwrap();

    conn.exec(r#"ALTER TABLE "test" ADD COLUMN "label" TEXT"#.to_string(), vec![]).await.unwrap();
    conn.exec(r#"UPDATE "test" SET "label" = 'x'"#.to_string(), vec![]).await.unwrap();
    assert_eq!(table.find(&Record::new()).await.unwrap(), vec![record! { "id" => 1, "test" => 1.0 }]);

    table.invalidate();
    assert_eq!(
        table.find(&Record::new()).await.unwrap(),
        vec![record! { "id" => 1, "test" => 1.0, "label" => "x" }]
    );
}
