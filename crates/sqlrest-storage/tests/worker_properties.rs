// SPDX-FileCopyrightText: 2026 SQLRest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end behavior of the worker against a real database file.

use std::sync::Arc;

use sqlrest_config::model::StorageConfig;
use sqlrest_core::{ErrorCode, Outcome, Payload, Row, Value};
use sqlrest_storage::{Request, RowQuery, SortOrder, Worker};
use tempfile::TempDir;

async fn open(dir: &TempDir) -> Worker {
    let path = dir.path().join("props.db");
    Worker::open(&StorageConfig::for_path(path.to_str().unwrap()))
        .await
        .expect("worker should open")
}

async fn people(dir: &TempDir) -> Worker {
    let worker = open(dir).await;
    worker
        .execute(
            "CREATE TABLE people (id INTEGER PRIMARY KEY, name TEXT NOT NULL, age INTEGER, photo BLOB)",
            vec![],
        )
        .await
        .unwrap();
    worker
}

fn rows(payload: Payload) -> Vec<Row> {
    match payload {
        Payload::Rows(rows) => rows,
        other => panic!("expected rows, got {other:?}"),
    }
}

#[tokio::test]
async fn example_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let worker = open(&dir).await;

    assert_eq!(worker.list_tables().await.unwrap(), Payload::Tables(vec![]));

    let created = worker
        .execute("CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT)", vec![])
        .await
        .unwrap();
    assert_eq!(created.affected(), Some(0));

    let id = worker
        .insert("t", Row::new().with("name", "a"))
        .await
        .unwrap();
    assert_eq!(id, Payload::Inserted(1));

    let listed = rows(worker.list_rows("t", RowQuery::new()).await.unwrap());
    assert_eq!(listed, vec![Row::new().with("id", 1).with("name", "a")]);

    let updated = worker
        .update("t", Row::new().with("id", 1), Row::new().with("name", "b"))
        .await
        .unwrap();
    assert_eq!(updated, Payload::Affected(1));

    let deleted = worker.delete("t", Row::new().with("id", 1)).await.unwrap();
    assert_eq!(deleted, Payload::Affected(1));

    let listed = rows(worker.list_rows("t", RowQuery::new()).await.unwrap());
    assert!(listed.is_empty());

    worker.close().await.unwrap();
}

#[tokio::test]
async fn list_rows_returns_every_row_with_every_column() {
    let dir = tempfile::tempdir().unwrap();
    let worker = people(&dir).await;

    for i in 0..25 {
        worker
            .insert("people", Row::new().with("name", format!("p{i}")).with("age", i))
            .await
            .unwrap();
    }

    let listed = rows(worker.list_rows("people", RowQuery::new()).await.unwrap());
    assert_eq!(listed.len(), 25);
    for row in &listed {
        assert_eq!(
            row.columns().collect::<Vec<_>>(),
            vec!["id", "name", "age", "photo"]
        );
    }
}

#[tokio::test]
async fn insert_round_trips_through_list_rows() {
    let dir = tempfile::tempdir().unwrap();
    let worker = people(&dir).await;

    let Payload::Inserted(id) = worker
        .insert(
            "people",
            Row::new()
                .with("name", "Zoë")
                .with("age", Value::Null)
                .with("photo", vec![0u8, 159, 146, 150]),
        )
        .await
        .unwrap()
    else {
        panic!("insert should yield an id");
    };

    let listed = rows(
        worker
            .list_rows("people", RowQuery::new().filter("id", id))
            .await
            .unwrap(),
    );
    assert_eq!(
        listed,
        vec![
            Row::new()
                .with("id", id)
                .with("name", "Zoë")
                .with("age", Value::Null)
                .with("photo", vec![0u8, 159, 146, 150])
        ]
    );
}

#[tokio::test]
async fn update_and_delete_report_zero_for_missing_keys() {
    let dir = tempfile::tempdir().unwrap();
    let worker = people(&dir).await;
    worker
        .insert("people", Row::new().with("name", "a"))
        .await
        .unwrap();

    let updated = worker
        .update("people", Row::new().with("id", 1), Row::new().with("age", 40))
        .await
        .unwrap();
    assert_eq!(updated, Payload::Affected(1));
    let listed = rows(
        worker
            .list_rows("people", RowQuery::new().filter("id", 1))
            .await
            .unwrap(),
    );
    assert_eq!(listed[0].get("age"), Some(&Value::Integer(40)));

    let missing = worker
        .update("people", Row::new().with("id", 99), Row::new().with("age", 1))
        .await
        .unwrap();
    assert_eq!(missing, Payload::Affected(0));

    let missing = worker
        .delete("people", Row::new().with("id", 99))
        .await
        .unwrap();
    assert_eq!(missing, Payload::Affected(0));
}

#[tokio::test]
async fn delete_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let worker = people(&dir).await;
    worker
        .insert("people", Row::new().with("name", "a"))
        .await
        .unwrap();

    let first = worker.delete("people", Row::new().with("id", 1)).await;
    let second = worker.delete("people", Row::new().with("id", 1)).await;
    assert_eq!(first.unwrap(), Payload::Affected(1));
    assert_eq!(second.unwrap(), Payload::Affected(0));

    let listed = rows(
        worker
            .list_rows("people", RowQuery::new().filter("id", 1))
            .await
            .unwrap(),
    );
    assert!(listed.is_empty());
}

#[tokio::test]
async fn concurrent_callers_never_lose_updates() {
    let dir = tempfile::tempdir().unwrap();
    let worker = Arc::new(open(&dir).await);
    worker
        .execute(
            "CREATE TABLE counter (id INTEGER PRIMARY KEY, n INTEGER NOT NULL)",
            vec![],
        )
        .await
        .unwrap();
    worker
        .insert("counter", Row::new().with("id", 1).with("n", 0))
        .await
        .unwrap();

    // Read-modify-write split over two requests would race without ordering;
    // a single UPDATE per caller checks that none is lost or interleaved.
    let mut tasks = Vec::new();
    for _ in 0..4 {
        let worker = Arc::clone(&worker);
        tasks.push(tokio::spawn(async move {
            let pending: Vec<_> = (0..25)
                .map(|_| worker.execute("UPDATE counter SET n = n + 1 WHERE id = 1", vec![]))
                .collect();
            for completion in pending {
                assert_eq!(completion.await.unwrap().affected(), Some(1));
            }
        }));
    }
    for task in futures::future::join_all(tasks).await {
        task.unwrap();
    }

    let listed = rows(worker.list_rows("counter", RowQuery::new()).await.unwrap());
    assert_eq!(listed[0].get("n"), Some(&Value::Integer(100)));
}

#[tokio::test]
async fn earlier_submission_executes_first() {
    let dir = tempfile::tempdir().unwrap();
    let worker = open(&dir).await;
    worker
        .execute("CREATE TABLE seq (step TEXT)", vec![])
        .await
        .unwrap();

    // B is awaited first; A must still have run before it.
    let a = worker.insert("seq", Row::new().with("step", "A"));
    let b = worker.execute(
        "INSERT INTO seq (step) SELECT 'B after ' || group_concat(step) FROM seq",
        vec![],
    );
    b.await.unwrap();
    a.await.unwrap();

    let listed = rows(
        worker
            .list_rows("seq", RowQuery::new().order_by("rowid", SortOrder::Asc))
            .await
            .unwrap(),
    );
    assert_eq!(listed[1].get("step"), Some(&Value::from("B after A")));
}

#[tokio::test]
async fn metacharacters_in_values_are_data() {
    let dir = tempfile::tempdir().unwrap();
    let worker = people(&dir).await;
    let hostile = "'; DROP TABLE people; --";

    worker
        .insert("people", Row::new().with("name", hostile))
        .await
        .unwrap();
    let matched = rows(
        worker
            .list_rows("people", RowQuery::new().filter("name", hostile))
            .await
            .unwrap(),
    );
    assert_eq!(matched.len(), 1);
    assert_eq!(matched[0].get("name"), Some(&Value::from(hostile)));

    worker
        .update(
            "people",
            Row::new().with("name", hostile),
            Row::new().with("age", 1),
        )
        .await
        .unwrap();
    assert_eq!(
        worker.list_tables().await.unwrap(),
        Payload::Tables(vec!["people".into()])
    );
}

#[tokio::test]
async fn hostile_identifiers_never_reach_the_database() {
    let dir = tempfile::tempdir().unwrap();
    let worker = people(&dir).await;

    let cases = [
        Request::ListRows {
            table: "people; DROP TABLE people".into(),
            query: RowQuery::new(),
        },
        Request::Insert {
            table: "people".into(),
            row: Row::new().with("name\"", "x"),
        },
        Request::Update {
            table: "peo ple".into(),
            primary_key: Row::new().with("id", 1),
            values: Row::new().with("name", "x"),
        },
        Request::Delete {
            table: "people".into(),
            primary_key: Row::new().with("id'--", 1),
        },
    ];
    for request in cases {
        let err = worker.submit(request).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidIdentifierError);
    }
    assert_eq!(
        worker.list_tables().await.unwrap(),
        Payload::Tables(vec!["people".into()])
    );
}

#[tokio::test]
async fn unknown_filter_column_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let worker = people(&dir).await;

    let err = worker
        .list_rows("people", RowQuery::new().filter("nickname", "x"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::UnknownColumnError);

    let err = worker
        .update("people", Row::new().with("id", 1), Row::new().with("nickname", "x"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::UnknownColumnError);
}

#[tokio::test]
async fn constraint_violations_carry_driver_message() {
    let dir = tempfile::tempdir().unwrap();
    let worker = people(&dir).await;

    let outcome = Outcome::from(
        worker
            .insert("people", Row::new().with("age", 3))
            .await,
    );
    assert!(!outcome.success);
    assert_eq!(outcome.error_code, Some(ErrorCode::SqlExecutionError));
    assert_eq!(
        outcome.error_message.as_deref(),
        Some("NOT NULL constraint failed: people.name")
    );
}

#[tokio::test]
async fn listing_pages_and_sorts() {
    let dir = tempfile::tempdir().unwrap();
    let worker = people(&dir).await;
    for i in 1..=10 {
        worker
            .insert("people", Row::new().with("name", format!("p{i}")).with("age", i))
            .await
            .unwrap();
    }

    let page = rows(
        worker
            .list_rows(
                "people",
                RowQuery::new().order_by("age", SortOrder::Desc).page(3, 3),
            )
            .await
            .unwrap(),
    );
    let ages: Vec<i64> = page
        .iter()
        .filter_map(|r| r.get("age").and_then(Value::as_i64))
        .collect();
    assert_eq!(ages, vec![7, 6, 5]);
}

#[tokio::test]
async fn raw_sql_binds_params_and_classifies_results() {
    let dir = tempfile::tempdir().unwrap();
    let worker = people(&dir).await;

    let changes = worker
        .execute(
            "INSERT INTO people (name, age) VALUES (?1, ?2), (?3, ?4)",
            vec!["a".into(), 1.into(), "b".into(), 2.into()],
        )
        .await
        .unwrap();
    let Payload::Changes(changes) = changes else {
        panic!("mutation should report changes");
    };
    assert_eq!(changes.rows_affected, 2);
    assert_eq!(changes.last_insert_id, 2);

    let queried = rows(
        worker
            .execute("SELECT name FROM people WHERE age > ?1", vec![1.into()])
            .await
            .unwrap(),
    );
    assert_eq!(queried, vec![Row::new().with("name", "b")]);

    let err = worker.execute("SELEKT 1", vec![]).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::SqlExecutionError);
}

#[tokio::test]
async fn schema_and_info_describe_the_database() {
    let dir = tempfile::tempdir().unwrap();
    let worker = people(&dir).await;

    let Payload::Schema(schema) = worker.table_schema("people").await.unwrap() else {
        panic!("expected schema");
    };
    assert_eq!(schema.name, "people");
    assert_eq!(schema.primary_key(), vec!["id"]);
    assert_eq!(
        schema.columns.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
        vec!["id", "name", "age", "photo"]
    );

    let err = worker.table_schema("ghost").await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::SqlExecutionError);

    let Payload::Info(info) = worker.database_info().await.unwrap() else {
        panic!("expected info");
    };
    assert_eq!(info.file_name, "props.db");
    assert!(info.page_size > 0);
    assert!(info.schema_version > 0);
    assert!(!info.sqlite_version.is_empty());
}

#[tokio::test]
async fn internal_tables_are_hidden() {
    let dir = tempfile::tempdir().unwrap();
    let worker = open(&dir).await;
    worker
        .execute(
            "CREATE TABLE b (id INTEGER PRIMARY KEY AUTOINCREMENT, x)",
            vec![],
        )
        .await
        .unwrap();
    worker
        .execute("CREATE TABLE a (x)", vec![])
        .await
        .unwrap();

    // AUTOINCREMENT creates sqlite_sequence.
    assert_eq!(
        worker.list_tables().await.unwrap(),
        Payload::Tables(vec!["a".into(), "b".into()])
    );
}

#[tokio::test]
async fn data_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let worker = people(&dir).await;
    worker
        .insert("people", Row::new().with("name", "kept"))
        .await
        .unwrap();
    worker.close().await.unwrap();

    let reopened = open(&dir).await;
    let listed = rows(reopened.list_rows("people", RowQuery::new()).await.unwrap());
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].get("name"), Some(&Value::from("kept")));
}

#[tokio::test]
async fn raw_results_keep_repeated_column_names() {
    let dir = tempfile::tempdir().unwrap();
    let worker = open(&dir).await;

    let listed = rows(worker.execute("SELECT 1 AS id, 2 AS id", vec![]).await.unwrap());
    assert_eq!(listed[0].len(), 2);
    assert_eq!(listed[0].get("id"), Some(&Value::Integer(1)));
    assert_eq!(listed[0].get("id:1"), Some(&Value::Integer(2)));
}

#[tokio::test]
async fn generated_columns_can_be_filtered_and_sorted() {
    let dir = tempfile::tempdir().unwrap();
    let worker = open(&dir).await;
    worker
        .execute(
            "CREATE TABLE g (id INTEGER PRIMARY KEY, a INTEGER, b INTEGER GENERATED ALWAYS AS (a * 2))",
            vec![],
        )
        .await
        .unwrap();
    for a in [3, 1] {
        worker.insert("g", Row::new().with("a", a)).await.unwrap();
    }

    let matched = rows(
        worker
            .list_rows("g", RowQuery::new().filter("b", 6))
            .await
            .unwrap(),
    );
    assert_eq!(matched.len(), 1);
    assert_eq!(matched[0].get("a"), Some(&Value::Integer(3)));

    let sorted = rows(
        worker
            .list_rows("g", RowQuery::new().order_by("b", SortOrder::Asc))
            .await
            .unwrap(),
    );
    assert_eq!(sorted[0].get("b"), Some(&Value::Integer(2)));
}

#[tokio::test]
async fn rowid_tables_expose_rowid_for_later_updates() {
    let dir = tempfile::tempdir().unwrap();
    let worker = open(&dir).await;
    worker
        .execute("CREATE TABLE tags (label TEXT)", vec![])
        .await
        .unwrap();
    worker
        .insert("tags", Row::new().with("label", "red"))
        .await
        .unwrap();

    let listed = rows(worker.list_rows("tags", RowQuery::new()).await.unwrap());
    assert_eq!(listed[0].columns().collect::<Vec<_>>(), vec!["rowid", "label"]);
    let rowid = listed[0].get("rowid").cloned().unwrap();

    let updated = worker
        .update(
            "tags",
            Row::new().with("rowid", rowid),
            Row::new().with("label", "blue"),
        )
        .await
        .unwrap();
    assert_eq!(updated, Payload::Affected(1));
}

#[tokio::test]
async fn counted_listing_reports_total_beyond_the_page() {
    let dir = tempfile::tempdir().unwrap();
    let worker = people(&dir).await;
    for (name, age) in [("a", 30), ("b", 30), ("c", 30), ("d", 40)] {
        worker
            .insert("people", Row::new().with("name", name).with("age", age))
            .await
            .unwrap();
    }

    let query = RowQuery::new().filter("age", 30).page(2, 0).with_total();
    let Payload::Page(page) = worker.list_rows("people", query).await.unwrap() else {
        panic!("expected a page");
    };
    assert_eq!(page.rows.len(), 2);
    assert_eq!(page.total_rows, 3);
}
