//! Integration tests for the embedded migrations and pool helpers.
//!
//! Each test runs in its own database on the shared PostgreSQL server from
//! `wishpath-test-utils`.

use sqlx::Row;

use wishpath_db::config::DbConfig;
use wishpath_db::pool;
use wishpath_test_utils::{create_test_db, drop_test_db, test_db_config};

#[tokio::test]
async fn migrations_create_all_tables() {
    let (pool, db_name) = create_test_db().await;

    let rows = sqlx::query(
        "SELECT table_name FROM information_schema.tables \
         WHERE table_schema = 'public' ORDER BY table_name",
    )
    .fetch_all(&pool)
    .await
    .unwrap();
    let tables: Vec<String> = rows.iter().map(|r| r.get("table_name")).collect();
    for table in pool::TABLES {
        assert!(tables.iter().any(|t| t == table), "missing table {table}");
    }

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn migrations_are_idempotent() {
    let (pool, db_name) = create_test_db().await;

    pool::run_migrations(&pool)
        .await
        .expect("second run should be a no-op");

    let counts = pool::table_counts(&pool).await.unwrap();
    assert_eq!(counts.len(), pool::TABLES.len());
    assert!(counts.iter().all(|(_, n)| *n == 0));

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn status_check_constraints_reject_unknown_values() {
    let (pool, db_name) = create_test_db().await;

    let err = sqlx::query("INSERT INTO plans (title, status) VALUES ('x', 'paused')")
        .execute(&pool)
        .await
        .unwrap_err();
    let code = err
        .as_database_error()
        .and_then(|e| e.code())
        .map(|c| c.into_owned());
    assert_eq!(code.as_deref(), Some("23514"));

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn progress_is_bounded() {
    let (pool, db_name) = create_test_db().await;

    let result = sqlx::query("INSERT INTO plans (title, progress) VALUES ('x', 101)")
        .execute(&pool)
        .await;
    assert!(result.is_err());

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn ensure_database_exists_is_idempotent() {
    let config = test_db_config().await;
    let db_name = config.database_name().unwrap().to_owned();

    pool::ensure_database_exists(&config).await.unwrap();
    pool::ensure_database_exists(&config).await.unwrap();

    let pool = pool::create_pool(&config).await.unwrap();
    pool::run_migrations(&pool).await.unwrap();
    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn ensure_database_exists_rejects_unsafe_names() {
    let config = DbConfig::new("postgresql://localhost:5432/bad-name;drop");
    let err = pool::ensure_database_exists(&config).await.unwrap_err();
    assert!(err.to_string().contains("invalid characters"));
}
