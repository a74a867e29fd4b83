//! Shared test utilities for wishpath integration tests.
//!
//! - [`pg_url`], [`create_test_db`], [`drop_test_db`]: a PostgreSQL server
//!   shared by every test in a binary, with one throwaway database per test.
//!   When `WISHPATH_TEST_PG_URL` is set that server is used as-is; otherwise
//!   a container is started through testcontainers on first use.
//! - [`faulty::FaultyStore`]: an in-memory store with scripted failures and
//!   a gate for holding calls open.
//! - [`fixtures`]: ready-made plan trees.

pub mod faulty;
pub mod fixtures;

use sqlx::PgPool;
use testcontainers::ContainerAsync;
use testcontainers::ImageExt;
use testcontainers::runners::AsyncRunner;
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;
use uuid::Uuid;

use wishpath_db::config::DbConfig;
use wishpath_db::pool;

pub use faulty::{FaultyStore, StoreCall};

/// Environment variable naming an already running server to test against.
pub const PG_URL_ENV: &str = "WISHPATH_TEST_PG_URL";

struct SharedPg {
    base_url: String,
    _container: Option<ContainerAsync<Postgres>>,
}

static SHARED_PG: OnceCell<SharedPg> = OnceCell::const_new();

async fn init_shared_pg() -> SharedPg {
    if let Ok(url) = std::env::var(PG_URL_ENV) {
        return SharedPg {
            base_url: url.trim_end_matches('/').to_owned(),
            _container: None,
        };
    }

    let container = Postgres::default()
        .with_tag("17")
        .start()
        .await
        .expect("failed to start PostgreSQL container");
    let host = container.get_host().await.expect("failed to get host");
    let port = container
        .get_host_port_ipv4(5432)
        .await
        .expect("failed to get mapped port");

    SharedPg {
        base_url: format!("postgresql://postgres:postgres@{host}:{port}"),
        _container: Some(container),
    }
}

/// Server root URL, without a database name.
pub async fn pg_url() -> &'static str {
    &SHARED_PG.get_or_init(init_shared_pg).await.base_url
}

/// Config for a fresh, uniquely named database on the shared server. The
/// database itself is not created.
pub async fn test_db_config() -> DbConfig {
    let name = format!("wishpath_test_{}", Uuid::new_v4().simple());
    DbConfig::new(format!("{}/{name}", pg_url().await))
}

/// Create a throwaway database with migrations applied.
///
/// Returns the pool and the database name to pass to [`drop_test_db`].
pub async fn create_test_db() -> (PgPool, String) {
    let config = test_db_config().await;
    let db_name = config
        .database_name()
        .expect("generated URL has a database name")
        .to_owned();

    pool::ensure_database_exists(&config)
        .await
        .unwrap_or_else(|e| panic!("failed to create temp database {db_name}: {e:#}"));
    let pool = pool::create_pool(&config)
        .await
        .unwrap_or_else(|e| panic!("failed to connect to temp database {db_name}: {e:#}"));
    pool::run_migrations(&pool)
        .await
        .expect("migrations should succeed");

    (pool, db_name)
}

/// Drop a database made by [`create_test_db`], terminating any
/// connections still open to it.
pub async fn drop_test_db(db_name: &str) {
    let maintenance = DbConfig::new(format!("{}/postgres", pg_url().await));
    let maint_pool = pool::create_pool(&maintenance)
        .await
        .expect("failed to connect to maintenance database for cleanup");

    let _ = sqlx::query(
        "SELECT pg_terminate_backend(pid) FROM pg_stat_activity \
         WHERE datname = $1 AND pid <> pg_backend_pid()",
    )
    .bind(db_name)
    .execute(&maint_pool)
    .await;

    let stmt = format!("DROP DATABASE IF EXISTS {db_name}");
    let _ = sqlx::query(&stmt).execute(&maint_pool).await;
    maint_pool.close().await;
}
