//! Database Test Utilities
//!
//! PostgreSQL containers for adapter integration tests. The schema comes
//! from `infra_db`'s embedded migrations, so tests run against exactly what
//! production applies.

use std::sync::Arc;

use infra_db::{create_pool, run_migrations, DatabaseConfig, DatabaseError, DatabasePool};
use testcontainers::{runners::AsyncRunner, ContainerAsync, ImageExt, TestcontainersError};
use testcontainers_modules::postgres::Postgres;
use thiserror::Error;
use tokio::sync::OnceCell;

const POSTGRES_TAG: &str = "16-alpine";
const POSTGRES_USER: &str = "test_user";
const POSTGRES_PASSWORD: &str = "test_password";
const POSTGRES_DB: &str = "back_office_test";

/// Tables truncated by [`TestDatabase::clear_data`], children first
const DATA_TABLES: &[&str] = &[
    "audit_events",
    "period_locks",
    "equity_entries",
    "provisions",
    "accounts_receivable",
    "accounts_payable",
    "invoice_lines",
    "invoices",
    "document_sequences",
    "exchange_rates",
    "employees",
    "contracts",
    "suppliers",
    "customers",
];

#[derive(Debug, Error)]
pub enum TestDatabaseError {
    #[error("container error: {0}")]
    Container(#[from] TestcontainersError),

    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("query error: {0}")]
    Query(#[from] sqlx::Error),
}

/// Configuration for test database
#[derive(Debug, Clone)]
pub struct TestDatabaseConfig {
    pub user: String,
    pub password: String,
    pub database: String,
    pub host: String,
    pub port: u16,
}

impl Default for TestDatabaseConfig {
    fn default() -> Self {
        Self {
            user: POSTGRES_USER.to_string(),
            password: POSTGRES_PASSWORD.to_string(),
            database: POSTGRES_DB.to_string(),
            host: "localhost".to_string(),
            port: 5432,
        }
    }
}

impl TestDatabaseConfig {
    pub fn connection_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.user, self.password, self.host, self.port, self.database
        )
    }
}

/// A migrated PostgreSQL container
pub struct TestDatabase {
    _container: ContainerAsync<Postgres>,
    pub config: TestDatabaseConfig,
    pub pool: DatabasePool,
}

impl TestDatabase {
    /// Starts a container and applies the migrations
    pub async fn new() -> Result<Self, TestDatabaseError> {
        let container = Postgres::default()
            .with_user(POSTGRES_USER)
            .with_password(POSTGRES_PASSWORD)
            .with_db_name(POSTGRES_DB)
            .with_tag(POSTGRES_TAG)
            .start()
            .await?;

        let config = TestDatabaseConfig {
            host: container.get_host().await?.to_string(),
            port: container.get_host_port_ipv4(5432).await?,
            ..TestDatabaseConfig::default()
        };

        let pool = create_pool(DatabaseConfig::new(config.connection_url()).max_connections(5)).await?;
        run_migrations(&pool).await?;

        Ok(Self {
            _container: container,
            config,
            pool,
        })
    }

    pub fn pool(&self) -> &DatabasePool {
        &self.pool
    }

    /// Clears all rows while preserving the schema
    pub async fn clear_data(&self) -> Result<(), TestDatabaseError> {
        sqlx::query(&format!("TRUNCATE TABLE {} CASCADE", DATA_TABLES.join(", ")))
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

static SHARED_TEST_DB: OnceCell<Arc<TestDatabase>> = OnceCell::const_new();

/// Singleton database shared across tests to avoid container start-up per test
///
/// # Panics
///
/// Panics if the container cannot be started.
pub async fn get_shared_test_database() -> Arc<TestDatabase> {
    SHARED_TEST_DB
        .get_or_init(|| async {
            Arc::new(
                TestDatabase::new()
                    .await
                    .expect("Failed to create shared test database"),
            )
        })
        .await
        .clone()
}

/// Fresh database for tests that need isolation
pub async fn create_isolated_test_database() -> Result<TestDatabase, TestDatabaseError> {
    TestDatabase::new().await
}
