//! PostgreSQL persistence for the back-office core
//!
//! Every domain port has an adapter here. All queries filter by the
//! caller's company, mutable records are updated under an optimistic
//! version check, and multi-row writes run in one transaction.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{create_pool, DatabaseConfig, PostgresInvoiceAdapter};
//!
//! let pool = create_pool(DatabaseConfig::new("postgres://localhost/back_office")).await?;
//! let invoices = PostgresInvoiceAdapter::new(pool.clone());
//! ```

pub mod adapters;
pub(crate) mod codec;
pub mod error;
pub mod pool;

pub use adapters::{
    PostgresAuditSink, PostgresDirectory, PostgresInvoiceAdapter, PostgresLedgerAdapter, PostgresRateProvider,
    PostgresSequenceAdapter,
};
pub use error::DatabaseError;
pub use pool::{create_pool, create_pool_from_url, run_migrations, DatabaseConfig, DatabasePool};
