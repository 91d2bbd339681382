//! Port implementations over PostgreSQL
//!
//! Each adapter owns a clone of the pool, translates between row types and
//! domain values, and maps `sqlx` failures through [`crate::DatabaseError`]
//! into `PortError`.
//!
//! ```rust,ignore
//! use infra_db::adapters::PostgresLedgerAdapter;
//!
//! let ledger = Arc::new(PostgresLedgerAdapter::new(pool.clone()));
//! let payable = ledger.get_payable(&ctx, payable_id).await?;
//! ```

pub mod audit;
pub mod directory;
pub mod invoices;
pub mod ledger;
pub mod rates;
pub mod sequences;

pub use audit::PostgresAuditSink;
pub use directory::PostgresDirectory;
pub use invoices::PostgresInvoiceAdapter;
pub use ledger::PostgresLedgerAdapter;
pub use rates::PostgresRateProvider;
pub use sequences::PostgresSequenceAdapter;
