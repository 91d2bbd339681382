//! Test Utilities Crate
//!
//! Shared test infrastructure for the back-office workspace.
//!
//! # Modules
//!
//! - `fixtures`: Pre-built amounts, dates, and tenants
//! - `builders`: Request builders and the in-memory service harness
//! - `database`: PostgreSQL container management for adapter tests
//! - `assertions`: Assertion helpers for money, conversions, and statements
//! - `generators`: Property-based test data generators

pub mod assertions;
pub mod builders;
pub mod database;
pub mod fixtures;
pub mod generators;

pub use assertions::*;
pub use builders::*;
pub use database::*;
pub use fixtures::*;
pub use generators::*;
