//! Core Kernel - Foundational types shared by the back-office finance crates
//!
//! This crate provides the fundamental building blocks used across all domain modules:
//! - Money types with precise decimal arithmetic
//! - Calendar types for financial periods and an injectable clock
//! - Common identifiers and the explicit tenant context
//! - Port infrastructure and the audit sink

pub mod money;
pub mod temporal;
pub mod identifiers;
pub mod context;
pub mod audit;
pub mod ports;
pub mod error;

pub use money::{Money, Currency, MoneyError, Rate, round_money, round_half_up, MAX_AMOUNT};
pub use temporal::{
    add_months, Clock, DateRange, FixedClock, SystemClock, TemporalError, Timezone, YearMonth,
};
pub use identifiers::{
    AuditEventId, BranchId, CompanyId, ContractId, CustomerId, DocumentId, EmployeeId, IdParseError,
    EquityEntryId, InvoiceId, InvoiceLineId, PayableId, ProvisionId, ReceivableId, SeriesId,
    SettlementId, SupplierId, TemplateId, UserId,
};
pub use context::TenantContext;
pub use audit::{AuditAction, AuditEntity, AuditEvent, AuditSink, TracingAuditSink};
#[cfg(any(test, feature = "mock"))]
pub use audit::mock;
pub use ports::{AdapterHealth, DomainPort, HealthCheckResult, HealthCheckable, PortError};
pub use error::{CoreError, ErrorKind};
