//! Ledger domain - payables, receivables, provisions, and equity
//!
//! This crate tracks individual obligations owed to and by the company:
//! - Accounts payable and receivable with settlements and derived overdue status
//! - Eagerly materialized recurring series
//! - Provisions with reversal-not-edit discipline
//! - Capital contributions and distributions feeding the balance sheet
//! - Period locks consulted before any dated mutation

pub mod category;
pub mod equity;
pub mod error;
pub mod obligation;
pub mod payable;
pub mod period;
pub mod ports;
pub mod provision;
pub mod receivable;
pub mod recurrence;
pub mod service;

pub use category::{Classification, ExpenseCategory, RevenueCategory};
pub use equity::{EquityEntry, EquityKind, NewEquityEntry};
pub use error::LedgerError;
pub use obligation::{DisplayStatus, Obligation, ObligationStatus, Settlement, SettlementRequest};
pub use payable::{AccountPayable, NewPayable};
pub use period::{PeriodGuard, PeriodLock};
pub use ports::{
    CounterpartyDirectory, EquityPort, ObligationQuery, PayablePort, PeriodLockPort, ProvisionPort,
    ProvisionQuery, ReceivableInsert, ReceivablePort,
};
pub use provision::{NewProvision, Provision, ProvisionStatus, ProvisionSubject, SupersedeProvision};
pub use receivable::{AccountReceivable, InvoiceReceivable, NewReceivable, ReviewFlag};
pub use recurrence::{Recurrence, RecurrenceFrequency, SeriesRef};
pub use service::{LedgerPorts, LedgerService};
