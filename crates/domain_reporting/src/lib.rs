//! Reporting domain
//!
//! Aging of open obligations, the three financial statements, and the
//! monthly close. Generators are pure functions over ledger records;
//! [`ReportingService`] and [`MonthlyCloseService`] load the records
//! through the ledger and invoicing ports.

pub mod aging;
pub mod close;
pub mod error;
pub mod figures;
pub mod service;
pub mod sources;
pub mod statements;

pub use aging::{generate_aging, AgingBucket, AgingReport, BucketSet, AGING_BANDS};
pub use close::{summarize_month, ClosedMonth, MonthlyCloseService, MonthlySummary};
pub use error::ReportingError;
pub use figures::{Figure, StatementLine, StatementSection, REPORTING_TOLERANCE};
pub use service::ReportingService;
pub use sources::ReportingSources;
pub use statements::{
    generate_balance_sheet, generate_cash_flow, generate_profit_and_loss, BalanceSheet, BalanceSheetInputs,
    CashFlowMonth, CashFlowStatement, ClassifiedSection, ProfitAndLoss,
};
