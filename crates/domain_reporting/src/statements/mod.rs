//! Financial statements derived from ledger records
//!
//! Every generator is a pure function of its inputs. Reporting-currency
//! figures come from the conversions frozen on each record; nothing is
//! re-converted at report time.

pub mod balance_sheet;
pub mod cash_flow;
pub mod profit_and_loss;

pub use balance_sheet::{generate_balance_sheet, BalanceSheet, BalanceSheetInputs, ClassifiedSection};
pub use cash_flow::{generate_cash_flow, CashFlowMonth, CashFlowStatement};
pub use profit_and_loss::{generate_profit_and_loss, ProfitAndLoss};
