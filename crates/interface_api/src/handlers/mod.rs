//! Request handlers

pub mod close;
pub mod equity;
pub mod health;
pub mod invoices;
pub mod payables;
pub mod provisions;
pub mod receivables;
pub mod reports;
