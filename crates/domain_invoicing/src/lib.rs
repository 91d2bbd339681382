//! Invoicing domain - numbering and the invoice lifecycle
//!
//! - Gap-free, per-company, per-year invoice numbers (`INV-YYYY000001`)
//! - Line pricing with discount and tax, rounded half away from zero
//! - The draft/issued/sent/partial/paid/cancelled status machine
//! - Exactly one receivable per issued invoice

pub mod error;
pub mod invoice;
pub mod line;
pub mod numbering;
pub mod ports;
pub mod service;

pub use error::InvoiceError;
pub use invoice::{CreateInvoiceRequest, Invoice, InvoiceDisplayStatus, InvoiceStatus};
pub use line::{
    price_lines, InvoiceLine, InvoiceTotals, LineAmounts, LineInput, MAX_QUANTITY, TOTALS_TOLERANCE,
};
pub use numbering::{InvoiceNumber, InvoiceNumberingService, INVOICE_SEQUENCE_KEY};
pub use ports::{InvoicePort, InvoiceQuery, SequencePort};
pub use service::InvoiceService;
