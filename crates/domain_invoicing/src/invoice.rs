//! Invoice aggregate and its status machine
//!
//! ```text
//! draft   -> issued | cancelled
//! issued  -> sent | partial | paid | cancelled
//! sent    -> partial | paid | cancelled
//! partial -> paid
//! ```
//!
//! `paid` and `cancelled` are terminal. Overdue is derived when read and
//! never stored.

use chrono::{DateTime, NaiveDate, Utc};
use core_kernel::{
    BranchId, CompanyId, ContractId, Currency, CustomerId, InvoiceId, Money, TemplateId, UserId,
};
use domain_fx::ConvertedAmount;
use domain_ledger::RevenueCategory;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::InvoiceError;
use crate::line::{InvoiceLine, InvoiceTotals, LineInput};
use crate::numbering::InvoiceNumber;

/// Stored invoice status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Draft,
    Issued,
    Sent,
    Partial,
    Paid,
    Cancelled,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Issued => "issued",
            InvoiceStatus::Sent => "sent",
            InvoiceStatus::Partial => "partial",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, InvoiceStatus::Paid | InvoiceStatus::Cancelled)
    }

    /// Whether the invoice has been issued and is awaiting payment
    pub fn is_receivable(&self) -> bool {
        matches!(self, InvoiceStatus::Issued | InvoiceStatus::Sent | InvoiceStatus::Partial)
    }

    pub fn can_transition_to(&self, next: InvoiceStatus) -> bool {
        use InvoiceStatus::*;
        matches!(
            (self, next),
            (Draft, Issued)
                | (Draft, Cancelled)
                | (Issued, Sent)
                | (Issued, Partial)
                | (Issued, Paid)
                | (Issued, Cancelled)
                | (Sent, Partial)
                | (Sent, Paid)
                | (Sent, Cancelled)
                | (Partial, Paid)
        )
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvoiceStatus {
    type Err = InvoiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(InvoiceStatus::Draft),
            "issued" => Ok(InvoiceStatus::Issued),
            "sent" => Ok(InvoiceStatus::Sent),
            "partial" => Ok(InvoiceStatus::Partial),
            "paid" => Ok(InvoiceStatus::Paid),
            "cancelled" => Ok(InvoiceStatus::Cancelled),
            other => Err(InvoiceError::validation(format!("unknown invoice status: {}", other))),
        }
    }
}

/// Status as shown to users
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceDisplayStatus {
    Draft,
    Issued,
    Sent,
    Partial,
    Paid,
    Cancelled,
    Overdue,
}

impl From<InvoiceStatus> for InvoiceDisplayStatus {
    fn from(status: InvoiceStatus) -> Self {
        match status {
            InvoiceStatus::Draft => InvoiceDisplayStatus::Draft,
            InvoiceStatus::Issued => InvoiceDisplayStatus::Issued,
            InvoiceStatus::Sent => InvoiceDisplayStatus::Sent,
            InvoiceStatus::Partial => InvoiceDisplayStatus::Partial,
            InvoiceStatus::Paid => InvoiceDisplayStatus::Paid,
            InvoiceStatus::Cancelled => InvoiceDisplayStatus::Cancelled,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: InvoiceId,
    pub company_id: CompanyId,
    pub branch_id: BranchId,
    pub number: InvoiceNumber,
    pub customer_id: CustomerId,
    pub contract_id: Option<ContractId>,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub currency: Currency,
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub total: Decimal,
    /// Conversion of `total`, fixed when the invoice was priced
    pub converted: ConvertedAmount,
    pub status: InvoiceStatus,
    pub notes: Option<String>,
    pub language: Option<String>,
    pub template_id: Option<TemplateId>,
    pub category: RevenueCategory,
    pub lines: Vec<InvoiceLine>,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: i64,
}

impl Invoice {
    pub const ENTITY: &'static str = "Invoice";

    pub fn total_money(&self) -> Money {
        Money::new(self.total, self.currency)
    }

    pub fn totals(&self) -> InvoiceTotals {
        InvoiceTotals {
            subtotal: self.subtotal,
            tax_amount: self.tax_amount,
            total: self.total,
        }
    }

    /// Replaces the lines and the totals derived from them
    pub fn set_lines(&mut self, lines: Vec<InvoiceLine>) {
        let totals = InvoiceTotals::of(&lines);
        self.lines = lines;
        self.subtotal = totals.subtotal;
        self.tax_amount = totals.tax_amount;
        self.total = totals.total;
    }

    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.status.is_receivable() && self.due_date < today
    }

    pub fn display_status(&self, today: NaiveDate) -> InvoiceDisplayStatus {
        if self.is_overdue(today) {
            InvoiceDisplayStatus::Overdue
        } else {
            self.status.into()
        }
    }

    /// Moves to `next` if the status machine allows it
    pub fn transition(&mut self, next: InvoiceStatus) -> Result<(), InvoiceError> {
        if !self.status.can_transition_to(next) {
            return Err(InvoiceError::transition(self.status, next));
        }
        self.status = next;
        Ok(())
    }
}

/// Request to create a draft invoice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateInvoiceRequest {
    pub customer_id: CustomerId,
    pub contract_id: Option<ContractId>,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub currency: Currency,
    pub lines: Vec<LineInput>,
    /// Totals computed by the caller, checked against ours when present
    pub declared_totals: Option<InvoiceTotals>,
    pub notes: Option<String>,
    pub language: Option<String>,
    pub template_id: Option<TemplateId>,
    #[serde(default)]
    pub category: RevenueCategory,
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [InvoiceStatus; 6] = [
        InvoiceStatus::Draft,
        InvoiceStatus::Issued,
        InvoiceStatus::Sent,
        InvoiceStatus::Partial,
        InvoiceStatus::Paid,
        InvoiceStatus::Cancelled,
    ];

    #[test]
    fn test_terminal_states_have_no_exits() {
        for next in ALL {
            assert!(!InvoiceStatus::Paid.can_transition_to(next));
            assert!(!InvoiceStatus::Cancelled.can_transition_to(next));
        }
    }

    #[test]
    fn test_no_way_back_to_draft() {
        for from in ALL {
            assert!(!from.can_transition_to(InvoiceStatus::Draft));
        }
    }

    #[test]
    fn test_partial_only_moves_to_paid() {
        let exits: Vec<InvoiceStatus> = ALL
            .into_iter()
            .filter(|next| InvoiceStatus::Partial.can_transition_to(*next))
            .collect();
        assert_eq!(exits, vec![InvoiceStatus::Paid]);
    }

    #[test]
    fn test_status_codes() {
        for status in ALL {
            assert_eq!(status.as_str().parse::<InvoiceStatus>().unwrap(), status);
        }
        assert!("overdue".parse::<InvoiceStatus>().is_err());
    }
}
