//! Accounts receivable

use chrono::{DateTime, NaiveDate, Utc};
use core_kernel::{BranchId, CompanyId, CustomerId, InvoiceId, Money, ReceivableId, UserId};
use domain_fx::ConvertedAmount;
use serde::{Deserialize, Serialize};

use crate::category::{Classification, RevenueCategory};
use crate::obligation::{DisplayStatus, Obligation};
use crate::recurrence::{Recurrence, SeriesRef};

/// Marks a receivable that needs an operator's attention
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewFlag {
    pub reason: String,
    pub flagged_at: DateTime<Utc>,
}

/// An amount a customer owes the company
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountReceivable {
    pub id: ReceivableId,
    pub company_id: CompanyId,
    pub branch_id: BranchId,
    pub customer_id: CustomerId,
    pub description: String,
    pub category: RevenueCategory,
    #[serde(flatten)]
    pub obligation: Obligation,
    pub recurrence: Option<Recurrence>,
    pub series: Option<SeriesRef>,
    /// Invoice whose issuance created this receivable; unique per company
    pub invoice_id: Option<InvoiceId>,
    pub review_flag: Option<ReviewFlag>,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: i64,
}

impl AccountReceivable {
    pub const ENTITY: &'static str = "AccountReceivable";

    pub fn display_status(&self, today: NaiveDate) -> DisplayStatus {
        self.obligation.display_status(today)
    }

    pub fn needs_review(&self) -> bool {
        self.review_flag.is_some()
    }
}

/// Request to record a receivable (or a recurring series of receivables)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewReceivable {
    pub customer_id: CustomerId,
    pub description: String,
    pub amount: Money,
    #[serde(default)]
    pub category: RevenueCategory,
    pub recorded_on: Option<NaiveDate>,
    pub due_date: NaiveDate,
    pub recurrence: Option<Recurrence>,
    pub classification: Option<Classification>,
}

/// Receivable raised by issuing an invoice.
///
/// Carries the invoice's own conversion snapshot so the receivable and the
/// invoice report the same figure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceReceivable {
    pub invoice_id: InvoiceId,
    pub customer_id: CustomerId,
    pub description: String,
    pub amount: Money,
    pub converted: ConvertedAmount,
    pub category: RevenueCategory,
    pub recorded_on: NaiveDate,
    pub due_date: NaiveDate,
}
