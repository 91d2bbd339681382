//! Accounts payable

use chrono::{DateTime, NaiveDate, Utc};
use core_kernel::{BranchId, CompanyId, DocumentId, Money, PayableId, SupplierId, UserId};
use serde::{Deserialize, Serialize};

use crate::category::{Classification, ExpenseCategory};
use crate::obligation::{DisplayStatus, Obligation};
use crate::recurrence::{Recurrence, SeriesRef};

/// An amount the company owes a supplier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountPayable {
    pub id: PayableId,
    pub company_id: CompanyId,
    pub branch_id: BranchId,
    pub supplier_id: SupplierId,
    pub description: String,
    pub category: ExpenseCategory,
    #[serde(flatten)]
    pub obligation: Obligation,
    pub recurrence: Option<Recurrence>,
    pub series: Option<SeriesRef>,
    /// Supporting document (bill, receipt) in the document store
    pub document_id: Option<DocumentId>,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: i64,
}

impl AccountPayable {
    pub const ENTITY: &'static str = "AccountPayable";

    pub fn display_status(&self, today: NaiveDate) -> DisplayStatus {
        self.obligation.display_status(today)
    }
}

/// Request to record a payable (or a recurring series of payables)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPayable {
    pub supplier_id: SupplierId,
    pub description: String,
    pub amount: Money,
    #[serde(default)]
    pub category: ExpenseCategory,
    /// Accrual date, defaults to today
    pub recorded_on: Option<NaiveDate>,
    pub due_date: NaiveDate,
    pub recurrence: Option<Recurrence>,
    pub document_id: Option<DocumentId>,
    pub classification: Option<Classification>,
}
