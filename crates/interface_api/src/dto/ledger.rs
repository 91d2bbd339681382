//! Payable, receivable, provision and equity DTOs

use chrono::NaiveDate;
use core_kernel::{CustomerId, DocumentId, SupplierId};
use domain_ledger::{
    AccountPayable, AccountReceivable, Classification, DisplayStatus, EquityKind, ExpenseCategory, NewEquityEntry,
    NewPayable, NewProvision, NewReceivable, Obligation, ObligationQuery, Provision, ProvisionQuery, ProvisionStatus,
    ProvisionSubject, Recurrence,
    RevenueCategory, SettlementRequest, SupersedeProvision,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::{amount_in_range, parse_list, MoneyBody};
use crate::error::ApiError;

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePayableBody {
    pub supplier_id: Uuid,
    #[validate(length(min = 1, max = 500))]
    pub description: String,
    #[validate(nested)]
    pub amount: MoneyBody,
    pub category: Option<ExpenseCategory>,
    pub recorded_on: Option<NaiveDate>,
    pub due_date: NaiveDate,
    pub recurrence: Option<Recurrence>,
    pub document_id: Option<Uuid>,
    pub classification: Option<Classification>,
}

impl CreatePayableBody {
    pub fn into_request(self) -> Result<NewPayable, ApiError> {
        Ok(NewPayable {
            supplier_id: SupplierId::from_uuid(self.supplier_id),
            amount: self.amount.to_money()?,
            description: self.description,
            category: self.category.unwrap_or_default(),
            recorded_on: self.recorded_on,
            due_date: self.due_date,
            recurrence: self.recurrence,
            document_id: self.document_id.map(DocumentId::from_uuid),
            classification: self.classification,
        })
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateReceivableBody {
    pub customer_id: Uuid,
    #[validate(length(min = 1, max = 500))]
    pub description: String,
    #[validate(nested)]
    pub amount: MoneyBody,
    pub category: Option<RevenueCategory>,
    pub recorded_on: Option<NaiveDate>,
    pub due_date: NaiveDate,
    pub recurrence: Option<Recurrence>,
    pub classification: Option<Classification>,
}

impl CreateReceivableBody {
    pub fn into_request(self) -> Result<NewReceivable, ApiError> {
        Ok(NewReceivable {
            customer_id: CustomerId::from_uuid(self.customer_id),
            amount: self.amount.to_money()?,
            description: self.description,
            category: self.category.unwrap_or_default(),
            recorded_on: self.recorded_on,
            due_date: self.due_date,
            recurrence: self.recurrence,
            classification: self.classification,
        })
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct SettlementBody {
    #[validate(custom(function = "amount_in_range"))]
    pub amount: Decimal,
    pub settled_on: NaiveDate,
    #[validate(length(max = 200))]
    pub reference: Option<String>,
}

impl From<SettlementBody> for SettlementRequest {
    fn from(body: SettlementBody) -> Self {
        SettlementRequest {
            amount: body.amount,
            settled_on: body.settled_on,
            reference: body.reference,
        }
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct ObligationListParams {
    /// Comma-separated stored statuses
    pub status: Option<String>,
    pub due_from: Option<NaiveDate>,
    pub due_to: Option<NaiveDate>,
    /// Only outstanding records past their due date
    #[serde(default)]
    pub overdue: bool,
    #[validate(range(min = 1, max = 500))]
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl ObligationListParams {
    pub fn to_query(&self) -> Result<ObligationQuery, ApiError> {
        Ok(ObligationQuery {
            statuses: parse_list(self.status.as_deref())?,
            due_from: self.due_from,
            due_to: self.due_to,
            limit: self.limit,
            offset: self.offset,
            ..ObligationQuery::default()
        })
    }
}

/// A payable or receivable with its derived state
#[derive(Debug, Serialize)]
pub struct ObligationResponse<T> {
    #[serde(flatten)]
    pub record: T,
    pub display_status: DisplayStatus,
    pub outstanding: Decimal,
    pub outstanding_reporting_ccy: Decimal,
}

impl<T> ObligationResponse<T> {
    fn build(record: T, obligation: &Obligation, today: NaiveDate) -> Self {
        Self {
            display_status: obligation.display_status(today),
            outstanding: obligation.outstanding(),
            outstanding_reporting_ccy: obligation.outstanding_reporting(),
            record,
        }
    }
}

impl ObligationResponse<AccountPayable> {
    pub fn payable(payable: AccountPayable, today: NaiveDate) -> Self {
        let obligation = payable.obligation.clone();
        Self::build(payable, &obligation, today)
    }
}

impl ObligationResponse<AccountReceivable> {
    pub fn receivable(receivable: AccountReceivable, today: NaiveDate) -> Self {
        let obligation = receivable.obligation.clone();
        Self::build(receivable, &obligation, today)
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProvisionBody {
    pub subject: ProvisionSubject,
    #[validate(length(min = 1, max = 500))]
    pub description: String,
    #[validate(nested)]
    pub amount: MoneyBody,
    pub provision_date: NaiveDate,
    pub classification: Option<Classification>,
}

impl CreateProvisionBody {
    pub fn into_request(self) -> Result<NewProvision, ApiError> {
        Ok(NewProvision {
            subject: self.subject,
            amount: self.amount.to_money()?,
            description: self.description,
            provision_date: self.provision_date,
            classification: self.classification,
        })
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct SupersedeProvisionBody {
    #[validate(nested)]
    pub amount: MoneyBody,
    #[validate(length(min = 1, max = 500))]
    pub description: Option<String>,
    pub provision_date: Option<NaiveDate>,
}

impl SupersedeProvisionBody {
    pub fn into_request(self) -> Result<SupersedeProvision, ApiError> {
        Ok(SupersedeProvision {
            amount: self.amount.to_money()?,
            description: self.description,
            provision_date: self.provision_date,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct SupersededResponse {
    pub previous: Provision,
    pub replacement: Provision,
}

#[derive(Debug, Deserialize, Validate)]
pub struct EquityEntryBody {
    pub kind: EquityKind,
    #[validate(nested)]
    pub amount: MoneyBody,
    pub entry_date: NaiveDate,
    #[validate(length(min = 1, max = 500))]
    pub description: String,
}

impl EquityEntryBody {
    pub fn into_request(self) -> Result<NewEquityEntry, ApiError> {
        Ok(NewEquityEntry {
            kind: self.kind,
            amount: self.amount.to_money()?,
            entry_date: self.entry_date,
            description: self.description,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ProvisionListParams {
    pub status: Option<ProvisionStatus>,
    pub date_to: Option<NaiveDate>,
}

impl From<ProvisionListParams> for ProvisionQuery {
    fn from(params: ProvisionListParams) -> Self {
        ProvisionQuery {
            status: params.status,
            date_to: params.date_to,
            ..ProvisionQuery::default()
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct EquityListParams {
    pub up_to: Option<NaiveDate>,
}
