//! Invoice DTOs

use chrono::NaiveDate;
use core_kernel::{ContractId, CustomerId, TemplateId};
use domain_invoicing::{
    CreateInvoiceRequest, Invoice, InvoiceDisplayStatus, InvoiceQuery, InvoiceStatus, InvoiceTotals, LineInput,
};
use domain_ledger::RevenueCategory;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::{amount_in_range, parse_currency, parse_list, percent_in_range, quantity_in_range};
use crate::error::ApiError;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LineBody {
    #[validate(length(min = 1, max = 500))]
    pub description: String,
    #[validate(custom(function = "quantity_in_range"))]
    pub quantity: Decimal,
    #[validate(custom(function = "amount_in_range"))]
    pub unit_price: Decimal,
    #[serde(default)]
    #[validate(custom(function = "percent_in_range"))]
    pub discount_percent: Decimal,
    #[serde(default)]
    #[validate(custom(function = "percent_in_range"))]
    pub tax_percent: Decimal,
}

impl From<LineBody> for LineInput {
    fn from(body: LineBody) -> Self {
        LineInput::new(body.description, body.quantity, body.unit_price)
            .with_discount(body.discount_percent)
            .with_tax(body.tax_percent)
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateInvoiceBody {
    pub customer_id: Uuid,
    pub contract_id: Option<Uuid>,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    #[validate(length(equal = 3))]
    pub currency: String,
    #[validate(length(min = 1, message = "an invoice needs at least one line"), nested)]
    pub lines: Vec<LineBody>,
    pub declared_totals: Option<InvoiceTotals>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    #[validate(length(min = 2, max = 8))]
    pub language: Option<String>,
    pub template_id: Option<Uuid>,
    pub category: Option<RevenueCategory>,
}

impl CreateInvoiceBody {
    pub fn into_request(self) -> Result<CreateInvoiceRequest, ApiError> {
        Ok(CreateInvoiceRequest {
            customer_id: CustomerId::from_uuid(self.customer_id),
            contract_id: self.contract_id.map(ContractId::from_uuid),
            issue_date: self.issue_date,
            due_date: self.due_date,
            currency: parse_currency(&self.currency)?,
            lines: self.lines.into_iter().map(LineInput::from).collect(),
            declared_totals: self.declared_totals,
            notes: self.notes,
            language: self.language,
            template_id: self.template_id.map(TemplateId::from_uuid),
            category: self.category.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateLinesBody {
    #[validate(length(min = 1), nested)]
    pub lines: Vec<LineBody>,
}

#[derive(Debug, Deserialize)]
pub struct TransitionBody {
    pub status: InvoiceStatus,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct InvoiceListParams {
    /// Comma-separated stored statuses
    pub status: Option<String>,
    pub customer_id: Option<Uuid>,
    pub issued_from: Option<NaiveDate>,
    pub issued_to: Option<NaiveDate>,
    #[validate(range(min = 1, max = 500))]
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl InvoiceListParams {
    pub fn to_query(&self) -> Result<InvoiceQuery, ApiError> {
        Ok(InvoiceQuery {
            statuses: parse_list(self.status.as_deref())?,
            customer_id: self.customer_id.map(CustomerId::from_uuid),
            issued_from: self.issued_from,
            issued_to: self.issued_to,
            limit: self.limit,
            offset: self.offset,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct InvoiceResponse {
    #[serde(flatten)]
    pub invoice: Invoice,
    pub display_status: InvoiceDisplayStatus,
}

impl InvoiceResponse {
    pub fn new(invoice: Invoice, today: NaiveDate) -> Self {
        let display_status = invoice.display_status(today);
        Self { invoice, display_status }
    }
}
