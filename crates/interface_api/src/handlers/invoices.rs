//! Invoice handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use core_kernel::InvoiceId;
use uuid::Uuid;
use validator::Validate;

use crate::auth::{permissions, AuthContext};
use crate::dto::invoices::*;
use crate::dto::ledger::SettlementBody;
use crate::{error::ApiError, AppState};

/// Creates a draft invoice
pub async fn create_invoice(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(body): Json<CreateInvoiceBody>,
) -> Result<(StatusCode, Json<InvoiceResponse>), ApiError> {
    auth.require(permissions::INVOICE_WRITE)?;
    body.validate()?;

    let invoice = state
        .invoices
        .create_invoice(&auth.tenant, body.into_request()?)
        .await?;
    Ok((StatusCode::CREATED, Json(InvoiceResponse::new(invoice, state.clock.today()))))
}

/// Lists invoices
pub async fn list_invoices(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(params): Query<InvoiceListParams>,
) -> Result<Json<Vec<InvoiceResponse>>, ApiError> {
    auth.require(permissions::INVOICE_READ)?;
    params.validate()?;

    let today = state.clock.today();
    let invoices = state.invoices.list_invoices(&auth.tenant, &params.to_query()?).await?;
    Ok(Json(
        invoices
            .into_iter()
            .map(|invoice| InvoiceResponse::new(invoice, today))
            .collect(),
    ))
}

/// Gets an invoice by ID
pub async fn get_invoice(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<InvoiceResponse>, ApiError> {
    auth.require(permissions::INVOICE_READ)?;

    let invoice = state
        .invoices
        .get_invoice(&auth.tenant, InvoiceId::from_uuid(id))
        .await?;
    Ok(Json(InvoiceResponse::new(invoice, state.clock.today())))
}

/// Replaces the lines of a draft
pub async fn update_lines(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateLinesBody>,
) -> Result<Json<InvoiceResponse>, ApiError> {
    auth.require(permissions::INVOICE_WRITE)?;
    body.validate()?;

    let lines = body.lines.into_iter().map(Into::into).collect();
    let invoice = state
        .invoices
        .update_draft_lines(&auth.tenant, InvoiceId::from_uuid(id), lines)
        .await?;
    Ok(Json(InvoiceResponse::new(invoice, state.clock.today())))
}

/// Moves an invoice to a new status
pub async fn transition_status(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(body): Json<TransitionBody>,
) -> Result<Json<InvoiceResponse>, ApiError> {
    auth.require(permissions::INVOICE_WRITE)?;

    let invoice = state
        .invoices
        .transition_status(&auth.tenant, InvoiceId::from_uuid(id), body.status)
        .await?;
    Ok(Json(InvoiceResponse::new(invoice, state.clock.today())))
}

/// Records a payment against the invoice's receivable
pub async fn record_payment(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(body): Json<SettlementBody>,
) -> Result<Json<InvoiceResponse>, ApiError> {
    auth.require(permissions::INVOICE_WRITE)?;
    auth.require(permissions::LEDGER_WRITE)?;
    body.validate()?;

    let invoice = state
        .invoices
        .record_payment(&auth.tenant, InvoiceId::from_uuid(id), body.into())
        .await?;
    Ok(Json(InvoiceResponse::new(invoice, state.clock.today())))
}

/// Cancels an invoice
pub async fn cancel_invoice(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<InvoiceResponse>, ApiError> {
    auth.require(permissions::INVOICE_WRITE)?;

    let invoice = state
        .invoices
        .cancel_invoice(&auth.tenant, InvoiceId::from_uuid(id))
        .await?;
    Ok(Json(InvoiceResponse::new(invoice, state.clock.today())))
}
