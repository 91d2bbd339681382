//! Accounts receivable handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use core_kernel::ReceivableId;
use domain_ledger::AccountReceivable;
use uuid::Uuid;
use validator::Validate;

use crate::auth::{permissions, AuthContext};
use crate::dto::ledger::*;
use crate::{error::ApiError, AppState};

type ReceivableResponse = ObligationResponse<AccountReceivable>;

/// Records a receivable; a recurring receivable returns its whole series
pub async fn create_receivable(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(body): Json<CreateReceivableBody>,
) -> Result<(StatusCode, Json<Vec<ReceivableResponse>>), ApiError> {
    auth.require(permissions::LEDGER_WRITE)?;
    body.validate()?;

    let today = state.clock.today();
    let created = state
        .ledger
        .create_receivable(&auth.tenant, body.into_request()?)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(created.into_iter().map(|r| ReceivableResponse::receivable(r, today)).collect()),
    ))
}

pub async fn list_receivables(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(params): Query<ObligationListParams>,
) -> Result<Json<Vec<ReceivableResponse>>, ApiError> {
    auth.require(permissions::LEDGER_READ)?;
    params.validate()?;

    let today = state.clock.today();
    let receivables = if params.overdue {
        state.ledger.list_overdue_receivables(&auth.tenant, Some(today)).await?
    } else {
        state.ledger.list_receivables(&auth.tenant, &params.to_query()?).await?
    };
    Ok(Json(
        receivables
            .into_iter()
            .map(|r| ReceivableResponse::receivable(r, today))
            .collect(),
    ))
}

/// Receivables whose invoice was cancelled after settlements were recorded
pub async fn list_flagged(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<Vec<ReceivableResponse>>, ApiError> {
    auth.require(permissions::LEDGER_READ)?;

    let today = state.clock.today();
    let flagged = state.ledger.list_flagged_receivables(&auth.tenant).await?;
    Ok(Json(flagged.into_iter().map(|r| ReceivableResponse::receivable(r, today)).collect()))
}

pub async fn get_receivable(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<ReceivableResponse>, ApiError> {
    auth.require(permissions::LEDGER_READ)?;

    let receivable = state
        .ledger
        .get_receivable(&auth.tenant, ReceivableId::from_uuid(id))
        .await?;
    Ok(Json(ReceivableResponse::receivable(receivable, state.clock.today())))
}

/// Records a settlement; a receivable raised by an invoice also moves that invoice
pub async fn record_settlement(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(body): Json<SettlementBody>,
) -> Result<Json<ReceivableResponse>, ApiError> {
    auth.require(permissions::LEDGER_WRITE)?;
    body.validate()?;

    let receivable = state
        .invoices
        .settle_receivable(&auth.tenant, ReceivableId::from_uuid(id), body.into())
        .await?;
    Ok(Json(ReceivableResponse::receivable(receivable, state.clock.today())))
}

pub async fn cancel_receivable(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<ReceivableResponse>, ApiError> {
    auth.require(permissions::LEDGER_WRITE)?;

    let receivable = state
        .ledger
        .cancel_receivable(&auth.tenant, ReceivableId::from_uuid(id))
        .await?;
    Ok(Json(ReceivableResponse::receivable(receivable, state.clock.today())))
}

/// Clears the review flag once the settlements have been dealt with
pub async fn clear_review_flag(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<ReceivableResponse>, ApiError> {
    auth.require(permissions::LEDGER_WRITE)?;

    let receivable = state
        .ledger
        .clear_review_flag(&auth.tenant, ReceivableId::from_uuid(id))
        .await?;
    Ok(Json(ReceivableResponse::receivable(receivable, state.clock.today())))
}
