//! Accounts payable handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use core_kernel::PayableId;
use domain_ledger::AccountPayable;
use uuid::Uuid;
use validator::Validate;

use crate::auth::{permissions, AuthContext};
use crate::dto::ledger::*;
use crate::{error::ApiError, AppState};

type PayableResponse = ObligationResponse<AccountPayable>;

/// Records a payable; a recurring payable returns its whole series
pub async fn create_payable(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(body): Json<CreatePayableBody>,
) -> Result<(StatusCode, Json<Vec<PayableResponse>>), ApiError> {
    auth.require(permissions::LEDGER_WRITE)?;
    body.validate()?;

    let today = state.clock.today();
    let created = state.ledger.create_payable(&auth.tenant, body.into_request()?).await?;
    Ok((
        StatusCode::CREATED,
        Json(created.into_iter().map(|p| PayableResponse::payable(p, today)).collect()),
    ))
}

pub async fn list_payables(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(params): Query<ObligationListParams>,
) -> Result<Json<Vec<PayableResponse>>, ApiError> {
    auth.require(permissions::LEDGER_READ)?;
    params.validate()?;

    let today = state.clock.today();
    let payables = if params.overdue {
        state.ledger.list_overdue_payables(&auth.tenant, Some(today)).await?
    } else {
        state.ledger.list_payables(&auth.tenant, &params.to_query()?).await?
    };
    Ok(Json(payables.into_iter().map(|p| PayableResponse::payable(p, today)).collect()))
}

pub async fn get_payable(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<PayableResponse>, ApiError> {
    auth.require(permissions::LEDGER_READ)?;

    let payable = state.ledger.get_payable(&auth.tenant, PayableId::from_uuid(id)).await?;
    Ok(Json(PayableResponse::payable(payable, state.clock.today())))
}

pub async fn record_settlement(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(body): Json<SettlementBody>,
) -> Result<Json<PayableResponse>, ApiError> {
    auth.require(permissions::LEDGER_WRITE)?;
    body.validate()?;

    let payable = state
        .ledger
        .record_payable_settlement(&auth.tenant, PayableId::from_uuid(id), body.into())
        .await?;
    Ok(Json(PayableResponse::payable(payable, state.clock.today())))
}

pub async fn cancel_payable(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<PayableResponse>, ApiError> {
    auth.require(permissions::LEDGER_WRITE)?;

    let payable = state.ledger.cancel_payable(&auth.tenant, PayableId::from_uuid(id)).await?;
    Ok(Json(PayableResponse::payable(payable, state.clock.today())))
}
