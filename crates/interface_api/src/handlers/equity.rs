//! Equity entry handlers

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use domain_ledger::EquityEntry;
use validator::Validate;

use crate::auth::{permissions, AuthContext};
use crate::dto::ledger::{EquityEntryBody, EquityListParams};
use crate::{error::ApiError, AppState};

pub async fn record_equity_entry(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(body): Json<EquityEntryBody>,
) -> Result<(StatusCode, Json<EquityEntry>), ApiError> {
    auth.require(permissions::LEDGER_WRITE)?;
    body.validate()?;

    let entry = state
        .ledger
        .record_equity_entry(&auth.tenant, body.into_request()?)
        .await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

pub async fn list_equity_entries(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(params): Query<EquityListParams>,
) -> Result<Json<Vec<EquityEntry>>, ApiError> {
    auth.require(permissions::LEDGER_READ)?;

    let entries = state.ledger.list_equity_entries(&auth.tenant, params.up_to).await?;
    Ok(Json(entries))
}
