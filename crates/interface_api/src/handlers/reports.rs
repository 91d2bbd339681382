//! Financial report handlers

use axum::{
    extract::{Query, State},
    Json,
};
use domain_reporting::{AgingReport, BalanceSheet, CashFlowStatement, ProfitAndLoss};

use crate::auth::{permissions, AuthContext};
use crate::dto::reports::{AsOfParams, CashFlowParams, PeriodParams};
use crate::{error::ApiError, AppState};

pub async fn aging(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(params): Query<AsOfParams>,
) -> Result<Json<AgingReport>, ApiError> {
    auth.require(permissions::REPORT_READ)?;

    let report = state
        .reporting
        .aging(&auth.tenant, params.as_of, params.show_reporting_currency)
        .await?;
    Ok(Json(report))
}

pub async fn profit_and_loss(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(params): Query<PeriodParams>,
) -> Result<Json<ProfitAndLoss>, ApiError> {
    auth.require(permissions::REPORT_READ)?;

    let report = state
        .reporting
        .profit_and_loss(&auth.tenant, params.range()?, params.show_reporting_currency)
        .await?;
    Ok(Json(report))
}

pub async fn balance_sheet(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(params): Query<AsOfParams>,
) -> Result<Json<BalanceSheet>, ApiError> {
    auth.require(permissions::REPORT_READ)?;

    let report = state
        .reporting
        .balance_sheet(&auth.tenant, params.as_of, params.show_reporting_currency)
        .await?;
    Ok(Json(report))
}

pub async fn cash_flow(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(params): Query<CashFlowParams>,
) -> Result<Json<CashFlowStatement>, ApiError> {
    auth.require(permissions::REPORT_READ)?;

    let report = state
        .reporting
        .cash_flow(
            &auth.tenant,
            params.range()?,
            params.opening_balance,
            params.show_reporting_currency,
        )
        .await?;
    Ok(Json(report))
}
