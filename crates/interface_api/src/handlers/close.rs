//! Monthly close handlers

use axum::{
    extract::{Path, State},
    Json,
};
use domain_reporting::{ClosedMonth, MonthlySummary};

use crate::auth::{permissions, AuthContext};
use crate::dto::close::{parse_year_month, ClosedPeriodsResponse, ReopenedResponse};
use crate::{error::ApiError, AppState};

/// Totals for the month and whether it is closed
pub async fn summarize_month(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(raw): Path<String>,
) -> Result<Json<MonthlySummary>, ApiError> {
    auth.require(permissions::REPORT_READ)?;

    let year_month = parse_year_month(&raw)?;
    let summary = state.close.summarize_month(&auth.tenant, year_month).await?;
    Ok(Json(summary))
}

pub async fn close_month(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(raw): Path<String>,
) -> Result<Json<ClosedMonth>, ApiError> {
    auth.require(permissions::PERIOD_CLOSE)?;

    let year_month = parse_year_month(&raw)?;
    let closed = state.close.close_month(&auth.tenant, year_month).await?;
    Ok(Json(closed))
}

pub async fn reopen_month(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(raw): Path<String>,
) -> Result<Json<ReopenedResponse>, ApiError> {
    auth.require(permissions::PERIOD_CLOSE)?;

    let year_month = parse_year_month(&raw)?;
    state.close.reopen_month(&auth.tenant, year_month).await?;
    Ok(Json(ReopenedResponse {
        year_month,
        is_closed: false,
    }))
}

pub async fn closed_periods(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<ClosedPeriodsResponse>, ApiError> {
    auth.require(permissions::REPORT_READ)?;

    let periods = state.close.closed_periods(&auth.tenant).await?;
    Ok(Json(ClosedPeriodsResponse { periods }))
}
