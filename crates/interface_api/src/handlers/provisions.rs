//! Provision handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use core_kernel::ProvisionId;
use domain_ledger::Provision;
use uuid::Uuid;
use validator::Validate;

use crate::auth::{permissions, AuthContext};
use crate::dto::ledger::{CreateProvisionBody, ProvisionListParams, SupersedeProvisionBody, SupersededResponse};
use crate::{error::ApiError, AppState};

pub async fn create_provision(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(body): Json<CreateProvisionBody>,
) -> Result<(StatusCode, Json<Provision>), ApiError> {
    auth.require(permissions::LEDGER_WRITE)?;
    body.validate()?;

    let provision = state
        .ledger
        .create_provision(&auth.tenant, body.into_request()?)
        .await?;
    Ok((StatusCode::CREATED, Json(provision)))
}

pub async fn list_provisions(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(params): Query<ProvisionListParams>,
) -> Result<Json<Vec<Provision>>, ApiError> {
    auth.require(permissions::LEDGER_READ)?;

    let provisions = state.ledger.list_provisions(&auth.tenant, &params.into()).await?;
    Ok(Json(provisions))
}

pub async fn get_provision(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<Provision>, ApiError> {
    auth.require(permissions::LEDGER_READ)?;

    let provision = state
        .ledger
        .get_provision(&auth.tenant, ProvisionId::from_uuid(id))
        .await?;
    Ok(Json(provision))
}

pub async fn reverse_provision(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<Provision>, ApiError> {
    auth.require(permissions::LEDGER_WRITE)?;

    let provision = state
        .ledger
        .reverse_provision(&auth.tenant, ProvisionId::from_uuid(id))
        .await?;
    Ok(Json(provision))
}

/// Reverses a provision and records its replacement
pub async fn supersede_provision(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(body): Json<SupersedeProvisionBody>,
) -> Result<(StatusCode, Json<SupersededResponse>), ApiError> {
    auth.require(permissions::LEDGER_WRITE)?;
    body.validate()?;

    let (previous, replacement) = state
        .ledger
        .supersede_provision(&auth.tenant, ProvisionId::from_uuid(id), body.into_request()?)
        .await?;
    Ok((StatusCode::CREATED, Json(SupersededResponse { previous, replacement })))
}
