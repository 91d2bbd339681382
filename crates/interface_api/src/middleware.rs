//! Request middleware: bearer authentication and the per-request log line

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use tracing::{info, warn};

use crate::auth::{validate_token, AuthContext};
use crate::error::ApiError;
use crate::AppState;

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Resolves the caller's tenant from the bearer token.
///
/// Every route behind this layer can rely on an [`AuthContext`] extension;
/// requests without a usable token stop here with 401.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(request.headers()).ok_or_else(|| {
        warn!(path = %request.uri().path(), "request without bearer token");
        ApiError::Unauthorized
    })?;

    let claims = validate_token(token, &state.config.jwt_secret).inspect_err(|e| {
        warn!(error = %e, "rejected bearer token");
    })?;
    let tenant = claims.tenant_context().inspect_err(|e| {
        warn!(error = %e, subject = %claims.sub, "token carries no usable tenant");
    })?;

    request.extensions_mut().insert(AuthContext { claims, tenant });
    Ok(next.run(request).await)
}

/// One structured log line per request, tagged with the acting company and user
pub async fn request_log_middleware(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let tenant = request.extensions().get::<AuthContext>().map(|auth| auth.tenant);

    let started = Instant::now();
    let response = next.run(request).await;

    info!(
        %method,
        %path,
        company = tenant.map(|t| t.company_id.to_string()).unwrap_or_default(),
        user = tenant.map(|t| t.user_id.to_string()).unwrap_or_default(),
        status = response.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "request handled"
    );

    response
}
