//! Authentication and authorization
//!
//! Tokens are HS256 JWTs whose claims name the acting user and the company
//! and branch they act for. Every authenticated request carries an
//! [`AuthContext`] with the derived [`TenantContext`].

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use chrono::{Duration, Utc};
use core_kernel::{BranchId, CompanyId, TenantContext, UserId};
use jsonwebtoken::errors::ErrorKind as JwtErrorKind;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::error::ApiError;

/// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    pub company_id: String,
    pub branch_id: String,
    /// User's roles
    pub roles: Vec<String>,
    /// Expiration timestamp
    pub exp: i64,
    /// Issued at timestamp
    pub iat: i64,
}

impl Claims {
    /// Tenant scope named by the token
    pub fn tenant_context(&self) -> Result<TenantContext, AuthError> {
        let parse = |field: &str, value: &str| {
            Uuid::parse_str(value).map_err(|_| AuthError::MalformedClaim(field.to_string()))
        };
        Ok(TenantContext::new(
            CompanyId::from_uuid(parse("company_id", &self.company_id)?),
            BranchId::from_uuid(parse("branch_id", &self.branch_id)?),
            UserId::from_uuid(parse("sub", &self.sub)?),
        ))
    }
}

/// Auth errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Invalid token")]
    InvalidToken,
    #[error("Token expired")]
    TokenExpired,
    #[error("Malformed claim: {0}")]
    MalformedClaim(String),
    #[error("Missing permission: {0}")]
    MissingPermission(String),
}

/// Creates a new JWT token for `ctx`
pub fn create_token(
    ctx: &TenantContext,
    roles: Vec<String>,
    secret: &str,
    expiration_secs: u64,
) -> Result<String, AuthError> {
    let now = Utc::now();
    let exp = i64::try_from(expiration_secs)
        .ok()
        .and_then(Duration::try_seconds)
        .and_then(|validity| now.checked_add_signed(validity))
        .ok_or(AuthError::InvalidToken)?;

    let claims = Claims {
        sub: ctx.user_id.as_uuid().to_string(),
        company_id: ctx.company_id.as_uuid().to_string(),
        branch_id: ctx.branch_id.as_uuid().to_string(),
        roles,
        exp: exp.timestamp(),
        iat: now.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|_| AuthError::InvalidToken)
}

/// Validates a JWT token
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, AuthError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| match e.kind() {
        JwtErrorKind::ExpiredSignature => AuthError::TokenExpired,
        _ => AuthError::InvalidToken,
    })?;

    Ok(token_data.claims)
}

/// Checks if user has required role
pub fn has_role(claims: &Claims, required_role: &str) -> bool {
    claims.roles.iter().any(|r| r == required_role || r == "admin")
}

/// Permission definitions
pub mod permissions {
    pub const INVOICE_READ: &str = "invoice:read";
    pub const INVOICE_WRITE: &str = "invoice:write";
    pub const LEDGER_READ: &str = "ledger:read";
    pub const LEDGER_WRITE: &str = "ledger:write";
    pub const REPORT_READ: &str = "report:read";
    pub const PERIOD_CLOSE: &str = "period:close";
}

/// Authenticated caller, inserted by the auth middleware
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub claims: Claims,
    pub tenant: TenantContext,
}

impl AuthContext {
    pub fn require(&self, permission: &str) -> Result<(), ApiError> {
        if has_role(&self.claims, permission) {
            Ok(())
        } else {
            Err(AuthError::MissingPermission(permission.to_string()).into())
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .ok_or(ApiError::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    fn ctx() -> TenantContext {
        TenantContext::new(CompanyId::new(), BranchId::new(), UserId::new())
    }

    #[test]
    fn test_token_carries_tenant() {
        let ctx = ctx();
        let token = create_token(&ctx, vec!["invoice:read".to_string()], SECRET, 60).unwrap();
        let claims = validate_token(&token, SECRET).unwrap();
        assert_eq!(claims.tenant_context().unwrap(), ctx);
        assert!(has_role(&claims, permissions::INVOICE_READ));
        assert!(!has_role(&claims, permissions::PERIOD_CLOSE));
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let token = create_token(&ctx(), vec![], SECRET, 60).unwrap();
        assert_eq!(validate_token(&token, "other").unwrap_err(), AuthError::InvalidToken);
    }

    #[test]
    fn test_expired_token() {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            company_id: Uuid::new_v4().to_string(),
            branch_id: Uuid::new_v4().to_string(),
            roles: vec![],
            exp: now - 3600,
            iat: now - 7200,
        };
        let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET.as_bytes())).unwrap();
        assert_eq!(validate_token(&token, SECRET).unwrap_err(), AuthError::TokenExpired);
    }

    #[test]
    fn test_admin_has_every_role() {
        let claims = Claims {
            sub: String::new(),
            company_id: String::new(),
            branch_id: String::new(),
            roles: vec!["admin".to_string()],
            exp: 0,
            iat: 0,
        };
        assert!(has_role(&claims, permissions::PERIOD_CLOSE));
        assert_eq!(
            claims.tenant_context().unwrap_err(),
            AuthError::MalformedClaim("company_id".to_string())
        );
    }
}
