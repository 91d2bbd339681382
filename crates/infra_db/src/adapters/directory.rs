//! Existence checks against the counterparty tables

use async_trait::async_trait;
use core_kernel::{
    ContractId, CustomerId, DomainPort, EmployeeId, HealthCheckResult, HealthCheckable, PortError, SupplierId,
    TenantContext,
};
use domain_ledger::CounterpartyDirectory;
use sqlx::PgPool;
use uuid::Uuid;

use crate::codec::ping;
use crate::error::DatabaseError;

#[derive(Debug, Clone)]
pub struct PostgresDirectory {
    pool: PgPool,
}

impl PostgresDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn exists(&self, table: &'static str, ctx: &TenantContext, id: Uuid) -> Result<bool, PortError> {
        let sql = format!("SELECT EXISTS(SELECT 1 FROM {} WHERE id = $1 AND company_id = $2)", table);
        let found = sqlx::query_scalar::<_, bool>(&sql)
            .bind(id)
            .bind(*ctx.company_id.as_uuid())
            .fetch_one(&self.pool)
            .await
            .map_err(DatabaseError::from)?;
        Ok(found)
    }
}

impl DomainPort for PostgresDirectory {}

#[async_trait]
impl HealthCheckable for PostgresDirectory {
    async fn health_check(&self) -> HealthCheckResult {
        ping(&self.pool, "postgres-directory").await
    }
}

#[async_trait]
impl CounterpartyDirectory for PostgresDirectory {
    async fn customer_exists(&self, ctx: &TenantContext, id: CustomerId) -> Result<bool, PortError> {
        self.exists("customers", ctx, id.into()).await
    }

    async fn supplier_exists(&self, ctx: &TenantContext, id: SupplierId) -> Result<bool, PortError> {
        self.exists("suppliers", ctx, id.into()).await
    }

    async fn contract_exists(&self, ctx: &TenantContext, id: ContractId) -> Result<bool, PortError> {
        self.exists("contracts", ctx, id.into()).await
    }

    async fn employee_exists(&self, ctx: &TenantContext, id: EmployeeId) -> Result<bool, PortError> {
        self.exists("employees", ctx, id.into()).await
    }
}
