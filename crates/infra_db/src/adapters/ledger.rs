//! PostgreSQL adapter for the ledger stores
//!
//! Payables, receivables, provisions, equity entries and period locks share
//! one pool. Updates are optimistic: the `WHERE version = $expected` guard
//! turns a lost race into `PortError::Conflict`.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use core_kernel::{
    BranchId, CompanyId, ContractId, CustomerId, DocumentId, DomainPort, EmployeeId, EquityEntryId, HealthCheckResult,
    HealthCheckable, InvoiceId, PayableId, PortError, ProvisionId, ReceivableId, SupplierId, TenantContext, UserId,
    YearMonth,
};
use domain_ledger::{
    AccountPayable, AccountReceivable, EquityEntry, EquityPort, ObligationQuery, PayablePort, PeriodLock,
    PeriodLockPort, Provision, ProvisionPort, ProvisionQuery, ProvisionSubject, ReceivableInsert, ReceivablePort,
    ReviewFlag,
};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::codec::{
    bind_conversion, bind_obligation, money, parse, parse_opt, ping, placeholders, push_page, ConversionRow,
    ObligationRow, OBLIGATION_COLUMNS,
};
use crate::error::DatabaseError;

const PAYABLE_HEAD: &str = "id, company_id, branch_id, supplier_id, description, category";
const PAYABLE_TAIL: &str = "document_id, created_by, created_at, updated_at, version";
const RECEIVABLE_HEAD: &str = "id, company_id, branch_id, customer_id, description, category";
const RECEIVABLE_TAIL: &str = "invoice_id, review_reason, flagged_at, created_by, created_at, updated_at, version";
const OBLIGATION_COUNT: usize = 18;

fn columns(head: &str, tail: &str) -> String {
    format!("{}, {}, {}", head, OBLIGATION_COLUMNS, tail)
}

#[derive(Debug, sqlx::FromRow)]
struct PayableRow {
    id: Uuid,
    company_id: Uuid,
    branch_id: Uuid,
    supplier_id: Uuid,
    description: String,
    category: String,
    #[sqlx(flatten)]
    obligation: ObligationRow,
    document_id: Option<Uuid>,
    created_by: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    version: i64,
}

impl PayableRow {
    fn into_domain(self) -> Result<AccountPayable, DatabaseError> {
        let parts = self.obligation.into_parts()?;
        Ok(AccountPayable {
            id: PayableId::from_uuid(self.id),
            company_id: CompanyId::from_uuid(self.company_id),
            branch_id: BranchId::from_uuid(self.branch_id),
            supplier_id: SupplierId::from_uuid(self.supplier_id),
            description: self.description,
            category: parse("category", &self.category)?,
            obligation: parts.obligation,
            recurrence: parts.recurrence,
            series: parts.series,
            document_id: self.document_id.map(DocumentId::from_uuid),
            created_by: UserId::from_uuid(self.created_by),
            created_at: self.created_at,
            updated_at: self.updated_at,
            version: self.version,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ReceivableRow {
    id: Uuid,
    company_id: Uuid,
    branch_id: Uuid,
    customer_id: Uuid,
    description: String,
    category: String,
    #[sqlx(flatten)]
    obligation: ObligationRow,
    invoice_id: Option<Uuid>,
    review_reason: Option<String>,
    flagged_at: Option<DateTime<Utc>>,
    created_by: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    version: i64,
}

impl ReceivableRow {
    fn into_domain(self) -> Result<AccountReceivable, DatabaseError> {
        let parts = self.obligation.into_parts()?;
        let review_flag = match (self.review_reason, self.flagged_at) {
            (Some(reason), Some(flagged_at)) => Some(ReviewFlag { reason, flagged_at }),
            _ => None,
        };
        Ok(AccountReceivable {
            id: ReceivableId::from_uuid(self.id),
            company_id: CompanyId::from_uuid(self.company_id),
            branch_id: BranchId::from_uuid(self.branch_id),
            customer_id: CustomerId::from_uuid(self.customer_id),
            description: self.description,
            category: parse("category", &self.category)?,
            obligation: parts.obligation,
            recurrence: parts.recurrence,
            series: parts.series,
            invoice_id: self.invoice_id.map(InvoiceId::from_uuid),
            review_flag,
            created_by: UserId::from_uuid(self.created_by),
            created_at: self.created_at,
            updated_at: self.updated_at,
            version: self.version,
        })
    }
}

const PROVISION_COLUMNS: &str = "id, company_id, branch_id, subject_kind, subject_id, description, amount, currency, \
    reporting_currency, amount_reporting_ccy, rate_used, rate_source, rate_timestamp, provision_date, status, \
    reversed_at, reversed_on, supersedes, superseded_by, classification, created_by, created_at, version";

#[derive(Debug, sqlx::FromRow)]
struct ProvisionRow {
    id: Uuid,
    company_id: Uuid,
    branch_id: Uuid,
    subject_kind: String,
    subject_id: Uuid,
    description: String,
    amount: Decimal,
    currency: String,
    #[sqlx(flatten)]
    conversion: ConversionRow,
    provision_date: NaiveDate,
    status: String,
    reversed_at: Option<DateTime<Utc>>,
    reversed_on: Option<NaiveDate>,
    supersedes: Option<Uuid>,
    superseded_by: Option<Uuid>,
    classification: Option<String>,
    created_by: Uuid,
    created_at: DateTime<Utc>,
    version: i64,
}

fn subject_columns(subject: &ProvisionSubject) -> (&'static str, Uuid) {
    match subject {
        ProvisionSubject::Employee(id) => ("employee", *id.as_uuid()),
        ProvisionSubject::Contract(id) => ("contract", *id.as_uuid()),
    }
}

impl ProvisionRow {
    fn into_domain(self) -> Result<Provision, DatabaseError> {
        let subject = match self.subject_kind.as_str() {
            "employee" => ProvisionSubject::Employee(EmployeeId::from_uuid(self.subject_id)),
            "contract" => ProvisionSubject::Contract(ContractId::from_uuid(self.subject_id)),
            other => return Err(DatabaseError::decode("subject_kind", format!("unknown subject '{}'", other))),
        };
        Ok(Provision {
            id: ProvisionId::from_uuid(self.id),
            company_id: CompanyId::from_uuid(self.company_id),
            branch_id: BranchId::from_uuid(self.branch_id),
            subject,
            description: self.description,
            amount: money("currency", self.amount, &self.currency)?,
            converted: self.conversion.into_converted()?,
            provision_date: self.provision_date,
            status: parse("status", &self.status)?,
            reversed_at: self.reversed_at,
            reversed_on: self.reversed_on,
            supersedes: self.supersedes.map(ProvisionId::from_uuid),
            superseded_by: self.superseded_by.map(ProvisionId::from_uuid),
            classification: parse_opt("classification", self.classification.as_deref())?,
            created_by: UserId::from_uuid(self.created_by),
            created_at: self.created_at,
            version: self.version,
        })
    }
}

const EQUITY_COLUMNS: &str = "id, company_id, branch_id, kind, amount, currency, reporting_currency, \
    amount_reporting_ccy, rate_used, rate_source, rate_timestamp, entry_date, description, created_by, created_at";

#[derive(Debug, sqlx::FromRow)]
struct EquityRow {
    id: Uuid,
    company_id: Uuid,
    branch_id: Uuid,
    kind: String,
    amount: Decimal,
    currency: String,
    #[sqlx(flatten)]
    conversion: ConversionRow,
    entry_date: NaiveDate,
    description: String,
    created_by: Uuid,
    created_at: DateTime<Utc>,
}

impl EquityRow {
    fn into_domain(self) -> Result<EquityEntry, DatabaseError> {
        Ok(EquityEntry {
            id: EquityEntryId::from_uuid(self.id),
            company_id: CompanyId::from_uuid(self.company_id),
            branch_id: BranchId::from_uuid(self.branch_id),
            kind: parse("kind", &self.kind)?,
            amount: money("currency", self.amount, &self.currency)?,
            converted: self.conversion.into_converted()?,
            entry_date: self.entry_date,
            description: self.description,
            created_by: UserId::from_uuid(self.created_by),
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct LockRow {
    company_id: Uuid,
    period: String,
    locked_at: DateTime<Utc>,
    locked_by: Uuid,
}

impl LockRow {
    fn into_domain(self) -> Result<PeriodLock, DatabaseError> {
        Ok(PeriodLock {
            company_id: CompanyId::from_uuid(self.company_id),
            period: parse("period", &self.period)?,
            locked_at: self.locked_at,
            locked_by: UserId::from_uuid(self.locked_by),
        })
    }
}

fn collect<R, T>(rows: Vec<R>, map: impl Fn(R) -> Result<T, DatabaseError>) -> Result<Vec<T>, PortError> {
    rows.into_iter()
        .map(|row| map(row).map_err(PortError::from))
        .collect()
}

fn push_obligation_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &ObligationQuery) {
    if !query.statuses.is_empty() {
        let statuses: Vec<String> = query.statuses.iter().map(|s| s.as_str().to_string()).collect();
        builder.push(" AND status = ANY(").push_bind(statuses).push(")");
    }
    if let Some(from) = query.due_from {
        builder.push(" AND due_date >= ").push_bind(from);
    }
    if let Some(to) = query.due_to {
        builder.push(" AND due_date <= ").push_bind(to);
    }
    if let Some(recorded_to) = query.recorded_to {
        builder.push(" AND recorded_on <= ").push_bind(recorded_to);
    }
    if let Some(series_id) = query.series_id {
        builder.push(" AND series_id = ").push_bind(*series_id.as_uuid());
    }
    builder.push(" ORDER BY due_date, id");
    push_page(builder, query.limit, query.offset);
}

/// PostgreSQL implementation of every ledger store port
#[derive(Debug, Clone)]
pub struct PostgresLedgerAdapter {
    pool: PgPool,
}

impl PostgresLedgerAdapter {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Distinguishes a stale version from a missing row after a guarded
    /// update touched nothing
    async fn stale_or_missing(&self, table: &str, entity: &str, id: Uuid, company_id: Uuid) -> PortError {
        let sql = format!("SELECT EXISTS(SELECT 1 FROM {} WHERE id = $1 AND company_id = $2)", table);
        match sqlx::query_scalar::<_, bool>(&sql)
            .bind(id)
            .bind(company_id)
            .fetch_one(&self.pool)
            .await
        {
            Ok(true) => DatabaseError::StaleVersion(format!("{} {} was modified concurrently", entity, id)).into(),
            Ok(false) => PortError::not_found(entity, id),
            Err(e) => DatabaseError::from(e).into(),
        }
    }

    fn insert_receivable_sql(on_conflict: &str) -> String {
        format!(
            "INSERT INTO accounts_receivable ({}) VALUES ({}){}",
            columns(RECEIVABLE_HEAD, RECEIVABLE_TAIL),
            placeholders(1, 6 + OBLIGATION_COUNT + 7),
            on_conflict
        )
    }

    fn bind_receivable<'q>(
        sql: &'q str,
        receivable: &'q AccountReceivable,
    ) -> Result<crate::codec::PgQuery<'q>, DatabaseError> {
        let query = sqlx::query(sql)
            .bind(*receivable.id.as_uuid())
            .bind(*receivable.company_id.as_uuid())
            .bind(*receivable.branch_id.as_uuid())
            .bind(*receivable.customer_id.as_uuid())
            .bind(receivable.description.as_str())
            .bind(receivable.category.as_str());
        let flag = receivable.review_flag.as_ref();
        Ok(bind_obligation(
            query,
            &receivable.obligation,
            receivable.recurrence.as_ref(),
            receivable.series.as_ref(),
        )?
        .bind(receivable.invoice_id.map(Uuid::from))
        .bind(flag.map(|f| f.reason.as_str()))
        .bind(flag.map(|f| f.flagged_at))
        .bind(*receivable.created_by.as_uuid())
        .bind(receivable.created_at)
        .bind(receivable.updated_at)
        .bind(receivable.version))
    }

    async fn fetch_receivables(
        &self,
        builder: &mut QueryBuilder<'_, Postgres>,
    ) -> Result<Vec<AccountReceivable>, PortError> {
        let rows = builder
            .build_query_as::<ReceivableRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(DatabaseError::from)?;
        collect(rows, ReceivableRow::into_domain)
    }
}

impl DomainPort for PostgresLedgerAdapter {}

#[async_trait]
impl HealthCheckable for PostgresLedgerAdapter {
    async fn health_check(&self) -> HealthCheckResult {
        ping(&self.pool, "postgres-ledger-adapter").await
    }
}

#[async_trait]
impl PayablePort for PostgresLedgerAdapter {
    #[instrument(skip(self, ctx, payables), fields(company_id = %ctx.company_id, count = payables.len()))]
    async fn insert_payables(&self, ctx: &TenantContext, payables: &[AccountPayable]) -> Result<(), PortError> {
        let sql = format!(
            "INSERT INTO accounts_payable ({}) VALUES ({})",
            columns(PAYABLE_HEAD, PAYABLE_TAIL),
            placeholders(1, 6 + OBLIGATION_COUNT + 5)
        );
        let mut tx = self.pool.begin().await.map_err(DatabaseError::from)?;
        for payable in payables {
            let query = sqlx::query(&sql)
                .bind(*payable.id.as_uuid())
                .bind(*payable.company_id.as_uuid())
                .bind(*payable.branch_id.as_uuid())
                .bind(*payable.supplier_id.as_uuid())
                .bind(payable.description.as_str())
                .bind(payable.category.as_str());
            bind_obligation(query, &payable.obligation, payable.recurrence.as_ref(), payable.series.as_ref())?
                .bind(payable.document_id.map(Uuid::from))
                .bind(*payable.created_by.as_uuid())
                .bind(payable.created_at)
                .bind(payable.updated_at)
                .bind(payable.version)
                .execute(&mut *tx)
                .await
                .map_err(DatabaseError::from)?;
        }
        tx.commit().await.map_err(DatabaseError::from)?;
        debug!("payables inserted");
        Ok(())
    }

    async fn get_payable(&self, ctx: &TenantContext, id: PayableId) -> Result<AccountPayable, PortError> {
        let sql = format!(
            "SELECT {} FROM accounts_payable WHERE id = $1 AND company_id = $2",
            columns(PAYABLE_HEAD, PAYABLE_TAIL)
        );
        let row = sqlx::query_as::<_, PayableRow>(&sql)
            .bind(*id.as_uuid())
            .bind(*ctx.company_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::from)?
            .ok_or_else(|| PortError::not_found(AccountPayable::ENTITY, id))?;
        Ok(row.into_domain()?)
    }

    #[instrument(skip(self, ctx, payable), fields(payable_id = %payable.id))]
    async fn update_payable(
        &self,
        ctx: &TenantContext,
        payable: &AccountPayable,
        expected_version: i64,
    ) -> Result<(), PortError> {
        let o = &payable.obligation;
        let result = sqlx::query(
            r#"
            UPDATE accounts_payable
            SET status = $4, settlements = $5, paid_on = $6, cancelled_on = $7,
                classification = $8, updated_at = $9, version = $10
            WHERE id = $1 AND company_id = $2 AND version = $3
            "#,
        )
        .bind(*payable.id.as_uuid())
        .bind(*ctx.company_id.as_uuid())
        .bind(expected_version)
        .bind(o.status.as_str())
        .bind(Json(&o.settlements))
        .bind(o.paid_on)
        .bind(o.cancelled_on)
        .bind(o.classification.map(|c| c.as_str()))
        .bind(payable.updated_at)
        .bind(payable.version)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        if result.rows_affected() == 0 {
            return Err(self
                .stale_or_missing("accounts_payable", AccountPayable::ENTITY, *payable.id.as_uuid(), *ctx.company_id.as_uuid())
                .await);
        }
        Ok(())
    }

    async fn find_payables(&self, ctx: &TenantContext, query: &ObligationQuery) -> Result<Vec<AccountPayable>, PortError> {
        let mut builder = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM accounts_payable WHERE company_id = ",
            columns(PAYABLE_HEAD, PAYABLE_TAIL)
        ));
        builder.push_bind(*ctx.company_id.as_uuid());
        push_obligation_filters(&mut builder, query);
        let rows = builder
            .build_query_as::<PayableRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(DatabaseError::from)?;
        collect(rows, PayableRow::into_domain)
    }
}

#[async_trait]
impl ReceivablePort for PostgresLedgerAdapter {
    #[instrument(skip(self, ctx, receivables), fields(company_id = %ctx.company_id, count = receivables.len()))]
    async fn insert_receivables(
        &self,
        ctx: &TenantContext,
        receivables: &[AccountReceivable],
    ) -> Result<(), PortError> {
        let sql = Self::insert_receivable_sql("");
        let mut tx = self.pool.begin().await.map_err(DatabaseError::from)?;
        for receivable in receivables {
            Self::bind_receivable(&sql, receivable)?
                .execute(&mut *tx)
                .await
                .map_err(DatabaseError::from)?;
        }
        tx.commit().await.map_err(DatabaseError::from)?;
        Ok(())
    }

    #[instrument(skip(self, ctx, receivable), fields(invoice_id = ?receivable.invoice_id))]
    async fn insert_for_invoice(
        &self,
        ctx: &TenantContext,
        receivable: &AccountReceivable,
    ) -> Result<ReceivableInsert, PortError> {
        let invoice_id = receivable
            .invoice_id
            .ok_or_else(|| PortError::validation_field("receivable has no invoice", "invoice_id"))?;

        let sql = Self::insert_receivable_sql(
            " ON CONFLICT (company_id, invoice_id) WHERE invoice_id IS NOT NULL DO NOTHING",
        );
        let result = Self::bind_receivable(&sql, receivable)?
            .execute(&self.pool)
            .await
            .map_err(DatabaseError::from)?;

        if result.rows_affected() == 1 {
            return Ok(ReceivableInsert::Created(receivable.clone()));
        }
        debug!("receivable for invoice already present");
        self.find_by_invoice(ctx, invoice_id)
            .await?
            .map(ReceivableInsert::Existing)
            .ok_or_else(|| PortError::conflict(format!("receivable for invoice {} vanished", invoice_id)))
    }

    async fn get_receivable(&self, ctx: &TenantContext, id: ReceivableId) -> Result<AccountReceivable, PortError> {
        let mut builder = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM accounts_receivable WHERE company_id = ",
            columns(RECEIVABLE_HEAD, RECEIVABLE_TAIL)
        ));
        builder.push_bind(*ctx.company_id.as_uuid());
        builder.push(" AND id = ").push_bind(*id.as_uuid());
        self.fetch_receivables(&mut builder)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| PortError::not_found(AccountReceivable::ENTITY, id))
    }

    async fn find_by_invoice(
        &self,
        ctx: &TenantContext,
        invoice_id: InvoiceId,
    ) -> Result<Option<AccountReceivable>, PortError> {
        let mut builder = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM accounts_receivable WHERE company_id = ",
            columns(RECEIVABLE_HEAD, RECEIVABLE_TAIL)
        ));
        builder.push_bind(*ctx.company_id.as_uuid());
        builder.push(" AND invoice_id = ").push_bind(*invoice_id.as_uuid());
        Ok(self.fetch_receivables(&mut builder).await?.into_iter().next())
    }

    #[instrument(skip(self, ctx, receivable), fields(receivable_id = %receivable.id))]
    async fn update_receivable(
        &self,
        ctx: &TenantContext,
        receivable: &AccountReceivable,
        expected_version: i64,
    ) -> Result<(), PortError> {
        let o = &receivable.obligation;
        let flag = receivable.review_flag.as_ref();
        let result = sqlx::query(
            r#"
            UPDATE accounts_receivable
            SET status = $4, settlements = $5, paid_on = $6, cancelled_on = $7,
                classification = $8, review_reason = $9, flagged_at = $10,
                updated_at = $11, version = $12
            WHERE id = $1 AND company_id = $2 AND version = $3
            "#,
        )
        .bind(*receivable.id.as_uuid())
        .bind(*ctx.company_id.as_uuid())
        .bind(expected_version)
        .bind(o.status.as_str())
        .bind(Json(&o.settlements))
        .bind(o.paid_on)
        .bind(o.cancelled_on)
        .bind(o.classification.map(|c| c.as_str()))
        .bind(flag.map(|f| f.reason.as_str()))
        .bind(flag.map(|f| f.flagged_at))
        .bind(receivable.updated_at)
        .bind(receivable.version)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        if result.rows_affected() == 0 {
            return Err(self
                .stale_or_missing(
                    "accounts_receivable",
                    AccountReceivable::ENTITY,
                    *receivable.id.as_uuid(),
                    *ctx.company_id.as_uuid(),
                )
                .await);
        }
        Ok(())
    }

    async fn find_receivables(
        &self,
        ctx: &TenantContext,
        query: &ObligationQuery,
    ) -> Result<Vec<AccountReceivable>, PortError> {
        let mut builder = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM accounts_receivable WHERE company_id = ",
            columns(RECEIVABLE_HEAD, RECEIVABLE_TAIL)
        ));
        builder.push_bind(*ctx.company_id.as_uuid());
        push_obligation_filters(&mut builder, query);
        self.fetch_receivables(&mut builder).await
    }

    async fn find_flagged(&self, ctx: &TenantContext) -> Result<Vec<AccountReceivable>, PortError> {
        let mut builder = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM accounts_receivable WHERE company_id = ",
            columns(RECEIVABLE_HEAD, RECEIVABLE_TAIL)
        ));
        builder.push_bind(*ctx.company_id.as_uuid());
        builder.push(" AND review_reason IS NOT NULL ORDER BY flagged_at, id");
        self.fetch_receivables(&mut builder).await
    }
}

const UPDATE_PROVISION_SQL: &str = r#"
    UPDATE provisions
    SET status = $4, reversed_at = $5, reversed_on = $6, superseded_by = $7, version = $8
    WHERE id = $1 AND company_id = $2 AND version = $3
"#;

fn insert_provision_sql() -> String {
    format!("INSERT INTO provisions ({}) VALUES ({})", PROVISION_COLUMNS, placeholders(1, 23))
}

fn bind_provision<'q>(sql: &'q str, provision: &'q Provision) -> crate::codec::PgQuery<'q> {
    let (subject_kind, subject_id) = subject_columns(&provision.subject);
    let query = sqlx::query(sql)
        .bind(*provision.id.as_uuid())
        .bind(*provision.company_id.as_uuid())
        .bind(*provision.branch_id.as_uuid())
        .bind(subject_kind)
        .bind(subject_id)
        .bind(provision.description.as_str())
        .bind(provision.amount.amount())
        .bind(provision.amount.currency().code());
    bind_conversion(query, &provision.converted)
        .bind(provision.provision_date)
        .bind(provision.status.as_str())
        .bind(provision.reversed_at)
        .bind(provision.reversed_on)
        .bind(provision.supersedes.map(Uuid::from))
        .bind(provision.superseded_by.map(Uuid::from))
        .bind(provision.classification.map(|c| c.as_str()))
        .bind(*provision.created_by.as_uuid())
        .bind(provision.created_at)
        .bind(provision.version)
}

fn bind_provision_update<'q>(
    provision: &'q Provision,
    company_id: Uuid,
    expected_version: i64,
) -> crate::codec::PgQuery<'q> {
    sqlx::query(UPDATE_PROVISION_SQL)
        .bind(*provision.id.as_uuid())
        .bind(company_id)
        .bind(expected_version)
        .bind(provision.status.as_str())
        .bind(provision.reversed_at)
        .bind(provision.reversed_on)
        .bind(provision.superseded_by.map(Uuid::from))
        .bind(provision.version)
}

#[async_trait]
impl ProvisionPort for PostgresLedgerAdapter {
    #[instrument(skip(self, ctx, provision), fields(provision_id = %provision.id))]
    async fn insert_provision(&self, ctx: &TenantContext, provision: &Provision) -> Result<(), PortError> {
        let sql = insert_provision_sql();
        bind_provision(&sql, provision)
            .execute(&self.pool)
            .await
            .map_err(DatabaseError::from)?;
        debug!(company_id = %ctx.company_id, "provision inserted");
        Ok(())
    }

    async fn get_provision(&self, ctx: &TenantContext, id: ProvisionId) -> Result<Provision, PortError> {
        let sql = format!("SELECT {} FROM provisions WHERE id = $1 AND company_id = $2", PROVISION_COLUMNS);
        let row = sqlx::query_as::<_, ProvisionRow>(&sql)
            .bind(*id.as_uuid())
            .bind(*ctx.company_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::from)?
            .ok_or_else(|| PortError::not_found(Provision::ENTITY, id))?;
        Ok(row.into_domain()?)
    }

    #[instrument(skip(self, ctx, provision), fields(provision_id = %provision.id))]
    async fn update_provision(
        &self,
        ctx: &TenantContext,
        provision: &Provision,
        expected_version: i64,
    ) -> Result<(), PortError> {
        let result = bind_provision_update(provision, *ctx.company_id.as_uuid(), expected_version)
            .execute(&self.pool)
            .await
            .map_err(DatabaseError::from)?;

        if result.rows_affected() == 0 {
            return Err(self
                .stale_or_missing("provisions", Provision::ENTITY, *provision.id.as_uuid(), *ctx.company_id.as_uuid())
                .await);
        }
        Ok(())
    }

    async fn find_provisions(&self, ctx: &TenantContext, query: &ProvisionQuery) -> Result<Vec<Provision>, PortError> {
        let mut builder =
            QueryBuilder::<Postgres>::new(format!("SELECT {} FROM provisions WHERE company_id = ", PROVISION_COLUMNS));
        builder.push_bind(*ctx.company_id.as_uuid());
        if let Some(status) = query.status {
            builder.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(subject) = &query.subject {
            let (kind, id) = subject_columns(subject);
            builder.push(" AND subject_kind = ").push_bind(kind);
            builder.push(" AND subject_id = ").push_bind(id);
        }
        if let Some(date_to) = query.date_to {
            builder.push(" AND provision_date <= ").push_bind(date_to);
        }
        builder.push(" ORDER BY provision_date, id");

        let rows = builder
            .build_query_as::<ProvisionRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(DatabaseError::from)?;
        collect(rows, ProvisionRow::into_domain)
    }

    #[instrument(skip(self, ctx, old, replacement), fields(provision_id = %old.id, replacement_id = %replacement.id))]
    async fn supersede_provision(
        &self,
        ctx: &TenantContext,
        old: &Provision,
        expected_version: i64,
        replacement: &Provision,
    ) -> Result<(), PortError> {
        let mut tx = self.pool.begin().await.map_err(DatabaseError::from)?;
        let sql = insert_provision_sql();
        bind_provision(&sql, replacement)
            .execute(&mut *tx)
            .await
            .map_err(DatabaseError::from)?;
        let result = bind_provision_update(old, *ctx.company_id.as_uuid(), expected_version)
            .execute(&mut *tx)
            .await
            .map_err(DatabaseError::from)?;
        if result.rows_affected() == 0 {
            tx.rollback().await.map_err(DatabaseError::from)?;
            return Err(self
                .stale_or_missing("provisions", Provision::ENTITY, *old.id.as_uuid(), *ctx.company_id.as_uuid())
                .await);
        }
        tx.commit().await.map_err(DatabaseError::from)?;
        debug!(company_id = %ctx.company_id, "provision superseded");
        Ok(())
    }
}

#[async_trait]
impl EquityPort for PostgresLedgerAdapter {
    async fn insert_equity_entry(&self, _ctx: &TenantContext, entry: &EquityEntry) -> Result<(), PortError> {
        let sql = format!("INSERT INTO equity_entries ({}) VALUES ({})", EQUITY_COLUMNS, placeholders(1, 15));
        let query = sqlx::query(&sql)
            .bind(*entry.id.as_uuid())
            .bind(*entry.company_id.as_uuid())
            .bind(*entry.branch_id.as_uuid())
            .bind(entry.kind.as_str())
            .bind(entry.amount.amount())
            .bind(entry.amount.currency().code());
        bind_conversion(query, &entry.converted)
            .bind(entry.entry_date)
            .bind(entry.description.as_str())
            .bind(*entry.created_by.as_uuid())
            .bind(entry.created_at)
            .execute(&self.pool)
            .await
            .map_err(DatabaseError::from)?;
        Ok(())
    }

    async fn find_equity_entries(
        &self,
        ctx: &TenantContext,
        up_to: Option<NaiveDate>,
    ) -> Result<Vec<EquityEntry>, PortError> {
        let mut builder =
            QueryBuilder::<Postgres>::new(format!("SELECT {} FROM equity_entries WHERE company_id = ", EQUITY_COLUMNS));
        builder.push_bind(*ctx.company_id.as_uuid());
        if let Some(up_to) = up_to {
            builder.push(" AND entry_date <= ").push_bind(up_to);
        }
        builder.push(" ORDER BY entry_date, id");

        let rows = builder
            .build_query_as::<EquityRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(DatabaseError::from)?;
        collect(rows, EquityRow::into_domain)
    }
}

#[async_trait]
impl PeriodLockPort for PostgresLedgerAdapter {
    async fn get_lock(&self, ctx: &TenantContext, period: YearMonth) -> Result<Option<PeriodLock>, PortError> {
        let row = sqlx::query_as::<_, LockRow>(
            "SELECT company_id, period, locked_at, locked_by FROM period_locks WHERE company_id = $1 AND period = $2",
        )
        .bind(*ctx.company_id.as_uuid())
        .bind(period.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from)?;
        Ok(row.map(LockRow::into_domain).transpose()?)
    }

    #[instrument(skip(self, ctx, lock), fields(period = %lock.period))]
    async fn insert_lock(&self, ctx: &TenantContext, lock: &PeriodLock) -> Result<(), PortError> {
        sqlx::query("INSERT INTO period_locks (company_id, period, locked_at, locked_by) VALUES ($1, $2, $3, $4)")
            .bind(*ctx.company_id.as_uuid())
            .bind(lock.period.to_string())
            .bind(lock.locked_at)
            .bind(*lock.locked_by.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(DatabaseError::from)?;
        Ok(())
    }

    async fn delete_lock(&self, ctx: &TenantContext, period: YearMonth) -> Result<bool, PortError> {
        let result = sqlx::query("DELETE FROM period_locks WHERE company_id = $1 AND period = $2")
            .bind(*ctx.company_id.as_uuid())
            .bind(period.to_string())
            .execute(&self.pool)
            .await
            .map_err(DatabaseError::from)?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_locks(&self, ctx: &TenantContext) -> Result<Vec<PeriodLock>, PortError> {
        let rows = sqlx::query_as::<_, LockRow>(
            "SELECT company_id, period, locked_at, locked_by FROM period_locks WHERE company_id = $1 ORDER BY period",
        )
        .bind(*ctx.company_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::from)?;
        collect(rows, LockRow::into_domain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_counts_match_columns() {
        let payable = columns(PAYABLE_HEAD, PAYABLE_TAIL);
        assert_eq!(payable.split(',').count(), 6 + OBLIGATION_COUNT + 5);
        let receivable = columns(RECEIVABLE_HEAD, RECEIVABLE_TAIL);
        assert_eq!(receivable.split(',').count(), 6 + OBLIGATION_COUNT + 7);
        assert_eq!(OBLIGATION_COLUMNS.split(',').count(), OBLIGATION_COUNT);
        assert_eq!(PROVISION_COLUMNS.split(',').count(), 23);
        assert_eq!(EQUITY_COLUMNS.split(',').count(), 15);
    }

    #[test]
    fn test_subject_columns() {
        let employee = EmployeeId::new();
        assert_eq!(
            subject_columns(&ProvisionSubject::Employee(employee)),
            ("employee", *employee.as_uuid())
        );
    }

    #[test]
    fn test_out_of_range_period_fails_to_decode() {
        let row = LockRow {
            company_id: Uuid::new_v4(),
            period: "2025-13".to_string(),
            locked_at: Utc::now(),
            locked_by: Uuid::new_v4(),
        };
        assert!(row.into_domain().is_err());
    }
}
