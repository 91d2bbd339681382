//! PostgreSQL adapter for invoices and their lines

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use core_kernel::{
    BranchId, CompanyId, ContractId, CustomerId, DomainPort, HealthCheckResult, HealthCheckable, InvoiceId,
    InvoiceLineId, PortError, TemplateId, TenantContext, UserId,
};
use domain_invoicing::{Invoice, InvoiceLine, InvoicePort, InvoiceQuery};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use std::collections::HashMap;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::codec::{bind_conversion, parse, ping, placeholders, push_page, to_i32, to_u32, ConversionRow};
use crate::error::DatabaseError;

const INVOICE_COLUMNS: &str = "id, company_id, branch_id, invoice_number, customer_id, contract_id, issue_date, \
    due_date, currency, subtotal, tax_amount, total, reporting_currency, amount_reporting_ccy, rate_used, \
    rate_source, rate_timestamp, status, notes, language, template_id, category, created_by, created_at, \
    updated_at, version";
const INVOICE_COLUMN_COUNT: usize = 26;

const LINE_COLUMNS: &str = "id, invoice_id, sequence, description, quantity, unit_price, discount_percent, \
    tax_percent, net_amount, tax_amount, line_total";

#[derive(Debug, sqlx::FromRow)]
struct InvoiceRow {
    id: Uuid,
    company_id: Uuid,
    branch_id: Uuid,
    invoice_number: String,
    customer_id: Uuid,
    contract_id: Option<Uuid>,
    issue_date: NaiveDate,
    due_date: NaiveDate,
    currency: String,
    subtotal: Decimal,
    tax_amount: Decimal,
    total: Decimal,
    #[sqlx(flatten)]
    conversion: ConversionRow,
    status: String,
    notes: Option<String>,
    language: Option<String>,
    template_id: Option<Uuid>,
    category: String,
    created_by: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    version: i64,
}

impl InvoiceRow {
    fn into_domain(self, lines: Vec<InvoiceLine>) -> Result<Invoice, DatabaseError> {
        Ok(Invoice {
            id: InvoiceId::from_uuid(self.id),
            company_id: CompanyId::from_uuid(self.company_id),
            branch_id: BranchId::from_uuid(self.branch_id),
            number: parse("invoice_number", &self.invoice_number)?,
            customer_id: CustomerId::from_uuid(self.customer_id),
            contract_id: self.contract_id.map(ContractId::from_uuid),
            issue_date: self.issue_date,
            due_date: self.due_date,
            currency: parse("currency", &self.currency)?,
            subtotal: self.subtotal,
            tax_amount: self.tax_amount,
            total: self.total,
            converted: self.conversion.into_converted()?,
            status: parse("status", &self.status)?,
            notes: self.notes,
            language: self.language,
            template_id: self.template_id.map(TemplateId::from_uuid),
            category: parse("category", &self.category)?,
            lines,
            created_by: UserId::from_uuid(self.created_by),
            created_at: self.created_at,
            updated_at: self.updated_at,
            version: self.version,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct LineRow {
    id: Uuid,
    invoice_id: Uuid,
    sequence: i32,
    description: String,
    quantity: Decimal,
    unit_price: Decimal,
    discount_percent: Decimal,
    tax_percent: Decimal,
    net_amount: Decimal,
    tax_amount: Decimal,
    line_total: Decimal,
}

impl LineRow {
    fn into_domain(self) -> Result<InvoiceLine, DatabaseError> {
        Ok(InvoiceLine {
            id: InvoiceLineId::from_uuid(self.id),
            sequence: to_u32("sequence", self.sequence)?,
            description: self.description,
            quantity: self.quantity,
            unit_price: self.unit_price,
            discount_percent: self.discount_percent,
            tax_percent: self.tax_percent,
            net_amount: self.net_amount,
            tax_amount: self.tax_amount,
            line_total: self.line_total,
        })
    }
}

/// PostgreSQL implementation of [`InvoicePort`]
///
/// An invoice and its lines are always written in one transaction; updates
/// replace the full line set.
#[derive(Debug, Clone)]
pub struct PostgresInvoiceAdapter {
    pool: PgPool,
}

impl PostgresInvoiceAdapter {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert_lines(
        tx: &mut Transaction<'_, Postgres>,
        invoice_id: Uuid,
        lines: &[InvoiceLine],
    ) -> Result<(), DatabaseError> {
        let sql = format!("INSERT INTO invoice_lines ({}) VALUES ({})", LINE_COLUMNS, placeholders(1, 11));
        for line in lines {
            sqlx::query(&sql)
                .bind(*line.id.as_uuid())
                .bind(invoice_id)
                .bind(to_i32("sequence", line.sequence)?)
                .bind(line.description.as_str())
                .bind(line.quantity)
                .bind(line.unit_price)
                .bind(line.discount_percent)
                .bind(line.tax_percent)
                .bind(line.net_amount)
                .bind(line.tax_amount)
                .bind(line.line_total)
                .execute(&mut **tx)
                .await?;
        }
        Ok(())
    }

    /// Loads lines for a batch of invoices keyed by invoice id
    async fn load_lines(&self, invoice_ids: Vec<Uuid>) -> Result<HashMap<Uuid, Vec<InvoiceLine>>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM invoice_lines WHERE invoice_id = ANY($1) ORDER BY invoice_id, sequence",
            LINE_COLUMNS
        );
        let rows = sqlx::query_as::<_, LineRow>(&sql)
            .bind(invoice_ids)
            .fetch_all(&self.pool)
            .await?;

        let mut by_invoice: HashMap<Uuid, Vec<InvoiceLine>> = HashMap::new();
        for row in rows {
            let invoice_id = row.invoice_id;
            by_invoice.entry(invoice_id).or_default().push(row.into_domain()?);
        }
        Ok(by_invoice)
    }

    async fn hydrate(&self, rows: Vec<InvoiceRow>) -> Result<Vec<Invoice>, DatabaseError> {
        let mut lines = self.load_lines(rows.iter().map(|r| r.id).collect()).await?;
        rows.into_iter()
            .map(|row| {
                let invoice_lines = lines.remove(&row.id).unwrap_or_default();
                row.into_domain(invoice_lines)
            })
            .collect()
    }
}

impl DomainPort for PostgresInvoiceAdapter {}

#[async_trait]
impl HealthCheckable for PostgresInvoiceAdapter {
    async fn health_check(&self) -> HealthCheckResult {
        ping(&self.pool, "postgres-invoice-adapter").await
    }
}

#[async_trait]
impl InvoicePort for PostgresInvoiceAdapter {
    #[instrument(skip(self, ctx, invoice), fields(company_id = %ctx.company_id, number = %invoice.number))]
    async fn insert_invoice(&self, ctx: &TenantContext, invoice: &Invoice) -> Result<(), PortError> {
        let sql = format!(
            "INSERT INTO invoices ({}) VALUES ({})",
            INVOICE_COLUMNS,
            placeholders(1, INVOICE_COLUMN_COUNT)
        );
        let mut tx = self.pool.begin().await.map_err(DatabaseError::from)?;

        let query = sqlx::query(&sql)
            .bind(*invoice.id.as_uuid())
            .bind(*invoice.company_id.as_uuid())
            .bind(*invoice.branch_id.as_uuid())
            .bind(invoice.number.to_string())
            .bind(*invoice.customer_id.as_uuid())
            .bind(invoice.contract_id.map(Uuid::from))
            .bind(invoice.issue_date)
            .bind(invoice.due_date)
            .bind(invoice.currency.code())
            .bind(invoice.subtotal)
            .bind(invoice.tax_amount)
            .bind(invoice.total);
        bind_conversion(query, &invoice.converted)
            .bind(invoice.status.as_str())
            .bind(invoice.notes.as_deref())
            .bind(invoice.language.as_deref())
            .bind(invoice.template_id.map(Uuid::from))
            .bind(invoice.category.as_str())
            .bind(*invoice.created_by.as_uuid())
            .bind(invoice.created_at)
            .bind(invoice.updated_at)
            .bind(invoice.version)
            .execute(&mut *tx)
            .await
            .map_err(DatabaseError::from)?;

        Self::insert_lines(&mut tx, *invoice.id.as_uuid(), &invoice.lines).await?;
        tx.commit().await.map_err(DatabaseError::from)?;
        debug!(lines = invoice.lines.len(), "invoice inserted");
        Ok(())
    }

    async fn get_invoice(&self, ctx: &TenantContext, id: InvoiceId) -> Result<Invoice, PortError> {
        let sql = format!("SELECT {} FROM invoices WHERE id = $1 AND company_id = $2", INVOICE_COLUMNS);
        let row = sqlx::query_as::<_, InvoiceRow>(&sql)
            .bind(*id.as_uuid())
            .bind(*ctx.company_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::from)?
            .ok_or_else(|| PortError::not_found(Invoice::ENTITY, id))?;

        self.hydrate(vec![row])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| PortError::not_found(Invoice::ENTITY, id))
    }

    #[instrument(skip(self, ctx, invoice), fields(invoice_id = %invoice.id, status = %invoice.status))]
    async fn update_invoice(
        &self,
        ctx: &TenantContext,
        invoice: &Invoice,
        expected_version: i64,
    ) -> Result<(), PortError> {
        let mut tx = self.pool.begin().await.map_err(DatabaseError::from)?;

        let result = sqlx::query(
            r#"
            UPDATE invoices
            SET customer_id = $4, contract_id = $5, issue_date = $6, due_date = $7,
                subtotal = $8, tax_amount = $9, total = $10, amount_reporting_ccy = $11,
                status = $12, notes = $13, language = $14, template_id = $15,
                updated_at = $16, version = $17
            WHERE id = $1 AND company_id = $2 AND version = $3
            "#,
        )
        .bind(*invoice.id.as_uuid())
        .bind(*ctx.company_id.as_uuid())
        .bind(expected_version)
        .bind(*invoice.customer_id.as_uuid())
        .bind(invoice.contract_id.map(Uuid::from))
        .bind(invoice.issue_date)
        .bind(invoice.due_date)
        .bind(invoice.subtotal)
        .bind(invoice.tax_amount)
        .bind(invoice.total)
        .bind(invoice.converted.reporting_amount)
        .bind(invoice.status.as_str())
        .bind(invoice.notes.as_deref())
        .bind(invoice.language.as_deref())
        .bind(invoice.template_id.map(Uuid::from))
        .bind(invoice.updated_at)
        .bind(invoice.version)
        .execute(&mut *tx)
        .await
        .map_err(DatabaseError::from)?;

        if result.rows_affected() == 0 {
            let exists: bool =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM invoices WHERE id = $1 AND company_id = $2)")
                    .bind(*invoice.id.as_uuid())
                    .bind(*ctx.company_id.as_uuid())
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(DatabaseError::from)?;
            return Err(if exists {
                DatabaseError::StaleVersion(format!(
                    "invoice {} is no longer at version {}",
                    invoice.id, expected_version
                ))
                .into()
            } else {
                PortError::not_found(Invoice::ENTITY, invoice.id)
            });
        }

        sqlx::query("DELETE FROM invoice_lines WHERE invoice_id = $1")
            .bind(*invoice.id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(DatabaseError::from)?;
        Self::insert_lines(&mut tx, *invoice.id.as_uuid(), &invoice.lines).await?;

        tx.commit().await.map_err(DatabaseError::from)?;
        Ok(())
    }

    async fn find_invoices(&self, ctx: &TenantContext, query: &InvoiceQuery) -> Result<Vec<Invoice>, PortError> {
        let mut builder =
            QueryBuilder::<Postgres>::new(format!("SELECT {} FROM invoices WHERE company_id = ", INVOICE_COLUMNS));
        builder.push_bind(*ctx.company_id.as_uuid());
        if !query.statuses.is_empty() {
            let statuses: Vec<String> = query.statuses.iter().map(|s| s.as_str().to_string()).collect();
            builder.push(" AND status = ANY(").push_bind(statuses).push(")");
        }
        if let Some(customer_id) = query.customer_id {
            builder.push(" AND customer_id = ").push_bind(*customer_id.as_uuid());
        }
        if let Some(from) = query.issued_from {
            builder.push(" AND issue_date >= ").push_bind(from);
        }
        if let Some(to) = query.issued_to {
            builder.push(" AND issue_date <= ").push_bind(to);
        }
        builder.push(" ORDER BY issue_date, invoice_number");
        push_page(&mut builder, query.limit, query.offset);

        let rows = builder
            .build_query_as::<InvoiceRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(DatabaseError::from)?;
        Ok(self.hydrate(rows).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain_invoicing::InvoiceStatus;
    use rust_decimal_macros::dec;

    fn row() -> InvoiceRow {
        InvoiceRow {
            id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            branch_id: Uuid::new_v4(),
            invoice_number: "INV-2025000007".to_string(),
            customer_id: Uuid::new_v4(),
            contract_id: None,
            issue_date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            due_date: NaiveDate::from_ymd_opt(2025, 3, 31).unwrap(),
            currency: "USD".to_string(),
            subtotal: dec!(230.00),
            tax_amount: dec!(9.00),
            total: dec!(239.00),
            conversion: ConversionRow {
                reporting_currency: "USD".to_string(),
                amount_reporting_ccy: dec!(239.00),
                rate_used: Decimal::ONE,
                rate_source: "identity".to_string(),
                rate_timestamp: Utc::now(),
            },
            status: "issued".to_string(),
            notes: None,
            language: Some("en".to_string()),
            template_id: None,
            category: "services".to_string(),
            created_by: Uuid::new_v4(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            version: 2,
        }
    }

    #[test]
    fn test_invoice_row_maps_to_domain() {
        let invoice = row().into_domain(Vec::new()).unwrap();
        assert_eq!(invoice.number.to_string(), "INV-2025000007");
        assert_eq!(invoice.status, InvoiceStatus::Issued);
        assert_eq!(invoice.total, dec!(239.00));
        assert_eq!(invoice.converted.reporting_amount, dec!(239.00));
    }

    #[test]
    fn test_malformed_invoice_number_fails_to_decode() {
        let mut bad = row();
        bad.invoice_number = "2025-7".to_string();
        assert!(matches!(
            bad.into_domain(Vec::new()),
            Err(DatabaseError::Decode { ref column, .. }) if column == "invoice_number"
        ));
    }

    #[test]
    fn test_column_counts() {
        assert_eq!(INVOICE_COLUMNS.split(',').count(), INVOICE_COLUMN_COUNT);
        assert_eq!(LINE_COLUMNS.split(',').count(), 11);
    }
}
