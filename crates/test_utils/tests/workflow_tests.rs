//! End-to-end workflows over the in-memory harness

use core_kernel::{AuditAction, AuditEntity, Currency, ErrorKind, Money, YearMonth};
use domain_invoicing::{InvoiceQuery, InvoiceStatus, LineInput};
use domain_ledger::{
    DisplayStatus, EquityKind, ExpenseCategory, ObligationQuery, ObligationStatus, SettlementRequest,
};
use proptest::prelude::*;
use rust_decimal_macros::dec;
use test_utils::*;

fn settle(amount: rust_decimal::Decimal, on: chrono::NaiveDate) -> SettlementRequest {
    SettlementRequest {
        amount,
        settled_on: on,
        reference: None,
    }
}

#[tokio::test]
async fn test_invoice_issue_settle_and_close() {
    let office = InMemoryBackOffice::new().await;
    let ctx = TenantFixtures::tenant();
    let customer = TenantFixtures::customer_id();

    let invoice = office
        .invoices
        .create_invoice(
            &ctx,
            InvoiceRequestBuilder::new(customer)
                .with_currency(Currency::EUR)
                .with_line(LineInput::new("Setup", dec!(1), dec!(250.00)).with_tax(dec!(20)))
                .build(),
        )
        .await
        .unwrap();
    assert_eq!(invoice.status, InvoiceStatus::Draft);
    assert_eq!(invoice.total, dec!(1300.00));
    assert_invoice_totals_consistent(&invoice);
    assert_conversion_consistent(&invoice.converted, invoice.total);
    assert_eq!(invoice.converted.reporting_amount, dec!(1430.00));

    let issued = office
        .invoices
        .transition_status(&ctx, invoice.id, InvoiceStatus::Issued)
        .await
        .unwrap();
    assert_eq!(issued.status, InvoiceStatus::Issued);
    assert_eq!(office.ledger_store.receivable_count().await, 1);

    // Issuing again only re-checks the receivable
    office
        .invoices
        .transition_status(&ctx, invoice.id, InvoiceStatus::Issued)
        .await
        .unwrap();
    assert_eq!(office.ledger_store.receivable_count().await, 1);

    let receivable = office
        .ledger
        .receivable_for_invoice(&ctx, invoice.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(receivable.obligation.amount, Money::new(dec!(1300.00), Currency::EUR));
    assert_eq!(receivable.obligation.converted, invoice.converted);

    office.advance_to(DateFixtures::date(2025, 6, 28));
    let receivable = office
        .invoices
        .settle_receivable(&ctx, receivable.id, settle(dec!(1300.00), DateFixtures::date(2025, 6, 25)))
        .await
        .unwrap();
    assert_eq!(receivable.obligation.status, ObligationStatus::Paid);
    assert_not_overpaid(&receivable.obligation);
    let paid = office.invoices.get_invoice(&ctx, invoice.id).await.unwrap();
    assert_eq!(paid.status, InvoiceStatus::Paid);

    let june = DateFixtures::current_month();
    let closed = office.close.close_month(&ctx, june).await.unwrap();
    assert!(closed.summary.is_closed);
    assert_eq!(closed.summary.invoice_count, 1);
    assert_eq!(
        office
            .audit
            .matching(AuditEntity::PeriodClose, AuditAction::Closed)
            .await
            .len(),
        1
    );

    let err = office.close.close_month(&ctx, june).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidStateTransition);

    let err = office
        .ledger
        .create_payable(
            &ctx,
            PayableBuilder::new(TenantFixtures::supplier_id(), MoneyFixtures::usd_100())
                .recorded_on(DateFixtures::date(2025, 6, 20))
                .build(),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PeriodClosed);

    office.close.reopen_month(&ctx, june).await.unwrap();
    assert!(office.close.closed_periods(&ctx).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_recurring_rent_feeds_aging_and_cash_flow() {
    let office = InMemoryBackOffice::new().await;
    let ctx = TenantFixtures::tenant();

    let series = office
        .ledger
        .create_payable(
            &ctx,
            PayableBuilder::new(TenantFixtures::supplier_id(), MoneyFixtures::usd_rent())
                .description("Office rent")
                .category(ExpenseCategory::Rent)
                .recorded_on(DateFixtures::date(2025, 6, 1))
                .due_on(DateFixtures::date(2025, 6, 5))
                .monthly_until(DateFixtures::date(2025, 12, 31))
                .build(),
        )
        .await
        .unwrap();
    assert_eq!(series.len(), 7);
    assert_eq!(series[6].obligation.due_date, DateFixtures::date(2025, 12, 5));
    assert!(series.iter().all(|p| p.series.is_some()));

    office
        .ledger
        .record_payable_settlement(&ctx, series[0].id, settle(dec!(2500.00), DateFixtures::date(2025, 6, 5)))
        .await
        .unwrap();

    office.advance_to(DateFixtures::date(2025, 7, 20));
    let aging = office
        .reporting
        .aging(&ctx, None, true)
        .await
        .unwrap();
    assert_eq!(aging.as_of, DateFixtures::date(2025, 7, 20));
    assert_eq!(aging.payables.count(), 1);
    assert_eq!(aging.payables.total(), dec!(2500.00));
    assert_eq!(aging.receivables.count(), 0);

    let window = core_kernel::DateRange::new(DateFixtures::date(2025, 6, 1), DateFixtures::date(2025, 8, 31)).unwrap();
    let cash_flow = office
        .reporting
        .cash_flow(&ctx, window, dec!(10000), true)
        .await
        .unwrap();
    assert_eq!(cash_flow.months.len(), 3);
    assert_cash_flow_chains(&cash_flow);
    assert_eq!(cash_flow.months[0].closing_balance, dec!(7500));

    let pnl = office.reporting.profit_and_loss(&ctx, window, true).await.unwrap();
    assert_reporting_total(&pnl.expenses.total, dec!(2500.00));
    assert_reporting_total(&pnl.net_income, dec!(-2500.00));
}

#[tokio::test]
async fn test_balance_sheet_balances_across_currencies() {
    let office = InMemoryBackOffice::new().await;
    let ctx = TenantFixtures::tenant();

    office
        .ledger
        .record_equity_entry(
            &ctx,
            equity_entry(EquityKind::Contribution, Money::new(dec!(50000), Currency::USD), DateFixtures::month_start()),
        )
        .await
        .unwrap();
    office
        .ledger
        .create_receivable(
            &ctx,
            ReceivableBuilder::new(TenantFixtures::customer_id(), MoneyFixtures::brl_1000()).build(),
        )
        .await
        .unwrap();
    office
        .ledger
        .create_payable(
            &ctx,
            PayableBuilder::new(TenantFixtures::supplier_id(), MoneyFixtures::eur_100()).build(),
        )
        .await
        .unwrap();
    office
        .ledger
        .create_provision(&ctx, employee_provision(TenantFixtures::employee_id(), MoneyFixtures::usd_100()))
        .await
        .unwrap();

    let sheet = office.reporting.balance_sheet(&ctx, None, true).await.unwrap();
    assert_balance_sheet_balances(&sheet);
    assert_eq!(sheet.assets.total.in_currency(Currency::BRL), dec!(1000.00));
}

#[tokio::test]
async fn test_cancelled_invoice_flags_settled_receivable() {
    let office = InMemoryBackOffice::new().await;
    let ctx = TenantFixtures::tenant();

    let invoice = office
        .invoices
        .create_invoice(&ctx, InvoiceRequestBuilder::new(TenantFixtures::customer_id()).build())
        .await
        .unwrap();
    office
        .invoices
        .transition_status(&ctx, invoice.id, InvoiceStatus::Issued)
        .await
        .unwrap();
    let receivable = office
        .ledger
        .receivable_for_invoice(&ctx, invoice.id)
        .await
        .unwrap()
        .unwrap();
    office
        .ledger
        .record_receivable_settlement(&ctx, receivable.id, settle(dec!(400.00), DateFixtures::today()))
        .await
        .unwrap();

    let cancelled = office.invoices.cancel_invoice(&ctx, invoice.id).await.unwrap();
    assert_eq!(cancelled.status, InvoiceStatus::Cancelled);

    let flagged = office.ledger.list_flagged_receivables(&ctx).await.unwrap();
    assert_eq!(flagged.len(), 1);
    assert_eq!(flagged[0].obligation.display_status(DateFixtures::today()), DisplayStatus::Partial);

    let cleared = office.ledger.clear_review_flag(&ctx, receivable.id).await.unwrap();
    assert!(cleared.review_flag.is_none());
}

#[tokio::test]
async fn test_missing_rate_blocks_the_write() {
    let office = InMemoryBackOffice::new().await;
    let ctx = TenantFixtures::tenant();
    office.remove_rate(Currency::EUR).await;

    let err = office
        .ledger
        .create_payable(
            &ctx,
            PayableBuilder::new(TenantFixtures::supplier_id(), MoneyFixtures::eur_100()).build(),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RateUnavailable);
    assert!(office
        .ledger
        .list_payables(&ctx, &ObligationQuery::default())
        .await
        .unwrap()
        .is_empty());

    office.set_rate(Currency::EUR, dec!(1.08)).await;
    let created = office
        .ledger
        .create_payable(
            &ctx,
            PayableBuilder::new(TenantFixtures::supplier_id(), MoneyFixtures::eur_100()).build(),
        )
        .await
        .unwrap();
    assert_eq!(created[0].obligation.converted.reporting_amount, dec!(108.00));
}

#[tokio::test]
async fn test_strict_directory_rejects_unknown_counterparties() {
    let office = InMemoryBackOffice::strict().await;
    let ctx = TenantFixtures::tenant();

    let err = office
        .invoices
        .create_invoice(&ctx, InvoiceRequestBuilder::new(TenantFixtures::customer_id()).build())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let customer = office.register_customer().await;
    let invoice = office
        .invoices
        .create_invoice(&ctx, InvoiceRequestBuilder::new(customer).build())
        .await
        .unwrap();
    assert_eq!(invoice.customer_id, customer);
}

async fn invoice_numbers(office: &InMemoryBackOffice, ctx: &core_kernel::TenantContext) -> Vec<String> {
    let mut numbers: Vec<String> = office
        .invoices
        .list_invoices(ctx, &InvoiceQuery::default())
        .await
        .unwrap()
        .iter()
        .map(|i| i.number.to_string())
        .collect();
    numbers.sort();
    numbers
}

#[tokio::test]
async fn test_invoice_numbers_are_per_tenant() {
    let office = InMemoryBackOffice::new().await;
    let first = TenantFixtures::tenant();
    let second = TenantFixtures::tenant();

    for ctx in [&first, &first, &second] {
        office
            .invoices
            .create_invoice(ctx, InvoiceRequestBuilder::new(TenantFixtures::customer_id()).build())
            .await
            .unwrap();
    }

    assert_eq!(invoice_numbers(&office, &first).await, vec!["INV-2025000001", "INV-2025000002"]);
    assert_eq!(invoice_numbers(&office, &second).await, vec!["INV-2025000001"]);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_generated_invoices_price_consistently(lines in line_inputs_strategy(6), currency in convertible_currency_strategy()) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let office = InMemoryBackOffice::new().await;
            let ctx = TenantFixtures::tenant();
            let invoice = office
                .invoices
                .create_invoice(
                    &ctx,
                    InvoiceRequestBuilder::new(TenantFixtures::customer_id())
                        .with_currency(currency)
                        .with_lines(lines)
                        .build(),
                )
                .await
                .unwrap();

            assert_invoice_totals_consistent(&invoice);
            assert_two_decimal_places(invoice.total);
            assert_conversion_consistent(&invoice.converted, invoice.total);
            assert_eq!(YearMonth::of(invoice.issue_date), DateFixtures::current_month());
        });
    }
}
