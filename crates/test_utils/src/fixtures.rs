//! Pre-built Test Fixtures
//!
//! Consistent amounts, dates, and tenants for unit and workflow tests.

use chrono::NaiveDate;
use core_kernel::{
    BranchId, CompanyId, ContractId, Currency, CustomerId, EmployeeId, Money, SupplierId, TenantContext,
    UserId, YearMonth,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Fixture for Money test data
pub struct MoneyFixtures;

impl MoneyFixtures {
    pub fn usd_100() -> Money {
        Money::new(dec!(100.00), Currency::USD)
    }

    /// Typical monthly rent
    pub fn usd_rent() -> Money {
        Money::new(dec!(2500.00), Currency::USD)
    }

    pub fn usd_zero() -> Money {
        Money::zero(Currency::USD)
    }

    pub fn eur_100() -> Money {
        Money::new(dec!(100.00), Currency::EUR)
    }

    pub fn brl_1000() -> Money {
        Money::new(dec!(1000.00), Currency::BRL)
    }

    /// Zero decimal places
    pub fn jpy_10000() -> Money {
        Money::new(dec!(10000), Currency::JPY)
    }
}

/// Rates quoted against USD, the default reporting currency
pub struct RateFixtures;

impl RateFixtures {
    pub const EUR_USD: Decimal = dec!(1.10);
    pub const BRL_USD: Decimal = dec!(0.20);
    pub const GBP_USD: Decimal = dec!(1.25);

    /// `(base, quote, rate)` triples for a static provider
    pub fn usd_table() -> Vec<(Currency, Currency, Decimal)> {
        vec![
            (Currency::EUR, Currency::USD, Self::EUR_USD),
            (Currency::BRL, Currency::USD, Self::BRL_USD),
            (Currency::GBP, Currency::USD, Self::GBP_USD),
        ]
    }
}

/// Fixture for calendar data
pub struct DateFixtures;

impl DateFixtures {
    pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap_or(NaiveDate::MIN)
    }

    /// The harness clock's default "today"
    pub fn today() -> NaiveDate {
        Self::date(2025, 6, 15)
    }

    pub fn month_start() -> NaiveDate {
        Self::date(2025, 6, 1)
    }

    pub fn month_end() -> NaiveDate {
        Self::date(2025, 6, 30)
    }

    pub fn in_thirty_days() -> NaiveDate {
        Self::date(2025, 7, 15)
    }

    pub fn current_month() -> YearMonth {
        YearMonth::of(Self::today())
    }

    pub fn previous_month() -> YearMonth {
        YearMonth::of(Self::date(2025, 5, 1))
    }
}

/// Fixture for tenants and counterparties
pub struct TenantFixtures;

impl TenantFixtures {
    /// A fresh tenant with random identifiers
    pub fn tenant() -> TenantContext {
        TenantContext::new(CompanyId::new(), BranchId::new(), UserId::new())
    }

    /// Another user in the same company and branch
    pub fn colleague_of(ctx: &TenantContext) -> TenantContext {
        TenantContext::new(ctx.company_id, ctx.branch_id, UserId::new())
    }

    pub fn customer_id() -> CustomerId {
        CustomerId::new()
    }

    pub fn supplier_id() -> SupplierId {
        SupplierId::new()
    }

    pub fn contract_id() -> ContractId {
        ContractId::new()
    }

    pub fn employee_id() -> EmployeeId {
        EmployeeId::new()
    }
}
