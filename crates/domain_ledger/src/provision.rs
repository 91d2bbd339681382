//! Provisions
//!
//! A provision's amount is never edited. A corrected estimate is recorded as
//! a new provision and the old one is reversed; `reversed_at` is written
//! exactly once.

use chrono::{DateTime, NaiveDate, Utc};
use core_kernel::{BranchId, CompanyId, ContractId, EmployeeId, Money, ProvisionId, UserId};
use domain_fx::ConvertedAmount;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::category::Classification;
use crate::error::LedgerError;

/// What the provision is held against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum ProvisionSubject {
    Employee(EmployeeId),
    Contract(ContractId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvisionStatus {
    Active,
    Reversed,
}

impl ProvisionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProvisionStatus::Active => "active",
            ProvisionStatus::Reversed => "reversed",
        }
    }
}

impl FromStr for ProvisionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(ProvisionStatus::Active),
            "reversed" => Ok(ProvisionStatus::Reversed),
            _ => Err(format!("unknown provision status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provision {
    pub id: ProvisionId,
    pub company_id: CompanyId,
    pub branch_id: BranchId,
    pub subject: ProvisionSubject,
    pub description: String,
    pub amount: Money,
    pub converted: ConvertedAmount,
    pub provision_date: NaiveDate,
    pub status: ProvisionStatus,
    pub reversed_at: Option<DateTime<Utc>>,
    /// Business date of the reversal
    pub reversed_on: Option<NaiveDate>,
    pub supersedes: Option<ProvisionId>,
    pub superseded_by: Option<ProvisionId>,
    pub classification: Option<Classification>,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub version: i64,
}

impl Provision {
    pub const ENTITY: &'static str = "Provision";

    pub fn is_active(&self) -> bool {
        self.status == ProvisionStatus::Active
    }

    /// Marks the provision reversed. Fails if it already was.
    pub fn reverse(&mut self, at: DateTime<Utc>, on: NaiveDate) -> Result<(), LedgerError> {
        if self.status == ProvisionStatus::Reversed {
            return Err(LedgerError::InvalidStateTransition {
                entity: Self::ENTITY,
                status: self.status.as_str().to_string(),
                action: "reverse",
            });
        }
        self.status = ProvisionStatus::Reversed;
        self.reversed_at = Some(at);
        self.reversed_on = Some(on);
        Ok(())
    }

    /// Held as a liability on `as_of`
    pub fn is_active_as_of(&self, as_of: NaiveDate) -> bool {
        self.provision_date <= as_of && self.reversed_on.map_or(true, |on| on > as_of)
    }

    /// Defaults to current; provisions carry no due date
    pub fn classification(&self) -> Classification {
        self.classification.unwrap_or(Classification::Current)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProvision {
    pub subject: ProvisionSubject,
    pub description: String,
    pub amount: Money,
    pub provision_date: NaiveDate,
    pub classification: Option<Classification>,
}

/// Replacement estimate for an active provision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupersedeProvision {
    pub amount: Money,
    pub description: Option<String>,
    /// Defaults to today
    pub provision_date: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::Currency;
    use rust_decimal_macros::dec;

    fn provision() -> Provision {
        let amount = Money::new(dec!(1500), Currency::USD);
        Provision {
            id: ProvisionId::new(),
            company_id: CompanyId::new(),
            branch_id: BranchId::new(),
            subject: ProvisionSubject::Employee(EmployeeId::new()),
            description: "Vacation accrual".into(),
            amount,
            converted: ConvertedAmount::identity(&amount, Utc::now()),
            provision_date: NaiveDate::from_ymd_opt(2025, 1, 31).unwrap(),
            status: ProvisionStatus::Active,
            reversed_at: None,
            reversed_on: None,
            supersedes: None,
            superseded_by: None,
            classification: None,
            created_by: UserId::new(),
            created_at: Utc::now(),
            version: 1,
        }
    }

    #[test]
    fn test_reverse_once() {
        let mut p = provision();
        let at = Utc::now();
        let on = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        p.reverse(at, on).unwrap();
        assert_eq!(p.reversed_at, Some(at));

        let err = p.reverse(Utc::now(), on).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidStateTransition { .. }));
        assert_eq!(p.reversed_at, Some(at));
    }

    #[test]
    fn test_active_as_of() {
        let mut p = provision();
        p.reverse(Utc::now(), NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()).unwrap();
        assert!(!p.is_active_as_of(NaiveDate::from_ymd_opt(2025, 1, 30).unwrap()));
        assert!(p.is_active_as_of(NaiveDate::from_ymd_opt(2025, 2, 28).unwrap()));
        assert!(!p.is_active_as_of(NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()));
    }
}
