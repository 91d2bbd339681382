//! Contributed capital

use chrono::{DateTime, NaiveDate, Utc};
use core_kernel::{BranchId, CompanyId, EquityEntryId, Money, UserId};
use domain_fx::ConvertedAmount;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquityKind {
    /// Capital paid in by owners
    Contribution,
    /// Capital returned to owners
    Distribution,
}

impl EquityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EquityKind::Contribution => "contribution",
            EquityKind::Distribution => "distribution",
        }
    }
}

impl FromStr for EquityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "contribution" => Ok(EquityKind::Contribution),
            "distribution" => Ok(EquityKind::Distribution),
            _ => Err(format!("unknown equity kind: {}", s)),
        }
    }
}

/// A movement of owners' capital; moves cash one-for-one
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityEntry {
    pub id: EquityEntryId,
    pub company_id: CompanyId,
    pub branch_id: BranchId,
    pub kind: EquityKind,
    pub amount: Money,
    pub converted: ConvertedAmount,
    pub entry_date: NaiveDate,
    pub description: String,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
}

impl EquityEntry {
    pub const ENTITY: &'static str = "EquityEntry";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEquityEntry {
    pub kind: EquityKind,
    pub amount: Money,
    pub entry_date: NaiveDate,
    pub description: String,
}
