//! Per-record classification used by the statements

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Revenue line a receivable is reported under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevenueCategory {
    Services,
    Products,
    Subscriptions,
    Interest,
    Other,
}

impl RevenueCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            RevenueCategory::Services => "services",
            RevenueCategory::Products => "products",
            RevenueCategory::Subscriptions => "subscriptions",
            RevenueCategory::Interest => "interest",
            RevenueCategory::Other => "other",
        }
    }

    /// Statement line label
    pub fn label(&self) -> &'static str {
        match self {
            RevenueCategory::Services => "Service revenue",
            RevenueCategory::Products => "Product revenue",
            RevenueCategory::Subscriptions => "Subscription revenue",
            RevenueCategory::Interest => "Interest income",
            RevenueCategory::Other => "Other revenue",
        }
    }
}

impl Default for RevenueCategory {
    fn default() -> Self {
        RevenueCategory::Services
    }
}

impl fmt::Display for RevenueCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RevenueCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "services" => Ok(RevenueCategory::Services),
            "products" => Ok(RevenueCategory::Products),
            "subscriptions" => Ok(RevenueCategory::Subscriptions),
            "interest" => Ok(RevenueCategory::Interest),
            "other" => Ok(RevenueCategory::Other),
            _ => Err(format!("unknown revenue category: {}", s)),
        }
    }
}

/// Expense line a payable is reported under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseCategory {
    Payroll,
    Rent,
    Suppliers,
    Utilities,
    Taxes,
    ProfessionalServices,
    Marketing,
    Other,
}

impl ExpenseCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExpenseCategory::Payroll => "payroll",
            ExpenseCategory::Rent => "rent",
            ExpenseCategory::Suppliers => "suppliers",
            ExpenseCategory::Utilities => "utilities",
            ExpenseCategory::Taxes => "taxes",
            ExpenseCategory::ProfessionalServices => "professional_services",
            ExpenseCategory::Marketing => "marketing",
            ExpenseCategory::Other => "other",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ExpenseCategory::Payroll => "Payroll",
            ExpenseCategory::Rent => "Rent",
            ExpenseCategory::Suppliers => "Suppliers",
            ExpenseCategory::Utilities => "Utilities",
            ExpenseCategory::Taxes => "Taxes",
            ExpenseCategory::ProfessionalServices => "Professional services",
            ExpenseCategory::Marketing => "Marketing",
            ExpenseCategory::Other => "Other expenses",
        }
    }
}

impl Default for ExpenseCategory {
    fn default() -> Self {
        ExpenseCategory::Other
    }
}

impl fmt::Display for ExpenseCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExpenseCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "payroll" => Ok(ExpenseCategory::Payroll),
            "rent" => Ok(ExpenseCategory::Rent),
            "suppliers" => Ok(ExpenseCategory::Suppliers),
            "utilities" => Ok(ExpenseCategory::Utilities),
            "taxes" => Ok(ExpenseCategory::Taxes),
            "professional_services" => Ok(ExpenseCategory::ProfessionalServices),
            "marketing" => Ok(ExpenseCategory::Marketing),
            "other" => Ok(ExpenseCategory::Other),
            _ => Err(format!("unknown expense category: {}", s)),
        }
    }
}

/// Balance sheet side of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Current,
    NonCurrent,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Current => "current",
            Classification::NonCurrent => "non_current",
        }
    }
}

impl FromStr for Classification {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "current" => Ok(Classification::Current),
            "non_current" => Ok(Classification::NonCurrent),
            _ => Err(format!("unknown classification: {}", s)),
        }
    }
}
