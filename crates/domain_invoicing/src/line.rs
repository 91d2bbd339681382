//! Invoice lines and total computation
//!
//! One formula is used everywhere a line is priced:
//!
//! ```text
//! net   = round2(quantity * unit_price * (1 - discount/100))
//! total = round2(quantity * unit_price * (1 - discount/100) * (1 + tax/100))
//! tax   = total - net
//! ```
//!
//! Invoice totals are plain sums of the rounded line figures, so
//! `total == subtotal + tax_amount` holds exactly.

use core_kernel::{round_money, InvoiceLineId, MAX_AMOUNT};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::InvoiceError;

/// Declared totals may differ from the computed ones by at most this much
pub const TOTALS_TOLERANCE: Decimal = dec!(0.01);

/// Largest quantity accepted on a single line
pub const MAX_QUANTITY: Decimal = dec!(1000000000);

/// Line as submitted by the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineInput {
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    #[serde(default)]
    pub discount_percent: Decimal,
    #[serde(default)]
    pub tax_percent: Decimal,
}

impl LineInput {
    pub fn new(description: impl Into<String>, quantity: Decimal, unit_price: Decimal) -> Self {
        Self {
            description: description.into(),
            quantity,
            unit_price,
            discount_percent: Decimal::ZERO,
            tax_percent: Decimal::ZERO,
        }
    }

    pub fn with_discount(mut self, percent: Decimal) -> Self {
        self.discount_percent = percent;
        self
    }

    pub fn with_tax(mut self, percent: Decimal) -> Self {
        self.tax_percent = percent;
        self
    }

    pub fn validate(&self, position: usize) -> Result<(), InvoiceError> {
        let invalid = |what: &str| InvoiceError::validation(format!("line {}: {}", position, what));
        let hundred = Decimal::ONE_HUNDRED;

        if self.description.trim().is_empty() {
            return Err(invalid("description is required"));
        }
        if self.quantity < Decimal::ZERO {
            return Err(invalid("quantity must not be negative"));
        }
        if self.quantity > MAX_QUANTITY {
            return Err(invalid("quantity is too large"));
        }
        if self.unit_price < Decimal::ZERO {
            return Err(invalid("unit price must not be negative"));
        }
        if self.unit_price > MAX_AMOUNT {
            return Err(invalid("unit price is too large"));
        }
        if self.discount_percent < Decimal::ZERO || self.discount_percent > hundred {
            return Err(invalid("discount must be between 0 and 100"));
        }
        if self.tax_percent < Decimal::ZERO || self.tax_percent > hundred {
            return Err(invalid("tax must be between 0 and 100"));
        }
        Ok(())
    }

    /// Prices the line; `None` when the figures do not fit a decimal
    pub fn amounts(&self) -> Option<LineAmounts> {
        let hundred = Decimal::ONE_HUNDRED;
        let keep = Decimal::ONE.checked_sub(self.discount_percent.checked_div(hundred)?)?;
        let uplift = Decimal::ONE.checked_add(self.tax_percent.checked_div(hundred)?)?;
        let discounted = self.quantity.checked_mul(self.unit_price)?.checked_mul(keep)?;
        let net = round_money(discounted);
        let total = round_money(discounted.checked_mul(uplift)?);
        Some(LineAmounts {
            net_amount: net,
            tax_amount: total.checked_sub(net)?,
            line_total: total,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineAmounts {
    pub net_amount: Decimal,
    pub tax_amount: Decimal,
    pub line_total: Decimal,
}

/// A priced invoice line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceLine {
    pub id: InvoiceLineId,
    pub sequence: u32,
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub discount_percent: Decimal,
    pub tax_percent: Decimal,
    pub net_amount: Decimal,
    pub tax_amount: Decimal,
    pub line_total: Decimal,
}

impl InvoiceLine {
    pub fn from_input(sequence: u32, input: LineInput) -> Result<Self, InvoiceError> {
        let amounts = input.amounts().ok_or_else(|| {
            InvoiceError::validation(format!("line {}: amount is too large", sequence))
        })?;
        Ok(Self {
            id: InvoiceLineId::new_v7(),
            sequence,
            description: input.description,
            quantity: input.quantity,
            unit_price: input.unit_price,
            discount_percent: input.discount_percent,
            tax_percent: input.tax_percent,
            net_amount: amounts.net_amount,
            tax_amount: amounts.tax_amount,
            line_total: amounts.line_total,
        })
    }
}

/// Invoice-level totals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InvoiceTotals {
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub total: Decimal,
}

impl InvoiceTotals {
    /// Sums lines produced by [`price_lines`], whose totals are bounded
    pub fn of(lines: &[InvoiceLine]) -> Self {
        lines.iter().fold(Self::default(), |acc, line| Self {
            subtotal: acc.subtotal + line.net_amount,
            tax_amount: acc.tax_amount + line.tax_amount,
            total: acc.total + line.line_total,
        })
    }

    /// Sums arbitrary lines, `None` on overflow
    pub fn checked_of(lines: &[InvoiceLine]) -> Option<Self> {
        lines.iter().try_fold(Self::default(), |acc, line| {
            Some(Self {
                subtotal: acc.subtotal.checked_add(line.net_amount)?,
                tax_amount: acc.tax_amount.checked_add(line.tax_amount)?,
                total: acc.total.checked_add(line.line_total)?,
            })
        })
    }

    /// Checks totals supplied by the caller against the computed ones
    pub fn check_declared(&self, declared: &InvoiceTotals) -> Result<(), InvoiceError> {
        if declared.total != declared.subtotal + declared.tax_amount {
            return Err(InvoiceError::validation(format!(
                "declared total {} does not equal subtotal {} plus tax {}",
                declared.total, declared.subtotal, declared.tax_amount
            )));
        }
        let pairs = [
            ("subtotal", declared.subtotal, self.subtotal),
            ("tax amount", declared.tax_amount, self.tax_amount),
            ("total", declared.total, self.total),
        ];
        for (field, declared, computed) in pairs {
            if (declared - computed).abs() > TOTALS_TOLERANCE {
                return Err(InvoiceError::validation(format!(
                    "declared {} {} does not match computed {}",
                    field, declared, computed
                )));
            }
        }
        Ok(())
    }
}

/// Validates and prices a full set of lines, numbering them from 1
pub fn price_lines(inputs: Vec<LineInput>) -> Result<Vec<InvoiceLine>, InvoiceError> {
    if inputs.is_empty() {
        return Err(InvoiceError::validation("an invoice needs at least one line"));
    }
    for (index, input) in inputs.iter().enumerate() {
        input.validate(index + 1)?;
    }
    let lines = inputs
        .into_iter()
        .enumerate()
        .map(|(index, input)| InvoiceLine::from_input(index as u32 + 1, input))
        .collect::<Result<Vec<_>, _>>()?;

    match InvoiceTotals::checked_of(&lines) {
        Some(totals) if totals.total <= MAX_AMOUNT => Ok(lines),
        _ => Err(InvoiceError::validation(format!(
            "invoice total exceeds the maximum of {}",
            MAX_AMOUNT
        ))),
    }
}
