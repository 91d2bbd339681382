//! Sequential invoice numbering
//!
//! Numbers are `INV-{YYYY}{sequence:06}`: the calendar year from the clock
//! followed by a per-company, per-year counter. The counter is advanced by
//! the store's atomic increment-and-read primitive, so concurrent callers
//! never share a number. Sequences past 999 999 keep all their digits.

use chrono::Datelike;
use core_kernel::{Clock, TenantContext};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::error::InvoiceError;
use crate::ports::SequencePort;

/// Sequence key used for invoice numbers
pub const INVOICE_SEQUENCE_KEY: &str = "INV";

const PREFIX: &str = "INV-";
const MIN_SEQUENCE_DIGITS: usize = 6;

/// A formatted invoice number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InvoiceNumber {
    year: i32,
    sequence: u64,
}

impl InvoiceNumber {
    pub fn new(year: i32, sequence: u64) -> Result<Self, InvoiceError> {
        if !(1000..=9999).contains(&year) {
            return Err(InvoiceError::validation(format!("invoice year {} is not four digits", year)));
        }
        if sequence == 0 {
            return Err(InvoiceError::validation("invoice sequence starts at 1"));
        }
        Ok(Self { year, sequence })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Recovers year and sequence from a formatted number
    pub fn parse(s: &str) -> Result<Self, InvoiceError> {
        let invalid = || InvoiceError::validation(format!("malformed invoice number: {}", s));
        let digits = s.strip_prefix(PREFIX).ok_or_else(invalid)?;
        if digits.len() < 4 + MIN_SEQUENCE_DIGITS || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let (year, sequence) = digits.split_at(4);
        let year = year.parse::<i32>().map_err(|_| invalid())?;
        let sequence = sequence.parse::<u64>().map_err(|_| invalid())?;
        Self::new(year, sequence).map_err(|_| invalid())
    }
}

impl fmt::Display for InvoiceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:04}{:06}", PREFIX, self.year, self.sequence)
    }
}

impl FromStr for InvoiceNumber {
    type Err = InvoiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for InvoiceNumber {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for InvoiceNumber {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Allocates invoice numbers
#[derive(Clone)]
pub struct InvoiceNumberingService {
    sequences: Arc<dyn SequencePort>,
    clock: Arc<dyn Clock>,
}

impl InvoiceNumberingService {
    pub fn new(sequences: Arc<dyn SequencePort>, clock: Arc<dyn Clock>) -> Self {
        Self { sequences, clock }
    }

    #[instrument(skip(self), fields(company_id = %ctx.company_id))]
    pub async fn next_invoice_number(&self, ctx: &TenantContext) -> Result<InvoiceNumber, InvoiceError> {
        let year = self.clock.today().year();
        let sequence = self
            .sequences
            .next_value(ctx, INVOICE_SEQUENCE_KEY, year)
            .await?;
        let number = InvoiceNumber::new(year, sequence)?;
        debug!(%number, "invoice number allocated");
        Ok(number)
    }
}
