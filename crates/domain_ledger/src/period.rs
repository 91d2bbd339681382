//! Period locks
//!
//! Closing a month writes a lock; every mutation dated into a locked month
//! is refused with `PeriodClosed`.

use chrono::{DateTime, NaiveDate, Utc};
use core_kernel::{CompanyId, TenantContext, UserId, YearMonth};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::error::LedgerError;
use crate::ports::PeriodLockPort;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodLock {
    pub company_id: CompanyId,
    pub period: YearMonth,
    pub locked_at: DateTime<Utc>,
    pub locked_by: UserId,
}

/// Checks dates against the company's closed periods
#[derive(Clone)]
pub struct PeriodGuard {
    locks: Arc<dyn PeriodLockPort>,
}

impl PeriodGuard {
    pub fn new(locks: Arc<dyn PeriodLockPort>) -> Self {
        Self { locks }
    }

    pub async fn is_closed(&self, ctx: &TenantContext, period: YearMonth) -> Result<bool, LedgerError> {
        Ok(self.locks.get_lock(ctx, period).await?.is_some())
    }

    /// Fails with `PeriodClosed` when `date` falls in a locked month
    pub async fn ensure_open(&self, ctx: &TenantContext, date: NaiveDate) -> Result<(), LedgerError> {
        let period = YearMonth::of(date);
        if self.is_closed(ctx, period).await? {
            debug!(%period, "mutation refused, period closed");
            return Err(LedgerError::PeriodClosed(period));
        }
        Ok(())
    }

    /// Checks several dates, reporting the first closed month
    pub async fn ensure_all_open(
        &self,
        ctx: &TenantContext,
        dates: impl IntoIterator<Item = NaiveDate>,
    ) -> Result<(), LedgerError> {
        let mut periods: Vec<YearMonth> = dates.into_iter().map(YearMonth::of).collect();
        periods.sort();
        periods.dedup();
        for period in periods {
            if self.is_closed(ctx, period).await? {
                return Err(LedgerError::PeriodClosed(period));
            }
        }
        Ok(())
    }
}
