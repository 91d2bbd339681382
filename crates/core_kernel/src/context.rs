//! Explicit tenant context threaded through every core operation

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::identifiers::{BranchId, CompanyId, UserId};

/// Who is acting, and on behalf of which company and branch.
///
/// Every store call is scoped by `company_id`; `branch_id` and `user_id` are
/// stamped on the records and audit events the operation produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TenantContext {
    pub company_id: CompanyId,
    pub branch_id: BranchId,
    pub user_id: UserId,
}

impl TenantContext {
    pub fn new(company_id: CompanyId, branch_id: BranchId, user_id: UserId) -> Self {
        Self {
            company_id,
            branch_id,
            user_id,
        }
    }

    /// Same company and branch, different acting user
    pub fn acting_as(&self, user_id: UserId) -> Self {
        Self { user_id, ..*self }
    }
}

impl fmt::Display for TenantContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.company_id, self.branch_id, self.user_id)
    }
}
