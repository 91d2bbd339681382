//! Strongly-typed identifiers for domain entities
//!
//! Using newtype wrappers around UUIDs provides type safety and prevents
//! accidental mixing of different identifier types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Failure to read an identifier from its text form
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdParseError {
    #[error("expected a {expected} identifier, got {found}")]
    WrongPrefix { expected: &'static str, found: String },

    #[error("malformed identifier: {0}")]
    Malformed(String),
}

/// Splits `PREFIX-uuid` (or a bare uuid) and checks the prefix.
fn parse_prefixed(s: &str, prefix: &'static str) -> Result<Uuid, IdParseError> {
    let s = s.trim();
    if let Ok(uuid) = Uuid::parse_str(s) {
        return Ok(uuid);
    }
    let (found, rest) = s
        .split_once('-')
        .ok_or_else(|| IdParseError::Malformed(s.to_string()))?;
    if found != prefix {
        return Err(IdParseError::WrongPrefix {
            expected: prefix,
            found: found.to_string(),
        });
    }
    Uuid::parse_str(rest).map_err(|_| IdParseError::Malformed(s.to_string()))
}

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Random identifier
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Time-ordered identifier, preferred for rows that are listed by creation
            pub fn new_v7() -> Self {
                Self(Uuid::now_v7())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            pub fn prefix() -> &'static str {
                $prefix
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}-{}", $prefix, self.0)
            }
        }

        impl FromStr for $name {
            type Err = IdParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                parse_prefixed(s, $prefix).map(Self)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Uuid {
                id.0
            }
        }
    };
}

define_id!(
    /// The tenant; every stored record is scoped by it
    CompanyId, "CMP"
);
define_id!(BranchId, "BRN");
define_id!(UserId, "USR");

// Master data mirrored from upstream systems
define_id!(CustomerId, "CUS");
define_id!(SupplierId, "SUP");
define_id!(ContractId, "CTR");
define_id!(EmployeeId, "EMP");
define_id!(TemplateId, "TPL");
define_id!(DocumentId, "DOC");

define_id!(InvoiceId, "IVC");
define_id!(InvoiceLineId, "IVL");

define_id!(PayableId, "AP");
define_id!(ReceivableId, "AR");
define_id!(SettlementId, "STL");
define_id!(
    /// Groups the occurrences generated from one recurring obligation
    SeriesId, "SER"
);
define_id!(ProvisionId, "PRV");
define_id!(EquityEntryId, "EQT");

define_id!(AuditEventId, "AUD");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invoice_id_display() {
        let id = InvoiceId::new();
        let display = id.to_string();
        assert!(display.starts_with("IVC-"));
    }

    #[test]
    fn test_id_parsing() {
        let original = ReceivableId::new_v7();
        let parsed: ReceivableId = original.to_string().parse().unwrap();
        assert_eq!(original, parsed);

        let bare: ReceivableId = original.as_uuid().to_string().parse().unwrap();
        assert_eq!(original, bare);
    }

    #[test]
    fn test_uuid_conversion() {
        let uuid = Uuid::new_v4();
        let company_id = CompanyId::from(uuid);
        let back: Uuid = company_id.into();
        assert_eq!(uuid, back);
    }

    #[test]
    fn test_foreign_prefix_is_rejected() {
        let payable = PayableId::new();
        assert_eq!(
            payable.to_string().parse::<InvoiceId>(),
            Err(IdParseError::WrongPrefix {
                expected: "IVC",
                found: "AP".to_string(),
            })
        );
    }

    #[test]
    fn test_v7_ids_are_time_ordered() {
        let first = PayableId::new_v7();
        let second = PayableId::new_v7();
        assert!(first.as_uuid() <= second.as_uuid());
    }
}
