//! Strongly-typed identifiers for domain entities
//!
//! Every persisted entity is keyed by a database-assigned `i64`. Wrapping the
//! raw number in a newtype keeps a `PayerId` from ever being passed where a
//! `ProviderId` is expected, which matters because tenant scoping compares
//! these keys directly.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

macro_rules! define_id {
    ($name:ident, $prefix:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wraps a raw database key
            pub const fn new(value: i64) -> Self {
                Self(value)
            }

            /// Returns the raw database key
            pub const fn value(&self) -> i64 {
                self.0
            }

            /// Returns the identifier prefix for display
            pub fn prefix() -> &'static str {
                $prefix
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}-{}", $prefix, self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                // Strip prefix if present
                let raw = s.strip_prefix(concat!($prefix, "-")).unwrap_or(s);
                Ok(Self(raw.trim().parse()?))
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> i64 {
                id.0
            }
        }
    };
}

// Request identifiers
define_id!(GopId, "GOP");
define_id!(ClaimId, "CLM");
define_id!(DiagnosisCodeId, "ICD");

// Party identifiers
define_id!(UserId, "USR");
define_id!(ProviderId, "PRV");
define_id!(PayerId, "PYR");
define_id!(MemberId, "MBR");
define_id!(DoctorId, "DOC");
define_id!(TerminalId, "TRM");

// Messaging identifiers
define_id!(NotificationId, "NTF");
define_id!(ChatId, "CHT");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gop_id_display() {
        let id = GopId::new(42);
        assert_eq!(id.to_string(), "GOP-42");
    }

    #[test]
    fn test_id_parsing_accepts_prefixed_and_bare() {
        let prefixed: PayerId = "PYR-7".parse().unwrap();
        let bare: PayerId = "7".parse().unwrap();
        assert_eq!(prefixed, bare);
        assert_eq!(prefixed.value(), 7);
    }

    #[test]
    fn test_id_parsing_rejects_garbage() {
        assert!("GOP-abc".parse::<GopId>().is_err());
    }
}
