//! Kernel error type
//!
//! Statuses, room types, roles and the other closed vocabularies parse through
//! `FromStr` and reject anything else with [`CoreError`]. Domain crates turn
//! it into a field-level validation error.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("unknown {kind} value: {value:?}")]
    UnknownVariant { kind: &'static str, value: String },
}

impl CoreError {
    /// Error for a string that is not part of a closed vocabulary
    pub fn unknown_variant(kind: &'static str, value: impl Into<String>) -> Self {
        CoreError::UnknownVariant {
            kind,
            value: value.into(),
        }
    }

    /// The vocabulary the value was checked against
    pub fn kind(&self) -> &'static str {
        match self {
            CoreError::UnknownVariant { kind, .. } => kind,
        }
    }
}
