//! Party domain errors

use core_kernel::PortError;
use thiserror::Error;

/// Errors that can occur in the actors and directory domain
#[derive(Debug, Error)]
pub enum PartyError {
    /// The entity does not exist or is outside the actor's scope
    #[error("{entity} not found: {id}")]
    NotFound {
        entity: &'static str,
        id: String,
    },

    /// The actor's role or type is not accepted by the access rule
    #[error("Not authorized")]
    NotAuthorized,

    /// A field failed validation
    #[error("Invalid {field}: {message}")]
    Validation {
        field: String,
        message: String,
    },

    /// A stored account has an inconsistent role/type combination
    #[error("Invalid affiliation: {0}")]
    InvalidAffiliation(String),

    /// The directory backend failed
    #[error(transparent)]
    Port(#[from] PortError),
}

impl PartyError {
    /// Creates a NotFound error from any ID type
    pub fn not_found(entity: &'static str, id: impl std::fmt::Display) -> Self {
        PartyError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Creates a Validation error for a named field
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        PartyError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}
