//! GOP domain errors

use core_kernel::{GopId, PortError};
use domain_messaging::DeliveryError;
use domain_party::PartyError;
use thiserror::Error;

/// Errors that can occur in the GOP domain
///
/// `NotFound` and `NotAuthorized` are kept apart here so tests and logs can
/// tell them apart; the HTTP edge renders both the same way.
#[derive(Debug, Error)]
pub enum GopError {
    /// The entity does not exist or belongs to another tenant
    #[error("{entity} not found: {id}")]
    NotFound {
        entity: &'static str,
        id: String,
    },

    /// The actor's role or type may not perform this operation
    #[error("Not authorized")]
    NotAuthorized,

    /// Submitted input failed validation; nothing was changed
    #[error("Invalid {field}: {message}")]
    Validation {
        field: String,
        message: String,
    },

    /// The operation is not legal from the current status
    #[error("Cannot {action} a request that is {status}")]
    InvalidTransition {
        action: &'static str,
        status: String,
    },

    /// The request is closed and can no longer change
    #[error("Request {0} is closed")]
    Closed(GopId),

    /// A persistence or directory backend failed
    #[error("Backend error: {0}")]
    Port(PortError),
}

impl GopError {
    pub fn not_found(entity: &'static str, id: impl std::fmt::Display) -> Self {
        GopError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        GopError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn invalid_transition(action: &'static str, status: impl std::fmt::Display) -> Self {
        GopError::InvalidTransition {
            action,
            status: status.to_string(),
        }
    }

    /// Not-found and not-authorized collapse into one outcome for callers
    pub fn is_hidden(&self) -> bool {
        matches!(self, GopError::NotFound { .. } | GopError::NotAuthorized)
    }

    /// Guard violations the user can act on (as opposed to backend faults)
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, GopError::Port(_))
    }
}

impl From<PortError> for GopError {
    fn from(error: PortError) -> Self {
        match error {
            PortError::NotFound { entity_type, id } => GopError::NotFound {
                entity: entity_name(&entity_type),
                id,
            },
            PortError::Validation { message, field } => GopError::Validation {
                field: field.unwrap_or_else(|| "request".to_string()),
                message,
            },
            other => GopError::Port(other),
        }
    }
}

impl From<PartyError> for GopError {
    fn from(error: PartyError) -> Self {
        match error {
            PartyError::NotFound { entity, id } => GopError::NotFound { entity, id },
            PartyError::NotAuthorized => GopError::NotAuthorized,
            PartyError::Validation { field, message } => GopError::Validation { field, message },
            PartyError::InvalidAffiliation(message) => GopError::Port(PortError::internal(message)),
            PartyError::Port(port) => port.into(),
        }
    }
}

impl From<DeliveryError> for GopError {
    fn from(error: DeliveryError) -> Self {
        match error {
            DeliveryError::Storage(port) => port.into(),
            other => GopError::Port(PortError::internal(other.to_string())),
        }
    }
}

fn entity_name(entity_type: &str) -> &'static str {
    match entity_type {
        "GuaranteeOfPayment" => "GuaranteeOfPayment",
        "Payer" => "Payer",
        "Provider" => "Provider",
        "Doctor" => "Doctor",
        "Member" => "Member",
        "Claim" => "Claim",
        "User" => "User",
        _ => "Record",
    }
}
