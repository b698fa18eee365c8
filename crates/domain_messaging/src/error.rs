//! Messaging errors

use core_kernel::PortError;
use thiserror::Error;

/// Failure of one delivery channel
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The mail relay refused or could not be reached
    #[error("Mail delivery failed: {0}")]
    Mail(String),

    /// No usable address could be resolved
    #[error("No recipient address for {0}")]
    NoRecipient(String),

    /// The push transport failed
    #[error("Push failed: {0}")]
    Push(String),

    /// Storage of a notification or chat message failed
    #[error("Storage failed: {0}")]
    Storage(#[from] PortError),
}

impl DeliveryError {
    pub fn mail(message: impl Into<String>) -> Self {
        DeliveryError::Mail(message.into())
    }
}
