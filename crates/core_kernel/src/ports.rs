//! Port error and health types
//!
//! Each domain crate declares its storage and delivery traits on top of
//! [`DomainPort`] and returns [`PortError`] from them. `infra_db` provides the
//! Postgres implementations; the `mock` feature of each domain crate provides
//! in-memory ones for tests.
//!
//! ```rust,ignore
//! #[async_trait]
//! pub trait GopPort: DomainPort + HealthCheckable {
//!     async fn get(&self, id: GopId) -> Result<GuaranteeOfPayment, PortError>;
//! }
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failure reported by any adapter
///
/// The domain only branches on the kind: a missing row becomes a hidden
/// "not found", validation and conflict become field errors, and the rest is
/// an infrastructure failure.
#[derive(Debug, Error)]
pub enum PortError {
    #[error("{entity_type} {id} not found")]
    NotFound { entity_type: String, id: String },

    #[error("invalid data: {message}")]
    Validation { message: String, field: Option<String> },

    /// Unique key already taken (account email, national id)
    #[error("conflict: {message}")]
    Conflict { message: String },

    /// Storage unreachable or the pool is exhausted; may succeed on retry
    #[error("storage unavailable: {message}")]
    Connection {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<BoxError>,
    },
}

impl PortError {
    pub fn not_found(entity_type: impl Into<String>, id: impl fmt::Display) -> Self {
        PortError::NotFound {
            entity_type: entity_type.into(),
            id: id.to_string(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        PortError::Validation {
            message: message.into(),
            field: None,
        }
    }

    /// Validation error pinned to one input field
    pub fn validation_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        PortError::Validation {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        PortError::Conflict {
            message: message.into(),
        }
    }

    pub fn connection(message: impl Into<String>) -> Self {
        PortError::Connection {
            message: message.into(),
            source: None,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        PortError::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Wraps an underlying error, keeping it as the source
    pub fn internal_from(message: impl Into<String>, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        PortError::Internal {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, PortError::Connection { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, PortError::NotFound { .. })
    }
}

/// Marker for every domain port; ports live behind `Arc` in the service
pub trait DomainPort: Send + Sync + 'static {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterHealth {
    Healthy,
    /// Answering, but slowly or near capacity
    Degraded,
    Unhealthy,
}

/// One adapter's answer to a readiness check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResult {
    pub adapter_id: String,
    pub status: AdapterHealth,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub checked_at: chrono::DateTime<chrono::Utc>,
}

impl HealthCheckResult {
    fn new(adapter_id: impl Into<String>, status: AdapterHealth, latency_ms: u64, message: Option<String>) -> Self {
        Self {
            adapter_id: adapter_id.into(),
            status,
            latency_ms,
            message,
            checked_at: chrono::Utc::now(),
        }
    }

    pub fn healthy(adapter_id: impl Into<String>, latency_ms: u64) -> Self {
        Self::new(adapter_id, AdapterHealth::Healthy, latency_ms, None)
    }

    pub fn degraded(adapter_id: impl Into<String>, latency_ms: u64, message: impl Into<String>) -> Self {
        Self::new(adapter_id, AdapterHealth::Degraded, latency_ms, Some(message.into()))
    }

    pub fn unhealthy(adapter_id: impl Into<String>, latency_ms: u64, message: impl Into<String>) -> Self {
        Self::new(adapter_id, AdapterHealth::Unhealthy, latency_ms, Some(message.into()))
    }

    /// Whether the adapter can still serve requests
    pub fn is_serving(&self) -> bool {
        self.status != AdapterHealth::Unhealthy
    }
}

/// Adapters that can answer a readiness check
#[async_trait::async_trait]
pub trait HealthCheckable: Send + Sync {
    async fn health_check(&self) -> HealthCheckResult;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_names_entity_and_id() {
        let error = PortError::not_found("GuaranteeOfPayment", "GOP-12");
        assert!(error.is_not_found());
        assert!(!error.is_transient());
        assert_eq!(error.to_string(), "GuaranteeOfPayment GOP-12 not found");
    }

    #[test]
    fn test_internal_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk gone");
        let error = PortError::internal_from("flush chat", io);
        assert!(std::error::Error::source(&error).is_some());
    }

    #[test]
    fn test_only_unhealthy_stops_serving() {
        assert!(HealthCheckResult::healthy("postgres", 3).is_serving());
        assert!(HealthCheckResult::degraded("postgres", 900, "slow").is_serving());

        let down = HealthCheckResult::unhealthy("postgres", 5000, "pool timed out");
        assert!(!down.is_serving());
        assert_eq!(down.message.as_deref(), Some("pool timed out"));
    }
}
