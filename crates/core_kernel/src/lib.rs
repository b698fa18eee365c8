//! Core Kernel - Foundational types shared by the Guarantee of Payment workspace
//!
//! This crate provides the building blocks used across all domain modules:
//! - Strongly-typed numeric identifiers for every persisted entity
//! - Lenient, non-negative monetary amounts
//! - Port error and health-check types for the ports and adapters layout

pub mod amount;
pub mod identifiers;
pub mod error;
pub mod ports;

pub use amount::Amount;
pub use identifiers::{
    GopId, ProviderId, PayerId, UserId, MemberId, ClaimId, DoctorId,
    DiagnosisCodeId, NotificationId, ChatId, TerminalId,
};
pub use error::CoreError;
pub use ports::{AdapterHealth, DomainPort, HealthCheckResult, HealthCheckable, PortError};
