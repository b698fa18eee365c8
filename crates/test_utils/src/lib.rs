//! Test Utilities Crate
//!
//! Shared test infrastructure for the GOP workspace.
//!
//! # Modules
//!
//! - `fixtures`: Two provider/payer tenants, an admin and a member
//! - `builders`: Raw-input builders for drafts, patches and decisions
//! - `harness`: The GOP service wired to in-memory ports
//! - `database`: Migrated PostgreSQL containers for persistence tests
//! - `assertions`: Assertion helpers for outcomes and aggregates
//! - `generators`: Property-based input generators

pub mod fixtures;
pub mod builders;
pub mod harness;
pub mod database;
pub mod assertions;
pub mod generators;

pub use fixtures::*;
pub use builders::*;
pub use harness::*;
pub use database::*;
pub use assertions::*;
pub use generators::*;
