//! Domain Adapters
//!
//! PostgreSQL implementations of the domain ports. Each adapter:
//! - Implements its domain's port trait
//! - Translates between domain models and repository row types
//! - Reports database health through `HealthCheckable`
//!
//! # Usage
//!
//! ```rust,ignore
//! use infra_db::adapters::{PostgresDirectoryAdapter, PostgresGopAdapter, PostgresMessagingAdapter};
//!
//! let gops = Arc::new(PostgresGopAdapter::new(pool.clone()));
//! let directory = Arc::new(PostgresDirectoryAdapter::new(pool.clone()));
//! let messaging = Arc::new(PostgresMessagingAdapter::new(pool));
//! ```

pub mod directory;
pub mod gop;
pub mod messaging;

pub use directory::PostgresDirectoryAdapter;
pub use gop::PostgresGopAdapter;
pub use messaging::PostgresMessagingAdapter;
