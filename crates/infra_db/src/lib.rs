//! Infrastructure Database Layer
//!
//! PostgreSQL persistence for the Guarantee of Payment core, using SQLx.
//!
//! # Architecture
//!
//! The crate follows the repository pattern: repositories own the SQL and
//! return row types, and adapters implement the domain ports on top of them.
//! Tenant scoping arrives already resolved inside the domain query objects;
//! the adapters only translate it into `WHERE` clauses.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{create_pool, run_migrations, DatabaseConfig};
//! use infra_db::adapters::PostgresGopAdapter;
//!
//! let pool = create_pool(DatabaseConfig::new("postgres://localhost/gop")).await?;
//! run_migrations(&pool).await?;
//! let gops = PostgresGopAdapter::new(pool);
//! ```

pub mod adapters;
pub mod credentials;
pub mod error;
pub mod pool;
pub mod repositories;

pub use adapters::{PostgresDirectoryAdapter, PostgresGopAdapter, PostgresMessagingAdapter};
pub use credentials::{password_digest, verify_password};
pub use error::DatabaseError;
pub use pool::{create_pool, ping, run_migrations, DatabaseConfig, DatabasePool, MIGRATOR};
