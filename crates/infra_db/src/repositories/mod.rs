//! Repository implementations
//!
//! Repositories own the SQL and speak in row types; the adapters in
//! [`crate::adapters`] map rows to domain types and implement the ports.
//!
//! Queries are checked at runtime (`query_as` with `FromRow`), and writes
//! that touch more than one table run in a transaction.

pub mod directory;
pub mod gop;
pub mod messaging;

pub use directory::DirectoryRepository;
pub use gop::GopRepository;
pub use messaging::MessagingRepository;
