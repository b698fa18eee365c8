//! Actors and Directory Domain
//!
//! This crate models who is acting and what they may touch.
//!
//! # Actor Model
//!
//! Capabilities come from two independent axes:
//!
//! - **Affiliation**: the organisation the account belongs to (a provider, a
//!   payer, a member login) or none for platform staff
//! - **Role**: `admin`, `user_admin` or `user`
//!
//! Both axes are closed enums and an affiliation always carries the key of the
//! organisation it points at, so a "provider user without a provider" cannot
//! be constructed. Request handlers build an [`Actor`] once at the boundary
//! and pass it by value into every core operation.
//!
//! # Examples
//!
//! ```rust
//! use core_kernel::{ProviderId, UserId};
//! use domain_party::{AccessRule, Actor, Affiliation, Role, UserType};
//!
//! let actor = Actor::new(
//!     UserId::new(1),
//!     "Front desk",
//!     Role::User,
//!     Affiliation::Provider(ProviderId::new(10)),
//! );
//!
//! assert!(AccessRule::for_types([UserType::Provider]).allows(&actor));
//! assert!(!AccessRule::for_types([UserType::Payer]).allows(&actor));
//! ```

pub mod actor;
pub mod access;
pub mod organization;
pub mod member;
pub mod user;
pub mod error;
pub mod ports;

pub use actor::{Actor, Affiliation, Role, Scope, UserType};
pub use access::{authorize, AccessRule};
pub use organization::{Doctor, Payer, Provider};
pub use member::{Gender, Member, MemberChanges, MemberPatch, NewMember};
pub use user::{generate_one_time_password, NewUser, User, ONE_TIME_PASSWORD_LEN};
pub use error::PartyError;
pub use ports::DirectoryPort;
#[cfg(any(test, feature = "mock"))]
pub use ports::mock::InMemoryDirectory;
