//! Guarantee of Payment Domain
//!
//! A provider asks a payer to guarantee the cost of a patient's admission.
//! This crate holds the request aggregate, its lifecycle, the scoped listing
//! queries and the service that ties them to the directory, storage and
//! notification fan-out.
//!
//! # Lifecycle
//!
//! ```text
//! pending -> in_review -> approved | declined
//!    ^                         |
//!    +---- edit until final ---+          closed: one-way archive flag
//! ```
//!
//! # Tenancy
//!
//! Every operation takes an [`Actor`](domain_party::Actor). A request that
//! belongs to another provider or payer is reported as not found.

pub mod gop;
pub mod medical;
pub mod patch;
pub mod claim;
pub mod events;
pub mod lifecycle;
pub mod query;
pub mod ports;
pub mod service;
pub mod error;

pub use gop::{AdmissionReason, Financials, GopContent, GopStatus, GuaranteeOfPayment, NewGop, RoomType};
pub use medical::{MedicalChanges, MedicalDetails, MedicalDetailsPatch};
pub use patch::{GopChanges, GopDraft, GopPatch};
pub use claim::{Claim, NewClaim, TerminalClaimRequest};
pub use events::{Counterpart, GopEvent};
pub use lifecycle::{Decision, DecisionInput, PayerView};
pub use query::{
    AdminFilter, GopPage, GopQuery, ListingParams, Page, StatusCounts, StatusFilter, Visibility, PAGE_SIZE,
};
pub use ports::GopPort;
pub use service::{GopDetails, GopListing, GopService};
pub use error::GopError;
#[cfg(any(test, feature = "mock"))]
pub use ports::mock::InMemoryGopStore;
