//! GOP lifecycle state machine
//!
//! # Transitions
//!
//! ```text
//! (none) --submit--> pending --first payer view--> in_review --decide--> approved | declined
//!                       ^                                                      |
//!                       +---------- provider edit while not final -------------+
//!
//! any non-closed --resend--> pending      any non-closed --close--> closed (one way)
//! ```
//!
//! # Guards
//!
//! Each mutating method checks, in order: the actor owns the request on the
//! required side (otherwise `NotFound`, so a foreign tenant learns nothing),
//! the request is not closed, and the transition is legal from the current
//! status. Input is validated before the first field is written.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use core_kernel::ClaimId;
use domain_party::{Actor, Doctor, Member, Payer, Provider};

use crate::error::GopError;
use crate::events::GopEvent;
use crate::gop::{GopContent, GopStatus, GuaranteeOfPayment, NewGop};
use crate::patch::{non_blank, GopChanges};

/// Raw decision as submitted by the payer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DecisionInput {
    pub status: String,
    pub reason_decline: Option<String>,
    pub stamp_author: Option<String>,
}

/// A validated payer decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Approve {
        stamp_author: Option<String>,
    },
    Decline {
        reason: String,
        stamp_author: Option<String>,
    },
}

impl Decision {
    fn status(&self) -> GopStatus {
        match self {
            Decision::Approve { .. } => GopStatus::Approved,
            Decision::Decline { .. } => GopStatus::Declined,
        }
    }

    fn stamp_author(&self) -> Option<&str> {
        match self {
            Decision::Approve { stamp_author } | Decision::Decline { stamp_author, .. } => {
                stamp_author.as_deref()
            }
        }
    }
}

impl TryFrom<DecisionInput> for Decision {
    type Error = GopError;

    /// Only `approved` and `declined` are decisions; a decline needs a non-blank reason.
    fn try_from(input: DecisionInput) -> Result<Self, Self::Error> {
        let status: GopStatus = input
            .status
            .parse()
            .map_err(|e: core_kernel::CoreError| GopError::validation("status", e.to_string()))?;
        let stamp_author = non_blank(input.stamp_author);

        match status {
            GopStatus::Approved => Ok(Decision::Approve { stamp_author }),
            GopStatus::Declined => {
                // stored verbatim, only checked for content
                let reason = input
                    .reason_decline
                    .filter(|r| !r.trim().is_empty())
                    .ok_or_else(|| GopError::validation("reason_decline", "a reason is required to decline"))?;
                Ok(Decision::Decline { reason, stamp_author })
            }
            other => Err(GopError::validation(
                "status",
                format!("{other} is not a decision, expected approved or declined"),
            )),
        }
    }
}

/// The actor must be able to read the request
pub fn ensure_visible(actor: &Actor, gop: &GuaranteeOfPayment) -> Result<(), GopError> {
    if actor.scope().covers(gop.provider_id, gop.payer_id) {
        Ok(())
    } else {
        Err(GopError::not_found("GuaranteeOfPayment", gop.id))
    }
}

/// The actor must act for the request's provider
pub fn ensure_provider_owner(actor: &Actor, gop: &GuaranteeOfPayment) -> Result<(), GopError> {
    if actor.provider_id() == Some(gop.provider_id) {
        Ok(())
    } else {
        Err(GopError::not_found("GuaranteeOfPayment", gop.id))
    }
}

/// The actor must act for the request's payer
pub fn ensure_payer_owner(actor: &Actor, gop: &GuaranteeOfPayment) -> Result<(), GopError> {
    if actor.payer_id() == Some(gop.payer_id) {
        Ok(())
    } else {
        Err(GopError::not_found("GuaranteeOfPayment", gop.id))
    }
}

fn ensure_open(gop: &GuaranteeOfPayment) -> Result<(), GopError> {
    if gop.closed {
        Err(GopError::Closed(gop.id))
    } else {
        Ok(())
    }
}

/// Builds a new request after checking the provider owns every referenced record.
///
/// `payer` and `doctor` must already have been resolved through the
/// provider-scoped directory lookups.
pub fn submit(
    actor: &Actor,
    provider: &Provider,
    payer: &Payer,
    member: &Member,
    doctor: Option<&Doctor>,
    claim_id: Option<ClaimId>,
    changes: GopChanges,
) -> Result<NewGop, GopError> {
    if actor.provider_id() != Some(provider.id) {
        return Err(GopError::NotAuthorized);
    }
    if !provider.works_with(payer.id) {
        return Err(GopError::not_found("Payer", payer.id));
    }
    if let Some(doctor) = doctor {
        if doctor.provider_id != provider.id {
            return Err(GopError::not_found("Doctor", doctor.id));
        }
    }

    let mut content = GopContent::default();
    content.apply(changes);
    if let Some(doctor) = doctor {
        content.doctor_name = Some(doctor.name.clone());
    }

    Ok(NewGop {
        provider_id: provider.id,
        payer_id: payer.id,
        member_id: member.id,
        claim_id,
        content,
        created_at: Utc::now(),
    })
}

/// Result of the payer opening the detail view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayerView {
    /// The request changed and must be persisted
    pub changed: bool,
    pub event: Option<GopEvent>,
}

impl GuaranteeOfPayment {
    /// Records the payer opening the request.
    ///
    /// A pending, open request moves to `in_review` exactly once. Missing
    /// medical details are attached empty so the payer view can render them.
    pub fn record_payer_view(&mut self, actor: &Actor) -> Result<PayerView, GopError> {
        ensure_payer_owner(actor, self)?;

        let mut changed = false;
        if self.content.medical_details.is_none() {
            self.content.medical_details = Some(Default::default());
            changed = true;
        }

        let mut event = None;
        if self.status == GopStatus::Pending && !self.closed {
            let now = Utc::now();
            self.status = GopStatus::InReview;
            self.edited_at = Some(now);
            changed = true;
            event = Some(GopEvent::ReviewStarted {
                gop_id: self.id,
                timestamp: now,
            });
        }

        Ok(PayerView { changed, event })
    }

    /// Records the payer-side reviewer name
    pub fn set_stamp_author(&mut self, actor: &Actor, name: &str) -> Result<GopEvent, GopError> {
        ensure_payer_owner(actor, self)?;
        ensure_open(self)?;

        let name = name.trim();
        if name.is_empty() {
            return Err(GopError::validation("stamp_author", "reviewer name is required"));
        }

        self.stamp_author = Some(name.to_string());
        Ok(GopEvent::StampAuthorSet {
            gop_id: self.id,
            stamp_author: name.to_string(),
            timestamp: Utc::now(),
        })
    }

    /// Applies the payer's decision
    ///
    /// # Errors
    ///
    /// - `NotFound` if the actor is not this request's payer
    /// - `Closed` if the request is archived
    /// - `InvalidTransition` if a decision was already made
    /// - `Validation` if no reviewer name is known
    pub fn decide(&mut self, actor: &Actor, decision: Decision) -> Result<GopEvent, GopError> {
        ensure_payer_owner(actor, self)?;
        ensure_open(self)?;
        if self.status.is_decided() {
            return Err(GopError::invalid_transition("decide", self.status));
        }

        let stamp_author = decision
            .stamp_author()
            .map(str::to_string)
            .or_else(|| self.stamp_author.clone())
            .ok_or_else(|| GopError::validation("stamp_author", "reviewer name is required"))?;

        let status = decision.status();
        let now = Utc::now();
        self.reason_decline = match decision {
            Decision::Decline { reason, .. } => Some(reason),
            Decision::Approve { .. } => None,
        };
        self.stamp_author = Some(stamp_author);
        self.status = status;
        self.edited_at = Some(now);

        Ok(GopEvent::Decided {
            gop_id: self.id,
            status,
            timestamp: now,
        })
    }

    /// Applies a provider content edit.
    ///
    /// While the request is not final, editing a decided request re-opens it
    /// to `pending`. `mark_final` sets `final` the first time it is passed.
    pub fn edit(&mut self, actor: &Actor, changes: GopChanges, mark_final: bool) -> Result<GopEvent, GopError> {
        ensure_provider_owner(actor, self)?;
        ensure_open(self)?;

        let now = Utc::now();
        let reopened = !self.is_final && self.status.is_decided();
        let finalized = mark_final && !self.is_final;

        self.content.apply(changes);
        if reopened {
            self.status = GopStatus::Pending;
            self.reason_decline = None;
            self.edited_at = Some(now);
        }
        if finalized {
            self.is_final = true;
        }

        Ok(GopEvent::Edited {
            gop_id: self.id,
            reopened,
            finalized,
            timestamp: now,
        })
    }

    /// Resubmits the request for review
    pub fn resend(&mut self, actor: &Actor) -> Result<GopEvent, GopError> {
        ensure_provider_owner(actor, self)?;
        ensure_open(self)?;

        let now = Utc::now();
        self.status = GopStatus::Pending;
        self.edited_at = None;
        self.created_at = now;

        Ok(GopEvent::Resent {
            gop_id: self.id,
            timestamp: now,
        })
    }

    /// Archives the request; cannot be undone
    pub fn close(&mut self, actor: &Actor, reason: &str) -> Result<GopEvent, GopError> {
        ensure_provider_owner(actor, self)?;
        if self.closed {
            return Err(GopError::invalid_transition("close", "already closed"));
        }
        if reason.trim().is_empty() {
            return Err(GopError::validation("reason_close", "a reason is required to close"));
        }

        self.closed = true;
        self.reason_close = Some(reason.to_string());

        Ok(GopEvent::Closed {
            gop_id: self.id,
            reason: reason.to_string(),
            timestamp: Utc::now(),
        })
    }
}
