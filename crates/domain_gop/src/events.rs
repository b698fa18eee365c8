//! Domain events for the GOP aggregate
//!
//! Every accepted lifecycle transition yields one event. The service turns
//! events into notifications after the transition has been persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::GopId;

use crate::gop::GopStatus;

/// Which side of a request should hear about an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Counterpart {
    Provider,
    Payer,
}

/// Domain events emitted by the GOP aggregate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GopEvent {
    /// Provider submitted a new request
    Submitted {
        gop_id: GopId,
        timestamp: DateTime<Utc>,
    },

    /// Payer opened a pending request for the first time
    ReviewStarted {
        gop_id: GopId,
        timestamp: DateTime<Utc>,
    },

    /// Payer recorded the reviewer name
    StampAuthorSet {
        gop_id: GopId,
        stamp_author: String,
        timestamp: DateTime<Utc>,
    },

    /// Payer approved or declined
    Decided {
        gop_id: GopId,
        status: GopStatus,
        timestamp: DateTime<Utc>,
    },

    /// Provider edited the content
    Edited {
        gop_id: GopId,
        /// A decided, non-final request went back to pending
        reopened: bool,
        /// This edit marked the request final
        finalized: bool,
        timestamp: DateTime<Utc>,
    },

    /// Provider resubmitted the request for review
    Resent {
        gop_id: GopId,
        timestamp: DateTime<Utc>,
    },

    /// Provider archived the request
    Closed {
        gop_id: GopId,
        reason: String,
        timestamp: DateTime<Utc>,
    },
}

impl GopEvent {
    pub fn gop_id(&self) -> GopId {
        match self {
            GopEvent::Submitted { gop_id, .. }
            | GopEvent::ReviewStarted { gop_id, .. }
            | GopEvent::StampAuthorSet { gop_id, .. }
            | GopEvent::Decided { gop_id, .. }
            | GopEvent::Edited { gop_id, .. }
            | GopEvent::Resent { gop_id, .. }
            | GopEvent::Closed { gop_id, .. } => *gop_id,
        }
    }

    /// Returns the event type as a string
    pub fn event_type(&self) -> &'static str {
        match self {
            GopEvent::Submitted { .. } => "submitted",
            GopEvent::ReviewStarted { .. } => "review_started",
            GopEvent::StampAuthorSet { .. } => "stamp_author_set",
            GopEvent::Decided { .. } => "decided",
            GopEvent::Edited { .. } => "edited",
            GopEvent::Resent { .. } => "resent",
            GopEvent::Closed { .. } => "closed",
        }
    }

    /// The side that receives a notification for this event, if any
    pub fn counterpart(&self) -> Option<Counterpart> {
        match self {
            GopEvent::Submitted { .. } | GopEvent::Edited { .. } | GopEvent::Resent { .. } => {
                Some(Counterpart::Payer)
            }
            GopEvent::ReviewStarted { .. } | GopEvent::Decided { .. } => Some(Counterpart::Provider),
            GopEvent::StampAuthorSet { .. } | GopEvent::Closed { .. } => None,
        }
    }

    /// Whether the payer's contact gets an email
    pub fn emails_payer(&self) -> bool {
        matches!(
            self,
            GopEvent::Submitted { .. } | GopEvent::Resent { .. } | GopEvent::Edited { finalized: true, .. }
        )
    }

    /// Notification title and message text
    pub fn notification_text(&self) -> (&'static str, String) {
        let id = self.gop_id().value();
        match self {
            GopEvent::Submitted { .. } => ("New request", format!("New GOP request #{id} received")),
            GopEvent::ReviewStarted { .. } => ("In review", format!("GOP request #{id} is now under review")),
            GopEvent::StampAuthorSet { stamp_author, .. } => {
                ("Reviewer assigned", format!("GOP request #{id} is reviewed by {stamp_author}"))
            }
            GopEvent::Decided { status, .. } => ("Decision", format!("GOP request #{id} has been {status}")),
            GopEvent::Edited { finalized: true, .. } => {
                ("Final request", format!("GOP request #{id} has been submitted as final"))
            }
            GopEvent::Edited { .. } => ("Request updated", format!("GOP request #{id} has been updated")),
            GopEvent::Resent { .. } => ("Request resent", format!("GOP request #{id} has been resent")),
            GopEvent::Closed { reason, .. } => ("Closed", format!("GOP request #{id} was closed: {reason}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_goes_to_provider() {
        let event = GopEvent::Decided {
            gop_id: GopId::new(7),
            status: GopStatus::Declined,
            timestamp: Utc::now(),
        };
        assert_eq!(event.counterpart(), Some(Counterpart::Provider));
        assert!(!event.emails_payer());
        assert!(event.notification_text().1.contains("declined"));
    }

    #[test]
    fn test_only_final_edits_email_the_payer() {
        let plain = GopEvent::Edited {
            gop_id: GopId::new(7),
            reopened: false,
            finalized: false,
            timestamp: Utc::now(),
        };
        let final_edit = GopEvent::Edited {
            gop_id: GopId::new(7),
            reopened: true,
            finalized: true,
            timestamp: Utc::now(),
        };
        assert!(!plain.emails_payer());
        assert!(final_edit.emails_payer());
        assert_eq!(final_edit.counterpart(), Some(Counterpart::Payer));
    }
}
