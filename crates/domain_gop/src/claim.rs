//! Terminal-originated claims
//!
//! A point-of-sale terminal at the provider reports a member's device and an
//! optional amount. The claim shell is stored first; the provider completes
//! the request from it later.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{Amount, ClaimId, GopId, MemberId, ProviderId, TerminalId};

use crate::error::GopError;

/// A stored claim shell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    pub id: ClaimId,
    pub provider_id: ProviderId,
    pub member_id: MemberId,
    pub terminal_id: Option<TerminalId>,
    pub amount: Option<Amount>,
    /// Set once the provider completes the request
    pub gop_id: Option<GopId>,
    pub created_at: DateTime<Utc>,
}

impl Claim {
    /// Links the completed request
    pub fn attach(&mut self, gop_id: GopId) -> Result<(), GopError> {
        if let Some(existing) = self.gop_id {
            return Err(GopError::invalid_transition("attach a request to", format!("linked to {existing}")));
        }
        self.gop_id = Some(gop_id);
        Ok(())
    }
}

/// A claim shell to be stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewClaim {
    pub provider_id: ProviderId,
    pub member_id: MemberId,
    pub terminal_id: Option<TerminalId>,
    pub amount: Option<Amount>,
    pub created_at: DateTime<Utc>,
}

/// What a terminal submits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerminalClaimRequest {
    pub device_uid: String,
    pub terminal_id: Option<TerminalId>,
    pub amount: Option<Amount>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_attaches_once() {
        let mut claim = Claim {
            id: ClaimId::new(1),
            provider_id: ProviderId::new(1),
            member_id: MemberId::new(1),
            terminal_id: None,
            amount: None,
            gop_id: None,
            created_at: Utc::now(),
        };

        claim.attach(GopId::new(5)).unwrap();
        assert!(claim.attach(GopId::new(6)).is_err());
        assert_eq!(claim.gop_id, Some(GopId::new(5)));
    }
}
