//! Guarantee of Payment aggregate

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{Amount, ClaimId, CoreError, DiagnosisCodeId, GopId, MemberId, PayerId, ProviderId};

use crate::medical::MedicalDetails;
use crate::patch::GopChanges;

/// Review status of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GopStatus {
    /// Submitted, not yet opened by the payer
    Pending,
    /// Opened by the payer
    InReview,
    Approved,
    Declined,
}

impl GopStatus {
    pub const ALL: [GopStatus; 4] = [
        GopStatus::Pending,
        GopStatus::InReview,
        GopStatus::Approved,
        GopStatus::Declined,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GopStatus::Pending => "pending",
            GopStatus::InReview => "in_review",
            GopStatus::Approved => "approved",
            GopStatus::Declined => "declined",
        }
    }

    /// Whether the payer has made a decision
    pub fn is_decided(&self) -> bool {
        matches!(self, GopStatus::Approved | GopStatus::Declined)
    }
}

impl fmt::Display for GopStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GopStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(GopStatus::Pending),
            // legacy spelling
            "in_review" | "in review" => Ok(GopStatus::InReview),
            "approved" => Ok(GopStatus::Approved),
            "declined" => Ok(GopStatus::Declined),
            other => Err(CoreError::unknown_variant("status", other)),
        }
    }
}

/// Reason for the admission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdmissionReason {
    General,
    Specialist,
    Emergency,
    Scheduled,
}

impl AdmissionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdmissionReason::General => "general",
            AdmissionReason::Specialist => "specialist",
            AdmissionReason::Emergency => "emergency",
            AdmissionReason::Scheduled => "scheduled",
        }
    }
}

impl FromStr for AdmissionReason {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "general" => Ok(AdmissionReason::General),
            "specialist" => Ok(AdmissionReason::Specialist),
            "emergency" => Ok(AdmissionReason::Emergency),
            "scheduled" => Ok(AdmissionReason::Scheduled),
            other => Err(CoreError::unknown_variant("reason", other)),
        }
    }
}

/// Ward class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomType {
    Na,
    I,
    Ii,
    Iii,
    Iv,
    Vip,
}

impl RoomType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoomType::Na => "na",
            RoomType::I => "i",
            RoomType::Ii => "ii",
            RoomType::Iii => "iii",
            RoomType::Iv => "iv",
            RoomType::Vip => "vip",
        }
    }
}

impl FromStr for RoomType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "na" => Ok(RoomType::Na),
            "i" => Ok(RoomType::I),
            "ii" => Ok(RoomType::Ii),
            "iii" => Ok(RoomType::Iii),
            "iv" => Ok(RoomType::Iv),
            "vip" => Ok(RoomType::Vip),
            other => Err(CoreError::unknown_variant("room_type", other)),
        }
    }
}

/// Cost estimate of the admission
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Financials {
    pub room_price: Amount,
    pub doctor_fee: Amount,
    pub surgery_fee: Amount,
    pub medication_fee: Amount,
    /// Total quoted to the payer
    pub quotation: Amount,
}

/// Content fields shared by stored and not-yet-stored requests
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GopContent {
    pub doctor_name: Option<String>,
    pub patient_action_plan: Option<String>,
    pub patient_medical_no: Option<String>,
    pub admission_at: Option<NaiveDateTime>,
    pub reason: Option<AdmissionReason>,
    pub room_type: Option<RoomType>,
    pub financials: Financials,
    pub medical_details: Option<MedicalDetails>,
    pub diagnosis_codes: BTreeSet<DiagnosisCodeId>,
}

impl GopContent {
    /// Applies validated content changes; member changes are handled by the caller
    pub fn apply(&mut self, changes: GopChanges) {
        let GopChanges {
            doctor_name,
            patient_action_plan,
            patient_medical_no,
            admission_at,
            reason,
            room_type,
            room_price,
            doctor_fee,
            surgery_fee,
            medication_fee,
            quotation,
            diagnosis_codes,
            medical,
            member: _,
        } = changes;

        if doctor_name.is_some() {
            self.doctor_name = doctor_name;
        }
        if patient_action_plan.is_some() {
            self.patient_action_plan = patient_action_plan;
        }
        if patient_medical_no.is_some() {
            self.patient_medical_no = patient_medical_no;
        }
        if admission_at.is_some() {
            self.admission_at = admission_at;
        }
        if reason.is_some() {
            self.reason = reason;
        }
        if room_type.is_some() {
            self.room_type = room_type;
        }
        let financials = &mut self.financials;
        for (slot, value) in [
            (&mut financials.room_price, room_price),
            (&mut financials.doctor_fee, doctor_fee),
            (&mut financials.surgery_fee, surgery_fee),
            (&mut financials.medication_fee, medication_fee),
            (&mut financials.quotation, quotation),
        ] {
            if let Some(amount) = value {
                *slot = amount;
            }
        }
        if let Some(codes) = diagnosis_codes {
            self.diagnosis_codes = codes;
        }
        if !medical.is_empty() {
            self.medical_details.get_or_insert_with(MedicalDetails::default).apply(medical);
        }
    }
}

/// A request that has passed the create guards but has no id yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewGop {
    pub provider_id: ProviderId,
    pub payer_id: PayerId,
    pub member_id: MemberId,
    pub claim_id: Option<ClaimId>,
    pub content: GopContent,
    pub created_at: DateTime<Utc>,
}

/// The Guarantee of Payment aggregate
///
/// Lifecycle methods live in [`crate::lifecycle`]; they check the actor and
/// the current state before touching any field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuaranteeOfPayment {
    pub id: GopId,
    pub provider_id: ProviderId,
    pub payer_id: PayerId,
    pub member_id: MemberId,
    pub claim_id: Option<ClaimId>,
    #[serde(flatten)]
    pub content: GopContent,
    pub status: GopStatus,
    /// One-way archive flag
    pub closed: bool,
    /// Provider's confirmed submission, as opposed to an initial estimate
    #[serde(rename = "final")]
    pub is_final: bool,
    pub reason_decline: Option<String>,
    pub reason_close: Option<String>,
    /// Payer-side reviewer name
    pub stamp_author: Option<String>,
    #[serde(rename = "timestamp")]
    pub created_at: DateTime<Utc>,
    /// Last status change
    #[serde(rename = "timestamp_edited")]
    pub edited_at: Option<DateTime<Utc>>,
}

impl GuaranteeOfPayment {
    /// Materialises a stored request from its insert form
    pub fn from_new(id: GopId, new: NewGop) -> Self {
        Self {
            id,
            provider_id: new.provider_id,
            payer_id: new.payer_id,
            member_id: new.member_id,
            claim_id: new.claim_id,
            content: new.content,
            status: GopStatus::Pending,
            closed: false,
            is_final: false,
            reason_decline: None,
            reason_close: None,
            stamp_author: None,
            created_at: new.created_at,
            edited_at: None,
        }
    }

    /// Time from submission to the last status change, for decided requests.
    ///
    /// Formatted as `"X days Y hrs Z mins"`, dropping leading zero units.
    pub fn turnaround_time(&self) -> Option<String> {
        if !self.status.is_decided() {
            return None;
        }
        let edited_at = self.edited_at?;
        let seconds = (edited_at - self.created_at).num_seconds().max(0);
        Some(format_duration(seconds))
    }
}

fn format_duration(seconds: i64) -> String {
    let days = seconds / 86_400;
    let hours = (seconds % 86_400) / 3_600;
    let minutes = (seconds % 3_600) / 60;

    if days > 0 {
        format!("{days} days {hours} hrs {minutes} mins")
    } else if hours > 0 {
        format!("{hours} hrs {minutes} mins")
    } else {
        format!("{minutes} mins")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_status_accepts_legacy_spelling() {
        assert_eq!("in review".parse::<GopStatus>().unwrap(), GopStatus::InReview);
        assert_eq!("IN_REVIEW".parse::<GopStatus>().unwrap(), GopStatus::InReview);
        assert!("closed".parse::<GopStatus>().is_err());
    }

    #[test]
    fn test_room_type_vocabulary() {
        assert_eq!("VIP".parse::<RoomType>().unwrap(), RoomType::Vip);
        assert_eq!("iii".parse::<RoomType>().unwrap(), RoomType::Iii);
        assert!("v".parse::<RoomType>().is_err());
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(59), "0 mins");
        assert_eq!(format_duration(3 * 3600 + 5 * 60), "3 hrs 5 mins");
        assert_eq!(format_duration(2 * 86_400 + 60), "2 days 0 hrs 1 mins");
    }

    #[test]
    fn test_turnaround_only_for_decided() {
        let created_at = Utc::now() - Duration::hours(5);
        let mut gop = GuaranteeOfPayment::from_new(
            GopId::new(1),
            NewGop {
                provider_id: ProviderId::new(1),
                payer_id: PayerId::new(2),
                member_id: MemberId::new(3),
                claim_id: None,
                content: GopContent::default(),
                created_at,
            },
        );
        gop.edited_at = Some(created_at + Duration::minutes(90));
        assert_eq!(gop.turnaround_time(), None);

        gop.status = GopStatus::Approved;
        assert_eq!(gop.turnaround_time().as_deref(), Some("1 hrs 30 mins"));
    }
}
