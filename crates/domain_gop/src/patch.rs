//! Typed partial updates
//!
//! Every mutable field of a request is listed here with its coercion rule.
//! A patch is validated field by field into [`GopChanges`] before anything is
//! applied, so a rejected submission leaves the stored request untouched.
//!
//! | Field | Rule |
//! |---|---|
//! | fees, quotation | lenient amount, bad input becomes 0.00 |
//! | `reason`, `room_type` | closed vocabulary, unknown value rejected |
//! | `admission_date` / `admission_time` | `YYYY-MM-DD` / `HH:MM[:SS]`, rejected if malformed |
//! | `icd_codes` | replaces the whole set |
//! | text fields | blank means "leave unchanged" |

use std::collections::BTreeSet;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use core_kernel::{Amount, DiagnosisCodeId, DoctorId, PayerId};
use domain_party::{MemberChanges, MemberPatch};

use crate::error::GopError;
use crate::gop::{AdmissionReason, RoomType};
use crate::medical::{MedicalChanges, MedicalDetailsPatch};

/// Raw request fields from a form or JSON body
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GopPatch {
    pub doctor_name: Option<String>,
    pub patient_action_plan: Option<String>,
    pub patient_medical_no: Option<String>,
    pub admission_date: Option<String>,
    pub admission_time: Option<String>,
    pub reason: Option<String>,
    pub room_type: Option<String>,
    pub room_price: Option<Amount>,
    pub doctor_fee: Option<Amount>,
    pub surgery_fee: Option<Amount>,
    pub medication_fee: Option<Amount>,
    pub quotation: Option<Amount>,
    pub icd_codes: Option<Vec<i64>>,
    #[serde(default)]
    pub member: MemberPatch,
    #[serde(default)]
    pub medical_details: MedicalDetailsPatch,
}

/// Validated changes; `None` leaves a field untouched
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GopChanges {
    pub doctor_name: Option<String>,
    pub patient_action_plan: Option<String>,
    pub patient_medical_no: Option<String>,
    pub admission_at: Option<NaiveDateTime>,
    pub reason: Option<AdmissionReason>,
    pub room_type: Option<RoomType>,
    pub room_price: Option<Amount>,
    pub doctor_fee: Option<Amount>,
    pub surgery_fee: Option<Amount>,
    pub medication_fee: Option<Amount>,
    pub quotation: Option<Amount>,
    pub diagnosis_codes: Option<BTreeSet<DiagnosisCodeId>>,
    pub member: MemberChanges,
    pub medical: MedicalChanges,
}

pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_time(raw: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .ok()
}

impl GopPatch {
    /// Validates every field and converts to typed changes.
    ///
    /// # Errors
    ///
    /// `GopError::Validation` naming the first offending field.
    pub fn into_changes(self) -> Result<GopChanges, GopError> {
        let reason = non_blank(self.reason)
            .map(|raw| raw.parse::<AdmissionReason>())
            .transpose()
            .map_err(|e| GopError::validation("reason", e.to_string()))?;

        let room_type = non_blank(self.room_type)
            .map(|raw| raw.parse::<RoomType>())
            .transpose()
            .map_err(|e| GopError::validation("room_type", e.to_string()))?;

        let admission_date = non_blank(self.admission_date)
            .map(|raw| NaiveDate::parse_from_str(&raw, "%Y-%m-%d"))
            .transpose()
            .map_err(|_| GopError::validation("admission_date", "expected YYYY-MM-DD"))?;

        let admission_time = match non_blank(self.admission_time) {
            Some(raw) => Some(
                parse_time(&raw)
                    .ok_or_else(|| GopError::validation("admission_time", "expected HH:MM"))?,
            ),
            None => None,
        };

        let admission_at = admission_date
            .map(|date| date.and_time(admission_time.unwrap_or(NaiveTime::MIN)));

        let member = self.member.into_changes()?;
        let medical = self.medical_details.into_changes()?;

        Ok(GopChanges {
            doctor_name: non_blank(self.doctor_name),
            patient_action_plan: non_blank(self.patient_action_plan),
            patient_medical_no: non_blank(self.patient_medical_no),
            admission_at,
            reason,
            room_type,
            room_price: self.room_price,
            doctor_fee: self.doctor_fee,
            surgery_fee: self.surgery_fee,
            medication_fee: self.medication_fee,
            quotation: self.quotation,
            diagnosis_codes: self
                .icd_codes
                .map(|codes| codes.into_iter().map(DiagnosisCodeId::new).collect()),
            member,
            medical,
        })
    }
}

/// Input for submitting a new request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GopDraft {
    pub payer_id: PayerId,
    /// Selected doctor; its name is copied onto the request
    pub doctor_id: Option<DoctorId>,
    #[serde(flatten)]
    pub details: GopPatch,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_amounts_coerce_and_enums_validate() {
        let patch: GopPatch = serde_json::from_str(
            r#"{"room_price": "abc", "quotation": "1,500.00", "room_type": "vip", "reason": "emergency"}"#,
        )
        .unwrap();

        let changes = patch.into_changes().unwrap();
        assert_eq!(changes.room_price, Some(Amount::ZERO));
        assert_eq!(changes.quotation.map(|a| a.value()), Some(dec!(1500.00)));
        assert_eq!(changes.room_type, Some(RoomType::Vip));
        assert_eq!(changes.reason, Some(AdmissionReason::Emergency));
    }

    #[test]
    fn test_unknown_room_type_rejected() {
        let patch = GopPatch {
            room_type: Some("presidential".into()),
            ..GopPatch::default()
        };
        match patch.into_changes() {
            Err(GopError::Validation { field, .. }) => assert_eq!(field, "room_type"),
            other => panic!("expected room_type validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_admission_date_and_time_combine() {
        let patch = GopPatch {
            admission_date: Some("2024-03-01".into()),
            admission_time: Some("14:30".into()),
            ..GopPatch::default()
        };
        let changes = patch.into_changes().unwrap();
        let expected = NaiveDate::from_ymd_opt(2024, 3, 1)
            .and_then(|d| d.and_hms_opt(14, 30, 0));
        assert_eq!(changes.admission_at, expected);
    }

    #[test]
    fn test_draft_flattens_details() {
        let draft: GopDraft = serde_json::from_str(
            r#"{"payer_id": 4, "doctor_id": 7, "quotation": 300, "member": {"name": "Jane", "national_id": "S1"}}"#,
        )
        .unwrap();

        assert_eq!(draft.payer_id, PayerId::new(4));
        assert_eq!(draft.doctor_id, Some(DoctorId::new(7)));
        assert_eq!(draft.details.member.national_id.as_deref(), Some("S1"));
        assert_eq!(draft.details.quotation.map(|a| a.value()), Some(dec!(300)));
    }
}
