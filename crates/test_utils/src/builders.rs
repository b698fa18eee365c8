//! Test Data Builders
//!
//! Builders keep the raw, form-like field values and produce the typed input
//! through serde, so tests exercise the same coercion as the HTTP and bulk
//! JSON paths.

use serde_json::{json, Map, Value};

use core_kernel::{DoctorId, PayerId};
use domain_gop::{DecisionInput, GopDraft, GopPatch};

use crate::fixtures::Ids;

/// Builder for a provider's request draft
///
/// Defaults to tenant A: payer A, doctor A and the fixture member's national
/// id, with a quotation of `1,500.00`.
#[derive(Debug, Clone)]
pub struct GopDraftBuilder {
    payer_id: PayerId,
    doctor_id: Option<DoctorId>,
    fields: Map<String, Value>,
    member: Map<String, Value>,
    medical: Map<String, Value>,
}

impl Default for GopDraftBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GopDraftBuilder {
    pub fn new() -> Self {
        let mut builder = Self {
            payer_id: Ids::PAYER_A,
            doctor_id: Some(Ids::DOCTOR_A),
            fields: Map::new(),
            member: Map::new(),
            medical: Map::new(),
        };
        builder.fields.insert("quotation".into(), json!("1,500.00"));
        builder.fields.insert("reason".into(), json!("general"));
        builder.member.insert("name".into(), json!("Jane Doe"));
        builder.member.insert("national_id".into(), json!("S1234567A"));
        builder
    }

    /// Draft for tenant B (provider B's payer and doctor)
    pub fn tenant_b() -> Self {
        Self::new().payer(Ids::PAYER_B).doctor(Ids::DOCTOR_B)
    }

    pub fn payer(mut self, payer_id: PayerId) -> Self {
        self.payer_id = payer_id;
        self
    }

    pub fn doctor(mut self, doctor_id: DoctorId) -> Self {
        self.doctor_id = Some(doctor_id);
        self
    }

    pub fn without_doctor(mut self) -> Self {
        self.doctor_id = None;
        self
    }

    /// Sets any top-level field to a raw JSON value
    pub fn field(mut self, name: &str, value: Value) -> Self {
        self.fields.insert(name.to_string(), value);
        self
    }

    pub fn quotation(self, raw: &str) -> Self {
        self.field("quotation", json!(raw))
    }

    pub fn without_quotation(mut self) -> Self {
        self.fields.remove("quotation");
        self
    }

    pub fn room_price(self, raw: &str) -> Self {
        self.field("room_price", json!(raw))
    }

    pub fn room_type(self, raw: &str) -> Self {
        self.field("room_type", json!(raw))
    }

    pub fn icd_codes(self, codes: &[i64]) -> Self {
        self.field("icd_codes", json!(codes))
    }

    pub fn member_field(mut self, name: &str, value: &str) -> Self {
        self.member.insert(name.to_string(), json!(value));
        self
    }

    /// A patient not yet in the directory
    pub fn new_member(self, name: &str, national_id: &str) -> Self {
        self.member_field("name", name).member_field("national_id", national_id)
    }

    pub fn medical_field(mut self, name: &str, value: Value) -> Self {
        self.medical.insert(name.to_string(), value);
        self
    }

    /// The draft as a JSON body, as posted to the bulk endpoint
    pub fn to_json(&self) -> Value {
        let mut body = self.fields.clone();
        body.insert("payer_id".into(), json!(self.payer_id.value()));
        if let Some(doctor_id) = self.doctor_id {
            body.insert("doctor_id".into(), json!(doctor_id.value()));
        }
        body.insert("member".into(), Value::Object(self.member.clone()));
        body.insert("medical_details".into(), Value::Object(self.medical.clone()));
        Value::Object(body)
    }

    /// Only the editable details, as posted to the edit endpoint
    pub fn patch(&self) -> GopPatch {
        let mut body = self.fields.clone();
        body.insert("member".into(), Value::Object(self.member.clone()));
        body.insert("medical_details".into(), Value::Object(self.medical.clone()));
        serde_json::from_value(Value::Object(body)).expect("builder produces a valid patch")
    }

    pub fn build(&self) -> GopDraft {
        serde_json::from_value(self.to_json()).expect("builder produces a valid draft")
    }
}

/// Builder for a payer decision
#[derive(Debug, Clone, Default)]
pub struct DecisionBuilder {
    input: DecisionInput,
}

impl DecisionBuilder {
    pub fn approve() -> Self {
        Self {
            input: DecisionInput {
                status: "approved".into(),
                reason_decline: None,
                stamp_author: Some("Dr. Reviewer".into()),
            },
        }
    }

    pub fn decline(reason: Option<&str>) -> Self {
        Self {
            input: DecisionInput {
                status: "declined".into(),
                reason_decline: reason.map(str::to_string),
                stamp_author: Some("Dr. Reviewer".into()),
            },
        }
    }

    pub fn without_stamp_author(mut self) -> Self {
        self.input.stamp_author = None;
        self
    }

    pub fn build(self) -> DecisionInput {
        self.input
    }
}
