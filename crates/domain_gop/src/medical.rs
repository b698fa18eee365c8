//! Clinical details attached to a request

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::GopError;

/// Clinical summary supplied by the provider
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedicalDetails {
    pub symptoms: Option<String>,
    pub temperature: Option<String>,
    pub heart_rate: Option<String>,
    pub respiration: Option<String>,
    pub blood_pressure: Option<String>,
    pub physical_finding: Option<String>,
    pub health_history: Option<String>,
    pub previously_admitted: Option<NaiveDate>,
    pub diagnosis: Option<String>,
    pub in_patient: bool,
    pub test_results: Option<String>,
    pub current_therapy: Option<String>,
    pub treatment_plan: Option<String>,
}

impl MedicalDetails {
    pub fn apply(&mut self, changes: MedicalChanges) {
        let MedicalChanges {
            symptoms,
            temperature,
            heart_rate,
            respiration,
            blood_pressure,
            physical_finding,
            health_history,
            previously_admitted,
            diagnosis,
            in_patient,
            test_results,
            current_therapy,
            treatment_plan,
        } = changes;

        replace(&mut self.symptoms, symptoms);
        replace(&mut self.temperature, temperature);
        replace(&mut self.heart_rate, heart_rate);
        replace(&mut self.respiration, respiration);
        replace(&mut self.blood_pressure, blood_pressure);
        replace(&mut self.physical_finding, physical_finding);
        replace(&mut self.health_history, health_history);
        if previously_admitted.is_some() {
            self.previously_admitted = previously_admitted;
        }
        replace(&mut self.diagnosis, diagnosis);
        if let Some(flag) = in_patient {
            self.in_patient = flag;
        }
        replace(&mut self.test_results, test_results);
        replace(&mut self.current_therapy, current_therapy);
        replace(&mut self.treatment_plan, treatment_plan);
    }
}

fn replace(slot: &mut Option<String>, value: Option<String>) {
    if value.is_some() {
        *slot = value;
    }
}

/// Raw clinical fields from a form or JSON body
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MedicalDetailsPatch {
    pub symptoms: Option<String>,
    pub temperature: Option<String>,
    pub heart_rate: Option<String>,
    pub respiration: Option<String>,
    pub blood_pressure: Option<String>,
    pub physical_finding: Option<String>,
    pub health_history: Option<String>,
    /// `YYYY-MM-DD`
    pub previously_admitted: Option<String>,
    pub diagnosis: Option<String>,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub in_patient: Option<bool>,
    pub test_results: Option<String>,
    pub current_therapy: Option<String>,
    pub treatment_plan: Option<String>,
}

/// Validated clinical changes; `None` leaves a field untouched
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MedicalChanges {
    pub symptoms: Option<String>,
    pub temperature: Option<String>,
    pub heart_rate: Option<String>,
    pub respiration: Option<String>,
    pub blood_pressure: Option<String>,
    pub physical_finding: Option<String>,
    pub health_history: Option<String>,
    pub previously_admitted: Option<NaiveDate>,
    pub diagnosis: Option<String>,
    pub in_patient: Option<bool>,
    pub test_results: Option<String>,
    pub current_therapy: Option<String>,
    pub treatment_plan: Option<String>,
}

impl MedicalChanges {
    pub fn is_empty(&self) -> bool {
        *self == MedicalChanges::default()
    }
}

impl MedicalDetailsPatch {
    /// # Errors
    ///
    /// `GopError::Validation` for an unparseable `previously_admitted` date.
    pub fn into_changes(self) -> Result<MedicalChanges, GopError> {
        let previously_admitted = crate::patch::non_blank(self.previously_admitted)
            .map(|raw| {
                NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
                    .map_err(|_| GopError::validation("previously_admitted", "expected YYYY-MM-DD"))
            })
            .transpose()?;

        Ok(MedicalChanges {
            symptoms: self.symptoms,
            temperature: self.temperature,
            heart_rate: self.heart_rate,
            respiration: self.respiration,
            blood_pressure: self.blood_pressure,
            physical_finding: self.physical_finding,
            health_history: self.health_history,
            previously_admitted,
            diagnosis: self.diagnosis,
            in_patient: self.in_patient,
            test_results: self.test_results,
            current_therapy: self.current_therapy,
            treatment_plan: self.treatment_plan,
        })
    }
}

/// Checkbox-style flag: accepts booleans, numbers and "on"/"true"/"yes"/"1"
fn lenient_flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<bool>, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Null => None,
        serde_json::Value::Bool(flag) => Some(flag),
        serde_json::Value::Number(n) => Some(n.as_f64().is_some_and(|n| n != 0.0)),
        serde_json::Value::String(text) => Some(matches!(
            text.trim().to_ascii_lowercase().as_str(),
            "on" | "true" | "yes" | "1"
        )),
        _ => Some(false),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_patient_accepts_checkbox_values() {
        let patch: MedicalDetailsPatch = serde_json::from_str(r#"{"in_patient": "on"}"#).unwrap();
        assert_eq!(patch.in_patient, Some(true));

        let patch: MedicalDetailsPatch = serde_json::from_str(r#"{"in_patient": false}"#).unwrap();
        assert_eq!(patch.in_patient, Some(false));

        let patch: MedicalDetailsPatch = serde_json::from_str("{}").unwrap();
        assert_eq!(patch.in_patient, None);
    }

    #[test]
    fn test_apply_only_overwrites_supplied_fields() {
        let mut details = MedicalDetails {
            symptoms: Some("fever".into()),
            diagnosis: Some("dengue".into()),
            ..MedicalDetails::default()
        };

        details.apply(MedicalChanges {
            diagnosis: Some("dengue fever".into()),
            in_patient: Some(true),
            ..MedicalChanges::default()
        });

        assert_eq!(details.symptoms.as_deref(), Some("fever"));
        assert_eq!(details.diagnosis.as_deref(), Some("dengue fever"));
        assert!(details.in_patient);
    }

    #[test]
    fn test_bad_previous_admission_date() {
        let patch = MedicalDetailsPatch {
            previously_admitted: Some("last tuesday".into()),
            ..MedicalDetailsPatch::default()
        };
        assert!(matches!(patch.into_changes(), Err(GopError::Validation { .. })));
    }
}
