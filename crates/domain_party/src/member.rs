//! Members (patients)
//!
//! A member is owned by the system, not by any one provider, and is reused
//! across admissions. The national id is the deduplication key.

use chrono::NaiveDate;
use core_kernel::{CoreError, MemberId};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use validator::Validate;

use crate::error::PartyError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
        }
    }
}

impl FromStr for Gender {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            other => Err(CoreError::unknown_variant("gender", other)),
        }
    }
}

/// A stored member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    pub name: String,
    pub dob: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub national_id: Option<String>,
    pub tel: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    /// Relative URL of the uploaded photo
    pub photo: Option<String>,
    pub policy_number: Option<String>,
    /// Point-of-sale terminal binding
    pub device_uid: Option<String>,
}

impl Member {
    /// Applies validated changes in place
    pub fn apply(&mut self, changes: MemberChanges) {
        if let Some(name) = changes.name {
            self.name = name;
        }
        if changes.dob.is_some() {
            self.dob = changes.dob;
        }
        if changes.gender.is_some() {
            self.gender = changes.gender;
        }
        if changes.national_id.is_some() {
            self.national_id = changes.national_id;
        }
        if changes.tel.is_some() {
            self.tel = changes.tel;
        }
        if changes.email.is_some() {
            self.email = changes.email;
        }
        if changes.address.is_some() {
            self.address = changes.address;
        }
        if changes.photo.is_some() {
            self.photo = changes.photo;
        }
        if changes.policy_number.is_some() {
            self.policy_number = changes.policy_number;
        }
    }
}

/// A member not yet persisted
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewMember {
    pub name: String,
    pub dob: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub national_id: Option<String>,
    pub tel: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub photo: Option<String>,
    pub policy_number: Option<String>,
    pub device_uid: Option<String>,
}

impl NewMember {
    pub fn from_changes(changes: MemberChanges) -> Self {
        Self {
            name: changes.name.unwrap_or_default(),
            dob: changes.dob,
            gender: changes.gender,
            national_id: changes.national_id,
            tel: changes.tel,
            email: changes.email,
            address: changes.address,
            photo: changes.photo,
            policy_number: changes.policy_number,
            device_uid: None,
        }
    }

    /// Placeholder member bound to a terminal device, completed later by the provider
    pub fn for_device(device_uid: impl Into<String>) -> Self {
        Self {
            name: "Unregistered member".to_string(),
            device_uid: Some(device_uid.into()),
            ..Self::default()
        }
    }
}

/// Raw member fields as submitted by a form or JSON body
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct MemberPatch {
    #[validate(length(min = 1, max = 120))]
    pub name: Option<String>,
    /// `YYYY-MM-DD`
    pub dob: Option<String>,
    pub gender: Option<String>,
    #[validate(length(min = 1, max = 64))]
    pub national_id: Option<String>,
    pub tel: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub address: Option<String>,
    pub photo: Option<String>,
    pub policy_number: Option<String>,
}

/// Member fields after validation; `None` means "leave unchanged"
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemberChanges {
    pub name: Option<String>,
    pub dob: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub national_id: Option<String>,
    pub tel: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub photo: Option<String>,
    pub policy_number: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl MemberPatch {
    /// Validates every field and converts to typed changes.
    ///
    /// Blank strings are treated as absent.
    ///
    /// # Errors
    ///
    /// `PartyError::Validation` naming the first offending field.
    pub fn into_changes(self) -> Result<MemberChanges, PartyError> {
        let patch = MemberPatch {
            name: non_blank(self.name),
            dob: non_blank(self.dob),
            gender: non_blank(self.gender),
            national_id: non_blank(self.national_id),
            tel: non_blank(self.tel),
            email: non_blank(self.email),
            address: non_blank(self.address),
            photo: non_blank(self.photo),
            policy_number: non_blank(self.policy_number),
        };

        if let Err(errors) = patch.validate() {
            let field = errors
                .field_errors()
                .keys()
                .next()
                .map(|k| k.to_string())
                .unwrap_or_else(|| "member".to_string());
            return Err(PartyError::validation(field, "invalid value"));
        }

        let dob = patch
            .dob
            .as_deref()
            .map(|raw| NaiveDate::parse_from_str(raw, "%Y-%m-%d"))
            .transpose()
            .map_err(|_| PartyError::validation("dob", "expected YYYY-MM-DD"))?;

        let gender = patch
            .gender
            .as_deref()
            .map(Gender::from_str)
            .transpose()
            .map_err(|e| PartyError::validation("gender", e.to_string()))?;

        Ok(MemberChanges {
            name: patch.name,
            dob,
            gender,
            national_id: patch.national_id,
            tel: patch.tel,
            email: patch.email,
            address: patch.address,
            photo: patch.photo,
            policy_number: patch.policy_number,
        })
    }
}
