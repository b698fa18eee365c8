//! Login accounts

use core_kernel::UserId;
use rand::Rng;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::actor::{Actor, Affiliation, Role};
use crate::error::PartyError;
use crate::organization::Payer;

/// Length of generated one-time passwords
pub const ONE_TIME_PASSWORD_LEN: usize = 8;

const PASSWORD_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// A stored login account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub affiliation: Affiliation,
    pub premium: bool,
}

impl User {
    /// Builds the actor used for every core call made on behalf of this account
    pub fn actor(&self) -> Actor {
        Actor::new(self.id, self.name.clone(), self.role, self.affiliation)
    }
}

/// An account to be created
#[derive(Debug, Clone, PartialEq, Eq, Validate)]
pub struct NewUser {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    pub role: Role,
    pub affiliation: Affiliation,
    /// Plain one-time password; the directory adapter owns hashing
    pub password: String,
}

impl NewUser {
    /// Login account for a payer that has none yet.
    ///
    /// The login email is the payer's primary contact, falling back to the
    /// alternate contact.
    ///
    /// # Errors
    ///
    /// `PartyError::Validation` if the payer has no usable contact email.
    pub fn payer_account(payer: &Payer, password: String) -> Result<Self, PartyError> {
        let email = payer
            .contact_emails()
            .next()
            .ok_or_else(|| PartyError::validation("pic_email", "payer has no contact email"))?;

        let user = NewUser {
            name: payer.pic.clone().unwrap_or_else(|| payer.company.clone()),
            email: email.to_string(),
            role: Role::User,
            affiliation: Affiliation::Payer(payer.id),
            password,
        };
        user.validate()
            .map_err(|_| PartyError::validation("pic_email", "payer contact email is invalid"))?;
        Ok(user)
    }
}

/// Generates an upper-case alphanumeric one-time password
pub fn generate_one_time_password() -> String {
    generate_one_time_password_with(&mut rand::thread_rng())
}

/// Same as [`generate_one_time_password`] with a caller-supplied RNG
pub fn generate_one_time_password_with<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..ONE_TIME_PASSWORD_LEN)
        .map(|_| PASSWORD_ALPHABET[rng.gen_range(0..PASSWORD_ALPHABET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::PayerId;

    #[test]
    fn test_one_time_password_shape() {
        for _ in 0..50 {
            let password = generate_one_time_password();
            assert_eq!(password.len(), ONE_TIME_PASSWORD_LEN);
            assert!(password.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_user_actor_carries_affiliation() {
        let user = User {
            id: UserId::new(9),
            name: "Claims desk".into(),
            email: "desk@acme.test".into(),
            role: Role::User,
            affiliation: Affiliation::Payer(PayerId::new(4)),
            premium: false,
        };

        let actor = user.actor();
        assert_eq!(actor.payer_id(), Some(PayerId::new(4)));
        assert_eq!(actor.user_id, UserId::new(9));
    }

    #[test]
    fn test_new_user_rejects_bad_email() {
        let new_user = NewUser {
            name: "Acme".into(),
            email: "nope".into(),
            role: Role::User,
            affiliation: Affiliation::Payer(PayerId::new(4)),
            password: generate_one_time_password(),
        };
        assert!(new_user.validate().is_err());
    }

    #[test]
    fn test_payer_account_falls_back_to_alternate_contact() {
        let payer = Payer {
            id: PayerId::new(4),
            company: "Acme Assurance".into(),
            payer_type: None,
            pic: None,
            pic_email: Some("  ".into()),
            pic_alt_email: Some("claims@acme.test".into()),
            tel: None,
            country: None,
            user_id: None,
        };

        let account = NewUser::payer_account(&payer, "ABCD1234".into()).unwrap();
        assert_eq!(account.email, "claims@acme.test");
        assert_eq!(account.name, "Acme Assurance");
        assert_eq!(account.affiliation, Affiliation::Payer(PayerId::new(4)));
        assert_eq!(account.role, Role::User);

        let no_contact = Payer {
            pic_alt_email: None,
            ..payer
        };
        assert!(NewUser::payer_account(&no_contact, "ABCD1234".into()).is_err());
    }
}
