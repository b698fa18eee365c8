//! Actor and scope model

use core_kernel::{CoreError, MemberId, PayerId, ProviderId, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role tier of an account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Platform administrator, sees every tenant
    Admin,
    /// Organisation administrator, may edit shared resources (payers, doctors, billing codes)
    UserAdmin,
    /// Regular organisation user
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::UserAdmin => "user_admin",
            Role::User => "user",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "user_admin" => Ok(Role::UserAdmin),
            "user" => Ok(Role::User),
            other => Err(CoreError::unknown_variant("role", other)),
        }
    }
}

/// Kind of organisation an account belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserType {
    Provider,
    Payer,
    Member,
}

impl UserType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserType::Provider => "provider",
            UserType::Payer => "payer",
            UserType::Member => "member",
        }
    }
}

impl fmt::Display for UserType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "provider" => Ok(UserType::Provider),
            "payer" => Ok(UserType::Payer),
            "member" => Ok(UserType::Member),
            other => Err(CoreError::unknown_variant("user_type", other)),
        }
    }
}

/// The organisation an account acts for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum Affiliation {
    Provider(ProviderId),
    Payer(PayerId),
    Member(MemberId),
    /// Platform staff with no organisation
    Unaffiliated,
}

impl Affiliation {
    /// The user type this affiliation corresponds to, `None` for staff
    pub fn user_type(&self) -> Option<UserType> {
        match self {
            Affiliation::Provider(_) => Some(UserType::Provider),
            Affiliation::Payer(_) => Some(UserType::Payer),
            Affiliation::Member(_) => Some(UserType::Member),
            Affiliation::Unaffiliated => None,
        }
    }
}

/// Which GOP rows an actor may see
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Scope {
    /// Every tenant (admin)
    All,
    /// Rows whose provider is this provider
    Provider(ProviderId),
    /// Rows whose payer is this payer
    Payer(PayerId),
    /// No rows
    Nothing,
}

impl Scope {
    /// Whether a row owned by `provider` and addressed to `payer` is inside this scope
    pub fn covers(&self, provider: ProviderId, payer: PayerId) -> bool {
        match self {
            Scope::All => true,
            Scope::Provider(id) => *id == provider,
            Scope::Payer(id) => *id == payer,
            Scope::Nothing => false,
        }
    }
}

/// The authenticated caller of a core operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: UserId,
    /// Display name used in chat rooms and logs
    pub name: String,
    pub role: Role,
    pub affiliation: Affiliation,
}

impl Actor {
    pub fn new(user_id: UserId, name: impl Into<String>, role: Role, affiliation: Affiliation) -> Self {
        Self {
            user_id,
            name: name.into(),
            role,
            affiliation,
        }
    }

    pub fn user_type(&self) -> Option<UserType> {
        self.affiliation.user_type()
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// The provider this actor acts for, if any
    pub fn provider_id(&self) -> Option<ProviderId> {
        match self.affiliation {
            Affiliation::Provider(id) => Some(id),
            _ => None,
        }
    }

    /// The payer this actor acts for, if any
    pub fn payer_id(&self) -> Option<PayerId> {
        match self.affiliation {
            Affiliation::Payer(id) => Some(id),
            _ => None,
        }
    }

    /// Row visibility for this actor.
    ///
    /// Admins see everything; organisation users see their own rows only;
    /// members and unaffiliated non-admins see nothing.
    pub fn scope(&self) -> Scope {
        if self.is_admin() {
            return Scope::All;
        }
        match self.affiliation {
            Affiliation::Provider(id) => Scope::Provider(id),
            Affiliation::Payer(id) => Scope::Payer(id),
            Affiliation::Member(_) | Affiliation::Unaffiliated => Scope::Nothing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider_user(provider: i64) -> Actor {
        Actor::new(UserId::new(1), "Clinic", Role::User, Affiliation::Provider(ProviderId::new(provider)))
    }

    #[test]
    fn test_provider_scope_covers_only_own_rows() {
        let scope = provider_user(10).scope();

        assert!(scope.covers(ProviderId::new(10), PayerId::new(99)));
        assert!(!scope.covers(ProviderId::new(11), PayerId::new(99)));
    }

    #[test]
    fn test_admin_scope_is_all_even_with_affiliation() {
        let admin = Actor::new(UserId::new(2), "Root", Role::Admin, Affiliation::Provider(ProviderId::new(10)));
        assert_eq!(admin.scope(), Scope::All);
    }

    #[test]
    fn test_member_sees_nothing() {
        let member = Actor::new(UserId::new(3), "Pat", Role::User, Affiliation::Member(MemberId::new(5)));
        assert_eq!(member.scope(), Scope::Nothing);
        assert!(!member.scope().covers(ProviderId::new(1), PayerId::new(1)));
    }

    #[test]
    fn test_role_round_trips_through_str() {
        for role in [Role::Admin, Role::UserAdmin, Role::User] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("superuser".parse::<Role>().is_err());
    }
}
