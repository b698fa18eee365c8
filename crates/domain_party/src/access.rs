//! Route-level authorization predicate
//!
//! Every entry point into the core checks the caller against an
//! [`AccessRule`] before it touches any aggregate. The rule has four sets:
//! required roles, required types, excluded roles and excluded types. An
//! empty required set means "any".

use crate::actor::{Actor, Role, UserType};
use crate::error::PartyError;

/// Role/type requirements for an operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessRule {
    roles: Vec<Role>,
    types: Vec<UserType>,
    deny_roles: Vec<Role>,
    deny_types: Vec<UserType>,
}

impl AccessRule {
    /// Allows every authenticated actor
    pub fn any() -> Self {
        Self::default()
    }

    /// Requires one of the given user types
    pub fn for_types(types: impl IntoIterator<Item = UserType>) -> Self {
        Self {
            types: types.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Requires one of the given roles
    pub fn for_roles(roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            roles: roles.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Rejects actors holding any of these roles
    pub fn deny_roles(mut self, roles: impl IntoIterator<Item = Role>) -> Self {
        self.deny_roles = roles.into_iter().collect();
        self
    }

    /// Rejects actors of any of these types
    pub fn deny_types(mut self, types: impl IntoIterator<Item = UserType>) -> Self {
        self.deny_types = types.into_iter().collect();
        self
    }

    /// Provider or payer organisation users
    pub fn provider_or_payer() -> Self {
        Self::for_types([UserType::Provider, UserType::Payer])
    }

    /// Platform administrators only
    pub fn admin() -> Self {
        Self::for_roles([Role::Admin])
    }

    /// Anyone reading requests through a tenant or admin scope
    pub fn request_reader() -> Self {
        Self::any().deny_types([UserType::Member])
    }

    /// Evaluates the rule against an actor
    pub fn allows(&self, actor: &Actor) -> bool {
        let user_type = actor.user_type();

        if !self.roles.is_empty() && !self.roles.contains(&actor.role) {
            return false;
        }
        if !self.types.is_empty() && !user_type.is_some_and(|t| self.types.contains(&t)) {
            return false;
        }
        if self.deny_roles.contains(&actor.role) {
            return false;
        }
        if user_type.is_some_and(|t| self.deny_types.contains(&t)) {
            return false;
        }
        true
    }
}

/// Checks an actor against a rule
///
/// # Errors
///
/// Returns `PartyError::NotAuthorized` when the rule denies the actor.
pub fn authorize(actor: &Actor, rule: &AccessRule) -> Result<(), PartyError> {
    if rule.allows(actor) {
        Ok(())
    } else {
        tracing::debug!(user = %actor.user_id, role = %actor.role, "access rule denied actor");
        Err(PartyError::NotAuthorized)
    }
}
