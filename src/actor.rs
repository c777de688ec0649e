//! Actor view consumed by policies.
//!
//! The engine does not own user management. The host hands each
//! authorization call an [`Actor`]: the minimal view of the requesting
//! principal that policy targets can match against.

use crate::selector::RoleSelector;

/// The principal requesting authorization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    username: String,
    anonymous: bool,
    roles: Vec<String>,
}

impl Actor {
    /// A named, authenticated actor with the given role aliases.
    pub fn named(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            anonymous: false,
            roles: Vec::new(),
        }
    }

    /// An anonymous actor. Anonymous actors still carry roles so that
    /// guest-role policies can target them.
    pub fn anonymous() -> Self {
        Self {
            username: "anonymous".to_string(),
            anonymous: true,
            roles: Vec::new(),
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }

    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles.extend(roles.into_iter().map(Into::into));
        self
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn is_anonymous(&self) -> bool {
        self.anonymous
    }

    pub fn has_role(&self, selector: &RoleSelector) -> bool {
        self.roles.iter().any(|r| selector.matches(r))
    }

    /// Key under which per-actor caches are kept. Two actors with the same
    /// key share a policy cache entry; any other key forces a reload.
    pub fn identity_key(&self) -> &str {
        &self.username
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_actor() {
        let actor = Actor::named("bob").with_role("Admin");
        assert_eq!(actor.username(), "bob");
        assert!(!actor.is_anonymous());
        assert!(actor.has_role(&RoleSelector::new("admin")));
        assert!(!actor.has_role(&RoleSelector::new("guest")));
    }

    #[test]
    fn test_anonymous_actor() {
        let actor = Actor::anonymous().with_roles(["Guest"]);
        assert!(actor.is_anonymous());
        assert!(actor.has_role(&RoleSelector::new("Guest")));
        assert_eq!(actor.identity_key(), "anonymous");
    }
}
