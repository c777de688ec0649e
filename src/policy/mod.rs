//! Authorization policies, one variant per resource kind.
//!
//! Every variant shares the same evaluation shape: walk the configured
//! targets and conditions in order, short-circuit to NotApplicable on the
//! first mismatch, and produce the configured effect when everything that
//! was configured matched. An unset target means "don't care"; a policy with
//! nothing configured at all is a blanket policy and applies universally.
//!
//! Policies never return errors. Any fault during evaluation degrades to an
//! Indeterminate permission leaning toward the policy's effect, logged and
//! carrying the error as its cause. A domain-level access denial raised
//! inside evaluation becomes a Denied permission so the policy still
//! participates correctly in combining.

pub mod action;
pub mod cli;
pub mod context;
pub mod data;
pub mod facade;
pub mod generic;
pub mod http;
pub mod page;

pub use action::ActionPolicy;
pub use cli::CliPolicy;
pub use context::ContextPolicy;
pub use data::DataPolicy;
pub use facade::FacadePolicy;
pub use generic::GenericPolicy;
pub use http::HttpRequestPolicy;
pub use page::PagePolicy;

use crate::actor::Actor;
use crate::error::AuthzError;
use crate::permission::Permission;
use crate::selector::RoleSelector;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// The outcome a policy produces when all its targets and conditions match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Effect {
    Permit,
    Deny,
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Effect::Permit => f.write_str("Permit"),
            Effect::Deny => f.write_str("Deny"),
        }
    }
}

impl FromStr for Effect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("permit") {
            Ok(Effect::Permit)
        } else if s.eq_ignore_ascii_case("deny") {
            Ok(Effect::Deny)
        } else {
            Err(format!("Unknown policy effect \"{}\"", s))
        }
    }
}

/// The target set a policy is constructed with. Each field is optional;
/// variants only read the targets they support.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PolicyTargets {
    #[serde(default)]
    pub user_role: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub object: Option<String>,
    #[serde(default)]
    pub page_group: Option<String>,
    #[serde(default)]
    pub facade: Option<String>,
    #[serde(default)]
    pub app_uid: Option<Uuid>,
    #[serde(default)]
    pub context_alias: Option<String>,
}

impl PolicyTargets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn role(mut self, alias: impl Into<String>) -> Self {
        self.user_role = Some(alias.into());
        self
    }

    pub fn action(mut self, alias: impl Into<String>) -> Self {
        self.action = Some(alias.into());
        self
    }

    pub fn object(mut self, alias: impl Into<String>) -> Self {
        self.object = Some(alias.into());
        self
    }

    pub fn page_group(mut self, alias: impl Into<String>) -> Self {
        self.page_group = Some(alias.into());
        self
    }

    pub fn facade(mut self, alias: impl Into<String>) -> Self {
        self.facade = Some(alias.into());
        self
    }

    pub fn app(mut self, uid: Uuid) -> Self {
        self.app_uid = Some(uid);
        self
    }

    pub fn context(mut self, alias: impl Into<String>) -> Self {
        self.context_alias = Some(alias.into());
        self
    }
}

/// The per-resource-kind policy contract.
pub trait Policy: Send + Sync {
    type Resource;

    fn name(&self) -> &str;

    fn effect(&self) -> Effect;

    /// Evaluate the policy against a resource. Never panics and never
    /// reports an error: faults come back as Indeterminate permissions.
    fn authorize(&self, actor: &Actor, resource: Option<&Self::Resource>) -> Permission;
}

/// Shared outer shell for every variant's `authorize`: convert faults to
/// Indeterminate (leaning toward the policy effect) and domain denials to
/// Denied.
pub(crate) fn catch_fault(
    name: &str,
    effect: Effect,
    outcome: Result<Permission, AuthzError>,
) -> Permission {
    match outcome {
        Ok(permission) => permission,
        Err(AuthzError::AccessDenied(denial)) => {
            tracing::warn!(policy = name, reason = %denial, "policy raised a domain denial");
            let message = denial.message.clone();
            Permission::denied(Some(name), Some(&message))
        }
        Err(err) => {
            tracing::warn!(
                policy = name,
                error = %err,
                "policy evaluation failed, degrading to indeterminate"
            );
            Permission::indeterminate(
                Some(anyhow::Error::new(err)),
                Some(effect),
                Some(name),
                Some("policy evaluation failed"),
            )
        }
    }
}

/// Permission produced when every configured check passed.
pub(crate) fn applies(name: &str, effect: Effect) -> Permission {
    Permission::from_effect(effect, Some(name), Some("all configured targets matched"))
}

/// Permission produced when a configured target failed to match.
pub(crate) fn does_not_apply(name: &str, why: &str) -> Permission {
    Permission::not_applicable(Some(name), Some(why))
}

/// An unset role target matches any actor.
pub(crate) fn role_matches(selector: Option<&RoleSelector>, actor: &Actor) -> bool {
    selector.map(|s| actor.has_role(s)).unwrap_or(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AccessDeniedError;

    #[test]
    fn test_effect_parse_and_display() {
        assert_eq!("permit".parse::<Effect>().unwrap(), Effect::Permit);
        assert_eq!("DENY".parse::<Effect>().unwrap(), Effect::Deny);
        assert!("allow".parse::<Effect>().is_err());
        assert_eq!(Effect::Permit.to_string(), "Permit");
    }

    #[test]
    fn test_catch_fault_converts_errors_to_indeterminate() {
        let permission = catch_fault(
            "p1",
            Effect::Deny,
            Err(AuthzError::Config("bad condition".to_string())),
        );
        assert!(permission.is_indeterminate_deny());
        assert!(permission.exception().is_some());
        assert_eq!(permission.policy_name(), Some("p1"));
    }

    #[test]
    fn test_catch_fault_converts_domain_denial_to_denied() {
        let denial = AccessDeniedError {
            point: "context".to_string(),
            permission: Permission::denied(None, None),
            username: Some("bob".to_string()),
            resource: "Debug".to_string(),
            message: "Access to context \"Debug\" denied for user \"bob\"!".to_string(),
        };
        let permission = catch_fault("p1", Effect::Permit, Err(denial.into()));
        assert!(permission.is_denied());
        assert!(!permission.is_indeterminate());
    }

    #[test]
    fn test_catch_fault_passes_permissions_through() {
        let permission = catch_fault("p1", Effect::Permit, Ok(applies("p1", Effect::Permit)));
        assert!(permission.is_permitted());
    }

    #[test]
    fn test_role_matches_unset_target() {
        let actor = Actor::named("bob");
        assert!(role_matches(None, &actor));
        assert!(!role_matches(Some(&RoleSelector::new("Admin")), &actor));
    }
}
