//! Policy for session and application context access.

use crate::actor::Actor;
use crate::error::AuthzError;
use crate::permission::Permission;
use crate::policy::{applies, catch_fault, does_not_apply, role_matches, Effect, Policy, PolicyTargets};
use crate::resource::ContextRef;
use crate::selector::RoleSelector;

#[derive(Debug, Clone)]
pub struct ContextPolicy {
    name: String,
    effect: Effect,
    role: Option<RoleSelector>,
    context_alias: Option<String>,
}

impl ContextPolicy {
    pub fn new(name: impl Into<String>, effect: Effect, targets: PolicyTargets) -> Self {
        Self {
            name: name.into(),
            effect,
            role: targets.user_role.map(RoleSelector::new),
            context_alias: targets.context_alias,
        }
    }

    fn evaluate(
        &self,
        actor: &Actor,
        resource: Option<&ContextRef>,
    ) -> Result<Permission, AuthzError> {
        let context = resource.ok_or_else(|| AuthzError::MissingResource(self.name.clone()))?;

        if !role_matches(self.role.as_ref(), actor) {
            return Ok(does_not_apply(&self.name, "user role does not match"));
        }

        if let Some(alias) = &self.context_alias {
            if !alias.eq_ignore_ascii_case(&context.alias) {
                return Ok(does_not_apply(&self.name, "context does not match"));
            }
        }

        Ok(applies(&self.name, self.effect))
    }
}

impl Policy for ContextPolicy {
    type Resource = ContextRef;

    fn name(&self) -> &str {
        &self.name
    }

    fn effect(&self) -> Effect {
        self.effect
    }

    fn authorize(&self, actor: &Actor, resource: Option<&ContextRef>) -> Permission {
        catch_fault(&self.name, self.effect, self.evaluate(actor, resource))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_alias_exact_match() {
        let policy = ContextPolicy::new(
            "debug-context",
            Effect::Deny,
            PolicyTargets::new().context("my.App.DebugContext"),
        );
        let actor = Actor::named("bob");

        assert!(policy
            .authorize(&actor, Some(&ContextRef::new("my.App.DebugContext")))
            .is_denied());
        assert!(policy
            .authorize(&actor, Some(&ContextRef::new("my.App.FilterContext")))
            .is_not_applicable());
    }

    #[test]
    fn test_role_target() {
        let policy = ContextPolicy::new(
            "admin-contexts",
            Effect::Permit,
            PolicyTargets::new().role("Admin"),
        );
        let context = ContextRef::new("my.App.DebugContext");

        assert!(policy
            .authorize(&Actor::named("bob").with_role("Admin"), Some(&context))
            .is_permitted());
        assert!(policy
            .authorize(&Actor::anonymous(), Some(&context))
            .is_not_applicable());
    }
}
