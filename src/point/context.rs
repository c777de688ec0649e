//! Authorization point for session and application context access.

use std::sync::Arc;

use crate::actor::Actor;
use crate::error::Result;
use crate::event::AuthorizationListener;
use crate::permission::CombinedPermission;
use crate::point::{PointConfig, PointCore, PolicyLoader};
use crate::policy::ContextPolicy;
use crate::resource::ContextRef;

/// Checked before a context object is handed to the caller.
pub struct ContextAuthorizationPoint {
    core: PointCore<ContextPolicy>,
}

impl ContextAuthorizationPoint {
    pub fn new(config: PointConfig) -> Self {
        Self {
            core: PointCore::new(config, "context"),
        }
    }

    pub fn with_loader(mut self, loader: Box<dyn PolicyLoader<ContextPolicy>>) -> Self {
        self.core.set_loader(loader);
        self
    }

    pub fn with_listener(mut self, listener: Arc<dyn AuthorizationListener>) -> Self {
        self.core.add_listener(listener);
        self
    }

    pub fn add_policy(&mut self, policy: ContextPolicy) {
        self.core.add_policy(policy);
    }

    pub fn config(&self) -> &PointConfig {
        self.core.config()
    }

    pub fn evaluate(&self, context: &ContextRef, actor: &Actor) -> CombinedPermission {
        self.core.evaluate(actor, Some(context))
    }

    pub fn authorize(&self, context: ContextRef, actor: &Actor) -> Result<ContextRef> {
        if self.core.is_disabled() {
            return Ok(context);
        }
        let combined = self.core.evaluate(actor, Some(&context));
        self.core.resolve(&combined, actor, &context.alias)?;
        Ok(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permission::CombiningAlgorithm;
    use crate::policy::{Effect, PolicyTargets};

    #[test]
    fn test_debug_context_locked_down() {
        let mut point = ContextAuthorizationPoint::new(
            PointConfig::new("contexts")
                .default_effect(Effect::Permit)
                .combining_algorithm(CombiningAlgorithm::DenyOverrides),
        );
        point.add_policy(ContextPolicy::new(
            "debug-admins-only",
            Effect::Deny,
            PolicyTargets::new().context("my.App.DebugContext"),
        ));
        point.add_policy(ContextPolicy::new(
            "admins",
            Effect::Permit,
            PolicyTargets::new()
                .role("Admin")
                .context("my.App.DebugContext"),
        ));

        // deny-overrides: the blanket deny wins even for admins, other
        // contexts fall through to the Permit default.
        let admin = Actor::named("bob").with_role("Admin");
        assert!(point
            .authorize(ContextRef::new("my.App.DebugContext"), &admin)
            .is_err());
        assert!(point
            .authorize(ContextRef::new("my.App.FilterContext"), &admin)
            .is_ok());
    }
}
