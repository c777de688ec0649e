//! Authorization point guarding action execution.

use std::sync::Arc;

use crate::actor::Actor;
use crate::error::Result;
use crate::event::AuthorizationListener;
use crate::permission::CombinedPermission;
use crate::point::{PointConfig, PointCore, PolicyLoader};
use crate::policy::ActionPolicy;
use crate::resource::ActionRequest;

/// Checked before an action is performed.
pub struct ActionAuthorizationPoint {
    core: PointCore<ActionPolicy>,
}

impl ActionAuthorizationPoint {
    pub fn new(config: PointConfig) -> Self {
        Self {
            core: PointCore::new(config, "action"),
        }
    }

    pub fn with_loader(mut self, loader: Box<dyn PolicyLoader<ActionPolicy>>) -> Self {
        self.core.set_loader(loader);
        self
    }

    pub fn with_listener(mut self, listener: Arc<dyn AuthorizationListener>) -> Self {
        self.core.add_listener(listener);
        self
    }

    pub fn add_policy(&mut self, policy: ActionPolicy) {
        self.core.add_policy(policy);
    }

    pub fn config(&self) -> &PointConfig {
        self.core.config()
    }

    /// Combined decision without pass-or-deny resolution, for inspection.
    pub fn evaluate(&self, request: &ActionRequest, actor: &Actor) -> CombinedPermission {
        self.core.evaluate(actor, Some(request))
    }

    /// Pass the request through or raise an access denial.
    pub fn authorize(&self, request: ActionRequest, actor: &Actor) -> Result<ActionRequest> {
        if self.core.is_disabled() {
            return Ok(request);
        }
        let combined = self.core.evaluate(actor, Some(&request));
        self.core.resolve(&combined, actor, request.action.alias())?;
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{Effect, PolicyTargets};
    use crate::resource::ActionRef;

    #[test]
    fn test_disabled_point_passes_through() {
        let point = ActionAuthorizationPoint::new(PointConfig::new("actions").disabled());
        let request = ActionRequest::new(ActionRef::new("my.App.SaveOrder"));
        assert!(point.authorize(request, &Actor::anonymous()).is_ok());
    }

    #[test]
    fn test_permit_and_deny() {
        let mut point = ActionAuthorizationPoint::new(PointConfig::new("actions"));
        point.add_policy(ActionPolicy::new(
            "admins-may-act",
            Effect::Permit,
            PolicyTargets::new().role("Admin"),
            None,
        ));

        let request = ActionRequest::new(ActionRef::new("my.App.SaveOrder"));
        let admin = Actor::named("bob").with_role("Admin");
        assert!(point.authorize(request.clone(), &admin).is_ok());

        let err = point
            .authorize(request, &Actor::named("eve"))
            .unwrap_err();
        assert!(err
            .to_string()
            .contains("Access to action \"my.App.SaveOrder\" denied for user \"eve\"!"));
    }
}
