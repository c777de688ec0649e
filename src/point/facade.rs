//! Authorization point at the facade (transport adapter) boundary.

use std::sync::Arc;

use crate::actor::Actor;
use crate::error::Result;
use crate::event::AuthorizationListener;
use crate::permission::CombinedPermission;
use crate::point::{PointConfig, PointCore, PolicyLoader};
use crate::policy::FacadePolicy;
use crate::resource::FacadeRef;

/// Checked when a request enters the system through a facade.
pub struct FacadeAuthorizationPoint {
    core: PointCore<FacadePolicy>,
}

impl FacadeAuthorizationPoint {
    pub fn new(config: PointConfig) -> Self {
        Self {
            core: PointCore::new(config, "facade"),
        }
    }

    pub fn with_loader(mut self, loader: Box<dyn PolicyLoader<FacadePolicy>>) -> Self {
        self.core.set_loader(loader);
        self
    }

    pub fn with_listener(mut self, listener: Arc<dyn AuthorizationListener>) -> Self {
        self.core.add_listener(listener);
        self
    }

    pub fn add_policy(&mut self, policy: FacadePolicy) {
        self.core.add_policy(policy);
    }

    pub fn config(&self) -> &PointConfig {
        self.core.config()
    }

    pub fn evaluate(&self, facade: &FacadeRef, actor: &Actor) -> CombinedPermission {
        self.core.evaluate(actor, Some(facade))
    }

    pub fn authorize(&self, facade: FacadeRef, actor: &Actor) -> Result<FacadeRef> {
        if self.core.is_disabled() {
            return Ok(facade);
        }
        let combined = self.core.evaluate(actor, Some(&facade));
        self.core.resolve(&combined, actor, facade.alias())?;
        Ok(facade)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{Effect, PolicyTargets};

    #[test]
    fn test_facade_gate() {
        let mut point = FacadeAuthorizationPoint::new(PointConfig::new("facades"));
        point.add_policy(FacadePolicy::new(
            "web-for-users",
            Effect::Permit,
            PolicyTargets::new().role("User").facade("my.App.WebFacade"),
        ));

        let web = FacadeRef::new("my.App.WebFacade");
        let user = Actor::named("bob").with_role("User");
        assert!(point.authorize(web.clone(), &user).is_ok());

        let err = point.authorize(web, &Actor::anonymous()).unwrap_err();
        assert!(err
            .to_string()
            .contains("Access to facade \"my.App.WebFacade\" denied for anonymous users!"));
    }
}
