//! Policy for facade access at the transport boundary.

use crate::actor::Actor;
use crate::error::AuthzError;
use crate::permission::Permission;
use crate::policy::{applies, catch_fault, does_not_apply, role_matches, Effect, Policy, PolicyTargets};
use crate::resource::FacadeRef;
use crate::selector::{FacadeSelector, RoleSelector};

#[derive(Debug, Clone)]
pub struct FacadePolicy {
    name: String,
    effect: Effect,
    role: Option<RoleSelector>,
    facade: Option<FacadeSelector>,
}

impl FacadePolicy {
    pub fn new(name: impl Into<String>, effect: Effect, targets: PolicyTargets) -> Self {
        Self {
            name: name.into(),
            effect,
            role: targets.user_role.map(RoleSelector::new),
            facade: targets.facade.map(FacadeSelector::new),
        }
    }

    fn evaluate(
        &self,
        actor: &Actor,
        resource: Option<&FacadeRef>,
    ) -> Result<Permission, AuthzError> {
        let facade = resource.ok_or_else(|| AuthzError::MissingResource(self.name.clone()))?;

        if !role_matches(self.role.as_ref(), actor) {
            return Ok(does_not_apply(&self.name, "user role does not match"));
        }

        if let Some(selector) = &self.facade {
            if !selector.matches(facade) {
                return Ok(does_not_apply(&self.name, "facade does not match"));
            }
        }

        Ok(applies(&self.name, self.effect))
    }
}

impl Policy for FacadePolicy {
    type Resource = FacadeRef;

    fn name(&self) -> &str {
        &self.name
    }

    fn effect(&self) -> Effect {
        self.effect
    }

    fn authorize(&self, actor: &Actor, resource: Option<&FacadeRef>) -> Permission {
        catch_fault(&self.name, self.effect, self.evaluate(actor, resource))
    }
}
