//! Catch-all policy matched purely on targets, for points without a
//! kind-specific policy variant.

use crate::actor::Actor;
use crate::error::AuthzError;
use crate::permission::Permission;
use crate::policy::{applies, catch_fault, does_not_apply, role_matches, Effect, Policy, PolicyTargets};
use crate::resource::GenericRequest;
use crate::selector::{ActionSelector, FacadeSelector, ObjectSelector, PageGroupSelector, RoleSelector};

/// Matches whichever common targets are configured against whichever
/// attributes the request supplies. A configured target whose attribute is
/// absent from the request does not match.
#[derive(Debug, Clone)]
pub struct GenericPolicy {
    name: String,
    effect: Effect,
    role: Option<RoleSelector>,
    action: Option<ActionSelector>,
    object: Option<ObjectSelector>,
    page_group: Option<PageGroupSelector>,
    facade: Option<FacadeSelector>,
}

impl GenericPolicy {
    pub fn new(name: impl Into<String>, effect: Effect, targets: PolicyTargets) -> Self {
        Self {
            name: name.into(),
            effect,
            role: targets.user_role.map(RoleSelector::new),
            action: targets.action.map(ActionSelector::new),
            object: targets.object.map(ObjectSelector::new),
            page_group: targets.page_group.map(PageGroupSelector::new),
            facade: targets.facade.map(FacadeSelector::new),
        }
    }

    fn evaluate(
        &self,
        actor: &Actor,
        resource: Option<&GenericRequest>,
    ) -> Result<Permission, AuthzError> {
        let request = resource.ok_or_else(|| AuthzError::MissingResource(self.name.clone()))?;

        if !role_matches(self.role.as_ref(), actor) {
            return Ok(does_not_apply(&self.name, "user role does not match"));
        }

        if let Some(selector) = &self.action {
            if !request.action.as_ref().is_some_and(|a| selector.matches(a)) {
                return Ok(does_not_apply(&self.name, "action does not match"));
            }
        }

        if let Some(selector) = &self.object {
            if !request.object.as_ref().is_some_and(|o| selector.matches(o)) {
                return Ok(does_not_apply(&self.name, "object does not match"));
            }
        }

        if let Some(selector) = &self.page_group {
            if !request.page.as_ref().is_some_and(|p| selector.matches(p)) {
                return Ok(does_not_apply(&self.name, "page group does not match"));
            }
        }

        if let Some(selector) = &self.facade {
            if !request.facade.as_ref().is_some_and(|f| selector.matches(f)) {
                return Ok(does_not_apply(&self.name, "facade does not match"));
            }
        }

        Ok(applies(&self.name, self.effect))
    }
}

impl Policy for GenericPolicy {
    type Resource = GenericRequest;

    fn name(&self) -> &str {
        &self.name
    }

    fn effect(&self) -> Effect {
        self.effect
    }

    fn authorize(&self, actor: &Actor, resource: Option<&GenericRequest>) -> Permission {
        catch_fault(&self.name, self.effect, self.evaluate(actor, resource))
    }
}
