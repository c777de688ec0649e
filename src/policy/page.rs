//! Policy for page and menu item visibility.

use crate::actor::Actor;
use crate::error::AuthzError;
use crate::permission::Permission;
use crate::policy::{applies, catch_fault, does_not_apply, role_matches, Effect, Policy, PolicyTargets};
use crate::resource::PageRef;
use crate::selector::{PageGroupSelector, RoleSelector};
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PagePolicyCondition {
    /// Page policies apply to published pages only unless a policy opts in
    /// to unpublished ones explicitly.
    pub apply_to_unpublished: bool,
}

#[derive(Debug, Clone)]
pub struct PagePolicy {
    name: String,
    effect: Effect,
    role: Option<RoleSelector>,
    page_group: Option<PageGroupSelector>,
    condition: Option<serde_json::Value>,
}

impl PagePolicy {
    pub fn new(
        name: impl Into<String>,
        effect: Effect,
        targets: PolicyTargets,
        condition: Option<serde_json::Value>,
    ) -> Self {
        Self {
            name: name.into(),
            effect,
            role: targets.user_role.map(RoleSelector::new),
            page_group: targets.page_group.map(PageGroupSelector::new),
            condition,
        }
    }

    fn condition(&self) -> Result<PagePolicyCondition, AuthzError> {
        match &self.condition {
            Some(value) => Ok(serde_json::from_value(value.clone())?),
            None => Ok(PagePolicyCondition::default()),
        }
    }

    fn evaluate(&self, actor: &Actor, resource: Option<&PageRef>) -> Result<Permission, AuthzError> {
        let page = resource.ok_or_else(|| AuthzError::MissingResource(self.name.clone()))?;
        let condition = self.condition()?;

        if !page.is_published() && !condition.apply_to_unpublished {
            return Ok(does_not_apply(&self.name, "page is not published"));
        }

        if !role_matches(self.role.as_ref(), actor) {
            return Ok(does_not_apply(&self.name, "user role does not match"));
        }

        if let Some(selector) = &self.page_group {
            if !selector.matches(page) {
                return Ok(does_not_apply(&self.name, "page group does not match"));
            }
        }

        Ok(applies(&self.name, self.effect))
    }
}

impl Policy for PagePolicy {
    type Resource = PageRef;

    fn name(&self) -> &str {
        &self.name
    }

    fn effect(&self) -> Effect {
        self.effect
    }

    fn authorize(&self, actor: &Actor, resource: Option<&PageRef>) -> Permission {
        catch_fault(&self.name, self.effect, self.evaluate(actor, resource))
    }
}
