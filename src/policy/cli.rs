//! Policy for command line commands.

use crate::actor::Actor;
use crate::error::AuthzError;
use crate::permission::Permission;
use crate::policy::{applies, catch_fault, does_not_apply, role_matches, Effect, Policy, PolicyTargets};
use crate::resource::CliCommand;
use crate::selector::{FacadeSelector, RoleSelector};
use regex::Regex;
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CliPolicyCondition {
    /// Regex the command line must match for the policy to apply.
    pub command_pattern: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CliPolicy {
    name: String,
    effect: Effect,
    role: Option<RoleSelector>,
    facade: Option<FacadeSelector>,
    condition: Option<serde_json::Value>,
}

impl CliPolicy {
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
            facade: targets.facade.map(FacadeSelector::new),
            condition,
        }
    }

    fn condition(&self) -> Result<CliPolicyCondition, AuthzError> {
        match &self.condition {
            Some(value) => Ok(serde_json::from_value(value.clone())?),
            None => Ok(CliPolicyCondition::default()),
        }
    }

    fn evaluate(
        &self,
        actor: &Actor,
        resource: Option<&CliCommand>,
    ) -> Result<Permission, AuthzError> {
        let command = resource.ok_or_else(|| AuthzError::MissingResource(self.name.clone()))?;
        let condition = self.condition()?;

        if !role_matches(self.role.as_ref(), actor) {
            return Ok(does_not_apply(&self.name, "user role does not match"));
        }

        if let Some(selector) = &self.facade {
            match &command.facade {
                Some(facade) if selector.matches(facade) => {}
                _ => return Ok(does_not_apply(&self.name, "facade does not match")),
            }
        }

        if let Some(pattern) = &condition.command_pattern {
            // A pattern that fails to compile is a configuration fault, not
            // a mismatch.
            let regex = Regex::new(pattern)?;
            if !regex.is_match(&command.command) {
                return Ok(does_not_apply(&self.name, "command does not match pattern"));
            }
        }

        Ok(applies(&self.name, self.effect))
    }
}

impl Policy for CliPolicy {
    type Resource = CliCommand;

    fn name(&self) -> &str {
        &self.name
    }

    fn effect(&self) -> Effect {
        self.effect
    }

    fn authorize(&self, actor: &Actor, resource: Option<&CliCommand>) -> Permission {
        catch_fault(&self.name, self.effect, self.evaluate(actor, resource))
    }
}
