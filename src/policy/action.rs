//! Policy for actions about to be performed.

use crate::actor::Actor;
use crate::error::AuthzError;
use crate::permission::Permission;
use crate::policy::{applies, catch_fault, does_not_apply, role_matches, Effect, Policy, PolicyTargets};
use crate::resource::{ActionKind, ActionRequest, TaskInfo};
use crate::selector::{
    ActionSelector, AppSelector, FacadeSelector, ObjectSelector, PageGroupSelector, RoleSelector,
};
use serde::Deserialize;

/// Kind-specific conditions of an action policy.
///
/// The task-origin flags are tri-state: unset means "don't care", `true`
/// means the task must have that origin, `false` means it must not.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ActionPolicyCondition {
    pub command_line_task: Option<bool>,
    pub http_task: Option<bool>,
    pub scheduler_task: Option<bool>,
    /// Action aliases this policy never applies to, checked before anything
    /// else.
    pub exclude_actions: Vec<String>,
    /// Require the action to have been triggered by the widget that defines
    /// it (or by a chain containing it).
    pub action_trigger_widget_match: bool,
    /// Match the object target by exact alias instead of including
    /// extending objects.
    pub exact_object_match: bool,
    pub apply_if_target_app_matches_action_app: bool,
    pub apply_if_target_app_matches_object_app: bool,
    pub apply_if_target_app_matches_page_app: bool,
}

impl Default for ActionPolicyCondition {
    fn default() -> Self {
        Self {
            command_line_task: None,
            http_task: None,
            scheduler_task: None,
            exclude_actions: Vec::new(),
            action_trigger_widget_match: false,
            exact_object_match: false,
            apply_if_target_app_matches_action_app: true,
            apply_if_target_app_matches_object_app: false,
            apply_if_target_app_matches_page_app: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ActionPolicy {
    name: String,
    effect: Effect,
    role: Option<RoleSelector>,
    action: Option<ActionSelector>,
    facade: Option<FacadeSelector>,
    object: Option<ObjectSelector>,
    page_group: Option<PageGroupSelector>,
    app: Option<AppSelector>,
    condition: Option<serde_json::Value>,
}

impl ActionPolicy {
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
            action: targets.action.map(ActionSelector::new),
            facade: targets.facade.map(FacadeSelector::new),
            object: targets.object.map(ObjectSelector::new),
            page_group: targets.page_group.map(PageGroupSelector::new),
            app: targets.app_uid.map(AppSelector::new),
            condition,
        }
    }

    fn condition(&self) -> Result<ActionPolicyCondition, AuthzError> {
        match &self.condition {
            Some(value) => Ok(serde_json::from_value(value.clone())?),
            None => Ok(ActionPolicyCondition::default()),
        }
    }

    fn evaluate(
        &self,
        actor: &Actor,
        resource: Option<&ActionRequest>,
    ) -> Result<Permission, AuthzError> {
        let request = resource.ok_or_else(|| AuthzError::MissingResource(self.name.clone()))?;
        let condition = self.condition()?;
        let action = &request.action;
        let task = request.task.as_ref();

        // The exclusion list beats every other target.
        if condition
            .exclude_actions
            .iter()
            .any(|a| a.eq_ignore_ascii_case(action.alias()))
        {
            return Ok(does_not_apply(&self.name, "action is excluded"));
        }

        if !role_matches(self.role.as_ref(), actor) {
            return Ok(does_not_apply(&self.name, "user role does not match"));
        }

        if let Some(selector) = &self.action {
            if !selector.matches(action) {
                return Ok(does_not_apply(&self.name, "action does not match"));
            }
        }

        if let Some(selector) = &self.facade {
            match task.and_then(TaskInfo::facade) {
                Some(facade) if selector.matches(facade) => {}
                _ => return Ok(does_not_apply(&self.name, "facade does not match")),
            }
        }

        if let Some(selector) = &self.object {
            let matched = match action.object() {
                Some(object) => {
                    if condition.exact_object_match {
                        object.alias().eq_ignore_ascii_case(selector.alias())
                    } else {
                        selector.matches(object)
                    }
                }
                None => false,
            };
            if !matched {
                return Ok(does_not_apply(&self.name, "object does not match"));
            }
        }

        if let Some(selector) = &self.page_group {
            match task.and_then(TaskInfo::page) {
                Some(page) if selector.matches(page) => {}
                _ => return Ok(does_not_apply(&self.name, "page group does not match")),
            }
        }

        if let Some(selector) = &self.app {
            let mut matched = condition.apply_if_target_app_matches_action_app
                && selector.matches(action.app_uid());
            if !matched && condition.apply_if_target_app_matches_object_app {
                matched = action
                    .object()
                    .map(|o| selector.matches(o.app_uid()))
                    .unwrap_or(false);
            }
            if !matched && condition.apply_if_target_app_matches_page_app {
                matched = task
                    .and_then(TaskInfo::page)
                    .map(|p| selector.matches(p.app_uid()))
                    .unwrap_or(false);
            }
            if !matched {
                return Ok(does_not_apply(&self.name, "app does not match"));
            }
        }

        let origins = [
            (condition.command_line_task, task.map(TaskInfo::is_command_line), "command line origin"),
            (condition.http_task, task.map(TaskInfo::is_http), "http origin"),
            (condition.scheduler_task, task.map(TaskInfo::is_scheduler), "scheduler origin"),
        ];
        for (required, actual, label) in origins {
            if let Some(required) = required {
                if actual.unwrap_or(false) != required {
                    return Ok(does_not_apply(
                        &self.name,
                        &format!("{} does not match", label),
                    ));
                }
            }
        }

        // Opening a widget and reading its prefill are exempt: no widget
        // "defines" them.
        if condition.action_trigger_widget_match
            && !matches!(action.kind(), ActionKind::ShowWidget | ActionKind::ReadPrefill)
        {
            let widget = match task.and_then(TaskInfo::trigger_widget) {
                Some(widget) => widget,
                None => return Ok(does_not_apply(&self.name, "no trigger widget in task")),
            };
            let configured = match widget.action() {
                Some(action) => action,
                None => {
                    return Ok(does_not_apply(&self.name, "trigger widget defines no action"))
                }
            };
            if !configured.chain_contains(action) {
                return Ok(does_not_apply(
                    &self.name,
                    "action was not triggered by its defining widget",
                ));
            }
        }

        Ok(applies(&self.name, self.effect))
    }
}

impl Policy for ActionPolicy {
    type Resource = ActionRequest;

    fn name(&self) -> &str {
        &self.name
    }

    fn effect(&self) -> Effect {
        self.effect
    }

    fn authorize(&self, actor: &Actor, resource: Option<&ActionRequest>) -> Permission {
        catch_fault(&self.name, self.effect, self.evaluate(actor, resource))
    }
}
