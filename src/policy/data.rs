//! Policy for data sheet operations (read/create/update/delete).

use crate::actor::Actor;
use crate::condition::ConditionGroup;
use crate::error::AuthzError;
use crate::permission::{Obligation, Permission};
use crate::policy::{applies, catch_fault, does_not_apply, role_matches, Effect, Policy, PolicyTargets};
use crate::resource::{DataOperation, DataRequest};
use crate::selector::{ObjectSelector, RoleSelector};
use serde::Deserialize;

/// Applies a policy targeting one object to a related object by rebasing
/// its filters onto the relation path.
#[derive(Debug, Clone, Deserialize)]
pub struct RelatedObjectRule {
    pub object_alias: String,
    pub relation_path: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DataPolicyCondition {
    /// CRUD whitelist; empty means the policy applies to all operations.
    pub operations: Vec<DataOperation>,
    /// Filters the authorization point must merge into the query when this
    /// policy permits. Configured but empty means "unrestricted".
    pub add_filters: Option<ConditionGroup>,
    pub apply_to_related_objects: Vec<RelatedObjectRule>,
    /// Match the object target by exact alias instead of including
    /// extending objects.
    pub exact_object_match: bool,
}

#[derive(Debug, Clone)]
pub struct DataPolicy {
    name: String,
    effect: Effect,
    role: Option<RoleSelector>,
    object: Option<ObjectSelector>,
    condition: Option<serde_json::Value>,
}

impl DataPolicy {
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
            object: targets.object.map(ObjectSelector::new),
            condition,
        }
    }

    fn condition(&self) -> Result<DataPolicyCondition, AuthzError> {
        match &self.condition {
            Some(value) => Ok(serde_json::from_value(value.clone())?),
            None => Ok(DataPolicyCondition::default()),
        }
    }

    fn evaluate(
        &self,
        actor: &Actor,
        resource: Option<&DataRequest>,
    ) -> Result<Permission, AuthzError> {
        let request = resource.ok_or_else(|| AuthzError::MissingResource(self.name.clone()))?;
        let condition = self.condition()?;

        if !role_matches(self.role.as_ref(), actor) {
            return Ok(does_not_apply(&self.name, "user role does not match"));
        }

        // Relation path recorded when the policy applies via a related
        // object; the filter obligation is rebased onto it.
        let mut relation_path: Option<String> = None;
        if let Some(selector) = &self.object {
            let direct = if condition.exact_object_match {
                request.object.alias().eq_ignore_ascii_case(selector.alias())
            } else {
                selector.matches(&request.object)
            };
            if !direct {
                match condition
                    .apply_to_related_objects
                    .iter()
                    .find(|rule| request.object.is_a(&rule.object_alias))
                {
                    Some(rule) => relation_path = Some(rule.relation_path.clone()),
                    None => {
                        return Ok(does_not_apply(&self.name, "object does not match"));
                    }
                }
            }
        }

        if !condition.operations.is_empty() && !condition.operations.contains(&request.operation) {
            return Ok(does_not_apply(&self.name, "operation does not match"));
        }

        let mut permission = applies(&self.name, self.effect);
        if self.effect == Effect::Permit {
            if let Some(filters) = condition.add_filters {
                permission = permission
                    .with_obligation(Obligation::data_filter(Some(filters), relation_path));
            }
        }
        Ok(permission)
    }
}

impl Policy for DataPolicy {
    type Resource = DataRequest;

    fn name(&self) -> &str {
        &self.name
    }

    fn effect(&self) -> Effect {
        self.effect
    }

    fn authorize(&self, actor: &Actor, resource: Option<&DataRequest>) -> Permission {
        catch_fault(&self.name, self.effect, self.evaluate(actor, resource))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permission::ObligationPayload;
    use crate::resource::ObjectRef;
    use serde_json::json;

    fn sales_user() -> Actor {
        Actor::named("alice").with_role("Sales")
    }

    fn read_orders() -> DataRequest {
        DataRequest::new(ObjectRef::new("my.App.ORDER"), DataOperation::Read)
    }

    #[test]
    fn test_object_and_operation_targets() {
        let policy = DataPolicy::new(
            "orders-read",
            Effect::Permit,
            PolicyTargets::new().role("Sales").object("my.App.ORDER"),
            Some(json!({ "operations": ["read"] })),
        );

        assert!(policy.authorize(&sales_user(), Some(&read_orders())).is_permitted());

        let delete = DataRequest::new(ObjectRef::new("my.App.ORDER"), DataOperation::Delete);
        assert!(policy
            .authorize(&sales_user(), Some(&delete))
            .is_not_applicable());

        let other_object =
            DataRequest::new(ObjectRef::new("my.App.CUSTOMER"), DataOperation::Read);
        assert!(policy
            .authorize(&sales_user(), Some(&other_object))
            .is_not_applicable());
    }

    #[test]
    fn test_object_target_includes_extending_objects() {
        let policy = DataPolicy::new(
            "orders",
            Effect::Permit,
            PolicyTargets::new().object("my.App.ORDER"),
            None,
        );
        let derived = DataRequest::new(
            ObjectRef::new("my.App.SPECIAL_ORDER").with_parent("my.App.ORDER"),
            DataOperation::Read,
        );
        assert!(policy.authorize(&sales_user(), Some(&derived)).is_permitted());

        let exact = DataPolicy::new(
            "orders-exact",
            Effect::Permit,
            PolicyTargets::new().object("my.App.ORDER"),
            Some(json!({ "exact_object_match": true })),
        );
        assert!(exact
            .authorize(&sales_user(), Some(&derived))
            .is_not_applicable());
    }

    #[test]
    fn test_permit_with_filters_carries_obligation() {
        let policy = DataPolicy::new(
            "own-orders",
            Effect::Permit,
            PolicyTargets::new().object("my.App.ORDER"),
            Some(json!({
                "add_filters": {
                    "operator": "AND",
                    "conditions": [
                        { "expression": "CUSTOMER", "comparator": "==", "value": "[#CURRENT_USER#]" }
                    ]
                }
            })),
        );
        let permission = policy.authorize(&sales_user(), Some(&read_orders()));
        assert!(permission.is_permitted());
        assert!(permission.has_obligations());
        let ObligationPayload::DataFilter(payload) = permission.obligations()[0].payload();
        assert!(!payload.is_unrestricted());
        assert!(payload.relation_path.is_none());
    }

    #[test]
    fn test_related_object_match_records_relation_path() {
        let policy = DataPolicy::new(
            "own-orders",
            Effect::Permit,
            PolicyTargets::new().object("my.App.ORDER"),
            Some(json!({
                "apply_to_related_objects": [
                    { "object_alias": "my.App.ORDER_POSITION", "relation_path": "ORDER" }
                ],
                "add_filters": {
                    "conditions": [
                        { "expression": "CUSTOMER", "value": "[#CURRENT_USER#]" }
                    ]
                }
            })),
        );
        let positions =
            DataRequest::new(ObjectRef::new("my.App.ORDER_POSITION"), DataOperation::Read);
        let permission = policy.authorize(&sales_user(), Some(&positions));
        assert!(permission.is_permitted());
        let ObligationPayload::DataFilter(payload) = permission.obligations()[0].payload();
        assert_eq!(payload.relation_path.as_deref(), Some("ORDER"));
        let rebased = payload.effective_filters().unwrap();
        assert_eq!(rebased.conditions[0].expression, "ORDER__CUSTOMER");
    }

    #[test]
    fn test_deny_policy_attaches_no_obligation() {
        let policy = DataPolicy::new(
            "no-orders",
            Effect::Deny,
            PolicyTargets::new().object("my.App.ORDER"),
            Some(json!({
                "add_filters": { "conditions": [ { "expression": "X", "value": 1 } ] }
            })),
        );
        let permission = policy.authorize(&sales_user(), Some(&read_orders()));
        assert!(permission.is_denied());
        assert!(!permission.has_obligations());
    }

    #[test]
    fn test_missing_resource_is_indeterminate() {
        let policy = DataPolicy::new("p", Effect::Permit, PolicyTargets::new(), None);
        let permission = policy.authorize(&sales_user(), None);
        assert!(permission.is_indeterminate_permit());
    }
}
