//! Filter condition model used by data filter obligations.
//!
//! The engine never evaluates these conditions itself; it assembles them and
//! hands them to the host's query engine via the resource's filter set.
//! Expressions are opaque attribute paths, optionally prefixed with a
//! relation path when a policy applies through a related object.

use serde::{Deserialize, Serialize};

/// Separator between a relation path and the attribute expression it is
/// rebased onto.
pub const RELATION_SEP: &str = "__";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum GroupOperator {
    #[default]
    And,
    Or,
}

/// A single comparison against an attribute expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub expression: String,
    #[serde(default = "default_comparator")]
    pub comparator: String,
    #[serde(default)]
    pub value: serde_json::Value,
}

fn default_comparator() -> String {
    "==".to_string()
}

impl Condition {
    pub fn new(expression: impl Into<String>, comparator: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        Self {
            expression: expression.into(),
            comparator: comparator.into(),
            value: value.into(),
        }
    }

    /// Prefix the expression with a relation path.
    pub fn rebase(&self, relation_path: &str) -> Self {
        Self {
            expression: format!("{}{}{}", relation_path, RELATION_SEP, self.expression),
            comparator: self.comparator.clone(),
            value: self.value.clone(),
        }
    }
}

/// A tree of conditions joined by AND or OR.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ConditionGroup {
    #[serde(default)]
    pub operator: GroupOperator,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub nested_groups: Vec<ConditionGroup>,
}

impl ConditionGroup {
    pub fn and() -> Self {
        Self {
            operator: GroupOperator::And,
            ..Default::default()
        }
    }

    pub fn or() -> Self {
        Self {
            operator: GroupOperator::Or,
            ..Default::default()
        }
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn with_nested(mut self, group: ConditionGroup) -> Self {
        self.nested_groups.push(group);
        self
    }

    /// True when the group contains no conditions at any depth.
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty() && self.nested_groups.iter().all(|g| g.is_empty())
    }

    /// Rebase every condition in the tree onto a relation path.
    pub fn rebase(&self, relation_path: &str) -> Self {
        Self {
            operator: self.operator,
            conditions: self.conditions.iter().map(|c| c.rebase(relation_path)).collect(),
            nested_groups: self
                .nested_groups
                .iter()
                .map(|g| g.rebase(relation_path))
                .collect(),
        }
    }

    /// OR-join a set of groups. A single group is returned as-is to avoid
    /// needless nesting.
    pub fn or_of(mut groups: Vec<ConditionGroup>) -> Option<ConditionGroup> {
        match groups.len() {
            0 => None,
            1 => groups.pop(),
            _ => {
                let mut or = ConditionGroup::or();
                or.nested_groups = groups;
                Some(or)
            }
        }
    }

    /// AND-join an additional group onto an existing (optional) filter set.
    pub fn and_combine(existing: Option<ConditionGroup>, added: ConditionGroup) -> ConditionGroup {
        match existing {
            None => added,
            Some(current) => {
                if current.operator == GroupOperator::And {
                    current.with_nested(added)
                } else {
                    ConditionGroup::and().with_nested(current).with_nested(added)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn customer_filter() -> ConditionGroup {
        ConditionGroup::and().with_condition(Condition::new("CUSTOMER", "==", "[#CURRENT_USER#]"))
    }

    #[test]
    fn test_is_empty_recurses() {
        assert!(ConditionGroup::and().is_empty());
        assert!(ConditionGroup::or().with_nested(ConditionGroup::and()).is_empty());
        assert!(!customer_filter().is_empty());
    }

    #[test]
    fn test_rebase_prefixes_expressions() {
        let rebased = customer_filter().rebase("ORDER");
        assert_eq!(rebased.conditions[0].expression, "ORDER__CUSTOMER");
    }

    #[test]
    fn test_or_of_single_group_avoids_nesting() {
        let single = ConditionGroup::or_of(vec![customer_filter()]).unwrap();
        assert_eq!(single, customer_filter());

        let double =
            ConditionGroup::or_of(vec![customer_filter(), customer_filter()]).unwrap();
        assert_eq!(double.operator, GroupOperator::Or);
        assert_eq!(double.nested_groups.len(), 2);
    }

    #[test]
    fn test_and_combine_reuses_and_group() {
        let existing = ConditionGroup::and().with_condition(Condition::new("STATUS", "==", 10));
        let combined = ConditionGroup::and_combine(Some(existing), customer_filter());
        assert_eq!(combined.operator, GroupOperator::And);
        assert_eq!(combined.conditions.len(), 1);
        assert_eq!(combined.nested_groups.len(), 1);

        let from_or = ConditionGroup::and_combine(
            Some(ConditionGroup::or().with_condition(Condition::new("A", "==", 1))),
            customer_filter(),
        );
        assert_eq!(from_or.operator, GroupOperator::And);
        assert_eq!(from_or.nested_groups.len(), 2);
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let group: ConditionGroup = serde_json::from_value(json!({
            "operator": "OR",
            "conditions": [
                { "expression": "CUSTOMER", "value": "123" }
            ]
        }))
        .unwrap();
        assert_eq!(group.operator, GroupOperator::Or);
        assert_eq!(group.conditions[0].comparator, "==");
    }
}
