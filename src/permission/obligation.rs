//! Obligations: side-conditions attached to a Permit decision.
//!
//! A permit with obligations is only effective once the caller has fulfilled
//! them. The data authorization point is the main consumer: its policies
//! attach filter obligations that must be merged into the query before the
//! data is actually read or written.

use crate::condition::ConditionGroup;

/// Kind-specific obligation payload.
#[derive(Debug, Clone, PartialEq)]
pub enum ObligationPayload {
    DataFilter(DataFilterObligation),
}

/// A filter condition group to inject into the resource's query.
///
/// An obligation without filters (or with an empty group) means
/// "unrestricted": it is automatically fulfilled and overrides any narrower
/// filter obligations accumulated alongside it.
#[derive(Debug, Clone, PartialEq)]
pub struct DataFilterObligation {
    pub filters: Option<ConditionGroup>,
    /// Relation path to rebase the filters onto when the policy applied via
    /// a related object rather than the requested one directly.
    pub relation_path: Option<String>,
}

impl DataFilterObligation {
    pub fn is_unrestricted(&self) -> bool {
        match &self.filters {
            None => true,
            Some(group) => group.is_empty(),
        }
    }

    /// The filter group as it applies to the requested object, rebased onto
    /// the relation path if one was recorded.
    pub fn effective_filters(&self) -> Option<ConditionGroup> {
        let filters = self.filters.as_ref()?;
        if filters.is_empty() {
            return None;
        }
        Some(match &self.relation_path {
            Some(path) => filters.rebase(path),
            None => filters.clone(),
        })
    }
}

/// An obligation with its fulfillment state.
///
/// The payload is immutable; `fulfilled` transitions from `false` to `true`
/// exactly once, set by the consumer that applied the obligation.
#[derive(Debug, Clone, PartialEq)]
pub struct Obligation {
    payload: ObligationPayload,
    fulfilled: bool,
}

impl Obligation {
    pub fn data_filter(filters: Option<ConditionGroup>, relation_path: Option<String>) -> Self {
        Self {
            payload: ObligationPayload::DataFilter(DataFilterObligation {
                filters,
                relation_path,
            }),
            fulfilled: false,
        }
    }

    pub fn payload(&self) -> &ObligationPayload {
        &self.payload
    }

    pub fn is_fulfilled(&self) -> bool {
        self.fulfilled
    }

    pub fn mark_fulfilled(&mut self) {
        self.fulfilled = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::Condition;

    #[test]
    fn test_empty_payload_is_unrestricted() {
        let none = Obligation::data_filter(None, None);
        let ObligationPayload::DataFilter(payload) = none.payload();
        assert!(payload.is_unrestricted());
        assert_eq!(payload.effective_filters(), None);

        let empty = Obligation::data_filter(Some(ConditionGroup::and()), None);
        let ObligationPayload::DataFilter(payload) = empty.payload();
        assert!(payload.is_unrestricted());
    }

    #[test]
    fn test_effective_filters_rebased() {
        let filters =
            ConditionGroup::and().with_condition(Condition::new("CUSTOMER", "==", "123"));
        let obligation = Obligation::data_filter(Some(filters), Some("ORDER".to_string()));
        let ObligationPayload::DataFilter(payload) = obligation.payload();
        assert!(!payload.is_unrestricted());
        let effective = payload.effective_filters().unwrap();
        assert_eq!(effective.conditions[0].expression, "ORDER__CUSTOMER");
    }

    #[test]
    fn test_fulfillment_transition() {
        let mut obligation = Obligation::data_filter(None, None);
        assert!(!obligation.is_fulfilled());
        obligation.mark_fulfilled();
        assert!(obligation.is_fulfilled());
    }
}
